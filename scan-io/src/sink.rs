//! Off-thread frame persistence.
//!
//! Every submitted write is tracked until its outcome has been collected by
//! [`ImageSink::wait`]. Callers must treat `wait` as the barrier before any
//! output that references the written files.
//!
//! A background write that fails is remembered for the life of the sink, so
//! every later `wait` keeps failing even after the queue has drained.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error};
use rayon::{ThreadPool, ThreadPoolBuilder};
use scan_core::error::{Result as ScanResult, ScanError};
use std::path::PathBuf;

use crate::image::{Frame, ImageError, Result};

/// Handle for one submitted write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteTicket(u64);

struct Outcome {
    ticket: WriteTicket,
    path: PathBuf,
    result: Result<()>,
}

pub struct ImageSink {
    pool: Option<ThreadPool>,
    jpeg_quality: u8,
    sender: Sender<Outcome>,
    receiver: Receiver<Outcome>,
    in_flight: usize,
    next_ticket: u64,
    failed: Vec<PathBuf>,
}

impl ImageSink {
    /// Writes happen on the calling thread
    pub fn inline(jpeg_quality: u8) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            pool: None,
            jpeg_quality,
            sender,
            receiver,
            in_flight: 0,
            next_ticket: 0,
            failed: Vec::new(),
        }
    }

    /// Writes happen on a dedicated pool of `threads` workers
    pub fn background(threads: usize, jpeg_quality: u8) -> ScanResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("image-sink-{}", i))
            .build()
            .map_err(|e| ScanError::InvalidInput(format!("failed to start image writers: {}", e)))?;

        let mut sink = Self::inline(jpeg_quality);
        sink.pool = Some(pool);
        Ok(sink)
    }

    pub fn is_background(&self) -> bool {
        self.pool.is_some()
    }

    /// Number of writes submitted but not yet collected
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    /// Persist `frame` at `path`.
    ///
    /// Inline sinks return the write result directly. Background sinks
    /// return immediately; failures surface from [`ImageSink::wait`].
    pub fn submit(&mut self, frame: Frame, path: PathBuf) -> Result<WriteTicket> {
        let ticket = WriteTicket(self.next_ticket);
        self.next_ticket += 1;

        match &self.pool {
            None => {
                frame.write(&path, self.jpeg_quality)?;
                debug!("wrote {}", path.display());
            }
            Some(pool) => {
                let sender = self.sender.clone();
                let quality = self.jpeg_quality;
                self.in_flight += 1;
                pool.spawn(move || {
                    let result = frame.write(&path, quality);
                    // the receiver lives as long as the sink
                    let _ = sender.send(Outcome {
                        ticket,
                        path,
                        result,
                    });
                });
            }
        }
        Ok(ticket)
    }

    /// Block until every outstanding write has finished.
    ///
    /// Returns the number of writes collected. Fails with the first error
    /// collected by this call, or with [`ImageError::Unwritten`] if an
    /// earlier call already collected a failure.
    pub fn wait(&mut self) -> Result<usize> {
        let mut collected = 0;
        let mut first_error: Option<ImageError> = None;

        while self.in_flight > 0 {
            let Ok(outcome) = self.receiver.recv() else {
                break;
            };
            self.in_flight -= 1;
            collected += 1;

            match outcome.result {
                Ok(()) => debug!("wrote {} ({:?})", outcome.path.display(), outcome.ticket),
                Err(e) => {
                    error!("write {:?} failed: {}", outcome.ticket, e);
                    self.failed.push(outcome.path);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        match self.failed.first() {
            Some(first) => Err(ImageError::Unwritten {
                first: first.clone(),
                count: self.failed.len(),
            }),
            None => Ok(collected),
        }
    }
}

impl Drop for ImageSink {
    fn drop(&mut self) {
        if self.in_flight > 0 {
            if let Err(e) = self.wait() {
                error!("image writes failed during shutdown: {}", e);
            }
        }
    }
}
