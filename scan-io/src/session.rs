//! Scan session: the aggregate that pairs captured frames with poses and
//! turns them into an export directory.
//!
//! Layout under the base directory:
//!
//! ```text
//! ir1/00000.png ...     primary infrared
//! ir2/00000.png ...     secondary infrared
//! color/00000.jpg ...   optional
//! depth/00000.png ...   optional
//! export.npy
//! export.json
//! ```
//!
//! Both view lists always have one entry per accumulated frame. A failed
//! [`ScanSession::accumulate`] leaves the counter and view lists untouched.

use log::{debug, info, warn};
use nalgebra::Vector3;
use scan_core::camera::CameraCalibration;
use scan_core::error::{CaptureError, Result, ScanError, StorageError};
use scan_core::pose::{secondary_location, ArmPose, RigTransform, SecondaryPlacement};
use scan_core::rig::{ExportDocument, SensorDescriptor, ViewRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::device::FrameSet;
use crate::export::{write_archive, write_json, ARCHIVE_FILE, JSON_FILE};
use crate::image::{Frame, FrameKind, RasterFormat, DEFAULT_JPEG_QUALITY};
use crate::sink::ImageSink;

pub const PRIMARY_DIR: &str = "ir1";
pub const SECONDARY_DIR: &str = "ir2";
pub const COLOR_DIR: &str = "color";
pub const DEPTH_DIR: &str = "depth";

/// Minimum digits in a frame file stem
pub const FRAME_NAME_WIDTH: usize = 5;

/// Zero-padded file stem for frame `index`
pub fn frame_stem(index: usize) -> String {
    format!("{:0width$}", index, width = FRAME_NAME_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Encoding for the infrared pair
    pub image_format: RasterFormat,
    pub jpeg_quality: u8,
    /// Background writer threads; 0 writes on the calling thread
    pub writer_threads: usize,
    pub placement: SecondaryPlacement,
    pub keep_color: bool,
    pub keep_depth: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            image_format: RasterFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            writer_threads: 0,
            placement: SecondaryPlacement::Composed,
            keep_color: false,
            keep_depth: false,
        }
    }
}

pub struct ScanSession {
    base_directory: PathBuf,
    options: SessionOptions,
    primary_calibration: Option<CameraCalibration>,
    secondary_calibration: Option<CameraCalibration>,
    rig_transform: Option<RigTransform>,
    primary_views: Vec<ViewRecord>,
    secondary_views: Vec<ViewRecord>,
    frame_count: usize,
    sink: ImageSink,
    sealed: bool,
}

impl ScanSession {
    /// Open a session at `base_directory` with default options
    pub fn initialize(base_directory: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(base_directory, SessionOptions::default())
    }

    pub fn with_options(base_directory: impl AsRef<Path>, options: SessionOptions) -> Result<Self> {
        let base_directory = base_directory.as_ref().to_path_buf();
        prepare_directory(&base_directory)?;

        let mut subdirs = vec![PRIMARY_DIR, SECONDARY_DIR];
        if options.keep_color {
            subdirs.push(COLOR_DIR);
        }
        if options.keep_depth {
            subdirs.push(DEPTH_DIR);
        }
        for dir in subdirs {
            prepare_directory(&base_directory.join(dir))?;
        }

        let sink = match options.writer_threads {
            0 => ImageSink::inline(options.jpeg_quality),
            n => ImageSink::background(n, options.jpeg_quality)?,
        };

        info!(
            "Scan session at {} ({} infrared, {} writer threads)",
            base_directory.display(),
            options.image_format,
            options.writer_threads
        );

        Ok(Self {
            base_directory,
            options,
            primary_calibration: None,
            secondary_calibration: None,
            rig_transform: None,
            primary_views: Vec::new(),
            secondary_views: Vec::new(),
            frame_count: 0,
            sink,
            sealed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sealed {
            return Err(CaptureError::Sealed.into());
        }
        Ok(())
    }

    fn warn_if_captured(&self, what: &str) {
        if self.frame_count > 0 {
            warn!(
                "{} changed after {} frames were captured; earlier views keep the old value",
                what, self.frame_count
            );
        }
    }

    pub fn set_primary_calibration(&mut self, calibration: CameraCalibration) -> Result<()> {
        self.ensure_open()?;
        self.warn_if_captured("Primary calibration");
        self.primary_calibration = Some(calibration);
        Ok(())
    }

    pub fn set_secondary_calibration(&mut self, calibration: CameraCalibration) -> Result<()> {
        self.ensure_open()?;
        self.warn_if_captured("Secondary calibration");
        self.secondary_calibration = Some(calibration);
        Ok(())
    }

    /// Fixed pose of the secondary sensor in the primary frame
    pub fn set_rig_transform(&mut self, rig: RigTransform) -> Result<()> {
        self.ensure_open()?;
        self.warn_if_captured("Rig transform");
        self.rig_transform = Some(rig);
        Ok(())
    }

    fn setup(
        &self,
    ) -> std::result::Result<(&CameraCalibration, &CameraCalibration, &RigTransform), CaptureError>
    {
        let primary = self
            .primary_calibration
            .as_ref()
            .ok_or(CaptureError::MissingCalibration("primary"))?;
        let secondary = self
            .secondary_calibration
            .as_ref()
            .ok_or(CaptureError::MissingCalibration("secondary"))?;
        let rig = self
            .rig_transform
            .as_ref()
            .ok_or(CaptureError::MissingRigTransform)?;
        Ok((primary, secondary, rig))
    }

    /// Record one synchronized infrared pair taken at `pose`
    /// (`[x, y, z]` or `[x, y, z, rx, ry, rz]`).
    pub fn accumulate(&mut self, primary: Frame, secondary: Frame, pose: &[f64]) -> Result<()> {
        self.accumulate_frames(FrameSet::pair(primary, secondary), pose)
    }

    /// Like [`ScanSession::accumulate`], also storing any auxiliary streams
    /// the session keeps
    pub fn accumulate_frames(&mut self, frames: FrameSet, pose: &[f64]) -> Result<()> {
        self.ensure_open()?;

        let (primary_location, secondary_location) = {
            let (primary, secondary, rig) = self.setup()?;
            check_pair(&frames.primary, &frames.secondary)?;
            check_calibrated_size("primary", primary, &frames.primary)?;
            check_calibrated_size("secondary", secondary, &frames.secondary)?;
            if frames.primary.kind() == FrameKind::Depth && !self.options.image_format.is_lossless()
            {
                return Err(CaptureError::LossyDepth(self.options.image_format.to_string()).into());
            }
            let pose = ArmPose::from_slice(pose)?;
            (
                pose.position,
                secondary_location(&pose, rig, self.options.placement),
            )
        };

        let stem = frame_stem(self.frame_count);
        let ext = self.options.image_format.extension();

        let primary_path = self.frame_path(PRIMARY_DIR, &stem, ext);
        let secondary_path = self.frame_path(SECONDARY_DIR, &stem, ext);
        self.sink.submit(frames.primary, primary_path)?;
        self.sink.submit(frames.secondary, secondary_path)?;

        if let (true, Some(color)) = (self.options.keep_color, frames.color) {
            let path = self.frame_path(COLOR_DIR, &stem, RasterFormat::Jpeg.extension());
            self.sink.submit(color, path)?;
        }
        if let (true, Some(depth)) = (self.options.keep_depth, frames.depth) {
            let path = self.frame_path(DEPTH_DIR, &stem, RasterFormat::Png.extension());
            self.sink.submit(depth, path)?;
        }

        self.push_views(&stem, ext, primary_location, secondary_location);
        debug!(
            "Frame {} at ({:.4}, {:.4}, {:.4})",
            stem, primary_location.x, primary_location.y, primary_location.z
        );
        Ok(())
    }

    fn frame_path(&self, dir: &str, stem: &str, ext: &str) -> PathBuf {
        self.base_directory.join(dir).join(format!("{}.{}", stem, ext))
    }

    fn push_views(
        &mut self,
        stem: &str,
        ext: &str,
        primary_location: Vector3<f64>,
        secondary_location: Vector3<f64>,
    ) {
        self.primary_views.push(ViewRecord::at(
            format!("{}/{}.{}", PRIMARY_DIR, stem, ext),
            primary_location,
        ));
        self.secondary_views.push(ViewRecord::at(
            format!("{}/{}.{}", SECONDARY_DIR, stem, ext),
            secondary_location,
        ));
        self.frame_count += 1;
    }

    /// Descriptors for `[primary, secondary]`, primary as master
    pub fn export_descriptors(&self) -> Result<[SensorDescriptor; 2]> {
        let (primary, secondary, rig) = self.setup()?;
        Ok([
            SensorDescriptor::master(primary, self.primary_views.clone()),
            SensorDescriptor::attached(secondary, rig, self.secondary_views.clone()),
        ])
    }

    pub fn export_document(&self) -> Result<ExportDocument> {
        ExportDocument::new(Vec::from(self.export_descriptors()?))
    }

    /// Wait for every outstanding image write, then write `export.npy` and
    /// `export.json` and seal the session. Running it again rewrites the
    /// same files.
    ///
    /// Once a background write has failed the export would name a missing
    /// image, so this keeps failing for the rest of the session.
    pub fn materialize(&mut self) -> Result<()> {
        let document = self.export_document()?;

        let flushed = self.sink.wait()?;
        if flushed > 0 {
            debug!("Flushed {} pending image writes", flushed);
        }

        write_archive(&self.base_directory.join(ARCHIVE_FILE), &document)?;
        write_json(&self.base_directory.join(JSON_FILE), &document)?;
        self.sealed = true;

        info!(
            "Materialized {} frame pairs to {}",
            self.frame_count,
            self.base_directory.display()
        );
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn primary_views(&self) -> &[ViewRecord] {
        &self.primary_views
    }

    pub fn secondary_views(&self) -> &[ViewRecord] {
        &self.secondary_views
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn pending_writes(&self) -> usize {
        self.sink.pending()
    }
}

/// Create `path` if needed, refusing files and read-only directories
fn prepare_directory(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(StorageError::NotADirectory {
            path: path.to_path_buf(),
        }
        .into()),
        Ok(meta) if meta.permissions().readonly() => Err(StorageError::NotWritable {
            path: path.to_path_buf(),
        }
        .into()),
        Ok(_) => Ok(()),
        Err(_) => {
            fs::create_dir_all(path).map_err(|source| StorageError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(())
        }
    }
}

fn check_pair(primary: &Frame, secondary: &Frame) -> std::result::Result<(), CaptureError> {
    if primary.kind() != secondary.kind() || primary.dimensions() != secondary.dimensions() {
        return Err(CaptureError::FrameMismatch {
            primary: primary.describe(),
            secondary: secondary.describe(),
        });
    }
    Ok(())
}

fn check_calibrated_size(
    sensor: &'static str,
    calibration: &CameraCalibration,
    frame: &Frame,
) -> std::result::Result<(), CaptureError> {
    let expected = calibration.image_dimensions();
    let actual = frame.dimensions();
    if expected != actual {
        return Err(CaptureError::CalibrationMismatch {
            sensor,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{read_archive, read_json};
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;
    use ndarray::{Array2, Array3};
    use std::f64::consts::FRAC_PI_2;

    const W: u32 = 8;
    const H: u32 = 6;

    fn calibration() -> CameraCalibration {
        CameraCalibration::from_intrinsics(10.0, 10.0, 4.0, 3.0, vec![0.0; 5], W, H).unwrap()
    }

    fn rig() -> RigTransform {
        RigTransform::new(Vector3::new(0.05, 0.0, 0.0), Matrix3::identity()).unwrap()
    }

    fn infrared(seed: u8) -> Frame {
        Frame::infrared_from_array(&Array2::from_elem((H as usize, W as usize), seed)).unwrap()
    }

    fn ready(base: &Path, options: SessionOptions) -> ScanSession {
        let mut session = ScanSession::with_options(base, options).unwrap();
        session.set_primary_calibration(calibration()).unwrap();
        session.set_secondary_calibration(calibration()).unwrap();
        session.set_rig_transform(rig()).unwrap();
        session
    }

    #[test]
    fn test_frame_stem_padding() {
        assert_eq!(frame_stem(0), "00000");
        assert_eq!(frame_stem(42), "00042");
        assert_eq!(frame_stem(123456), "123456");
    }

    #[test]
    fn test_initialize_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("scan");
        let session = ScanSession::initialize(&base).unwrap();
        assert!(base.join(PRIMARY_DIR).is_dir());
        assert!(base.join(SECONDARY_DIR).is_dir());
        assert!(!base.join(COLOR_DIR).exists());
        assert_eq!(session.base_directory(), base.as_path());

        // idempotent on an existing tree
        ScanSession::initialize(&base).unwrap();
    }

    #[test]
    fn test_initialize_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, b"x").unwrap();
        let result = ScanSession::initialize(&path);
        assert!(matches!(
            result,
            Err(ScanError::Storage(StorageError::NotADirectory { .. }))
        ));
    }

    #[test]
    fn test_initialize_rejects_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("locked");
        fs::create_dir(&base).unwrap();
        let mut perms = fs::metadata(&base).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&base, perms.clone()).unwrap();

        let result = ScanSession::initialize(&base);

        perms.set_readonly(false);
        fs::set_permissions(&base, perms).unwrap();
        assert!(matches!(
            result,
            Err(ScanError::Storage(StorageError::NotWritable { .. }))
        ));
    }

    #[test]
    fn test_accumulate_requires_calibration() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ScanSession::initialize(dir.path()).unwrap();

        let err = session
            .accumulate(infrared(1), infrared(2), &[0.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::MissingCalibration("primary"))
        ));
        assert_eq!(session.frame_count(), 0);
        assert!(session.primary_views().is_empty());

        session.set_primary_calibration(calibration()).unwrap();
        session.set_secondary_calibration(calibration()).unwrap();
        let err = session
            .accumulate(infrared(1), infrared(2), &[0.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::MissingRigTransform)
        ));
        assert_eq!(session.frame_count(), 0);
    }

    #[test]
    fn test_rejected_frames_leave_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready(dir.path(), SessionOptions::default());
        let pose = [0.0, 0.0, 0.0];

        let small = Frame::infrared_from_array(&Array2::zeros((H as usize, 4))).unwrap();
        let err = session.accumulate(infrared(1), small.clone(), &pose).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::FrameMismatch { .. })
        ));

        let err = session.accumulate(small.clone(), small, &pose).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::CalibrationMismatch {
                sensor: "primary",
                expected: (W, H),
                actual: (4, H),
            })
        ));

        let depth = Frame::depth_from_array(&Array2::zeros((H as usize, W as usize))).unwrap();
        let err = session.accumulate(infrared(1), depth, &pose).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::FrameMismatch { .. })
        ));

        let err = session
            .accumulate(infrared(1), infrared(2), &[1.0, 2.0])
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::InvalidPose(2))
        ));

        let err = session
            .accumulate(infrared(1), infrared(2), &[f64::NAN, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::Capture(CaptureError::NonFinitePose(0))
        ));

        assert_eq!(session.frame_count(), 0);
        assert!(session.primary_views().is_empty());
        assert!(session.secondary_views().is_empty());
        assert!(!dir.path().join(PRIMARY_DIR).join("00000.png").exists());
    }

    #[test]
    fn test_views_stay_paired() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready(dir.path(), SessionOptions::default());

        for i in 0..4 {
            let pose = [i as f64 * 0.1, 0.3, 0.7];
            session.accumulate(infrared(i), infrared(i + 1), &pose).unwrap();
            assert_eq!(session.primary_views().len(), session.frame_count());
            assert_eq!(session.secondary_views().len(), session.frame_count());
        }

        assert_eq!(session.primary_views()[3].image_reference, "ir1/00003.png");
        assert_eq!(session.secondary_views()[3].image_reference, "ir2/00003.png");
        assert_eq!(
            Frame::open(&dir.path().join("ir2").join("00002.png")).unwrap(),
            infrared(3)
        );
    }

    #[test]
    fn test_secondary_offset_without_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready(dir.path(), SessionOptions::default());
        session
            .accumulate(infrared(0), infrared(0), &[1.0, 2.0, 3.0])
            .unwrap();

        let primary = &session.primary_views()[0];
        let secondary = &session.secondary_views()[0];
        assert_eq!(primary.location, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(secondary.location, Vector3::new(1.05, 2.0, 3.0), epsilon = 1e-12);
        assert_eq!(secondary.rotation, nalgebra::Matrix3::identity());
    }

    #[test]
    fn test_placement_policies_with_rotated_pose() {
        // quarter turn about z maps the rig baseline onto +y
        let pose = [0.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2];

        let dir = tempfile::tempdir().unwrap();
        let mut composed = ready(&dir.path().join("a"), SessionOptions::default());
        composed.accumulate(infrared(0), infrared(0), &pose).unwrap();
        assert_relative_eq!(
            composed.secondary_views()[0].location,
            Vector3::new(0.0, 0.05, 0.0),
            epsilon = 1e-12
        );

        let options = SessionOptions {
            placement: SecondaryPlacement::Offset,
            ..SessionOptions::default()
        };
        let mut offset = ready(&dir.path().join("b"), options);
        offset.accumulate(infrared(0), infrared(0), &pose).unwrap();
        assert_relative_eq!(
            offset.secondary_views()[0].location,
            Vector3::new(0.05, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_export_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let session = ScanSession::initialize(dir.path()).unwrap();
        assert!(matches!(
            session.export_descriptors(),
            Err(ScanError::Capture(CaptureError::MissingCalibration(_)))
        ));

        let session = ready(dir.path(), SessionOptions::default());
        let [primary, secondary] = session.export_descriptors().unwrap();
        assert!(primary.master);
        assert!(!secondary.master);
        assert_eq!(primary.location, Vector3::zeros());
        assert_eq!(primary.rotation, nalgebra::Matrix3::identity());
        assert_eq!(secondary.location, *rig().translation());
    }

    #[test]
    fn test_materialize_is_repeatable_and_seals() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready(dir.path(), SessionOptions::default());
        session
            .accumulate(infrared(1), infrared(2), &[0.1, 0.2, 0.3])
            .unwrap();

        session.materialize().unwrap();
        assert!(session.is_sealed());
        let json = fs::read(dir.path().join(JSON_FILE)).unwrap();
        let archive = fs::read(dir.path().join(ARCHIVE_FILE)).unwrap();

        session.materialize().unwrap();
        assert_eq!(fs::read(dir.path().join(JSON_FILE)).unwrap(), json);
        assert_eq!(fs::read(dir.path().join(ARCHIVE_FILE)).unwrap(), archive);

        let err = session
            .accumulate(infrared(1), infrared(2), &[0.1, 0.2, 0.3])
            .unwrap_err();
        assert!(matches!(err, ScanError::Capture(CaptureError::Sealed)));
        assert!(matches!(
            session.set_rig_transform(rig()),
            Err(ScanError::Capture(CaptureError::Sealed))
        ));
        assert_eq!(session.frame_count(), 1);
    }

    #[test]
    fn test_materialize_waits_for_background_writes() {
        let dir = tempfile::tempdir().unwrap();
        let options = SessionOptions {
            writer_threads: 2,
            ..SessionOptions::default()
        };
        let mut session = ready(dir.path(), options);
        for i in 0..10 {
            session
                .accumulate(infrared(i), infrared(i), &[0.0, 0.0, i as f64])
                .unwrap();
        }
        session.materialize().unwrap();
        assert_eq!(session.pending_writes(), 0);

        let document = read_json(&dir.path().join(JSON_FILE)).unwrap();
        for camera in &document.cameras {
            for view in &camera.views {
                assert!(dir.path().join(&view.image_reference).is_file());
            }
        }
        assert_eq!(read_archive(&dir.path().join(ARCHIVE_FILE)).unwrap(), document);
    }

    #[test]
    fn test_failed_background_write_blocks_export() {
        let dir = tempfile::tempdir().unwrap();
        let options = SessionOptions {
            writer_threads: 2,
            ..SessionOptions::default()
        };
        let mut session = ready(dir.path(), options);
        let secondary_dir = dir.path().join(SECONDARY_DIR);
        fs::remove_dir(&secondary_dir).unwrap();
        fs::write(&secondary_dir, b"not a directory").unwrap();

        session
            .accumulate(infrared(1), infrared(2), &[0.0, 0.0, 0.0])
            .unwrap();
        let err = session.materialize().unwrap_err();
        assert!(matches!(
            err,
            ScanError::Storage(StorageError::Write { .. })
        ));

        // fixing the directory does not bring the lost frame back
        fs::remove_file(&secondary_dir).unwrap();
        fs::create_dir(&secondary_dir).unwrap();
        let err = session.materialize().unwrap_err();
        assert!(matches!(
            err,
            ScanError::Storage(StorageError::UnwrittenImages { count: 1, .. })
        ));
        assert!(!dir.path().join(JSON_FILE).exists());
        assert!(!dir.path().join(ARCHIVE_FILE).exists());
        assert!(!session.is_sealed());
    }

    #[test]
    fn test_depth_pair_needs_lossless_format() {
        let dir = tempfile::tempdir().unwrap();
        let options = SessionOptions {
            image_format: RasterFormat::Jpeg,
            ..SessionOptions::default()
        };
        let mut session = ready(dir.path(), options);
        let depth = Frame::depth_from_array(&Array2::zeros((H as usize, W as usize))).unwrap();

        let err = session
            .accumulate(depth.clone(), depth, &[0.0, 0.0, 0.0])
            .unwrap_err();
        match err {
            ScanError::Capture(CaptureError::LossyDepth(format)) => assert_eq!(format, "JPEG"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(session.frame_count(), 0);
    }

    #[test]
    fn test_jpeg_infrared_and_auxiliary_streams() {
        let dir = tempfile::tempdir().unwrap();
        let options = SessionOptions {
            image_format: RasterFormat::Jpeg,
            keep_color: true,
            keep_depth: true,
            ..SessionOptions::default()
        };
        let mut session = ready(dir.path(), options);

        let frames = FrameSet {
            primary: infrared(10),
            secondary: infrared(20),
            color: Some(
                Frame::color_from_array(&Array3::from_elem((H as usize, W as usize, 3), 128))
                    .unwrap(),
            ),
            depth: Some(
                Frame::depth_from_array(&Array2::from_elem((H as usize, W as usize), 1000))
                    .unwrap(),
            ),
        };
        session.accumulate_frames(frames, &[0.0, 0.0, 0.0]).unwrap();

        assert_eq!(session.primary_views()[0].image_reference, "ir1/00000.jpg");
        assert!(dir.path().join(COLOR_DIR).join("00000.jpg").is_file());
        assert!(dir.path().join(DEPTH_DIR).join("00000.png").is_file());

        let document = session.export_document().unwrap();
        assert_eq!(document.paired_view_count(), Some(1));
    }

    #[test]
    fn test_auxiliary_streams_dropped_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready(dir.path(), SessionOptions::default());
        let mut frames = FrameSet::pair(infrared(1), infrared(1));
        frames.color = Some(
            Frame::color_from_array(&Array3::zeros((H as usize, W as usize, 3))).unwrap(),
        );
        session.accumulate_frames(frames, &[0.0, 0.0, 0.0]).unwrap();
        assert!(!dir.path().join(COLOR_DIR).exists());
    }

    #[test]
    fn test_options_fill_missing_fields() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"image_format": "jpg", "placement": "offset"}"#).unwrap();
        assert_eq!(options.image_format, RasterFormat::Jpeg);
        assert_eq!(options.placement, SecondaryPlacement::Offset);
        assert_eq!(options.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }
}
