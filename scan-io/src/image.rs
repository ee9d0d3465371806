use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};
use ndarray::{Array2, Array3};
use scan_core::error::{ScanError, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Quality used for lossy preview frames
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image codec error for {}: {source}", path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported raster format: {0}")]
    UnsupportedFormat(String),
    #[error("{kind} frames cannot be stored as {format}")]
    Incompatible {
        kind: FrameKind,
        format: RasterFormat,
    },
    #[error("Invalid image dimensions")]
    InvalidDimensions,
    #[error("{count} image writes failed, first {}", first.display())]
    Unwritten { first: PathBuf, count: usize },
}

pub type Result<T> = std::result::Result<T, ImageError>;

impl From<ImageError> for ScanError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Io { path, source } => StorageError::Write { path, source }.into(),
            ImageError::Codec { path, source } => StorageError::Encode {
                path,
                reason: source.to_string(),
            }
            .into(),
            ImageError::Unwritten { first, count } => {
                StorageError::UnwrittenImages { first, count }.into()
            }
            other => ScanError::InvalidInput(other.to_string()),
        }
    }
}

/// On-disk raster encoding, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// Lossless; required for depth
    #[default]
    Png,
    /// Lossy preview
    #[serde(alias = "jpg")]
    Jpeg,
}

impl RasterFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Ok(RasterFormat::Png),
            "jpg" | "jpeg" => Ok(RasterFormat::Jpeg),
            other => Err(ImageError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, RasterFormat::Png)
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterFormat::Png => write!(f, "PNG"),
            RasterFormat::Jpeg => write!(f, "JPEG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Infrared,
    Depth,
    Color,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Infrared => write!(f, "infrared"),
            FrameKind::Depth => write!(f, "depth"),
            FrameKind::Color => write!(f, "color"),
        }
    }
}

/// One captured pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// 8-bit single channel
    Infrared(GrayImage),
    /// 16-bit single channel, raw depth units
    Depth(DepthImage),
    /// 8-bit RGB
    Color(RgbImage),
}

impl Frame {
    /// Build an infrared frame from a `[height, width]` array
    pub fn infrared_from_array(pixels: &Array2<u8>) -> Result<Self> {
        let (height, width) = pixels.dim();
        let raw: Vec<u8> = pixels.iter().copied().collect();
        GrayImage::from_raw(width as u32, height as u32, raw)
            .map(Frame::Infrared)
            .ok_or(ImageError::InvalidDimensions)
    }

    /// Build a depth frame from a `[height, width]` array
    pub fn depth_from_array(pixels: &Array2<u16>) -> Result<Self> {
        let (height, width) = pixels.dim();
        let raw: Vec<u16> = pixels.iter().copied().collect();
        DepthImage::from_raw(width as u32, height as u32, raw)
            .map(Frame::Depth)
            .ok_or(ImageError::InvalidDimensions)
    }

    /// Build a color frame from a `[height, width, 3]` array
    pub fn color_from_array(pixels: &Array3<u8>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if channels != 3 {
            return Err(ImageError::InvalidDimensions);
        }
        let raw: Vec<u8> = pixels.iter().copied().collect();
        RgbImage::from_raw(width as u32, height as u32, raw)
            .map(Frame::Color)
            .ok_or(ImageError::InvalidDimensions)
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Infrared(_) => FrameKind::Infrared,
            Frame::Depth(_) => FrameKind::Depth,
            Frame::Color(_) => FrameKind::Color,
        }
    }

    /// Get frame dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Infrared(img) => img.dimensions(),
            Frame::Depth(img) => img.dimensions(),
            Frame::Color(img) => img.dimensions(),
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        let (w, h) = self.dimensions();
        format!("{} {}x{}", self.kind(), w, h)
    }

    /// Encode to `path`, picking the format from its extension
    pub fn write(&self, path: &Path, jpeg_quality: u8) -> Result<()> {
        let format = RasterFormat::from_path(path)?;
        if self.kind() == FrameKind::Depth && !format.is_lossless() {
            return Err(ImageError::Incompatible {
                kind: self.kind(),
                format,
            });
        }

        let io_err = |source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        let encoded = match format {
            RasterFormat::Png => {
                let encoder = PngEncoder::new(&mut writer);
                match self {
                    Frame::Infrared(img) => img.write_with_encoder(encoder),
                    Frame::Depth(img) => img.write_with_encoder(encoder),
                    Frame::Color(img) => img.write_with_encoder(encoder),
                }
            }
            RasterFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
                match self {
                    Frame::Infrared(img) => img.write_with_encoder(encoder),
                    Frame::Color(img) => img.write_with_encoder(encoder),
                    Frame::Depth(_) => {
                        return Err(ImageError::Incompatible {
                            kind: FrameKind::Depth,
                            format,
                        });
                    }
                }
            }
        };
        encoded.map_err(|source| ImageError::Codec {
            path: path.to_path_buf(),
            source,
        })?;

        writer.flush().map_err(io_err)?;
        writer
            .into_inner()
            .map_err(|e| io_err(e.into_error()))?
            .sync_all()
            .map_err(io_err)
    }

    /// Read a frame back from disk
    pub fn open(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|source| ImageError::Codec {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(match decoded {
            DynamicImage::ImageLuma8(img) => Frame::Infrared(img),
            DynamicImage::ImageLuma16(img) => Frame::Depth(img),
            DynamicImage::ImageRgb8(img) => Frame::Color(img),
            other => Frame::Color(other.to_rgb8()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Array2<u8> {
        Array2::from_shape_fn((height, width), |(r, c)| ((r * 16 + c) % 256) as u8)
    }

    #[test]
    fn test_image_error_display() {
        let err = ImageError::InvalidDimensions;
        assert_eq!(err.to_string(), "Invalid image dimensions");

        let err = ImageError::Incompatible {
            kind: FrameKind::Depth,
            format: RasterFormat::Jpeg,
        };
        assert_eq!(err.to_string(), "depth frames cannot be stored as JPEG");
    }

    #[test]
    fn test_image_error_into_scan_error() {
        let err: ScanError = ImageError::Io {
            path: PathBuf::from("ir1/00000.png"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert!(matches!(err, ScanError::Storage(StorageError::Write { .. })));

        let err: ScanError = ImageError::Unwritten {
            first: PathBuf::from("ir2/00003.png"),
            count: 1,
        }
        .into();
        assert!(matches!(
            err,
            ScanError::Storage(StorageError::UnwrittenImages { count: 1, .. })
        ));
    }

    #[test]
    fn test_raster_format_from_path() {
        assert_eq!(
            RasterFormat::from_path(Path::new("ir1/00000.png")).unwrap(),
            RasterFormat::Png
        );
        assert_eq!(
            RasterFormat::from_path(Path::new("color/00000.JPG")).unwrap(),
            RasterFormat::Jpeg
        );
        assert!(matches!(
            RasterFormat::from_path(Path::new("frame.bmp")),
            Err(ImageError::UnsupportedFormat(_))
        ));
        assert!(RasterFormat::from_path(Path::new("frame")).is_err());
    }

    #[test]
    fn test_frame_from_array_layout() {
        let pixels = gradient(4, 3);
        let frame = Frame::infrared_from_array(&pixels).unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.kind(), FrameKind::Infrared);
        match &frame {
            // row 1, column 2
            Frame::Infrared(img) => assert_eq!(img.get_pixel(2, 1).0[0], 18),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_color_requires_three_channels() {
        let pixels = Array3::<u8>::zeros((2, 2, 4));
        assert!(matches!(
            Frame::color_from_array(&pixels),
            Err(ImageError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_png_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00000.png");

        let infrared = Frame::infrared_from_array(&gradient(32, 24)).unwrap();
        infrared.write(&path, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(Frame::open(&path).unwrap(), infrared);

        let depth =
            Frame::depth_from_array(&Array2::from_shape_fn((8, 8), |(r, c)| (r * 1000 + c) as u16))
                .unwrap();
        depth.write(&path, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(Frame::open(&path).unwrap(), depth);
    }

    #[test]
    fn test_jpeg_round_trip_within_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00000.jpg");

        let flat = Array2::from_elem((16, 16), 128u8);
        let frame = Frame::infrared_from_array(&flat).unwrap();
        frame.write(&path, DEFAULT_JPEG_QUALITY).unwrap();

        match Frame::open(&path).unwrap() {
            Frame::Infrared(img) => {
                assert_eq!(img.dimensions(), (16, 16));
                assert!(img.pixels().all(|p| (p.0[0] as i32 - 128).abs() <= 2));
            }
            other => panic!("unexpected frame {}", other.describe()),
        }
    }

    #[test]
    fn test_depth_refuses_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00000.jpg");
        let depth = Frame::depth_from_array(&Array2::zeros((4, 4))).unwrap();
        let result = depth.write(&path, DEFAULT_JPEG_QUALITY);
        assert!(matches!(result, Err(ImageError::Incompatible { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("00000.png");
        let frame = Frame::infrared_from_array(&gradient(4, 4)).unwrap();
        assert!(matches!(
            frame.write(&path, DEFAULT_JPEG_QUALITY),
            Err(ImageError::Io { .. })
        ));
    }
}
