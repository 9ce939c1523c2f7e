//! Generic `Camera` trait and supporting types for image-capture hardware.

use std::fs;
use std::path::{Path, PathBuf};

use seekdog_types::SeekError;
use tracing::debug;

/// How [`CameraFrame::data`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Uncompressed pixels (greyscale or RGB24).
    Raw,
    Jpeg,
    Png,
}

impl ImageEncoding {
    /// Guess the encoding from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageEncoding::Jpeg),
            "png" => Some(ImageEncoding::Png),
            _ => None,
        }
    }

    /// MIME type for compressed encodings.
    pub fn mime(self) -> Option<&'static str> {
        match self {
            ImageEncoding::Raw => None,
            ImageEncoding::Jpeg => Some("image/jpeg"),
            ImageEncoding::Png => Some("image/png"),
        }
    }
}

/// An image frame returned by a camera driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Frame width in pixels; `0` when unknown (compressed file frames).
    pub width: u32,
    /// Frame height in pixels; `0` when unknown.
    pub height: u32,
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
    /// File the frame was read from, for dataset replay.
    pub source: Option<PathBuf>,
}

impl CameraFrame {
    /// An all-zero greyscale frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            encoding: ImageEncoding::Raw,
            data: vec![0u8; greyscale_len(width, height)],
            source: None,
        }
    }
}

/// Byte length of a greyscale frame, computed in `usize` so large
/// dimensions cannot wrap.
fn greyscale_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// A camera or image-capture device.
pub trait Camera: Send + Sync {
    /// Stable identifier for this camera, e.g. `"front_rgb"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::Hardware`] if the frame cannot be captured
    /// (e.g. the device is disconnected or the file is unreadable).
    fn capture(&mut self) -> Result<CameraFrame, SeekError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// DatasetCamera
// ─────────────────────────────────────────────────────────────────────────────

/// Replays the JPEG/PNG files of a directory in name order, wrapping around
/// at the end. Used to run whole searches against a recorded walk-through.
#[derive(Debug)]
pub struct DatasetCamera {
    id: String,
    files: Vec<PathBuf>,
    next: usize,
}

impl DatasetCamera {
    /// Index the image files in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::Hardware`] when the directory cannot be read or
    /// contains no images.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SeekError> {
        let dir = dir.as_ref();
        let fault = |details: String| SeekError::Hardware {
            component: "dataset_camera".to_string(),
            details,
        };
        let entries =
            fs::read_dir(dir).map_err(|e| fault(format!("{}: {e}", dir.display())))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && ImageEncoding::from_path(p).is_some())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(fault(format!("no images in {}", dir.display())));
        }
        debug!(dir = %dir.display(), images = files.len(), "dataset camera opened");
        Ok(Self {
            id: "dataset_camera".to_string(),
            files,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Camera for DatasetCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, SeekError> {
        let path = self.files[self.next % self.files.len()].clone();
        self.next = (self.next + 1) % self.files.len();
        let data = fs::read(&path).map_err(|e| SeekError::Hardware {
            component: self.id.clone(),
            details: format!("{}: {e}", path.display()),
        })?;
        let encoding = ImageEncoding::from_path(&path).unwrap_or(ImageEncoding::Raw);
        Ok(CameraFrame {
            width: 0,
            height: 0,
            encoding,
            data,
            source: Some(path),
        })
    }
}
