//! Conversion between image files and RGBA frames.

use crate::frame::{Frame, FrameSource};
use crate::{Error, Result};
use image::{DynamicImage, RgbaImage};
use log::debug;
use std::path::{Path, PathBuf};

/// Convert a decoded image of any pixel format to an RGBA frame
///
/// # Errors
///
/// Returns `InvalidInput` for an image with a zero dimension.
pub fn frame_from_image(image: DynamicImage) -> Result<Frame> {
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    Frame::new(width, height, rgba.into_raw())
}

/// Convert a frame back to an image buffer
///
/// # Errors
///
/// Returns `InvalidInput` if the buffer does not fit the dimensions.
pub fn frame_to_image(frame: &Frame) -> Result<RgbaImage> {
    RgbaImage::from_raw(frame.width(), frame.height(), frame.as_bytes().to_vec()).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Frame buffer does not match {}x{}",
            frame.width(),
            frame.height()
        ))
    })
}

/// Load an image file as a frame
///
/// # Errors
///
/// Returns `Image` if the file cannot be opened or decoded.
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let image = image::open(path.as_ref())?;
    debug!(
        "Loaded {} ({}x{})",
        path.as_ref().display(),
        image.width(),
        image.height()
    );
    frame_from_image(image)
}

/// Save a frame as an image file; the format follows the extension
///
/// # Errors
///
/// Returns `Image` if encoding or writing fails.
pub fn save_frame<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<()> {
    frame_to_image(frame)?.save(path)?;
    Ok(())
}

/// Frame source reading an image file on every capture, so a file that is
/// rewritten by another process is picked up on the next cycle
pub struct ImageFileSource {
    path: PathBuf,
    name: String,
}

impl ImageFileSource {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl FrameSource for ImageFileSource {
    fn capture(&mut self) -> Result<Frame> {
        load_frame(&self.path).map_err(|e| Error::FrameUnavailable(format!("{}: {e}", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
