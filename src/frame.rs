//! Pixel buffers, rectangular regions and frame sources.
//!
//! A [`Frame`] is an RGBA byte buffer whose length has been validated
//! against its dimensions, so every read through [`Frame::pixel`] or
//! [`Frame::clamp`] is in bounds. Scoring functions never see raw indices.

use crate::constants::{
    RGBA_CHANNELS, SKIN_MIN_BLUE, SKIN_MIN_CHANNEL_SPREAD, SKIN_MIN_GREEN, SKIN_MIN_RED,
    SKIN_MIN_RED_GREEN_GAP,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single RGB sample (alpha is ignored by every heuristic)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mean of the three channels
    #[must_use]
    pub fn brightness(self) -> f64 {
        (f64::from(self.r) + f64::from(self.g) + f64::from(self.b)) / 3.0
    }

    /// Rule-based skin-tone classification
    #[must_use]
    pub fn is_skin(self) -> bool {
        let (r, g, b) = (i32::from(self.r), i32::from(self.g), i32::from(self.b));
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        self.r > SKIN_MIN_RED
            && self.g > SKIN_MIN_GREEN
            && self.b > SKIN_MIN_BLUE
            && r > g
            && r > b
            && (r - g).abs() > SKIN_MIN_RED_GREEN_GAP
            && max - min > SKIN_MIN_CHANNEL_SPREAD
    }
}

/// Rectangular pixel area, top-left anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Sub-window whose offset and size are `parts / denominator` of this region
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sub_window(&self, parts: [u32; 4], denominator: u32) -> Self {
        let den = u64::from(denominator.max(1));
        let scale = |extent: u32, part: u32| (u64::from(extent) * u64::from(part) / den) as u32;
        let [fx, fy, fw, fh] = parts;
        Self {
            x: self.x.saturating_add(scale(self.width, fx)),
            y: self.y.saturating_add(scale(self.height, fy)),
            width: scale(self.width, fw),
            height: scale(self.height, fh),
        }
    }

    /// Left and right halves; the right half takes the odd column
    #[must_use]
    pub fn split_halves(&self) -> (Self, Self) {
        let left_width = self.width / 2;
        (
            Self::new(self.x, self.y, left_width, self.height),
            Self::new(self.x + left_width, self.y, self.width - left_width, self.height),
        )
    }
}

/// Validated RGBA frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an RGBA buffer
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a dimension is zero or the buffer length
    /// is not `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "Frame dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "RGBA buffer for {width}x{height} must hold {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Frame of a single opaque color
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a dimension is zero.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Result<Self> {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * RGBA_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&[color.r, color.g, color.b, u8::MAX]);
        }
        Self::new(width, height, data)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The whole frame as a region
    #[must_use]
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Pixel at `(x, y)`, with coordinates clamped to the frame
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let idx = (y * self.width as usize + x) * RGBA_CHANNELS;
        Rgb::new(self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Brightness at `(x, y)`, clamped like [`Frame::pixel`]
    #[must_use]
    pub fn brightness(&self, x: u32, y: u32) -> f64 {
        self.pixel(x, y).brightness()
    }

    /// Intersection of `region` with the frame; may be empty
    #[must_use]
    pub fn clamp(&self, region: Region) -> Region {
        let x = region.x.min(self.width);
        let y = region.y.min(self.height);
        let right = region.right().min(self.width);
        let bottom = region.bottom().min(self.height);
        Region::new(x, y, right - x, bottom - y)
    }

    /// Iterate the pixels of `region` (clamped) in raster order
    pub fn pixels(&self, region: Region) -> impl Iterator<Item = Rgb> + '_ {
        let region = self.clamp(region);
        (region.y..region.bottom())
            .flat_map(move |y| (region.x..region.right()).map(move |x| (x, y)))
            .map(move |(x, y)| self.pixel(x, y))
    }

    /// Paint `region` (clamped) with an opaque color
    pub fn fill_region(&mut self, region: Region, color: Rgb) {
        let region = self.clamp(region);
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                let idx = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
                self.data[idx..idx + RGBA_CHANNELS].copy_from_slice(&[color.r, color.g, color.b, u8::MAX]);
            }
        }
    }
}

/// Anything that can hand out the current frame on demand
pub trait FrameSource: Send {
    /// Capture the current frame
    ///
    /// # Errors
    ///
    /// Returns `FrameUnavailable` when no frame can be produced right now.
    fn capture(&mut self) -> Result<Frame>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Always returns the same frame
pub struct StaticFrameSource {
    frame: Frame,
}

impl StaticFrameSource {
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }
}

impl FrameSource for StaticFrameSource {
    fn capture(&mut self) -> Result<Frame> {
        Ok(self.frame.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Plays back a list of frames
pub struct SequenceFrameSource {
    frames: Vec<Frame>,
    position: usize,
}

impl SequenceFrameSource {
    /// Play the frames once, then report the source as unavailable
    #[must_use]
    pub fn once(frames: Vec<Frame>) -> Self {
        Self { frames, position: 0 }
    }

    /// Frames handed out so far
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl FrameSource for SequenceFrameSource {
    fn capture(&mut self) -> Result<Frame> {
        if self.frames.is_empty() {
            return Err(Error::FrameUnavailable("sequence is empty".to_string()));
        }
        let frame = self
            .frames
            .get(self.position)
            .cloned()
            .ok_or_else(|| Error::FrameUnavailable("sequence exhausted".to_string()))?;
        self.position += 1;
        Ok(frame)
    }

    fn name(&self) -> &str {
        "sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_bad_buffer() {
        assert!(Frame::new(2, 2, vec![0; 15]).is_err());
        assert!(Frame::new(0, 2, vec![]).is_err());
        assert!(Frame::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_pixel_clamps_out_of_bounds() {
        let mut frame = Frame::filled(4, 4, Rgb::new(0, 0, 0)).unwrap();
        frame.fill_region(Region::new(3, 3, 1, 1), Rgb::new(9, 8, 7));
        assert_eq!(frame.pixel(100, 100), Rgb::new(9, 8, 7));
    }

    #[test]
    fn test_clamp_region() {
        let frame = Frame::filled(10, 10, Rgb::new(0, 0, 0)).unwrap();
        assert_eq!(frame.clamp(Region::new(8, 8, 5, 5)), Region::new(8, 8, 2, 2));
        assert!(frame.clamp(Region::new(20, 20, 5, 5)).is_empty());
        assert_eq!(frame.pixels(Region::new(8, 8, 5, 5)).count(), 4);
    }

    #[test]
    fn test_skin_rule() {
        assert!(Rgb::new(200, 120, 90).is_skin());
        // red not dominant
        assert!(!Rgb::new(100, 120, 90).is_skin());
        // red/green gap too small
        assert!(!Rgb::new(130, 120, 60).is_skin());
        assert!(!Rgb::new(255, 255, 255).is_skin());
    }

    #[test]
    fn test_split_halves_covers_region() {
        let (left, right) = Region::new(10, 0, 7, 4).split_halves();
        assert_eq!(left.width + right.width, 7);
        assert_eq!(right.x, 13);
    }

    #[test]
    fn test_sequence_source_exhausts() {
        let frame = Frame::filled(2, 2, Rgb::new(1, 2, 3)).unwrap();
        let mut source = SequenceFrameSource::once(vec![frame]);
        assert!(source.capture().is_ok());
        assert!(matches!(source.capture(), Err(Error::FrameUnavailable(_))));
    }
}
