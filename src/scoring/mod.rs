//! Feature scoring heuristics over rectangular frame regions.
//!
//! Every function here is total: regions are clamped to the frame, and an
//! empty region scores zero instead of dividing by zero. Scores are in
//! `[0, 1]`.

/// Skin-tone driven face scoring
pub mod face;

/// Screen, edge and shape heuristics for phones
pub mod phone;

/// Mouth, eye and head-orientation heuristics for talking
pub mod talking;

use crate::frame::{Frame, Region, Rgb};

pub use face::{face_score, skin_tone_ratio};
pub use phone::{
    aspect_ratio_score, color_uniformity_score, phone_score, rectangular_edge_score,
    screen_brightness_score, uniformity_from_variance,
};
pub use talking::{
    eye_region_score, face_orientation_score, mouth_region_score, talking_score,
};

/// Trait for all per-channel region scorers
pub trait ChannelScorer: Send + Sync {
    /// Composite score of `region` in `frame`
    fn score(&self, frame: &Frame, region: Region) -> f64;

    /// Get scorer name
    fn name(&self) -> &str;
}

/// Scores face candidates
pub struct FaceScorer;

impl ChannelScorer for FaceScorer {
    fn score(&self, frame: &Frame, region: Region) -> f64 {
        face_score(frame, region)
    }

    fn name(&self) -> &str {
        "FaceScorer"
    }
}

/// Scores mobile phone candidates
pub struct PhoneScorer;

impl ChannelScorer for PhoneScorer {
    fn score(&self, frame: &Frame, region: Region) -> f64 {
        phone_score(frame, region)
    }

    fn name(&self) -> &str {
        "PhoneScorer"
    }
}

/// Scores talking candidates
pub struct TalkingScorer;

impl ChannelScorer for TalkingScorer {
    fn score(&self, frame: &Frame, region: Region) -> f64 {
        talking_score(frame, region)
    }

    fn name(&self) -> &str {
        "TalkingScorer"
    }
}

/// Number of pixels in `region` matching `predicate`, and the region's pixel count
pub(crate) fn count_where(frame: &Frame, region: Region, predicate: impl Fn(Rgb) -> bool) -> (usize, usize) {
    frame
        .pixels(region)
        .fold((0, 0), |(hits, total), px| (hits + usize::from(predicate(px)), total + 1))
}

/// Fraction of pixels in `region` matching `predicate`; zero for an empty region
#[allow(clippy::cast_precision_loss)]
pub(crate) fn fraction_where(frame: &Frame, region: Region, predicate: impl Fn(Rgb) -> bool) -> f64 {
    match count_where(frame, region, predicate) {
        (_, 0) => 0.0,
        (hits, total) => hits as f64 / total as f64,
    }
}

/// Mean pixel brightness of `region`; zero for an empty region
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_brightness(frame: &Frame, region: Region) -> f64 {
    let (sum, count) = frame
        .pixels(region)
        .fold((0.0, 0usize), |(sum, count), px| (sum + px.brightness(), count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Sum of the points awarded, as a score in tenths
///
/// Scores built from fixed point awards are summed as integers so that
/// "all conditions met" is exactly 1.0.
pub(crate) fn tenths(points: u32) -> f64 {
    f64::from(points) / 10.0
}
