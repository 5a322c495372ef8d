use super::{count_where, fraction_where, mean_brightness, tenths};
use crate::constants::{
    FACE_BRIGHTNESS_MAX, FACE_BRIGHTNESS_MIN, FACE_MIN_SKIN_PIXELS, FACE_SKIN_RATIO_MAX,
    FACE_SKIN_RATIO_MIN,
};
use crate::frame::{Frame, Region};

/// Fraction of skin-tone pixels in `region`
#[must_use]
pub fn skin_tone_ratio(frame: &Frame, region: Region) -> f64 {
    fraction_where(frame, region, |px| px.is_skin())
}

/// Face likelihood: 0.4 for a plausible skin ratio, 0.3 for a plausible
/// brightness and 0.3 for enough skin pixels in absolute terms.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn face_score(frame: &Frame, region: Region) -> f64 {
    let (skin_pixels, total) = count_where(frame, region, |px| px.is_skin());
    if total == 0 {
        return 0.0;
    }

    let skin_ratio = skin_pixels as f64 / total as f64;
    let brightness = mean_brightness(frame, region);

    let mut points = 0;
    if skin_ratio > FACE_SKIN_RATIO_MIN && skin_ratio < FACE_SKIN_RATIO_MAX {
        points += 4;
    }
    if brightness > FACE_BRIGHTNESS_MIN && brightness < FACE_BRIGHTNESS_MAX {
        points += 3;
    }
    if skin_pixels > FACE_MIN_SKIN_PIXELS {
        points += 3;
    }
    tenths(points)
}
