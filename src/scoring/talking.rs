use super::{fraction_where, mean_brightness, tenths};
use crate::constants::{
    DARK_PIXEL_BRIGHTNESS, EYE_DARK_MAX, EYE_DARK_MIN, MOUTH_DARK_MAX, MOUTH_DARK_MIN,
    MOUTH_MIN_CONTRAST, MOUTH_MIN_SKIN_FRACTION, ORIENTATION_MIN_ASYMMETRY, TALKING_WEIGHT_EYES,
    TALKING_WEIGHT_MOUTH, TALKING_WEIGHT_ORIENTATION,
};
use crate::frame::{Frame, Region};

/// Lower-middle band of a face window where the mouth is expected
#[must_use]
pub fn mouth_window(region: Region) -> Region {
    region.sub_window([5, 12, 10, 5], 20)
}

/// Upper band of a face window where the eyes are expected
#[must_use]
pub fn eye_window(region: Region) -> Region {
    region.sub_window([2, 3, 8, 2], 12)
}

fn is_dark(brightness: f64) -> bool {
    brightness < DARK_PIXEL_BRIGHTNESS
}

/// Mean absolute brightness step from each pixel to its upper-left neighbor.
/// Pixels on the top row or left column of the frame have no such neighbor
/// and are skipped.
#[allow(clippy::cast_precision_loss)]
fn mean_local_contrast(frame: &Frame, region: Region) -> f64 {
    let region = frame.clamp(region);
    let mut total = 0.0;
    let mut samples = 0usize;

    for y in region.y.max(1)..region.bottom() {
        for x in region.x.max(1)..region.right() {
            total += (frame.brightness(x, y) - frame.brightness(x - 1, y - 1)).abs();
            samples += 1;
        }
    }

    if samples == 0 {
        0.0
    } else {
        total / samples as f64
    }
}

/// Open-mouth likelihood: 0.4 for a moderate dark fraction, 0.3 for
/// surrounding skin and 0.3 for local contrast in the mouth window.
#[must_use]
pub fn mouth_region_score(frame: &Frame, region: Region) -> f64 {
    let mouth = mouth_window(region);

    let dark = fraction_where(frame, mouth, |px| is_dark(px.brightness()));
    let skin = fraction_where(frame, mouth, |px| px.is_skin());
    let contrast = mean_local_contrast(frame, mouth);

    let mut points = 0;
    if dark > MOUTH_DARK_MIN && dark < MOUTH_DARK_MAX {
        points += 4;
    }
    if skin > MOUTH_MIN_SKIN_FRACTION {
        points += 3;
    }
    if contrast > MOUTH_MIN_CONTRAST {
        points += 3;
    }
    tenths(points)
}

/// Left/right brightness asymmetry of `region` on a 0..1 scale.
/// Zero unless the asymmetry exceeds 0.2; capped at 1.0.
#[must_use]
pub fn face_orientation_score(frame: &Frame, region: Region) -> f64 {
    let (left, right) = frame.clamp(region).split_halves();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let asymmetry = (mean_brightness(frame, left) - mean_brightness(frame, right)).abs() / 255.0;
    if asymmetry > ORIENTATION_MIN_ASYMMETRY {
        asymmetry.min(1.0)
    } else {
        0.0
    }
}

/// Dark fraction of the eye window, kept only inside (0.1, 0.4)
#[must_use]
pub fn eye_region_score(frame: &Frame, region: Region) -> f64 {
    let dark = fraction_where(frame, eye_window(region), |px| is_dark(px.brightness()));
    if dark > EYE_DARK_MIN && dark < EYE_DARK_MAX {
        dark
    } else {
        0.0
    }
}

/// Weighted talking likelihood of `region`
#[must_use]
pub fn talking_score(frame: &Frame, region: Region) -> f64 {
    TALKING_WEIGHT_MOUTH * mouth_region_score(frame, region)
        + TALKING_WEIGHT_ORIENTATION * face_orientation_score(frame, region)
        + TALKING_WEIGHT_EYES * eye_region_score(frame, region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;

    #[test]
    fn test_windows_for_standard_face() {
        let face = Region::new(0, 0, 60, 60);
        assert_eq!(mouth_window(face), Region::new(15, 36, 30, 15));
        assert_eq!(eye_window(face), Region::new(10, 15, 40, 10));
    }

    #[test]
    fn test_orientation_symmetric_is_zero() {
        let frame = Frame::filled(60, 60, Rgb::new(120, 120, 120)).unwrap();
        assert_eq!(face_orientation_score(&frame, frame.bounds()), 0.0);
    }

    #[test]
    fn test_orientation_half_lit() {
        let mut frame = Frame::filled(60, 60, Rgb::new(0, 0, 0)).unwrap();
        frame.fill_region(Region::new(0, 0, 30, 60), Rgb::new(255, 255, 255));
        assert_eq!(face_orientation_score(&frame, frame.bounds()), 1.0);
    }

    #[test]
    fn test_eye_score_band() {
        let face = Region::new(0, 0, 60, 60);
        let mut frame = Frame::filled(60, 60, Rgb::new(150, 150, 150)).unwrap();
        // eye window is 40x10 at (10, 15); darken 3 of its 10 rows
        frame.fill_region(Region::new(10, 15, 40, 3), Rgb::new(10, 10, 10));
        assert!((eye_region_score(&frame, face) - 0.3).abs() < 1e-12);

        // fully dark eye window is outside the band
        frame.fill_region(Region::new(10, 15, 40, 10), Rgb::new(10, 10, 10));
        assert_eq!(eye_region_score(&frame, face), 0.0);
    }

    #[test]
    fn test_flat_region_never_talks() {
        let frame = Frame::filled(60, 60, Rgb::new(200, 120, 90)).unwrap();
        // skin everywhere: only the skin award of the mouth score applies
        let score = talking_score(&frame, frame.bounds());
        assert!((score - 0.6 * 0.3).abs() < 1e-12, "score was {score}");
    }

    #[test]
    fn test_contrast_skips_frame_origin() {
        let frame = Frame::filled(4, 4, Rgb::new(0, 0, 0)).unwrap();
        assert_eq!(mean_local_contrast(&frame, Region::new(0, 0, 1, 1)), 0.0);
    }
}
