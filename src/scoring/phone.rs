use super::{fraction_where, mean_brightness, tenths};
use crate::constants::{
    EDGE_BRIGHTNESS_STEP, EDGE_MIN_DIFFERING_NEIGHBORS, EDGE_MIN_FRACTION, PHONE_ASPECT_MAX,
    PHONE_ASPECT_MIN, PHONE_WEIGHT_ASPECT, PHONE_WEIGHT_EDGES, PHONE_WEIGHT_SCREEN,
    PHONE_WEIGHT_UNIFORMITY, SCREEN_BRIGHT_FRACTION, SCREEN_BRIGHT_PIXEL, SCREEN_MEAN_BRIGHTNESS,
    UNIFORM_VARIANCE, UNIFORM_VARIANCE_SCALE,
};
use crate::frame::{Frame, Region};

/// Lit-screen likelihood: 0.5 for a bright mean, 0.5 for many very bright pixels
#[must_use]
pub fn screen_brightness_score(frame: &Frame, region: Region) -> f64 {
    let mut points = 0;
    if mean_brightness(frame, region) > SCREEN_MEAN_BRIGHTNESS {
        points += 5;
    }
    if fraction_where(frame, region, |px| px.brightness() > SCREEN_BRIGHT_PIXEL) > SCREEN_BRIGHT_FRACTION {
        points += 5;
    }
    tenths(points)
}

/// Whether the pixel differs from at least two of its 4-neighbors by more
/// than the edge step. Neighbors outside the frame clamp to the pixel itself.
fn is_edge_pixel(frame: &Frame, x: u32, y: u32) -> bool {
    let center = frame.brightness(x, y);
    let neighbors = [
        (x.saturating_sub(1), y),
        (x.saturating_add(1), y),
        (x, y.saturating_sub(1)),
        (x, y.saturating_add(1)),
    ];
    neighbors
        .iter()
        .filter(|&&(nx, ny)| (frame.brightness(nx, ny) - center).abs() > EDGE_BRIGHTNESS_STEP)
        .count()
        >= EDGE_MIN_DIFFERING_NEIGHBORS
}

/// Fraction of edge pixels along the four border lines of `region`,
/// or zero when the fraction does not exceed 0.4.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rectangular_edge_score(frame: &Frame, region: Region) -> f64 {
    let region = frame.clamp(region);
    if region.is_empty() {
        return 0.0;
    }

    let (top, bottom) = (region.y, region.bottom() - 1);
    let (left, right) = (region.x, region.right() - 1);

    let horizontal = (region.x..region.right()).flat_map(|x| [(x, top), (x, bottom)]);
    let vertical = (region.y..region.bottom()).flat_map(|y| [(left, y), (right, y)]);

    let (edges, samples) = horizontal
        .chain(vertical)
        .fold((0usize, 0usize), |(edges, samples), (x, y)| {
            (edges + usize::from(is_edge_pixel(frame, x, y)), samples + 1)
        });

    let fraction = edges as f64 / samples as f64;
    if fraction > EDGE_MIN_FRACTION {
        fraction
    } else {
        0.0
    }
}

/// Uniformity as a function of per-channel variance.
///
/// 1.0 below 5000, then falls linearly to 0.0 at 10000.
#[must_use]
pub fn uniformity_from_variance(variance: f64) -> f64 {
    if variance < UNIFORM_VARIANCE {
        1.0
    } else {
        (1.0 - variance / UNIFORM_VARIANCE_SCALE).max(0.0)
    }
}

/// Mean of the R, G and B population variances over `region`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn channel_variance(frame: &Frame, region: Region) -> f64 {
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    let mut count = 0usize;

    for px in frame.pixels(region) {
        for (ch, value) in [px.r, px.g, px.b].into_iter().enumerate() {
            let v = f64::from(value);
            sum[ch] += v;
            sum_sq[ch] += v * v;
        }
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    let n = count as f64;
    let total: f64 = (0..3)
        .map(|ch| {
            let mean = sum[ch] / n;
            (sum_sq[ch] / n - mean * mean).max(0.0)
        })
        .sum();
    total / 3.0
}

/// Flat-color likelihood of `region`
#[must_use]
pub fn color_uniformity_score(frame: &Frame, region: Region) -> f64 {
    uniformity_from_variance(channel_variance(frame, region))
}

/// 1.0 when `height / width` lies in `[1.5, 2.5]`
#[must_use]
pub fn aspect_ratio_score(height: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    let ratio = height / width;
    if (PHONE_ASPECT_MIN..=PHONE_ASPECT_MAX).contains(&ratio) {
        1.0
    } else {
        0.0
    }
}

/// Weighted phone likelihood of `region`
#[must_use]
pub fn phone_score(frame: &Frame, region: Region) -> f64 {
    PHONE_WEIGHT_SCREEN * screen_brightness_score(frame, region)
        + PHONE_WEIGHT_EDGES * rectangular_edge_score(frame, region)
        + PHONE_WEIGHT_UNIFORMITY * color_uniformity_score(frame, region)
        + PHONE_WEIGHT_ASPECT * aspect_ratio_score(f64::from(region.height), f64::from(region.width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;

    #[test]
    fn test_screen_brightness() {
        let white = Frame::filled(40, 80, Rgb::new(255, 255, 255)).unwrap();
        assert_eq!(screen_brightness_score(&white, white.bounds()), 1.0);

        let grey = Frame::filled(40, 80, Rgb::new(170, 170, 170)).unwrap();
        assert_eq!(screen_brightness_score(&grey, grey.bounds()), 0.5);

        let dark = Frame::filled(40, 80, Rgb::new(10, 10, 10)).unwrap();
        assert_eq!(screen_brightness_score(&dark, dark.bounds()), 0.0);
    }

    #[test]
    fn test_flat_region_has_no_edges() {
        let frame = Frame::filled(40, 80, Rgb::new(200, 200, 200)).unwrap();
        assert_eq!(rectangular_edge_score(&frame, frame.bounds()), 0.0);
    }

    #[test]
    fn test_outlined_rectangle_has_edges() {
        // 1px white outline on black, scanned exactly along the outline
        let mut frame = Frame::filled(60, 100, Rgb::new(0, 0, 0)).unwrap();
        let white = Rgb::new(255, 255, 255);
        frame.fill_region(Region::new(10, 10, 40, 1), white);
        frame.fill_region(Region::new(10, 89, 40, 1), white);
        frame.fill_region(Region::new(10, 10, 1, 80), white);
        frame.fill_region(Region::new(49, 10, 1, 80), white);

        let score = rectangular_edge_score(&frame, Region::new(10, 10, 40, 80));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_uniformity_bounds() {
        assert_eq!(uniformity_from_variance(0.0), 1.0);
        assert_eq!(uniformity_from_variance(4999.0), 1.0);
        assert!((uniformity_from_variance(5000.0) - 0.5).abs() < 1e-12);
        assert_eq!(uniformity_from_variance(10_000.0), 0.0);
        assert_eq!(uniformity_from_variance(16_000.0), 0.0);
    }

    #[test]
    fn test_checkerboard_variance() {
        let mut frame = Frame::filled(10, 10, Rgb::new(0, 0, 0)).unwrap();
        for y in 0..10 {
            for x in 0..10 {
                if (x + y) % 2 == 0 {
                    frame.fill_region(Region::new(x, y, 1, 1), Rgb::new(255, 255, 255));
                }
            }
        }
        let variance = channel_variance(&frame, frame.bounds());
        assert!((variance - 127.5 * 127.5).abs() < 1e-6);
        assert_eq!(color_uniformity_score(&frame, frame.bounds()), 0.0);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(aspect_ratio_score(80.0, 40.0), 1.0);
        assert_eq!(aspect_ratio_score(60.0, 40.0), 1.0);
        assert_eq!(aspect_ratio_score(100.0, 40.0), 1.0);
        assert_eq!(aspect_ratio_score(60.0, 60.0), 0.0);
        assert_eq!(aspect_ratio_score(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_bright_flat_screen_phone_score() {
        // bright + uniform + phone-shaped, but no outline inside the window
        let frame = Frame::filled(40, 80, Rgb::new(250, 250, 250)).unwrap();
        let score = phone_score(&frame, frame.bounds());
        assert!((score - 0.7).abs() < 1e-9, "score was {score}");
    }
}
