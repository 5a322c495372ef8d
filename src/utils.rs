//! Utility functions for coordinate conversion and frame annotation.

pub mod image_conversion;
pub mod safe_cast;

use crate::frame::{Frame, Region, Rgb};
use crate::model::BoundingBox;
use safe_cast::f64_to_u32_clamp;

/// Pixel region covered by `bbox`, clipped to `bounds`
#[must_use]
pub fn bbox_to_region(bbox: &BoundingBox, bounds: Region) -> Region {
    let x = f64_to_u32_clamp(bbox.x, bounds.x, bounds.right());
    let y = f64_to_u32_clamp(bbox.y, bounds.y, bounds.bottom());
    let right = f64_to_u32_clamp(bbox.x + bbox.width, x, bounds.right());
    let bottom = f64_to_u32_clamp(bbox.y + bbox.height, y, bounds.bottom());
    Region::new(x, y, right - x, bottom - y)
}

/// Draw a rectangle outline of the given thickness inside `region`
pub fn draw_outline(frame: &mut Frame, region: Region, thickness: u32, color: Rgb) {
    let region = frame.clamp(region);
    if region.is_empty() {
        return;
    }
    let t = thickness.max(1).min(region.width).min(region.height);

    frame.fill_region(Region::new(region.x, region.y, region.width, t), color);
    frame.fill_region(Region::new(region.x, region.bottom() - t, region.width, t), color);
    frame.fill_region(Region::new(region.x, region.y, t, region.height), color);
    frame.fill_region(Region::new(region.right() - t, region.y, t, region.height), color);
}
