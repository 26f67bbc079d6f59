//! Bounding box reduction over the alpha channel

use crate::types::{BoundingBox, PixelBuffer};

/// Find the minimal inclusive rectangle containing every pixel with nonzero alpha.
///
/// Returns `None` when every pixel is fully transparent.
#[must_use]
pub fn find_content_bounds(buffer: &PixelBuffer) -> Option<BoundingBox> {
    let (width, height) = buffer.dimensions();
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x: Option<u32> = None;
    let mut max_y = 0;

    for y in 0..height {
        let row_start = buffer.pixel_index(0, y);
        for x in 0..width {
            if buffer.alpha_at(row_start + x as usize) > 0 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = Some(max_x.map_or(x, |m| m.max(x)));
                max_y = max_y.max(y);
            }
        }
    }

    max_x.map(|max_x| BoundingBox {
        min_x,
        min_y,
        max_x,
        max_y,
    })
}
