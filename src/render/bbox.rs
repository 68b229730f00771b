//! Tight bounding box of the visible pixels in an RGBA buffer.

use serde::Serialize;

/// Inclusive pixel bounds of the non-transparent content of a canvas.
///
/// `top`/`bottom` are rows (y), `left`/`right` are columns (x). A box with
/// zero width or height means the canvas had no visible pixel at all; it is
/// not a 1×1 area at the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// The "no content" sentinel.
    pub const EMPTY: BoundingBox = BoundingBox {
        top: 0,
        left: 0,
        bottom: 0,
        right: 0,
        width: 0,
        height: 0,
    };

    /// Builds a box from inclusive edges. `right >= left` and `bottom >= top`
    /// are expected.
    pub fn from_edges(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
            width: right - left + 1,
            height: bottom - top + 1,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Scans `pixels` (row-major RGBA, `width * height * 4` bytes) and returns
/// the smallest box enclosing every pixel with alpha > 0, or
/// [`BoundingBox::EMPTY`].
///
/// Pixels missing from a short buffer count as transparent.
pub fn compute_bounding_box(pixels: &[u8], width: u32, height: u32) -> BoundingBox {
    let row_len = width as usize * 4;
    if row_len == 0 {
        return BoundingBox::EMPTY;
    }

    let mut edges: Option<(u32, u32, u32, u32)> = None;

    for (y, row) in pixels.chunks(row_len).take(height as usize).enumerate() {
        let mut visible = row
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[3] > 0)
            .map(|(x, _)| x as u32);

        let Some(first) = visible.next() else {
            continue;
        };
        let last = visible.last().unwrap_or(first);
        let y = y as u32;

        edges = Some(match edges {
            None => (y, first, y, last),
            Some((top, left, _, right)) => (top, left.min(first), y, right.max(last)),
        });
    }

    match edges {
        Some((top, left, bottom, right)) => BoundingBox::from_edges(top, left, bottom, right),
        None => BoundingBox::EMPTY,
    }
}
