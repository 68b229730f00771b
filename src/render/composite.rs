//! Source-over compositing of RGBA regions onto a transparent canvas.

use std::borrow::Cow;

use super::canvas::Canvas;
use crate::doc::Rgba8;

/// A rectangle of RGBA pixels placed on the canvas.
#[derive(Clone, Debug)]
pub struct Region<'a> {
    /// `width * height * 4` bytes, row-major. Missing bytes read as transparent.
    pub pixels: Cow<'a, [u8]>,
    /// Vertical offset of the first row.
    pub top: i32,
    /// Horizontal offset of the first column.
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

/// Straight-alpha source-over: `src` painted on top of `dst`.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    // Output alpha scaled by 255, in [0, 255 * 255].
    let alpha = sa * 255 + da * inv;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let color = u32::from(src[i]) * sa * 255 + u32::from(dst[i]) * da * inv;
        out[i] = ((color + alpha / 2) / alpha) as u8;
    }
    out[3] = ((alpha + 127) / 255) as u8;
    out
}

/// Paints `regions` in order onto a fresh transparent `width × height`
/// canvas. Later regions land on top; anything outside the canvas is clipped.
pub fn composite(width: u32, height: u32, regions: &[Region<'_>]) -> Canvas {
    let mut canvas = Canvas::transparent(width, height);
    for region in regions {
        paint_region(&mut canvas, region);
    }
    canvas
}

fn paint_region(canvas: &mut Canvas, region: &Region<'_>) {
    let canvas_w = i64::from(canvas.width());
    let canvas_h = i64::from(canvas.height());
    let top = i64::from(region.top);
    let left = i64::from(region.left);

    let x0 = left.max(0);
    let x1 = (left + i64::from(region.width)).min(canvas_w);
    let y0 = top.max(0);
    let y1 = (top + i64::from(region.height)).min(canvas_h);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let src_stride = region.width as usize * 4;
    let dst_stride = canvas_w as usize * 4;
    let src = &region.pixels;
    let dst = canvas.pixels_mut();

    for y in y0..y1 {
        let src_row = (y - top) as usize * src_stride;
        let dst_row = y as usize * dst_stride;
        for x in x0..x1 {
            let s = src_row + (x - left) as usize * 4;
            let Some(px) = src.get(s..s + 4) else {
                // Short buffer: the rest of the region is transparent.
                return;
            };
            let d = dst_row + x as usize * 4;
            let below = [dst[d], dst[d + 1], dst[d + 2], dst[d + 3]];
            let blended = over(below, [px[0], px[1], px[2], px[3]]);
            dst[d..d + 4].copy_from_slice(&blended);
        }
    }
}
