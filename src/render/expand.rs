//! Cel pixel expansion to RGBA.

use std::borrow::Cow;

use crate::doc::{ColorDepth, Palette};

/// Converts a cel's pixel buffer into `width * height * 4` RGBA bytes.
///
/// RGBA input of the right size is borrowed as-is. Indexed input maps each
/// byte through `palette`; indices past the end of the palette become
/// transparent black. Bytes missing from a short buffer also come out
/// transparent, and surplus bytes are ignored.
pub fn expand_pixels<'a>(
    data: &'a [u8],
    width: u32,
    height: u32,
    depth: ColorDepth,
    palette: &Palette,
) -> Cow<'a, [u8]> {
    let pixel_count = width as usize * height as usize;
    let out_len = pixel_count * 4;

    match depth {
        ColorDepth::Rgba if data.len() == out_len => Cow::Borrowed(data),
        ColorDepth::Rgba => {
            let mut out = vec![0u8; out_len];
            let copied = data.len().min(out_len);
            out[..copied].copy_from_slice(&data[..copied]);
            Cow::Owned(out)
        }
        ColorDepth::Indexed => {
            let mut out = vec![0u8; out_len];
            for (dst, &index) in out.chunks_exact_mut(4).zip(data) {
                dst.copy_from_slice(&palette.color(index as usize));
            }
            Cow::Owned(out)
        }
    }
}
