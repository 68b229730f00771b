//! Aseprite (`.ase` / `.aseprite`) binary reader.
//!
//! The file is a 128-byte header followed by frames; each frame is a list of
//! size-prefixed chunks. Every chunk payload is decoded from its own bounded
//! slice, so a chunk can never read into its neighbour and unknown chunk
//! types are simply stepped over.
//!
//! Reference: <https://github.com/aseprite/aseprite/blob/main/docs/ase-file-specs.md>

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use super::cursor::Cursor;
use super::model::{
    AnimDirection, Cel, CelKind, Color, ColorDepth, ColorProfile, ColorProfileKind, Document,
    Frame, Grid, Layer, Palette, PixelRatio, Slice, SliceKey, SlicePivot, SliceRect, Tag,
    Tileset, UserData,
};
use crate::error::AseError;

const HEADER_SIZE: usize = 128;
const FILE_MAGIC: u16 = 0xA5E0;
const FRAME_MAGIC: u16 = 0xF1FA;
const FRAME_HEADER_SIZE: usize = 16;
const CHUNK_HEADER_SIZE: usize = 6;

/// Header flag: layer chunks end with a 16-byte UUID.
const FLAG_LAYER_UUID: u32 = 4;

/// Layer type carrying a tileset index.
const LAYER_TYPE_TILEMAP: u16 = 2;

/// Upper bound on palette entries accepted from a palette chunk.
const MAX_PALETTE_SIZE: usize = 1 << 16;

mod chunk {
    pub const OLD_PALETTE: u16 = 0x0004;
    pub const OLD_PALETTE_6BIT: u16 = 0x0011;
    pub const LAYER: u16 = 0x2004;
    pub const CEL: u16 = 0x2005;
    pub const CEL_EXTRA: u16 = 0x2006;
    pub const COLOR_PROFILE: u16 = 0x2007;
    pub const EXTERNAL_FILES: u16 = 0x2008;
    pub const MASK: u16 = 0x2016;
    pub const PATH: u16 = 0x2017;
    pub const TAGS: u16 = 0x2018;
    pub const PALETTE: u16 = 0x2019;
    pub const USER_DATA: u16 = 0x2020;
    pub const SLICE: u16 = 0x2022;
    pub const TILESET: u16 = 0x2023;
}

/// Reads and decodes an Aseprite file.
///
/// # Errors
/// Returns an error if the file cannot be read, or any error of
/// [`from_ase_slice`].
pub fn read_ase_file(path: &Path) -> Result<Document, AseError> {
    let bytes = fs::read(path).map_err(AseError::Io)?;
    from_ase_slice(&bytes)
}

/// Decodes an Aseprite document from an in-memory buffer.
///
/// The header is validated before any frame is read: a non-square pixel
/// ratio or a color depth other than 8 or 32 bpp fails without producing a
/// partial document.
///
/// # Errors
/// - [`AseError::UnsupportedPixelRatio`] / [`AseError::UnsupportedColorDepth`]
/// - [`AseError::Decode`] for bad magic numbers, truncated data or chunk
///   sizes that do not fit their frame.
pub fn from_ase_slice(bytes: &[u8]) -> Result<Document, AseError> {
    let mut cursor = Cursor::new(bytes);
    let header = read_header(&mut cursor)?;

    if !header.pixel_ratio.is_one_to_one() {
        return Err(AseError::UnsupportedPixelRatio {
            width: header.pixel_ratio.width,
            height: header.pixel_ratio.height,
        });
    }
    let color_depth = ColorDepth::from_bits(header.color_depth)
        .ok_or(AseError::UnsupportedColorDepth(header.color_depth))?;

    let mut state = DecodeState::new(color_depth, header.flags & FLAG_LAYER_UUID != 0);
    let mut frames = Vec::new();
    for frame_index in 0..header.num_frames as usize {
        frames.push(read_frame(&mut cursor, frame_index, &mut state)?);
    }

    if cursor.remaining() > 0 {
        tracing::debug!(
            trailing = cursor.remaining(),
            "ignoring bytes after the last frame"
        );
    }

    Ok(Document {
        file_size: header.file_size,
        num_frames: header.num_frames,
        width: header.width,
        height: header.height,
        color_depth,
        flags: header.flags,
        transparent_index: header.transparent_index,
        num_colors: header.num_colors,
        pixel_ratio: header.pixel_ratio,
        grid: header.grid,
        palette: state.palette.or(state.old_palette).unwrap_or_default(),
        layers: state.layers,
        frames,
        tags: state.tags,
        slices: state.slices,
        tilesets: state.tilesets,
        color_profile: state.color_profile,
        user_data: state.sprite_user_data,
    })
}

struct Header {
    file_size: u32,
    num_frames: u16,
    width: u16,
    height: u16,
    color_depth: u16,
    flags: u32,
    transparent_index: u8,
    num_colors: u16,
    pixel_ratio: PixelRatio,
    grid: Grid,
}

fn read_header(cursor: &mut Cursor<'_>) -> Result<Header, AseError> {
    let mut header = cursor.sub(HEADER_SIZE, "file header")?;

    let file_size = header.u32("file size")?;
    let magic = header.u16("file magic")?;
    if magic != FILE_MAGIC {
        return Err(AseError::decode(
            4,
            format!("bad file magic 0x{magic:04X} (expected 0x{FILE_MAGIC:04X})"),
        ));
    }

    let num_frames = header.u16("frame count")?;
    let width = header.u16("width")?;
    let height = header.u16("height")?;
    let color_depth = header.u16("color depth")?;
    let flags = header.u32("header flags")?;
    header.skip(2 + 4 + 4, "speed and reserved")?;
    let transparent_index = header.u8("transparent index")?;
    header.skip(3, "reserved")?;
    let num_colors = match header.u16("number of colors")? {
        0 => 256,
        n => n,
    };
    let pixel_width = header.u8("pixel width")?;
    let pixel_height = header.u8("pixel height")?;
    let grid = Grid {
        x: header.i16("grid x")?,
        y: header.i16("grid y")?,
        width: header.u16("grid width")?,
        height: header.u16("grid height")?,
    };

    Ok(Header {
        file_size,
        num_frames,
        width,
        height,
        color_depth,
        flags,
        transparent_index,
        num_colors,
        pixel_ratio: PixelRatio::from_header(pixel_width, pixel_height),
        grid,
    })
}

/// The element the next user data chunk belongs to.
#[derive(Clone, Copy, Debug)]
enum UserDataTarget {
    None,
    Sprite,
    Layer(usize),
    Cel(usize),
    Tags { next: usize },
    Slice(usize),
    Tileset(usize),
}

/// Sprite-wide state accumulated across frames.
struct DecodeState {
    depth: ColorDepth,
    layer_uuids: bool,
    layers: Vec<Layer>,
    palette: Option<Palette>,
    old_palette: Option<Palette>,
    tags: Vec<Tag>,
    slices: Vec<Slice>,
    tilesets: Vec<Tileset>,
    color_profile: Option<ColorProfile>,
    sprite_user_data: Option<UserData>,
    target: UserDataTarget,
}

impl DecodeState {
    fn new(depth: ColorDepth, layer_uuids: bool) -> Self {
        Self {
            depth,
            layer_uuids,
            layers: Vec::new(),
            palette: None,
            old_palette: None,
            tags: Vec::new(),
            slices: Vec::new(),
            tilesets: Vec::new(),
            color_profile: None,
            sprite_user_data: None,
            target: UserDataTarget::None,
        }
    }
}

fn read_frame(
    cursor: &mut Cursor<'_>,
    frame_index: usize,
    state: &mut DecodeState,
) -> Result<Frame, AseError> {
    let frame_offset = cursor.offset();
    let size = cursor.u32("frame size")?;
    let magic = cursor.u16("frame magic")?;
    if magic != FRAME_MAGIC {
        return Err(AseError::decode(
            frame_offset + 4,
            format!("bad magic 0x{magic:04X} in frame {frame_index} (expected 0x{FRAME_MAGIC:04X})"),
        ));
    }
    let old_chunks = cursor.u16("chunk count")?;
    let duration = cursor.u16("frame duration")?;
    cursor.skip(2, "reserved")?;
    let new_chunks = cursor.u32("chunk count")?;
    let chunks = if new_chunks == 0 {
        u32::from(old_chunks)
    } else {
        new_chunks
    };

    let body_len = (size as usize).checked_sub(FRAME_HEADER_SIZE).ok_or_else(|| {
        AseError::decode(
            frame_offset,
            format!("frame {frame_index} declares {size} byte(s), smaller than its header"),
        )
    })?;
    let mut body = cursor.sub(body_len, "frame body")?;

    let mut frame = Frame {
        size,
        duration,
        chunks,
        cels: Vec::new(),
    };
    state.target = UserDataTarget::None;

    for _ in 0..chunks {
        let chunk_offset = body.offset();
        let chunk_size = body.u32("chunk size")? as usize;
        if chunk_size < CHUNK_HEADER_SIZE {
            return Err(AseError::decode(
                chunk_offset,
                format!("chunk size {chunk_size} is smaller than the chunk header"),
            ));
        }
        let chunk_type = body.u16("chunk type")?;
        let mut payload = body.sub(chunk_size - CHUNK_HEADER_SIZE, "chunk payload")?;
        read_chunk(chunk_type, &mut payload, frame_index, &mut frame, state)?;
    }

    Ok(frame)
}

fn read_chunk(
    chunk_type: u16,
    payload: &mut Cursor<'_>,
    frame_index: usize,
    frame: &mut Frame,
    state: &mut DecodeState,
) -> Result<(), AseError> {
    match chunk_type {
        chunk::OLD_PALETTE | chunk::OLD_PALETTE_6BIT => {
            let palette = read_old_palette(payload, chunk_type == chunk::OLD_PALETTE_6BIT)?;
            state.old_palette = Some(palette);
        }
        chunk::PALETTE => {
            let base = state.palette.take().unwrap_or_default();
            state.palette = Some(read_palette(payload, base)?);
            if frame_index == 0 {
                state.target = UserDataTarget::Sprite;
            }
        }
        chunk::LAYER => {
            let layer = read_layer(payload, state.layer_uuids)?;
            state.layers.push(layer);
            state.target = UserDataTarget::Layer(state.layers.len() - 1);
        }
        chunk::CEL => {
            let cel = read_cel(payload, state.depth, frame_index)?;
            frame.cels.push(cel);
            state.target = UserDataTarget::Cel(frame.cels.len() - 1);
        }
        chunk::COLOR_PROFILE => {
            state.color_profile = Some(read_color_profile(payload)?);
        }
        chunk::TAGS => {
            state.tags.extend(read_tags(payload)?);
            state.target = UserDataTarget::Tags { next: 0 };
        }
        chunk::SLICE => {
            state.slices.push(read_slice(payload)?);
            state.target = UserDataTarget::Slice(state.slices.len() - 1);
        }
        chunk::TILESET => {
            state.tilesets.push(read_tileset(payload)?);
            state.target = UserDataTarget::Tileset(state.tilesets.len() - 1);
        }
        chunk::USER_DATA => {
            let user_data = read_user_data(payload)?;
            attach_user_data(user_data, frame, state);
        }
        chunk::CEL_EXTRA | chunk::EXTERNAL_FILES | chunk::MASK | chunk::PATH => {
            tracing::debug!(chunk_type, frame = frame_index, "skipping chunk");
        }
        other => {
            tracing::debug!(chunk_type = other, frame = frame_index, "skipping unknown chunk");
        }
    }
    Ok(())
}

fn attach_user_data(user_data: UserData, frame: &mut Frame, state: &mut DecodeState) {
    match state.target {
        UserDataTarget::Sprite => {
            state.sprite_user_data = Some(user_data);
            state.target = UserDataTarget::None;
        }
        UserDataTarget::Layer(index) => state.layers[index].user_data = Some(user_data),
        UserDataTarget::Cel(index) => frame.cels[index].user_data = Some(user_data),
        UserDataTarget::Slice(index) => state.slices[index].user_data = Some(user_data),
        UserDataTarget::Tileset(index) => {
            state.tilesets[index].user_data = Some(user_data);
            // The chunks after this one belong to single tiles, which are not decoded.
            state.target = UserDataTarget::None;
        }
        UserDataTarget::Tags { next } => {
            // Tag user data follows the tags chunk, one chunk per tag in order.
            if let Some(tag) = state.tags.get_mut(next) {
                tag.user_data = Some(user_data);
                state.target = UserDataTarget::Tags { next: next + 1 };
            } else {
                state.target = UserDataTarget::None;
            }
        }
        UserDataTarget::None => {
            tracing::debug!("user data chunk without an owner");
        }
    }
}

/// Expands a 6-bit palette component to 8 bits.
#[inline]
fn scale_6bit(value: u8) -> u8 {
    let value = value & 0x3F;
    (value << 2) | (value >> 4)
}

fn read_old_palette(payload: &mut Cursor<'_>, six_bit: bool) -> Result<Palette, AseError> {
    let packets = payload.u16("palette packet count")?;
    let mut palette = Palette::default();
    let mut index = 0usize;

    for _ in 0..packets {
        index += payload.u8("palette skip")? as usize;
        let count = match payload.u8("palette color count")? {
            0 => 256,
            n => n as usize,
        };
        for _ in 0..count {
            let rgb = payload.take(3, "palette color")?;
            let (red, green, blue) = if six_bit {
                (scale_6bit(rgb[0]), scale_6bit(rgb[1]), scale_6bit(rgb[2]))
            } else {
                (rgb[0], rgb[1], rgb[2])
            };
            if index < MAX_PALETTE_SIZE {
                palette.set(index, Color::rgba(red, green, blue, 255));
            }
            index += 1;
        }
    }

    palette.palette_size = palette.len() as u32;
    palette.last_color = palette.palette_size.saturating_sub(1);
    Ok(palette)
}

fn read_palette(payload: &mut Cursor<'_>, mut palette: Palette) -> Result<Palette, AseError> {
    let offset = payload.offset();
    let size = payload.u32("palette size")?;
    let first = payload.u32("first palette index")?;
    let last = payload.u32("last palette index")?;
    payload.skip(8, "reserved")?;

    if first > last || last as usize >= MAX_PALETTE_SIZE {
        return Err(AseError::decode(
            offset,
            format!("invalid palette range {first}..={last}"),
        ));
    }

    for index in first..=last {
        let flags = payload.u16("palette entry flags")?;
        let rgba = payload.take(4, "palette entry color")?;
        let name = if flags & 1 != 0 {
            Some(payload.string("palette entry name")?)
        } else {
            None
        };
        palette.set(
            index as usize,
            Color {
                red: rgba[0],
                green: rgba[1],
                blue: rgba[2],
                alpha: rgba[3],
                name,
            },
        );
    }

    palette.palette_size = size;
    palette.first_color = first;
    palette.last_color = last;
    Ok(palette)
}

fn read_layer(payload: &mut Cursor<'_>, with_uuid: bool) -> Result<Layer, AseError> {
    let flags = payload.u16("layer flags")?;
    let layer_type = payload.u16("layer type")?;
    let layer_child_level = payload.u16("layer child level")?;
    payload.skip(4, "default layer size")?;
    let blend_mode = payload.u16("blend mode")?;
    let opacity = payload.u8("layer opacity")?;
    payload.skip(3, "reserved")?;
    let name = payload.string("layer name")?;
    let tileset_index = if layer_type == LAYER_TYPE_TILEMAP {
        Some(payload.u32("tileset index")?)
    } else {
        None
    };
    let uuid = if with_uuid {
        Some(payload.bytes16("layer uuid")?)
    } else {
        None
    };

    Ok(Layer {
        flags,
        layer_type,
        layer_child_level,
        blend_mode,
        opacity,
        name,
        tileset_index,
        uuid,
        user_data: None,
    })
}

fn read_cel(
    payload: &mut Cursor<'_>,
    depth: ColorDepth,
    frame_index: usize,
) -> Result<Cel, AseError> {
    let layer_index = payload.u16("cel layer index")?;
    let x = payload.i16("cel x")?;
    let y = payload.i16("cel y")?;
    let opacity = payload.u8("cel opacity")?;
    let cel_type = payload.u16("cel type")?;
    let z_index = payload.i16("cel z-index")?;
    payload.skip(5, "reserved")?;

    let mut width = 0;
    let mut height = 0;
    let mut data = Vec::new();

    let kind = match cel_type {
        0 => {
            width = payload.u16("cel width")?;
            height = payload.u16("cel height")?;
            let limit = width as usize * height as usize * depth.bytes_per_pixel();
            let rest = payload.rest();
            data = rest[..rest.len().min(limit)].to_vec();
            CelKind::Raw
        }
        1 => CelKind::Linked {
            frame: payload.u16("linked frame")?,
        },
        2 => {
            width = payload.u16("cel width")?;
            height = payload.u16("cel height")?;
            let limit = width as usize * height as usize * depth.bytes_per_pixel();
            data = inflate_or_warn(payload.rest(), limit, layer_index, frame_index);
            CelKind::CompressedImage
        }
        3 => {
            width = payload.u16("tilemap width")?;
            height = payload.u16("tilemap height")?;
            let bits_per_tile = payload.u16("bits per tile")?;
            let tile_id_mask = payload.u32("tile id mask")?;
            payload.skip(4 * 3 + 10, "tile flip masks")?;
            let limit = width as usize * height as usize * (bits_per_tile as usize).div_ceil(8);
            data = inflate_or_warn(payload.rest(), limit, layer_index, frame_index);
            CelKind::CompressedTilemap {
                bits_per_tile,
                tile_id_mask,
            }
        }
        other => {
            tracing::warn!(
                cel_type = other,
                layer = layer_index,
                frame = frame_index,
                "unknown cel type"
            );
            CelKind::Unknown(other)
        }
    };

    Ok(Cel {
        layer_index,
        x,
        y,
        opacity,
        z_index,
        kind,
        width,
        height,
        data,
        user_data: None,
    })
}

/// Inflates zlib data, reading at most `limit` bytes of output.
fn inflate(compressed: &[u8], limit: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(limit.min(compressed.len().saturating_mul(8)));
    ZlibDecoder::new(compressed)
        .take(limit as u64)
        .read_to_end(&mut out)?;
    Ok(out)
}

/// A corrupt stream leaves the cel empty; it is rejected before compositing.
fn inflate_or_warn(compressed: &[u8], limit: usize, layer: u16, frame: usize) -> Vec<u8> {
    match inflate(compressed, limit) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(layer, frame, error = %err, "failed to inflate cel data");
            Vec::new()
        }
    }
}

fn read_color_profile(payload: &mut Cursor<'_>) -> Result<ColorProfile, AseError> {
    let kind = ColorProfileKind::from_u16(payload.u16("color profile type")?);
    let flags = payload.u16("color profile flags")?;
    let gamma = payload.fixed("gamma")?;
    payload.skip(8, "reserved")?;
    let icc_length = if kind == ColorProfileKind::Icc {
        let len = payload.u32("ICC profile length")?;
        payload.skip(len as usize, "ICC profile")?;
        Some(len)
    } else {
        None
    };

    Ok(ColorProfile {
        kind,
        flags,
        gamma,
        icc_length,
    })
}

fn read_tags(payload: &mut Cursor<'_>) -> Result<Vec<Tag>, AseError> {
    let count = payload.u16("tag count")?;
    payload.skip(8, "reserved")?;

    let mut tags = Vec::new();
    for _ in 0..count {
        let from = payload.u16("tag from")?;
        let to = payload.u16("tag to")?;
        let anim_direction = AnimDirection::from_u8(payload.u8("tag direction")?);
        let repeat = payload.u16("tag repeat")?;
        payload.skip(6, "reserved")?;
        let rgb = payload.take(3, "tag color")?;
        payload.skip(1, "extra")?;
        let name = payload.string("tag name")?;
        tags.push(Tag {
            from,
            to,
            anim_direction,
            repeat,
            color: format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]),
            name,
            user_data: None,
        });
    }
    Ok(tags)
}

fn read_slice_rect(payload: &mut Cursor<'_>, what: &str) -> Result<SliceRect, AseError> {
    Ok(SliceRect {
        x: payload.i32(what)?,
        y: payload.i32(what)?,
        width: payload.u32(what)?,
        height: payload.u32(what)?,
    })
}

fn read_slice(payload: &mut Cursor<'_>) -> Result<Slice, AseError> {
    let key_count = payload.u32("slice key count")?;
    let flags = payload.u32("slice flags")?;
    payload.skip(4, "reserved")?;
    let name = payload.string("slice name")?;

    let mut keys = Vec::new();
    for _ in 0..key_count {
        let frame = payload.u32("slice key frame")?;
        let bounds = read_slice_rect(payload, "slice bounds")?;
        let center = if flags & 1 != 0 {
            Some(read_slice_rect(payload, "slice center")?)
        } else {
            None
        };
        let pivot = if flags & 2 != 0 {
            Some(SlicePivot {
                x: payload.i32("slice pivot")?,
                y: payload.i32("slice pivot")?,
            })
        } else {
            None
        };
        keys.push(SliceKey {
            frame,
            bounds,
            center,
            pivot,
        });
    }

    Ok(Slice {
        name,
        flags,
        keys,
        user_data: None,
    })
}

fn read_tileset(payload: &mut Cursor<'_>) -> Result<Tileset, AseError> {
    let id = payload.u32("tileset id")?;
    let flags = payload.u32("tileset flags")?;
    let tile_count = payload.u32("tile count")?;
    let tile_width = payload.u16("tile width")?;
    let tile_height = payload.u16("tile height")?;
    let base_index = payload.i16("tileset base index")?;
    payload.skip(14, "reserved")?;
    let name = payload.string("tileset name")?;

    Ok(Tileset {
        id,
        flags,
        tile_count,
        tile_width,
        tile_height,
        base_index,
        name,
        user_data: None,
    })
}

fn read_user_data(payload: &mut Cursor<'_>) -> Result<UserData, AseError> {
    let flags = payload.u32("user data flags")?;
    let text = if flags & 1 != 0 {
        Some(payload.string("user data text")?)
    } else {
        None
    };
    let color = if flags & 2 != 0 {
        let rgba = payload.take(4, "user data color")?;
        Some(Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]))
    } else {
        None
    };
    // Property maps (flag 4) are left unread; the chunk bound discards them.
    Ok(UserData { text, color })
}

/// Fuzz-only entrypoint for a single cel chunk payload.
#[cfg(feature = "fuzzing")]
pub fn fuzz_read_cel(payload: &[u8]) -> Result<(), AseError> {
    let _ = read_cel(&mut Cursor::new(payload), ColorDepth::Rgba, 0)?;
    Ok(())
}
