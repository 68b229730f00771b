#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const CLEAR: [u8; 4] = [0, 0, 0, 0];

pub const CHUNK_OLD_PALETTE: u16 = 0x0004;
pub const CHUNK_LAYER: u16 = 0x2004;
pub const CHUNK_CEL: u16 = 0x2005;
pub const CHUNK_TAGS: u16 = 0x2018;
pub const CHUNK_PALETTE: u16 = 0x2019;
pub const CHUNK_USER_DATA: u16 = 0x2020;
pub const CHUNK_SLICE: u16 = 0x2022;
pub const CHUNK_TILESET: u16 = 0x2023;

/// Builds `.aseprite` files in memory, one chunk at a time.
///
/// Layers and the palette always land in frame 0, ahead of any other
/// chunk, the way Aseprite itself writes them.
#[derive(Clone, Debug)]
pub struct AseBuilder {
    width: u16,
    height: u16,
    depth: u16,
    flags: u32,
    pixel_ratio: (u8, u8),
    palette: Option<Vec<u8>>,
    layers: Vec<Vec<u8>>,
    frames: Vec<Vec<Vec<u8>>>,
}

impl AseBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            depth: 32,
            flags: 1,
            pixel_ratio: (1, 1),
            palette: None,
            layers: Vec::new(),
            frames: vec![Vec::new()],
        }
    }

    pub fn depth(mut self, bits: u16) -> Self {
        self.depth = bits;
        self
    }

    pub fn pixel_ratio(mut self, width: u8, height: u8) -> Self {
        self.pixel_ratio = (width, height);
        self
    }

    pub fn layer(mut self, name: &str) -> Self {
        self.layers.push(chunk(CHUNK_LAYER, &layer_payload(name)));
        self
    }

    pub fn palette(mut self, colors: &[[u8; 4]]) -> Self {
        self.palette = Some(chunk(CHUNK_PALETTE, &palette_payload(colors)));
        self
    }

    /// Starts a new frame; later cels and chunks go into it.
    pub fn frame(mut self) -> Self {
        self.frames.push(Vec::new());
        self
    }

    /// Adds a zlib-compressed image cel filled from `pixels`.
    pub fn cel(self, layer: u16, x: i16, y: i16, w: u16, h: u16, pixels: &[u8]) -> Self {
        self.cel_z(layer, x, y, 0, w, h, pixels)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn cel_z(self, layer: u16, x: i16, y: i16, z: i16, w: u16, h: u16, pixels: &[u8]) -> Self {
        let payload = cel_payload(layer, x, y, z, 2, w, h, &zlib(pixels));
        self.chunk(CHUNK_CEL, &payload)
    }

    /// A solid RGBA cel.
    pub fn solid(self, layer: u16, x: i16, y: i16, w: u16, h: u16, color: [u8; 4]) -> Self {
        let pixels = color.repeat(w as usize * h as usize);
        self.cel(layer, x, y, w, h, &pixels)
    }

    /// Adds an arbitrary chunk to the current frame.
    pub fn chunk(mut self, chunk_type: u16, payload: &[u8]) -> Self {
        let bytes = chunk(chunk_type, payload);
        if let Some(frame) = self.frames.last_mut() {
            frame.push(bytes);
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (index, chunks) in self.frames.iter().enumerate() {
            let mut all: Vec<&Vec<u8>> = Vec::new();
            if index == 0 {
                all.extend(self.palette.iter());
                all.extend(self.layers.iter());
            }
            all.extend(chunks.iter());
            body.extend(frame(&all));
        }

        let mut out = header(
            (128 + body.len()) as u32,
            self.frames.len() as u16,
            self.width,
            self.height,
            self.depth,
            self.flags,
            self.pixel_ratio,
        );
        out.extend(body);
        out
    }

    pub fn write_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, self.build()).expect("write aseprite file");
    }
}

fn header(
    file_size: u32,
    frames: u16,
    width: u16,
    height: u16,
    depth: u16,
    flags: u32,
    pixel_ratio: (u8, u8),
) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&0xA5E0u16.to_le_bytes());
    out.extend_from_slice(&frames.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&depth.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&100u16.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.push(0);
    out.extend_from_slice(&[0; 3]);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.push(pixel_ratio.0);
    out.push(pixel_ratio.1);
    out.extend_from_slice(&0i16.to_le_bytes());
    out.extend_from_slice(&0i16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.resize(128, 0);
    out
}

fn frame(chunks: &[&Vec<u8>]) -> Vec<u8> {
    let body_len: usize = chunks.iter().map(|c| c.len()).sum();
    let mut out = Vec::with_capacity(16 + body_len);
    out.extend_from_slice(&((16 + body_len) as u32).to_le_bytes());
    out.extend_from_slice(&0xF1FAu16.to_le_bytes());
    out.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    out.extend_from_slice(&100u16.to_le_bytes());
    out.extend_from_slice(&[0; 2]);
    out.extend_from_slice(&(chunks.len() as u32).to_le_bytes());
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out
}

pub fn chunk(chunk_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + payload.len());
    out.extend_from_slice(&((6 + payload.len()) as u32).to_le_bytes());
    out.extend_from_slice(&chunk_type.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn string_bytes(s: &str) -> Vec<u8> {
    let mut out = (s.len() as u16).to_le_bytes().to_vec();
    out.extend_from_slice(s.as_bytes());
    out
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("compress");
    encoder.finish().expect("finish zlib stream")
}

pub fn layer_payload(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.push(255);
    out.extend_from_slice(&[0; 3]);
    out.extend(string_bytes(name));
    out
}

#[allow(clippy::too_many_arguments)]
pub fn cel_payload(
    layer: u16,
    x: i16,
    y: i16,
    z: i16,
    cel_type: u16,
    w: u16,
    h: u16,
    data: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&layer.to_le_bytes());
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&y.to_le_bytes());
    out.push(255);
    out.extend_from_slice(&cel_type.to_le_bytes());
    out.extend_from_slice(&z.to_le_bytes());
    out.extend_from_slice(&[0; 5]);
    out.extend_from_slice(&w.to_le_bytes());
    out.extend_from_slice(&h.to_le_bytes());
    out.extend_from_slice(data);
    out
}

pub fn palette_payload(colors: &[[u8; 4]]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(colors.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(colors.len() as u32 - 1).to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    for color in colors {
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(color);
    }
    out
}

/// An old-style palette chunk with a single packet starting at index 0.
pub fn old_palette_payload(colors: &[[u8; 3]]) -> Vec<u8> {
    let mut out = 1u16.to_le_bytes().to_vec();
    out.push(0);
    out.push(colors.len() as u8);
    for color in colors {
        out.extend_from_slice(color);
    }
    out
}

/// A slice with one key on frame 0 and no center or pivot.
pub fn slice_payload(name: &str, bounds: (i32, i32, u32, u32)) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend(string_bytes(name));
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&bounds.0.to_le_bytes());
    out.extend_from_slice(&bounds.1.to_le_bytes());
    out.extend_from_slice(&bounds.2.to_le_bytes());
    out.extend_from_slice(&bounds.3.to_le_bytes());
    out
}

/// A tileset header with no tile data attached.
pub fn tileset_payload(id: u32, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&4u32.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&1i16.to_le_bytes());
    out.extend_from_slice(&[0; 14]);
    out.extend(string_bytes(name));
    out
}

/// A tags chunk; each tag is `(from, to, name)`, played forward.
pub fn tags_payload(tags: &[(u16, u16, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(tags.len() as u16).to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    for (from, to, name) in tags {
        out.extend_from_slice(&from.to_le_bytes());
        out.extend_from_slice(&to.to_le_bytes());
        out.push(0);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&[0; 6]);
        out.extend_from_slice(&[0x12, 0x34, 0x56]);
        out.push(0);
        out.extend(string_bytes(name));
    }
    out
}

pub fn user_data_text(text: &str) -> Vec<u8> {
    let mut out = 1u32.to_le_bytes().to_vec();
    out.extend(string_bytes(text));
    out
}

/// Two layers, one frame: a red 2×2 cel on layer 0, nothing on layer 1.
pub fn two_layer_fixture() -> AseBuilder {
    AseBuilder::new(2, 2)
        .layer("Background")
        .layer("Empty")
        .solid(0, 0, 0, 2, 2, RED)
}
