//! Decoded Aseprite document model.
//!
//! Everything here is produced once by the decoder and treated as read-only
//! afterwards. The types serialize (camelCase) into the metadata sidecar;
//! pixel buffers never do.

use serde::ser::SerializeStruct;
use serde::Serialize;

/// One RGBA pixel, straight (non-premultiplied) alpha.
pub type Rgba8 = [u8; 4];

/// Fully transparent black, used for anything out of range.
pub const TRANSPARENT: Rgba8 = [0, 0, 0, 0];

/// A fully decoded Aseprite file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// File size as declared in the header.
    pub file_size: u32,

    /// Number of frames declared in the header.
    pub num_frames: u16,

    /// Canvas width in pixels.
    pub width: u16,

    /// Canvas height in pixels.
    pub height: u16,

    pub color_depth: ColorDepth,

    /// Header flags (bit 1: layer opacity is valid, bit 4: layers carry a UUID).
    pub flags: u32,

    /// Palette entry that represents transparency in indexed sprites.
    pub transparent_index: u8,

    /// Number of colors declared in the header (0 in the file means 256).
    pub num_colors: u16,

    pub pixel_ratio: PixelRatio,

    pub grid: Grid,

    pub palette: Palette,

    pub layers: Vec<Layer>,

    pub frames: Vec<Frame>,

    pub tags: Vec<Tag>,

    pub slices: Vec<Slice>,

    pub tilesets: Vec<Tileset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_profile: Option<ColorProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

/// Supported color depths. Grayscale (16 bpp) is rejected at decode time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
pub enum ColorDepth {
    /// 8 bpp, one palette index per pixel.
    Indexed,
    /// 32 bpp, RGBA per pixel.
    Rgba,
}

impl ColorDepth {
    /// Maps the header's bits-per-pixel value, if supported.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(ColorDepth::Indexed),
            32 => Some(ColorDepth::Rgba),
            _ => None,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            ColorDepth::Indexed => 8,
            ColorDepth::Rgba => 32,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.bits() as usize / 8
    }
}

impl From<ColorDepth> for u16 {
    fn from(depth: ColorDepth) -> Self {
        depth.bits()
    }
}

/// Pixel aspect ratio. Serialized as `"w:h"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRatio {
    pub width: u8,
    pub height: u8,
}

impl PixelRatio {
    pub const SQUARE: PixelRatio = PixelRatio {
        width: 1,
        height: 1,
    };

    /// Builds a ratio from header bytes; a zero in either means 1:1.
    pub fn from_header(width: u8, height: u8) -> Self {
        if width == 0 || height == 0 {
            Self::SQUARE
        } else {
            Self { width, height }
        }
    }

    pub fn is_one_to_one(&self) -> bool {
        *self == Self::SQUARE
    }
}

impl std::fmt::Display for PixelRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl Serialize for PixelRatio {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Editor grid settings from the header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// A palette entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Color {
    pub fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
            name: None,
        }
    }

    #[inline]
    pub fn to_rgba8(&self) -> Rgba8 {
        [self.red, self.green, self.blue, self.alpha]
    }
}

/// The sprite palette, indexed by entry position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    /// Palette size as declared by the last palette chunk.
    pub palette_size: u32,
    pub first_color: u32,
    pub last_color: u32,
    pub colors: Vec<Color>,
}

impl Palette {
    /// Looks up an entry. Out-of-range indices are transparent black.
    #[inline]
    pub fn color(&self, index: usize) -> Rgba8 {
        self.colors
            .get(index)
            .map(Color::to_rgba8)
            .unwrap_or(TRANSPARENT)
    }

    /// Stores `color` at `index`, growing the palette with transparent entries.
    pub fn set(&mut self, index: usize, color: Color) {
        if index >= self.colors.len() {
            self.colors.resize(index + 1, Color::default());
        }
        self.colors[index] = color;
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// A layer. Core logic addresses layers only by their index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub flags: u16,
    #[serde(rename = "type")]
    pub layer_type: u16,
    pub layer_child_level: u16,
    pub blend_mode: u16,
    pub opacity: u8,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tileset_index: Option<u32>,
    #[serde(skip)]
    pub uuid: Option<[u8; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

/// One animation frame and the cels drawn in it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Frame size in bytes, header included.
    pub size: u32,
    /// Frame duration in milliseconds.
    pub duration: u16,
    /// Number of chunks in the frame.
    pub chunks: u32,
    pub cels: Vec<Cel>,
}

/// The closed set of cel kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CelKind {
    /// Uncompressed pixels.
    Raw,
    /// Shares the cel on the same layer at another frame.
    Linked { frame: u16 },
    /// Zlib-compressed pixels. The only kind that gets composited.
    CompressedImage,
    /// Zlib-compressed tile references; width and height are in tiles.
    CompressedTilemap { bits_per_tile: u16, tile_id_mask: u32 },
    /// A tag this decoder does not know.
    Unknown(u16),
}

impl CelKind {
    /// The numeric cel type stored in the file.
    pub fn tag(&self) -> u16 {
        match self {
            CelKind::Raw => 0,
            CelKind::Linked { .. } => 1,
            CelKind::CompressedImage => 2,
            CelKind::CompressedTilemap { .. } => 3,
            CelKind::Unknown(tag) => *tag,
        }
    }
}

/// A rectangular block of pixels attached to one layer in one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cel {
    pub layer_index: u16,
    /// Horizontal placement on the canvas.
    pub x: i16,
    /// Vertical placement on the canvas.
    pub y: i16,
    pub opacity: u8,
    pub z_index: i16,
    pub kind: CelKind,
    pub width: u16,
    pub height: u16,
    /// Decompressed pixel bytes: palette indices or RGBA, per the document's depth.
    pub data: Vec<u8>,
    pub user_data: Option<UserData>,
}

impl Cel {
    /// Paint order key: lower values are painted first.
    #[inline]
    pub fn stacking_order(&self) -> (i32, i16) {
        (
            i32::from(self.layer_index) + i32::from(self.z_index),
            self.z_index,
        )
    }

    pub fn is_compressed_image(&self) -> bool {
        self.kind == CelKind::CompressedImage
    }

    /// Expected pixel buffer length for the given depth.
    pub fn expected_len(&self, depth: ColorDepth) -> usize {
        self.width as usize * self.height as usize * depth.bytes_per_pixel()
    }

    /// Checks that the cel can be composited, describing the problem if not.
    pub fn check_pixels(&self, depth: ColorDepth) -> Result<(), String> {
        if !self.is_compressed_image() {
            return Err(format!("cel type {} cannot be composited", self.kind.tag()));
        }
        let expected = self.expected_len(depth);
        if self.data.len() != expected {
            return Err(format!(
                "pixel buffer holds {} byte(s), expected {} for {}x{} at {} bpp",
                self.data.len(),
                expected,
                self.width,
                self.height,
                depth.bits()
            ));
        }
        Ok(())
    }
}

// Hand-written so the pixel buffer stays out of the metadata and the cel
// kind flattens into `celType` plus an optional `linkedFrame`.
impl Serialize for Cel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let linked = match self.kind {
            CelKind::Linked { frame } => Some(frame),
            _ => None,
        };
        let mut fields = 8;
        fields += usize::from(linked.is_some()) + usize::from(self.user_data.is_some());

        let mut state = serializer.serialize_struct("Cel", fields)?;
        state.serialize_field("layerIndex", &self.layer_index)?;
        state.serialize_field("xpos", &self.x)?;
        state.serialize_field("ypos", &self.y)?;
        state.serialize_field("opacity", &self.opacity)?;
        state.serialize_field("celType", &self.kind.tag())?;
        state.serialize_field("zIndex", &self.z_index)?;
        state.serialize_field("w", &self.width)?;
        state.serialize_field("h", &self.height)?;
        if let Some(frame) = linked {
            state.serialize_field("linkedFrame", &frame)?;
        }
        if let Some(user_data) = &self.user_data {
            state.serialize_field("userData", user_data)?;
        }
        state.end()
    }
}

/// Playback direction of a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AnimDirection {
    Forward,
    Reverse,
    #[serde(rename = "Ping-pong")]
    PingPong,
    #[serde(rename = "Ping-pong Reverse")]
    PingPongReverse,
}

impl AnimDirection {
    /// Unknown values play forward, like the editor does.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => AnimDirection::Reverse,
            2 => AnimDirection::PingPong,
            3 => AnimDirection::PingPongReverse,
            _ => AnimDirection::Forward,
        }
    }
}

/// A named frame range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub from: u16,
    pub to: u16,
    pub anim_direction: AnimDirection,
    /// 0 repeats forever.
    pub repeat: u16,
    /// Deprecated tag color, `#rrggbb`.
    pub color: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SliceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SlicePivot {
    pub x: i32,
    pub y: i32,
}

/// Slice bounds from a given frame onwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SliceKey {
    pub frame: u32,
    pub bounds: SliceRect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<SliceRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<SlicePivot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice {
    pub name: String,
    pub flags: u32,
    pub keys: Vec<SliceKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

/// Tileset header. Tile pixels are not decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    pub id: u32,
    pub flags: u32,
    pub tile_count: u32,
    pub tile_width: u16,
    pub tile_height: u16,
    pub base_index: i16,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColorProfileKind {
    None,
    #[serde(rename = "sRGB")]
    Srgb,
    #[serde(rename = "ICC")]
    Icc,
    Unknown,
}

impl ColorProfileKind {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => ColorProfileKind::None,
            1 => ColorProfileKind::Srgb,
            2 => ColorProfileKind::Icc,
            _ => ColorProfileKind::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorProfile {
    #[serde(rename = "type")]
    pub kind: ColorProfileKind,
    pub flags: u16,
    /// Fixed gamma, meaningful when flag bit 1 is set.
    pub gamma: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icc_length: Option<u32>,
}

/// Free text and color attached to a sprite element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cel(layer_index: u16, z_index: i16) -> Cel {
        Cel {
            layer_index,
            x: 0,
            y: 0,
            opacity: 255,
            z_index,
            kind: CelKind::CompressedImage,
            width: 2,
            height: 2,
            data: vec![0; 16],
            user_data: None,
        }
    }

    #[test]
    fn test_palette_out_of_range_is_transparent() {
        let mut palette = Palette::default();
        palette.set(1, Color::rgba(255, 0, 0, 255));

        assert_eq!(palette.len(), 2);
        assert_eq!(palette.color(0), TRANSPARENT);
        assert_eq!(palette.color(1), [255, 0, 0, 255]);
        assert_eq!(palette.color(2), TRANSPARENT);
        assert_eq!(palette.color(usize::MAX), TRANSPARENT);
    }

    #[test]
    fn test_pixel_ratio_zero_means_square() {
        assert_eq!(PixelRatio::from_header(0, 0), PixelRatio::SQUARE);
        assert_eq!(PixelRatio::from_header(2, 0), PixelRatio::SQUARE);
        assert!(!PixelRatio::from_header(2, 1).is_one_to_one());
        assert!(!PixelRatio::from_header(2, 2).is_one_to_one());
        assert_eq!(PixelRatio::from_header(2, 1).to_string(), "2:1");
    }

    #[test]
    fn test_color_depth_bits() {
        assert_eq!(ColorDepth::from_bits(8), Some(ColorDepth::Indexed));
        assert_eq!(ColorDepth::from_bits(32), Some(ColorDepth::Rgba));
        assert_eq!(ColorDepth::from_bits(16), None);
        assert_eq!(ColorDepth::Rgba.bytes_per_pixel(), 4);
    }

    #[test]
    fn test_stacking_order_breaks_ties_with_z_index() {
        // Both sum to 1; the lower z-index paints first.
        let a = cel(0, 1);
        let b = cel(1, 0);
        assert!(b.stacking_order() < a.stacking_order());
        assert!(cel(0, -1).stacking_order() < cel(0, 0).stacking_order());
    }

    #[test]
    fn test_check_pixels() {
        let good = cel(0, 0);
        assert!(good.check_pixels(ColorDepth::Rgba).is_ok());
        assert!(good.check_pixels(ColorDepth::Indexed).is_err());

        let mut linked = cel(0, 0);
        linked.kind = CelKind::Linked { frame: 0 };
        assert!(linked.check_pixels(ColorDepth::Rgba).is_err());
    }

    #[test]
    fn test_cel_serialization_skips_pixels() {
        let mut linked = cel(3, 0);
        linked.kind = CelKind::Linked { frame: 7 };
        let json = serde_json::to_value(&linked).expect("serialize cel");

        assert_eq!(json["layerIndex"], 3);
        assert_eq!(json["celType"], 1);
        assert_eq!(json["linkedFrame"], 7);
        assert!(json.get("data").is_none());
    }
}
