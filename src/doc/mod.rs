//! Decoded document types and the Aseprite binary reader.
//!
//! [`io_ase`] walks the chunked file format into a [`Document`]. The document
//! is immutable once decoded; rendering only ever borrows it.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use ase_extract::doc::io_ase::read_ase_file;
//!
//! let document = read_ase_file(Path::new("sprite.aseprite")).unwrap();
//! println!("{}x{}, {} layer(s)", document.width, document.height, document.layers.len());
//! ```

mod cursor;
pub mod io_ase;
mod model;

pub use model::{
    AnimDirection, Cel, CelKind, Color, ColorDepth, ColorProfile, ColorProfileKind, Document,
    Frame, Grid, Layer, Palette, PixelRatio, Rgba8, Slice, SliceKey, SlicePivot, SliceRect, Tag,
    Tileset, UserData, TRANSPARENT,
};
