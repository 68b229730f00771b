//! Pixel pipeline: palette expansion, compositing and bounding boxes.
//!
//! These pieces know nothing about the file format beyond [`ColorDepth`]
//! and [`Palette`](crate::doc::Palette); the orchestration that picks and
//! orders cels lives in [`crate::extract`].
//!
//! [`ColorDepth`]: crate::doc::ColorDepth

mod bbox;
mod canvas;
mod composite;
mod expand;

pub use bbox::{compute_bounding_box, BoundingBox};
pub use canvas::Canvas;
pub use composite::{composite, over, Region};
pub use expand::expand_pixels;
