use std::path::PathBuf;
use thiserror::Error;

/// The main error type for extraction operations.
#[derive(Debug, Error)]
pub enum AseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported pixel ratio: {width}:{height}. Only 1:1 is supported.")]
    UnsupportedPixelRatio { width: u8, height: u8 },

    #[error("Unsupported color depth: {0}.")]
    UnsupportedColorDepth(u16),

    /// A single cel that cannot be composited. Reported, never fatal.
    #[error("Malformed cel on layer {layer} in frame {frame}: {message}")]
    MalformedCel {
        layer: usize,
        frame: usize,
        message: String,
    },

    #[error("Failed to decode Aseprite data at byte {offset}: {message}")]
    Decode { offset: usize, message: String },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write metadata to {path}: {source}")]
    MetadataWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl AseError {
    pub(crate) fn decode(offset: usize, message: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            message: message.into(),
        }
    }
}
