//! Metadata sidecar and extraction summary.
//!
//! The sidecar is the decoded [`Document`] with a `files` array appended,
//! one entry per PNG written. It is an explicit struct rather than an
//! augmented JSON value so its shape stays stable.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::doc::Document;
use crate::error::AseError;
use crate::render::BoundingBox;

/// One exported image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportFile {
    /// File name relative to the output directory, e.g. `00-03.png`.
    pub name: String,
    pub layer: usize,
    pub frame: usize,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// The JSON written next to the images.
#[derive(Debug, Serialize)]
pub struct Metadata<'a> {
    #[serde(flatten)]
    pub document: &'a Document,
    pub files: &'a [ExportFile],
}

impl<'a> Metadata<'a> {
    pub fn new(document: &'a Document, files: &'a [ExportFile]) -> Self {
        Self { document, files }
    }

    /// Pretty-printed JSON. Useful for testing without file I/O.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the pretty-printed JSON to `path`.
    pub fn write(&self, path: &Path) -> Result<(), AseError> {
        let file = File::create(path).map_err(AseError::Io)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| AseError::MetadataWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(AseError::Io)
    }
}

/// Counts gathered during an extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractCounts {
    pub layers: usize,
    pub frames: usize,
    /// Images written.
    pub images: usize,
    /// (layer, frame) pairs with cels that composited to nothing.
    pub empty: usize,
}

/// Summary of an [`extract_to_dir`](super::extract_to_dir) run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExtractReport {
    pub out_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub counts: ExtractCounts,
    pub files: Vec<ExportFile>,
    /// Cels skipped as malformed.
    pub warnings: Vec<String>,
}

impl fmt::Display for ExtractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} layer(s), {} frame(s): {} image(s) written, {} empty",
            self.counts.layers, self.counts.frames, self.counts.images, self.counts.empty
        )?;
        writeln!(f, "  metadata: {}", self.metadata_path.display())?;

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", self.warnings.len())?;
            for warning in &self.warnings {
                writeln!(f, "  - {}", warning)?;
            }
        }

        Ok(())
    }
}
