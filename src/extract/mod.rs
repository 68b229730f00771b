//! Per-layer, per-frame extraction.
//!
//! For every (layer, frame) pair the compressed-image cels of that layer are
//! picked out of the frame, ordered by stacking key, expanded to RGBA and
//! composited onto a transparent canvas. Pairs whose canvas has no visible
//! pixel produce nothing. Pairs are independent, so they are rendered on a
//! rayon pool; the metadata file is written once every image is done.

pub mod report;

pub use report::{ExportFile, ExtractCounts, ExtractReport, Metadata};

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::doc::io_ase::from_ase_slice;
use crate::doc::{Cel, Document, Frame};
use crate::error::AseError;
use crate::render::{composite, expand_pixels, Canvas, Region};

/// Default file name of the metadata sidecar.
pub const DEFAULT_METADATA_NAME: &str = "aseprite.json";

/// Where the Aseprite bytes come from.
#[derive(Clone, Debug)]
pub enum Input {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl Input {
    /// Loads the raw bytes.
    ///
    /// # Errors
    /// [`AseError::InvalidInput`] if the path is not a regular file or the
    /// buffer is empty; [`AseError::Io`] if reading fails.
    pub fn into_bytes(self) -> Result<Vec<u8>, AseError> {
        let bytes = match self {
            Input::Path(path) => {
                let meta = fs::metadata(&path).map_err(AseError::Io)?;
                if !meta.is_file() {
                    return Err(AseError::InvalidInput(format!(
                        "'{}' is not a file",
                        path.display()
                    )));
                }
                fs::read(&path).map_err(AseError::Io)?
            }
            Input::Bytes(bytes) => bytes,
        };
        if bytes.is_empty() {
            return Err(AseError::InvalidInput("input is empty".to_string()));
        }
        Ok(bytes)
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::Path(path)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Input::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Input::Bytes(bytes)
    }
}

impl From<&[u8]> for Input {
    fn from(bytes: &[u8]) -> Self {
        Input::Bytes(bytes.to_vec())
    }
}

/// Options for extraction behavior.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Worker threads; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// File name of the metadata sidecar inside the output directory.
    pub metadata_name: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            threads: None,
            metadata_name: DEFAULT_METADATA_NAME.to_string(),
        }
    }
}

/// The rendered frames of one layer; `None` where the layer shows nothing.
#[derive(Clone, Debug, Default)]
pub struct LayerFrames {
    pub frames: Vec<Option<Canvas>>,
}

/// A decoded document with every (layer, frame) canvas rendered.
#[derive(Debug)]
pub struct Extraction {
    pub document: Document,
    pub layers: Vec<LayerFrames>,
}

/// Output file name for a (layer, frame) pair, e.g. `00-03.png`.
pub fn file_name(layer: usize, frame: usize) -> String {
    format!("{layer:02}-{frame:02}.png")
}

/// The compressed-image cels of `layer` in `frame`, in paint order.
///
/// Ordered by `layer index + z-index`, then by z-index; the sort is stable
/// so equal keys keep their file order.
pub fn select_cels(frame: &Frame, layer: usize) -> Vec<&Cel> {
    let mut cels: Vec<&Cel> = frame
        .cels
        .iter()
        .filter(|cel| cel.layer_index as usize == layer)
        .filter(|cel| cel.is_compressed_image())
        .collect();
    cels.sort_by_key(|cel| cel.stacking_order());
    cels
}

/// A rendered pair plus the cels that had to be left out.
struct Rendered {
    canvas: Option<Canvas>,
    /// Compressed-image cels the layer has in this frame.
    cels: usize,
    malformed: Vec<AseError>,
}

fn render_pair(
    document: &Document,
    layer: usize,
    frame_index: usize,
) -> Result<Rendered, AseError> {
    if layer >= document.layers.len() {
        return Err(AseError::InvalidInput(format!(
            "layer {layer} out of range (document has {} layer(s))",
            document.layers.len()
        )));
    }
    let frame = document.frames.get(frame_index).ok_or_else(|| {
        AseError::InvalidInput(format!(
            "frame {frame_index} out of range (document has {} frame(s))",
            document.frames.len()
        ))
    })?;

    let cels = select_cels(frame, layer);
    let cel_count = cels.len();
    if cels.is_empty() {
        return Ok(Rendered {
            canvas: None,
            cels: 0,
            malformed: Vec::new(),
        });
    }

    let mut malformed = Vec::new();
    let mut regions = Vec::with_capacity(cel_count);
    for cel in cels {
        if let Err(message) = cel.check_pixels(document.color_depth) {
            let issue = AseError::MalformedCel {
                layer,
                frame: frame_index,
                message,
            };
            tracing::warn!("{issue}");
            malformed.push(issue);
            continue;
        }
        regions.push(Region {
            pixels: expand_pixels(
                &cel.data,
                u32::from(cel.width),
                u32::from(cel.height),
                document.color_depth,
                &document.palette,
            ),
            top: i32::from(cel.y),
            left: i32::from(cel.x),
            width: u32::from(cel.width),
            height: u32::from(cel.height),
        });
    }

    let canvas = composite(
        u32::from(document.width),
        u32::from(document.height),
        &regions,
    );
    let bbox = canvas.bounding_box();
    tracing::debug!(
        layer,
        frame = frame_index,
        regions = regions.len(),
        ?bbox,
        "rendered"
    );

    Ok(Rendered {
        canvas: (!bbox.is_empty()).then_some(canvas),
        cels: cel_count,
        malformed,
    })
}

/// Renders one (layer, frame) pair.
///
/// Returns `Ok(None)` when the layer has no compressed-image cel in the frame
/// or when the composite has no visible pixel. Malformed cels are logged and
/// left out.
///
/// # Errors
/// [`AseError::InvalidInput`] if `layer` or `frame` is out of range.
pub fn render_layer_frame(
    document: &Document,
    layer: usize,
    frame: usize,
) -> Result<Option<Canvas>, AseError> {
    render_pair(document, layer, frame).map(|rendered| rendered.canvas)
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, AseError> {
    if threads == Some(0) {
        return Err(AseError::InvalidInput(
            "threads must be >= 1 when set".to_string(),
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| AseError::ThreadPool(e.to_string()))
}

fn pairs(document: &Document) -> Vec<(usize, usize)> {
    (0..document.layers.len())
        .flat_map(|layer| (0..document.frames.len()).map(move |frame| (layer, frame)))
        .collect()
}

/// Renders every (layer, frame) pair in parallel.
///
/// # Errors
/// The first rendering error aborts the whole run.
pub fn render_layers(
    document: &Document,
    opts: &ExtractOptions,
) -> Result<Vec<LayerFrames>, AseError> {
    let pool = build_thread_pool(opts.threads)?;
    let rendered: Vec<Option<Canvas>> = pool.install(|| {
        pairs(document)
            .par_iter()
            .map(|&(layer, frame)| render_layer_frame(document, layer, frame))
            .collect::<Result<Vec<_>, AseError>>()
    })?;

    let frame_count = document.frames.len();
    let mut canvases = rendered.into_iter();
    let layers = (0..document.layers.len())
        .map(|_| LayerFrames {
            frames: canvases.by_ref().take(frame_count).collect(),
        })
        .collect();
    Ok(layers)
}

/// Decodes `input` and renders every (layer, frame) pair in memory.
///
/// # Errors
/// Any decode error, or the first rendering error.
pub fn extract(
    input: impl Into<Input>,
    opts: &ExtractOptions,
) -> Result<Extraction, AseError> {
    let bytes = input.into().into_bytes()?;
    let document = from_ase_slice(&bytes)?;
    let layers = render_layers(&document, opts)?;
    Ok(Extraction { document, layers })
}

/// Decodes `input`, writes one PNG per non-empty (layer, frame) pair into
/// `out_dir` and then the metadata sidecar.
///
/// `out_dir` is created if missing. Images are written in parallel; the
/// sidecar lists them ordered by layer, then frame.
///
/// # Errors
/// Decode errors abort before anything is written. Rendering or write
/// errors abort the run; images already written stay on disk.
#[tracing::instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn extract_to_dir(
    input: impl Into<Input>,
    out_dir: &Path,
    opts: &ExtractOptions,
) -> Result<ExtractReport, AseError> {
    let bytes = input.into().into_bytes()?;
    let document = from_ase_slice(&bytes)?;
    let pool = build_thread_pool(opts.threads)?;

    fs::create_dir_all(out_dir).map_err(AseError::Io)?;

    let exported: Vec<(Option<ExportFile>, Vec<AseError>, bool)> = pool.install(|| {
        pairs(&document)
            .par_iter()
            .map(|&(layer, frame)| -> Result<_, AseError> {
                let rendered = render_pair(&document, layer, frame)?;
                let had_cels = rendered.cels > 0;
                let Some(canvas) = rendered.canvas else {
                    return Ok((None, rendered.malformed, had_cels));
                };

                let name = file_name(layer, frame);
                canvas.write_png(&out_dir.join(&name))?;
                let file = ExportFile {
                    name,
                    layer,
                    frame,
                    bbox: canvas.bounding_box(),
                };
                Ok((Some(file), rendered.malformed, true))
            })
            .collect::<Result<Vec<_>, AseError>>()
    })?;

    // Every image is on disk past this point.
    let mut report = ExtractReport {
        out_dir: out_dir.to_path_buf(),
        metadata_path: out_dir.join(&opts.metadata_name),
        counts: ExtractCounts {
            layers: document.layers.len(),
            frames: document.frames.len(),
            ..Default::default()
        },
        ..Default::default()
    };
    for (file, malformed, had_cels) in exported {
        report
            .warnings
            .extend(malformed.into_iter().map(|issue| issue.to_string()));
        match file {
            Some(file) => report.files.push(file),
            None if had_cels => report.counts.empty += 1,
            None => {}
        }
    }
    report.counts.images = report.files.len();

    Metadata::new(&document, &report.files).write(&report.metadata_path)?;
    tracing::info!(
        images = report.counts.images,
        empty = report.counts.empty,
        "extraction finished"
    );

    Ok(report)
}
