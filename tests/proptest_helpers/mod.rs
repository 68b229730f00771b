#![allow(dead_code)]

use ase_extract::doc::{Color, Palette};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_rgba() -> BoxedStrategy<[u8; 4]> {
    any::<[u8; 4]>().boxed()
}

/// Opaque colors only; compositing one of these replaces what is below.
pub fn arb_opaque() -> BoxedStrategy<[u8; 4]> {
    any::<[u8; 3]>()
        .prop_map(|[r, g, b]| [r, g, b, 255])
        .boxed()
}

pub fn arb_palette(max_len: usize) -> BoxedStrategy<Palette> {
    prop::collection::vec(arb_rgba(), 0..=max_len)
        .prop_map(|colors| {
            let mut palette = Palette::default();
            for (index, [r, g, b, a]) in colors.into_iter().enumerate() {
                palette.set(index, Color::rgba(r, g, b, a));
            }
            palette
        })
        .boxed()
}

/// Canvas size plus one coordinate inside it.
pub fn arb_canvas_point(max_side: u32) -> BoxedStrategy<(u32, u32, u32, u32)> {
    (1..=max_side, 1..=max_side)
        .prop_flat_map(|(w, h)| (Just(w), Just(h), 0..w, 0..h))
        .boxed()
}

/// A solid cel placement: `(layer, x, y, w, h, color)`.
pub type CelSpec = (u16, i16, i16, u16, u16, [u8; 4]);

pub fn arb_cel(layers: u16, canvas: i16) -> BoxedStrategy<CelSpec> {
    (
        0..layers,
        -canvas..canvas * 2,
        -canvas..canvas * 2,
        1u16..=canvas as u16,
        1u16..=canvas as u16,
        arb_rgba(),
    )
        .boxed()
}
