//! Fuzz target for whole-file Aseprite decoding.
//!
//! This fuzzer feeds arbitrary byte sequences to the document decoder,
//! checking for panics, crashes, or hangs.

#![no_main]

use ase_extract::doc::io_ase::from_ase_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_ase_slice(data);
});
