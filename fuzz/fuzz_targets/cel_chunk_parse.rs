//! Fuzz target for a single cel chunk payload, zlib inflation included.

#![no_main]

use ase_extract::doc::io_ase::fuzz_read_cel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let _ = fuzz_read_cel(data);
});
