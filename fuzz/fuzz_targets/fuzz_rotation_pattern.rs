//! Fuzz target for `file_rotation` path parsing and suffix extraction.

#![no_main]

use libfuzzer_sys::fuzz_target;
use probe_config::rotation::rotation_index;
use probe_config::RotationPattern;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(pattern) = RotationPattern::parse(s) {
            let _ = pattern.matches(s);
        }
        let _ = rotation_index(s);
    }
});
