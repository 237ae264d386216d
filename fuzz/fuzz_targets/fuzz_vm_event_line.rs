//! Fuzz target for guest history line parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use probe_core::sender::VmEventLine;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(line) = VmEventLine::parse(s) {
            let _ = line.guest_log_path();
        }
    }
});
