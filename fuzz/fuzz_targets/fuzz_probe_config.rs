//! Fuzz target for probe.json parsing followed by semantic validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use probe_config::{validate_config, ProbeConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<ProbeConfig>(data) {
        let _ = validate_config(&config);
    }
});
