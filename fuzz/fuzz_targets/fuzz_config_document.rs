//! Fuzz target: config document parsing.
//!
//! Every sandbox directory accepted by the parser must be relative and free
//! of parent segments.

#![no_main]

use std::path::Component;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<httpfs_core::Config>(data) else {
        return;
    };
    for sandbox in config.api_keys.values() {
        assert!(sandbox
            .as_path()
            .components()
            .all(|c| matches!(c, Component::Normal(_))));
    }
});
