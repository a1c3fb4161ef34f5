//! Fuzz target: `Authorization` header decoding.
//!
//! Arbitrary header values must never panic; a decoded username never
//! contains the `:` separator.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|value: &str| {
    if let Some(creds) = httpfs_gateway::auth::decode_basic(value) {
        assert!(!creds.username.contains(':'));
    }
});
