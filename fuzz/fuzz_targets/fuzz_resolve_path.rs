//! Fuzz target: URL path resolution.
//!
//! Any resolved path must stay strictly inside the sandbox, whatever mix of
//! `..`, empty segments and percent escapes the input carries.

#![no_main]

use std::path::Path;

use httpfs_core::{SandboxDir, SandboxRoot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|url_path: &str| {
    let Ok(sandbox) = SandboxDir::new("tenant") else {
        return;
    };
    let root = SandboxRoot::new(Path::new("/srv/files"), &sandbox);
    if let Ok(path) = root.resolve(url_path) {
        assert!(path.starts_with(root.base()), "escaped: {}", path.display());
        assert_ne!(path.as_path(), root.base());
    }
});
