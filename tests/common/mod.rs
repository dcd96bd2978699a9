//! Common test utilities for installer integration tests.

#![allow(dead_code)]

mod fixtures;
mod mirror;

pub use fixtures::*;
pub use mirror::MockMirror;

use portlibs::Config;
use std::path::Path;

/// Config pointing at a mock mirror, with trees and cache under `dir`
pub fn test_config(dir: &Path, mirror: &MockMirror) -> Config {
    Config {
        mirror_url: mirror.mirror_url(),
        pubkey_url: mirror.pubkey_url(),
        libs_dir: dir.join("macos-libs"),
        cache_dir: dir.join("macos-pkgs"),
        retries: 0,
        http_timeout_secs: 5,
        ..Config::default()
    }
}
