//! Core infrastructure shared by the installer
//!
//! Configuration, error taxonomy, platform and version handling, locking
//! and terminal output.

pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod platform;
pub mod version;
