//! Low-level helpers used by the installer pipeline
//!
//! - **http**: blocking mirror client with timeout and retry
//! - **hash**: streaming file digests
//! - **progress**: spinner and download bar styling

pub mod hash;
pub mod http;
pub mod progress;
