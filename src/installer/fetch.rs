//! Name-addressed download cache
//!
//! Artifact filenames embed their version, so an existing file at the
//! destination is trusted to be the same artifact and is not re-fetched.
//! Signatures and the key are still verified on every use.

use crate::core::output;
use crate::helpers::http::HttpClient;
use anyhow::{Context, Result};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Cached,
    Downloaded { bytes: u64 },
}

pub struct Fetcher {
    http: HttpClient,
}

impl Fetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Download `url` to `dest` unless `dest` already exists.
    ///
    /// The body is streamed to a temporary file next to `dest` and renamed
    /// into place once complete, so a failed transfer leaves nothing behind.
    pub fn fetch(&self, description: &str, url: &str, dest: &Path) -> Result<FetchOutcome> {
        if dest.exists() {
            output::detail(&format!("already have {}", description));
            return Ok(FetchOutcome::Cached);
        }

        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot create temporary file in {}", dir.display()))?;
        let bytes = self.http.download_to(url, tmp.as_file_mut(), description)?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("cannot flush download of {}", description))?;
        tmp.persist(dest)
            .with_context(|| format!("cannot move download into {}", dest.display()))?;

        output::detail(&format!("downloaded {} ({} bytes)", description, bytes));
        Ok(FetchOutcome::Downloaded { bytes })
    }
}
