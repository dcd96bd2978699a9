//! Fatal installer error types.
//!
//! Every variant aborts the run. Callers that need to tell them apart use
//! `anyhow::Error::downcast_ref::<InstallError>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate an install run.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("unable to find a version of {package} compatible with {platform}")]
    NoCompatibleArtifact { package: String, platform: String },

    #[error(
        "untrusted signing key {}: {algorithm} digest mismatch\n  expected: {expected}\n  got:      {actual}\n\
         delete the cached key to re-download it",
        path.display()
    )]
    UntrustedKey {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("signing key {} is not a usable RSA public key: {reason}", path.display())]
    InvalidKey { path: PathBuf, reason: String },

    #[error("signature verification failed for {}", artifact.display())]
    BadSignature { artifact: PathBuf },

    #[error("archive {} has an entry outside the target tree: {entry}", artifact.display())]
    UnsafeArchivePath { artifact: PathBuf, entry: String },

    #[error("download of {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("download of {url} failed: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error(
        "target tree {} is in use by another installer. If this is incorrect, delete '{}'",
        tree.display(),
        lock.display()
    )]
    TargetLocked { tree: PathBuf, lock: PathBuf },
}

impl InstallError {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
