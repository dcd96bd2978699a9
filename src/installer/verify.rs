//! Chain of trust for mirror artifacts
//!
//! The signing key is downloaded from the network, so it is only used after
//! its RIPEMD-160 and SHA-1 digests match a fingerprint compiled into the
//! binary. Artifacts are then checked against their detached `.rmd160`
//! signature: RSA PKCS#1 v1.5 over the RIPEMD-160 digest of the file, the
//! format `openssl dgst -ripemd160 -sign` produces.
//!
//! Both checks fail closed. There is no way to continue past a mismatch.

use crate::core::error::InstallError;
use crate::core::output;
use crate::helpers::hash::{self, HashAlgorithm};
use crate::installer::fetch::Fetcher;
use anyhow::{Context, Result};
use ripemd::Ripemd160;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::DigestVerifier;
use std::path::{Path, PathBuf};

/// Fingerprint of the only signing key we accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustAnchor {
    /// Hex RIPEMD-160 of the PEM file bytes
    pub rmd160: &'static str,
    /// Hex SHA-1 of the PEM file bytes
    pub sha1: &'static str,
}

impl TrustAnchor {
    /// The MacPorts package signing key
    pub const MACPORTS: TrustAnchor = TrustAnchor {
        rmd160: "d3a22f5be7184d6575afcc1be6fdb82fd25562e8",
        sha1: "214baa965af76ff71187e6c1ac91c559547f48ab",
    };

    fn expected(&self, algorithm: HashAlgorithm) -> &'static str {
        match algorithm {
            HashAlgorithm::Rmd160 => self.rmd160,
            HashAlgorithm::Sha1 => self.sha1,
        }
    }
}

/// Downloads the signing key and vouches for it
pub struct TrustStore {
    anchor: TrustAnchor,
    key_url: String,
    key_path: PathBuf,
}

impl TrustStore {
    pub fn new(anchor: TrustAnchor, key_url: &str, key_path: PathBuf) -> Self {
        Self {
            anchor,
            key_url: key_url.to_string(),
            key_path,
        }
    }

    /// Fetch the key if needed, check its fingerprint and parse it.
    ///
    /// The fingerprint is recomputed on every call, cached key or not.
    pub fn trusted_key(&self, fetcher: &Fetcher) -> Result<TrustedKey> {
        fetcher
            .fetch("signing key", &self.key_url, &self.key_path)
            .context("Failed to fetch signing key")?;

        // One read: the bytes we fingerprint are the bytes we parse
        let bytes = std::fs::read(&self.key_path)
            .with_context(|| format!("Failed to read signing key: {}", self.key_path.display()))?;
        self.check_fingerprint(&bytes)?;

        let invalid = |reason: String| InstallError::InvalidKey {
            path: self.key_path.clone(),
            reason,
        };
        let pem = std::str::from_utf8(&bytes).map_err(|e| invalid(format!("not UTF-8 ({})", e)))?;
        let key = parse_public_key(pem).map_err(invalid)?;

        Ok(TrustedKey { key })
    }

    fn check_fingerprint(&self, bytes: &[u8]) -> Result<()> {
        for algorithm in [HashAlgorithm::Rmd160, HashAlgorithm::Sha1] {
            let actual = hash::bytes_digest(bytes, algorithm);
            let expected = self.anchor.expected(algorithm);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(InstallError::UntrustedKey {
                    path: self.key_path.clone(),
                    algorithm: algorithm.name(),
                    expected: expected.to_string(),
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Accepts SPKI (`BEGIN PUBLIC KEY`) and PKCS#1 (`BEGIN RSA PUBLIC KEY`) PEM.
fn parse_public_key(pem: &str) -> std::result::Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_pem(pem).or_else(|spki_err| {
        RsaPublicKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
            format!("not SPKI ({}) or PKCS#1 ({})", spki_err, pkcs1_err)
        })
    })
}

/// A public key whose fingerprint matched the trust anchor.
///
/// Only [`TrustStore::trusted_key`] can produce one.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    key: RsaPublicKey,
}

impl TrustedKey {
    /// Verify a detached RIPEMD-160/RSA signature over `artifact`.
    pub fn verify_detached(&self, artifact: &Path, signature: &Path) -> Result<()> {
        output::detail(&format!("verifying {}", file_label(artifact)));

        let digest = hash::hash_file::<Ripemd160>(artifact)
            .with_context(|| format!("Failed to read artifact: {}", artifact.display()))?;
        let sig_bytes = std::fs::read(signature)
            .with_context(|| format!("Failed to read signature: {}", signature.display()))?;

        let bad = || InstallError::BadSignature {
            artifact: artifact.to_path_buf(),
        };
        let sig = Signature::try_from(sig_bytes.as_slice()).map_err(|_| bad())?;
        VerifyingKey::<Ripemd160>::new(self.key.clone())
            .verify_digest(digest, &sig)
            .map_err(|_| bad())?;

        Ok(())
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
