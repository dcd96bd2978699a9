//! Artifact resolution
//!
//! Lists `<mirror>/<name>/` and picks the newest `.tbz2` built for the
//! target platform. Platform-independent builds (`any_any`, `darwin_any`,
//! `noarch`) are accepted alongside exact matches.

use crate::core::error::InstallError;
use crate::core::platform::PlatformTag;
use crate::core::version::{compare_versions, version_from_filename};
use crate::helpers::http::HttpClient;
use anyhow::{Context, Result};
use regex::Regex;

/// A concrete artifact chosen for installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub version: String,
}

impl ArtifactDescriptor {
    /// Detached signature published next to the artifact
    pub fn signature_url(&self) -> String {
        format!("{}.rmd160", self.url)
    }

    pub fn signature_filename(&self) -> String {
        format!("{}.rmd160", self.filename)
    }
}

pub struct ArtifactResolver<'a> {
    http: &'a HttpClient,
    mirror: String,
    platform: PlatformTag,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(http: &'a HttpClient, mirror: &str, platform: PlatformTag) -> Self {
        Self {
            http,
            mirror: mirror.trim_end_matches('/').to_string(),
            platform,
        }
    }

    /// Find the newest compatible artifact for `name`.
    pub fn resolve(&self, name: &str) -> Result<ArtifactDescriptor> {
        let base_url = format!("{}/{}", self.mirror, name);
        let listing = self
            .http
            .get_string(&format!("{}/", base_url))
            .with_context(|| format!("Failed to list mirror directory for {}", name))?;

        let found = candidates(name, &self.platform, &listing)?;
        let filename = select_newest(name, &self.platform, &found)
            .ok_or_else(|| InstallError::NoCompatibleArtifact {
                package: name.to_string(),
                platform: self.platform.to_string(),
            })?;

        let version = version_from_filename(&filename, name, &self.platform).unwrap_or_default();
        Ok(ArtifactDescriptor {
            name: name.to_string(),
            url: format!("{}/{}", base_url, filename),
            filename,
            version,
        })
    }
}

fn candidate_pattern(name: &str, platform: &PlatformTag) -> Result<Regex> {
    let pattern = format!(
        r"(?:^|[^\w.+\-])({}[\w.+\-]*?\.(?:any_any|darwin_any|{})\.(?:noarch|{})\.tbz2)",
        regex::escape(name),
        regex::escape(&platform.os),
        regex::escape(&platform.arch),
    );
    Regex::new(&pattern).with_context(|| format!("Invalid listing pattern for {}", name))
}

/// All artifact filenames for `name` in a listing, in listing order.
pub fn candidates(name: &str, platform: &PlatformTag, listing: &str) -> Result<Vec<String>> {
    Ok(candidate_pattern(name, platform)?
        .captures_iter(listing)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Pick the candidate with the highest inferred version.
///
/// Equal versions resolve to the later entry, so a listing of identical
/// versions behaves like "last match wins".
pub fn select_newest(name: &str, platform: &PlatformTag, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|f| (version_from_filename(f, name, platform).unwrap_or_default(), f))
        .max_by(|(a, _), (b, _)| compare_versions(a, b))
        .map(|(_, f)| f.clone())
}
