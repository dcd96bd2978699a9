//! Contained extraction of `.tbz2` artifacts
//!
//! Extraction is two-pass. The pre-flight pass reads every entry path and
//! rejects the whole artifact if any of them would land outside the target
//! tree, either lexically or through a symlink (one already in the tree, or
//! one the archive itself creates earlier on). Only then is anything written.

use crate::core::error::InstallError;
use crate::core::output;
use crate::helpers::progress;
use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

/// A bzip2-compressed tar archive opened for streaming
pub type ArtifactArchive = tar::Archive<BzDecoder<BufReader<File>>>;

/// Open an artifact for a single streaming pass.
pub fn open_archive(artifact: &Path) -> Result<ArtifactArchive> {
    let file = File::open(artifact)
        .with_context(|| format!("cannot open {}", artifact.display()))?;
    Ok(tar::Archive::new(BzDecoder::new(BufReader::new(file))))
}

/// Resolve an entry path against the tree without touching the filesystem.
///
/// Returns the normalized path relative to the tree, or `None` if the entry
/// is absolute or climbs out with `..`.
pub fn contained_path(entry: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();

    for c in entry.components() {
        match c {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    Some(out)
}

/// Package metadata (`+CONTENTS`, `+DESC`, ...) sits at the archive root
/// and is not part of the installed payload.
fn is_package_metadata(rel: &Path) -> bool {
    let mut parts = rel.components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(name)), None) => name.to_string_lossy().starts_with('+'),
        _ => false,
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Regular files written by one extraction, relative to the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFiles {
    pub files: Vec<PathBuf>,
}

impl ExtractedFiles {
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

/// What the pre-flight pass learned about an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preflight {
    /// Every entry carries a numeric uid and gid
    pub owners_readable: bool,
}

pub struct SafeExtractor {
    root: PathBuf,
}

impl SafeExtractor {
    /// `root` should already exist and be canonical.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Check every entry of `artifact` without writing anything.
    pub fn preflight(&self, artifact: &Path) -> Result<Preflight> {
        let mut archive = open_archive(artifact)?;
        let entries = archive
            .entries()
            .with_context(|| format!("tar read error: {}", artifact.display()))?;

        // Symlinks created by this archive: entry path -> resolved target,
        // `None` when the target leaves the tree
        let mut links: BTreeMap<PathBuf, Option<PathBuf>> = BTreeMap::new();
        let mut owners_readable = true;

        for entry in entries {
            let entry = entry.with_context(|| format!("tar entry error: {}", artifact.display()))?;
            let path = entry
                .path()
                .with_context(|| format!("tar path error: {}", artifact.display()))?
                .into_owned();
            let unsafe_path = || InstallError::UnsafeArchivePath {
                artifact: artifact.to_path_buf(),
                entry: path.display().to_string(),
            };

            let Some(rel) = contained_path(&path) else {
                return Err(unsafe_path().into());
            };
            if rel.as_os_str().is_empty() || is_package_metadata(&rel) {
                continue;
            }
            if !self.parents_stay_inside(&rel, &links) {
                return Err(unsafe_path().into());
            }

            let header = entry.header();
            owners_readable &= header.uid().is_ok() && header.gid().is_ok();

            if header.entry_type().is_symlink() {
                let target = entry
                    .link_name()
                    .with_context(|| format!("tar link error: {}", artifact.display()))?
                    .map(|t| t.into_owned())
                    .unwrap_or_default();
                let resolved = if target.is_absolute() {
                    None
                } else {
                    let parent = rel.parent().unwrap_or(Path::new(""));
                    contained_path(&parent.join(&target))
                };
                links.insert(rel, resolved);
            } else {
                links.remove(&rel);
            }
        }

        Ok(Preflight { owners_readable })
    }

    /// Every directory above `rel` must resolve inside the tree.
    fn parents_stay_inside(&self, rel: &Path, links: &BTreeMap<PathBuf, Option<PathBuf>>) -> bool {
        let mut prefix = PathBuf::new();
        let mut parents = rel.components().collect::<Vec<_>>();
        parents.pop();

        for comp in parents {
            prefix.push(comp);
            if let Some(target) = links.get(&prefix) {
                if target.is_none() {
                    return false;
                }
                continue;
            }

            let on_disk = self.root.join(&prefix);
            let is_link = std::fs::symlink_metadata(&on_disk)
                .map(|md| md.file_type().is_symlink())
                .unwrap_or(false);
            if is_link {
                match on_disk.canonicalize() {
                    Ok(real) if real.starts_with(&self.root) => {}
                    _ => return false,
                }
            }
        }

        true
    }

    /// Pre-flight, then unpack `artifact` into the tree.
    ///
    /// Permissions and mtimes are kept; numeric ownership only when running
    /// as root and every entry has a readable owner.
    pub fn extract(&self, artifact: &Path) -> Result<ExtractedFiles> {
        let checked = self.preflight(artifact)?;
        let preserve_owners = running_as_root() && checked.owners_readable;
        if running_as_root() && !checked.owners_readable {
            output::warning(&format!(
                "{} has blank owner fields, not preserving ownership",
                artifact.display()
            ));
        }

        let label = artifact
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());

        let extracted = progress::with_spinner(&format!("extracting {}", label), || {
            self.unpack(artifact, preserve_owners)
        })?;

        output::detail(&format!(
            "extracted {} files to {}",
            extracted.files.len(),
            self.root.display()
        ));
        Ok(extracted)
    }

    fn unpack(&self, artifact: &Path, preserve_owners: bool) -> Result<ExtractedFiles> {
        let mut archive = open_archive(artifact)?;
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);
        archive.set_preserve_ownerships(preserve_owners);
        archive.set_overwrite(true);

        let mut extracted = ExtractedFiles::default();
        let entries = archive
            .entries()
            .with_context(|| format!("tar read error: {}", artifact.display()))?;

        for entry in entries {
            let mut entry =
                entry.with_context(|| format!("tar entry error: {}", artifact.display()))?;
            let path = entry
                .path()
                .with_context(|| format!("tar path error: {}", artifact.display()))?
                .into_owned();

            let Some(rel) = contained_path(&path) else {
                return Err(InstallError::UnsafeArchivePath {
                    artifact: artifact.to_path_buf(),
                    entry: path.display().to_string(),
                }
                .into());
            };
            if rel.as_os_str().is_empty() || is_package_metadata(&rel) {
                continue;
            }

            let is_file = entry.header().entry_type().is_file();
            // unpack_in also refuses to write through symlinks leaving the tree
            let written = entry
                .unpack_in(&self.root)
                .with_context(|| format!("unpack error for {}", path.display()))?;
            if !written {
                return Err(InstallError::UnsafeArchivePath {
                    artifact: artifact.to_path_buf(),
                    entry: path.display().to_string(),
                }
                .into());
            }

            if is_file {
                extracted.files.push(rel);
            }
        }

        Ok(extracted)
    }
}
