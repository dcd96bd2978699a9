//! Post-extraction fixups
//!
//! MacPorts builds hard-code `/opt/local`. After extraction the files live
//! under `<tree>/opt/local`, so:
//!
//! - every `pkg-config` file gets its `prefix=` line pointed into the tree
//! - packages with known absolute include paths get a registered patch
//!
//! Package patches are a table keyed by package name, applied after the
//! `.pc` pass. Adding one does not touch the install loop.

use crate::core::output;
use crate::installer::extract::ExtractedFiles;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// In-tree location of the MacPorts prefix
pub const LOCAL_PREFIX: &str = "opt/local";

/// A package-specific patch; receives the target tree root
pub type PackagePatch = fn(&Path) -> Result<()>;

pub struct PatchTable {
    /// (package name prefix, prefix subdirectory below `opt/local`)
    pc_prefix_overrides: Vec<(String, String)>,
    package_patches: BTreeMap<String, PackagePatch>,
}

impl Default for PatchTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.override_pc_prefix("openssl", "libexec/openssl11");
        table.register("glib2", patch_glib2_gi18n);
        table
    }
}

impl PatchTable {
    /// A table with no overrides or package patches
    pub fn empty() -> Self {
        Self {
            pc_prefix_overrides: Vec::new(),
            package_patches: BTreeMap::new(),
        }
    }

    /// Register (or replace) the patch for `package`.
    pub fn register(&mut self, package: &str, patch: PackagePatch) {
        self.package_patches.insert(package.to_string(), patch);
    }

    /// Point `.pc` prefixes of packages starting with `name_prefix` at
    /// `opt/local/<subdir>`.
    pub fn override_pc_prefix(&mut self, name_prefix: &str, subdir: &str) {
        self.pc_prefix_overrides
            .push((name_prefix.to_string(), subdir.to_string()));
    }

    /// The `prefix=` value `.pc` files of `package` should carry.
    pub fn pc_prefix(&self, package: &str, root: &Path) -> String {
        let base = root.join(LOCAL_PREFIX);
        let prefix = self
            .pc_prefix_overrides
            .iter()
            .find(|(name_prefix, _)| package.starts_with(name_prefix.as_str()))
            .map(|(_, subdir)| base.join(subdir))
            .unwrap_or(base);
        prefix.display().to_string()
    }

    /// Run the `.pc` pass over `extracted`, then the package's own patch.
    pub fn apply(&self, package: &str, root: &Path, extracted: &ExtractedFiles) -> Result<()> {
        let prefix = self.pc_prefix(package, root);

        for rel in extracted.iter().filter(|p| p.extension().is_some_and(|e| e == "pc")) {
            let path = root.join(rel);
            output::detail(&format!("fixing {}", rel.display()));
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if let Some(updated) = rewrite_pc_prefix(&contents, &prefix) {
                std::fs::write(&path, updated)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        if let Some(patch) = self.package_patches.get(package) {
            patch(root).with_context(|| format!("Failed to patch {}", package))?;
        }

        Ok(())
    }
}

/// Replace the first line starting with `prefix` by `prefix=<new_prefix>`.
///
/// Returns `None` if there is no such line. Line endings are preserved.
pub fn rewrite_pc_prefix(contents: &str, new_prefix: &str) -> Option<String> {
    let mut out = String::with_capacity(contents.len() + new_prefix.len());
    let mut replaced = false;

    for line in contents.split_inclusive('\n') {
        if !replaced && line.trim_start().starts_with("prefix") {
            let body = line.trim_end_matches(['\r', '\n']);
            out.push_str("prefix=");
            out.push_str(new_prefix);
            out.push_str(&line[body.len()..]);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    replaced.then_some(out)
}

/// Replace every occurrence of `from` in the file at `path`.
fn replace_in_file(path: &Path, from: &str, to: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    std::fs::write(path, contents.replace(from, to))
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// glib's `gi18n.h` includes libintl by absolute path.
fn patch_glib2_gi18n(root: &Path) -> Result<()> {
    const HEADER: &str = "opt/local/include/glib-2.0/glib/gi18n.h";
    const LIBINTL: &str = "/opt/local/include/libintl.h";

    let path = root.join(HEADER);
    output::detail(&format!("fixing {}", HEADER));
    let in_tree = format!("{}{}", root.display(), LIBINTL);
    replace_in_file(&path, LIBINTL, &in_tree)
}
