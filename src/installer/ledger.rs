//! Installed-package ledger and skip list
//!
//! The ledger is `<tree>/INSTALLED`, one `name=version` line per package.
//! It is only ever appended to.
//!
//! ```text
//! libsdl2=2.0.20
//! glib2=2.76.4_1+x11
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ledger file name inside the target tree
pub const LEDGER_FILE_NAME: &str = "INSTALLED";

#[derive(Debug)]
pub struct InstallLedger {
    path: PathBuf,
    records: BTreeMap<String, String>,
}

impl InstallLedger {
    /// Load the ledger of `tree`. A missing file is an empty ledger.
    pub fn open(tree: &Path) -> Result<Self> {
        let path = tree.join(LEDGER_FILE_NAME);
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read ledger: {}", path.display()))?;
            parse_ledger(&content)
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Recorded version; empty for bare-name lines
    pub fn version(&self, name: &str) -> Option<&str> {
        self.records.get(name).map(String::as_str)
    }

    /// Append `name=version`. Recording an installed name again is a no-op.
    pub fn mark_installed(&mut self, name: &str, version: &str) -> Result<()> {
        if self.is_installed(name) {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger: {}", self.path.display()))?;
        writeln!(file, "{}={}", name, version)
            .with_context(|| format!("Failed to write ledger: {}", self.path.display()))?;

        self.records.insert(name.to_string(), version.to_string());
        Ok(())
    }

    pub fn records(&self) -> &BTreeMap<String, String> {
        &self.records
    }
}

/// Parse ledger text; the first record for a name wins.
fn parse_ledger(content: &str) -> BTreeMap<String, String> {
    let mut records = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, version) = line.split_once('=').unwrap_or((line, ""));
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        records
            .entry(name.to_string())
            .or_insert_with(|| version.trim().to_string());
    }

    records
}

/// Package name prefixes that are never fetched
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    prefixes: Vec<String>,
}

impl SkipList {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}
