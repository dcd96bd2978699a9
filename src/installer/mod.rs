//! Dependency installer
//!
//! Drains a FIFO of package names. Each name is skip-list checked, ledger
//! checked, then run through the pipeline:
//!
//! ```text
//! resolve -> download -> verify -> read manifest -> extract -> patch -> record
//! ```
//!
//! Dependencies found in the manifest are queued before the package itself
//! is extracted. Any error aborts the whole run; whatever was extracted
//! before stays in the tree and the ledger only lists completed packages,
//! so re-running picks up where it stopped.

pub mod extract;
pub mod fetch;
pub mod ledger;
pub mod manifest;
pub mod patch;
pub mod resolve;
pub mod verify;

use crate::core::config::Config;
use crate::core::lock::{self, TreeLock};
use crate::core::output;
use crate::core::platform::{Arch, PlatformTag};
use crate::helpers::http::HttpClient;
use anyhow::{Context, Result};
use extract::SafeExtractor;
use fetch::Fetcher;
use ledger::{InstallLedger, SkipList};
use patch::PatchTable;
use resolve::{ArtifactDescriptor, ArtifactResolver};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use verify::{TrustAnchor, TrustStore};

/// Cache file name of the signing key
pub const PUBKEY_FILE_NAME: &str = "macports-pubkey.pem";

/// Where a package is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    SkippedInstalled,
    SkippedBlacklisted,
    Resolving,
    Downloading,
    Verifying,
    ReadingManifest,
    Extracting,
    Patching,
    Installed,
    Failed,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SkippedInstalled => "skipped (already installed)",
            Self::SkippedBlacklisted => "skipped (blacklisted)",
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::ReadingManifest => "reading manifest",
            Self::Extracting => "extracting",
            Self::Patching => "patching",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final result for one processed name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { version: String },
    AlreadyInstalled,
    Skipped,
}

/// Names processed by one run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub entries: Vec<(String, Outcome)>,
}

impl InstallReport {
    /// Names installed during this run
    pub fn installed(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(name, outcome)| match outcome {
            Outcome::Installed { .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, o)| pred(o)).count()
    }

    /// One-line summary, e.g. "3 installed, 1 already present, 0 skipped"
    pub fn summary(&self) -> String {
        format!(
            "{} installed, {} already present, {} skipped",
            self.count(|o| matches!(o, Outcome::Installed { .. })),
            self.count(|o| matches!(o, Outcome::AlreadyInstalled)),
            self.count(|o| matches!(o, Outcome::Skipped)),
        )
    }
}

/// FIFO of package names; a name is accepted at most once per run
#[derive(Debug, Default)]
pub struct WorkQueue {
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl WorkQueue {
    /// Queue `name` unless it was queued before. Returns whether it was added.
    pub fn push(&mut self, name: &str) -> bool {
        if !self.seen.insert(name.to_string()) {
            return false;
        }
        self.queue.push_back(name.to_string());
        true
    }

    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Installs packages and their dependency closure into one target tree
pub struct DependencyInstaller {
    tree: PathBuf,
    cache_dir: PathBuf,
    mirror: String,
    platform: PlatformTag,
    ledger: InstallLedger,
    fetcher: Fetcher,
    trust: TrustStore,
    extractor: SafeExtractor,
    patches: PatchTable,
    skip: SkipList,
    _lock: TreeLock,
}

impl DependencyInstaller {
    /// Prepare `<libs_dir>/<arch>` and take its lock.
    ///
    /// Fails with `TargetLocked` if another installer holds the tree.
    pub fn new(config: &Config, arch: Arch, anchor: TrustAnchor) -> Result<Self> {
        let tree = config.libs_dir.join(arch.as_str());
        std::fs::create_dir_all(&tree)
            .with_context(|| format!("Failed to create target tree: {}", tree.display()))?;
        let tree = tree
            .canonicalize()
            .with_context(|| format!("Failed to resolve target tree: {}", tree.display()))?;

        std::fs::create_dir_all(&config.cache_dir).with_context(|| {
            format!("Failed to create cache dir: {}", config.cache_dir.display())
        })?;

        let lock = lock::acquire_tree_lock(&tree)?;
        let ledger = InstallLedger::open(&tree)?;

        let http = HttpClient::new(config.http_timeout(), config.retries);
        let trust = TrustStore::new(
            anchor,
            &config.pubkey_url,
            config.cache_dir.join(PUBKEY_FILE_NAME),
        );

        Ok(Self {
            extractor: SafeExtractor::new(tree.clone()),
            tree,
            cache_dir: config.cache_dir.clone(),
            mirror: config.mirror_base().to_string(),
            platform: PlatformTag::for_arch(arch),
            ledger,
            fetcher: Fetcher::new(http),
            trust,
            patches: PatchTable::default(),
            skip: SkipList::new(config.skip_prefixes.iter().cloned()),
            _lock: lock,
        })
    }

    /// Replace the default patch table
    pub fn with_patches(mut self, patches: PatchTable) -> Self {
        self.patches = patches;
        self
    }

    pub fn target_tree(&self) -> &Path {
        &self.tree
    }

    pub fn ledger(&self) -> &InstallLedger {
        &self.ledger
    }

    /// Install `roots` and everything they depend on.
    pub fn install<S: AsRef<str>>(&mut self, roots: &[S]) -> Result<InstallReport> {
        output::action(&format!(
            "Installing into {} ({})",
            self.tree.display(),
            self.platform
        ));

        let mut queue = WorkQueue::default();
        for root in roots {
            queue.push(root.as_ref());
        }

        let mut report = InstallReport::default();

        while let Some(name) = queue.pop() {
            if self.skip.is_skipped(&name) {
                output::skip(&name, PackageState::SkippedBlacklisted);
                report.entries.push((name, Outcome::Skipped));
                continue;
            }
            if self.ledger.is_installed(&name) {
                output::skip(&name, PackageState::SkippedInstalled);
                report.entries.push((name, Outcome::AlreadyInstalled));
                continue;
            }

            output::action(&format!("Installing {}", name));
            let mut state = PackageState::Resolving;
            match self.install_one(&name, &mut state, &mut queue) {
                Ok(version) => {
                    output::success(&format!("{} {} {}", name, version, PackageState::Installed));
                    report.entries.push((name, Outcome::Installed { version }));
                }
                Err(err) => {
                    output::error(&format!("{}: {} while {}", name, PackageState::Failed, state));
                    return Err(err.context(format!("{} failed while {}", name, state)));
                }
            }
        }

        Ok(report)
    }

    fn install_one(
        &mut self,
        name: &str,
        state: &mut PackageState,
        queue: &mut WorkQueue,
    ) -> Result<String> {
        enter(state, PackageState::Resolving);
        let resolver = ArtifactResolver::new(self.fetcher.http(), &self.mirror, self.platform.clone());
        let artifact = resolver.resolve(name)?;
        output::detail(&format!("found {}", artifact.filename));

        enter(state, PackageState::Downloading);
        let (archive, signature) = self.download(&artifact)?;

        enter(state, PackageState::Verifying);
        self.trust
            .trusted_key(&self.fetcher)?
            .verify_detached(&archive, &signature)?;

        enter(state, PackageState::ReadingManifest);
        for dep in manifest::read_dependencies(&archive)? {
            if queue.push(&dep) {
                output::detail(&format!("queued {}", dep));
            }
        }

        enter(state, PackageState::Extracting);
        let extracted = self.extractor.extract(&archive)?;

        enter(state, PackageState::Patching);
        self.patches.apply(name, &self.tree, &extracted)?;

        self.ledger.mark_installed(name, &artifact.version)?;
        Ok(artifact.version)
    }

    /// Fetch an artifact and its signature into the cache.
    fn download(&self, artifact: &ArtifactDescriptor) -> Result<(PathBuf, PathBuf)> {
        let archive = self.cache_dir.join(&artifact.filename);
        let signature = self.cache_dir.join(artifact.signature_filename());

        self.fetcher
            .fetch(&artifact.filename, &artifact.url, &archive)?;
        self.fetcher
            .fetch(&artifact.signature_filename(), &artifact.signature_url(), &signature)?;

        Ok((archive, signature))
    }
}

fn enter(state: &mut PackageState, next: PackageState) {
    *state = next;
    output::step(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &Path) -> Config {
        Config {
            libs_dir: dir.join("libs"),
            cache_dir: dir.join("pkgs"),
            mirror_url: "http://127.0.0.1:9/packages/".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_work_queue_accepts_each_name_once() {
        let mut queue = WorkQueue::default();
        assert!(queue.push("a"));
        assert!(queue.push("b"));
        assert!(!queue.push("a"));
        assert_eq!(queue.pop().as_deref(), Some("a"));
        // Still rejected after it left the queue
        assert!(!queue.push("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_report_summary() {
        let report = InstallReport {
            entries: vec![
                ("a".into(), Outcome::Installed { version: "1.0".into() }),
                ("b".into(), Outcome::AlreadyInstalled),
                ("python3".into(), Outcome::Skipped),
            ],
        };
        assert_eq!(report.summary(), "1 installed, 1 already present, 1 skipped");
        assert_eq!(report.installed().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(report.outcome("b"), Some(&Outcome::AlreadyInstalled));
    }

    #[test]
    fn test_new_creates_canonical_tree() {
        let dir = TempDir::new().unwrap();
        let installer =
            DependencyInstaller::new(&config(dir.path()), Arch::Arm64, TrustAnchor::MACPORTS)
                .unwrap();

        let expected = dir.path().join("libs/arm64").canonicalize().unwrap();
        assert_eq!(installer.target_tree(), expected);
        assert!(installer.target_tree().is_absolute());
        assert!(dir.path().join("pkgs").is_dir());
        assert!(expected.join(lock::LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_second_installer_on_same_tree_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path());
        let _first = DependencyInstaller::new(&cfg, Arch::X86_64, TrustAnchor::MACPORTS).unwrap();

        let err = DependencyInstaller::new(&cfg, Arch::X86_64, TrustAnchor::MACPORTS)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<crate::core::error::InstallError>(),
            Some(crate::core::error::InstallError::TargetLocked { .. })
        ));

        // A different architecture is a different tree
        assert!(DependencyInstaller::new(&cfg, Arch::Arm64, TrustAnchor::MACPORTS).is_ok());
    }

    #[test]
    fn test_skipped_and_installed_names_never_touch_network() {
        let dir = TempDir::new().unwrap();
        let mut installer =
            DependencyInstaller::new(&config(dir.path()), Arch::Arm64, TrustAnchor::MACPORTS)
                .unwrap();
        installer.ledger.mark_installed("libsdl2", "2.0.20").unwrap();

        // The mirror is unreachable, so any network access would fail the run
        let report = installer
            .install(&["python311", "libsdl2", "ncurses", "libsdl2"])
            .unwrap();
        assert_eq!(
            report.entries,
            vec![
                ("python311".to_string(), Outcome::Skipped),
                ("libsdl2".to_string(), Outcome::AlreadyInstalled),
                ("ncurses".to_string(), Outcome::Skipped),
            ]
        );
        assert!(!installer.ledger().is_installed("python311"));
    }
}
