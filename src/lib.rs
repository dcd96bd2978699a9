//! Signed MacPorts binary package installer
//!
//! Populates a per-architecture tree with prebuilt macOS libraries so a
//! project can be cross-built against them. Packages come from a MacPorts
//! mirror; every artifact must carry a valid signature from the MacPorts
//! signing key before anything is extracted.
//!
//! # Layout
//!
//! ```text
//! macos-libs/
//!   arm64/
//!     INSTALLED          name=version ledger
//!     opt/local/...      extracted package contents
//!   x86_64/
//! macos-pkgs/
//!   macports-pubkey.pem
//!   libsdl2-2.0.20.darwin_21.arm64.tbz2
//!   libsdl2-2.0.20.darwin_21.arm64.tbz2.rmd160
//! ```
//!
//! # Example
//!
//! ```no_run
//! use portlibs::{Arch, Config, DependencyInstaller, TrustAnchor};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let mut installer = DependencyInstaller::new(&config, Arch::Arm64, TrustAnchor::MACPORTS)?;
//! let report = installer.install(config.packages.as_slice())?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Pipeline
//!
//! For each queued package name:
//! - `resolve` - pick the newest compatible artifact from the mirror listing
//! - `fetch` - download artifact and `.rmd160` signature into the cache
//! - `verify` - check the signing key fingerprint, then the signature
//! - `manifest` - queue `@pkgdep` dependencies from `+CONTENTS`
//! - `extract` - unpack after a path containment pre-flight
//! - `patch` - fix `.pc` prefixes and known absolute include paths
//! - `ledger` - record `name=version`

pub mod core;
pub mod helpers;
pub mod installer;

pub use crate::core::config::Config;
pub use crate::core::error::InstallError;
pub use crate::core::output;
pub use crate::core::platform::{Arch, PlatformTag};
pub use installer::verify::TrustAnchor;
pub use installer::{DependencyInstaller, InstallReport, Outcome};
