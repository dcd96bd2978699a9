//! Target platform selection
//!
//! MacPorts publishes one artifact per (OS release, CPU arch) pair. The OS
//! release is the oldest Darwin we build against for each architecture.

use std::fmt;

/// Darwin release targeted for Intel builds (macOS 10.13)
pub const DARWIN_TARGET_X86_64: &str = "darwin_17";

/// Darwin release targeted for Apple Silicon builds (macOS 12)
pub const DARWIN_TARGET_ARM64: &str = "darwin_21";

/// Supported CPU architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Arch {
    #[value(name = "x86_64")]
    X86_64,
    #[value(name = "arm64")]
    Arm64,
}

impl Arch {
    /// Architecture name as it appears in artifact filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }

    /// Darwin release artifacts must be built for
    pub fn darwin_target(&self) -> &'static str {
        match self {
            Self::X86_64 => DARWIN_TARGET_X86_64,
            Self::Arm64 => DARWIN_TARGET_ARM64,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (OS release, CPU arch) pair selecting installable artifact variants
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformTag {
    pub os: String,
    pub arch: String,
}

impl PlatformTag {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform tag MacPorts uses for an architecture
    pub fn for_arch(arch: Arch) -> Self {
        Self::new(arch.darwin_target(), arch.as_str())
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.os, self.arch)
    }
}
