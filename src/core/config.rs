//! Installer configuration
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML
//! file, environment variables, then command-line flags (applied by the
//! binary).
//!
//! ```toml
//! mirror_url = "http://packages.macports.org"
//! libs_dir = "./macos-libs"
//! cache_dir = "./macos-pkgs"
//! skip_prefixes = ["python", "ncurses"]
//! http_timeout_secs = 30
//! retries = 2
//! packages = ["libsdl2", "glib2"]
//! ```
//!
//! The trust anchor is deliberately absent: it is compiled in.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default MacPorts binary package mirror
pub const DEFAULT_MIRROR: &str = "http://nue.de.packages.macports.org/macports/packages";

/// Location of the MacPorts signing key
pub const DEFAULT_PUBKEY_URL: &str =
    "https://svn.macports.org/repository/macports/trunk/base/macports-pubkey.pem";

/// Default HTTP timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the mirror
pub const MIRROR_ENV: &str = "PORTLIBS_MIRROR";

/// Environment variable overriding the HTTP timeout (seconds)
pub const HTTP_TIMEOUT_ENV: &str = "PORTLIBS_HTTP_TIMEOUT";

/// Libraries a macOS emulator build links against
pub const DEFAULT_PACKAGES: &[&str] = &[
    "libsdl2",
    "glib2",
    "libsamplerate",
    "libpixman",
    "libepoxy",
    "openssl11",
    "libpcap",
    "libslirp",
];

/// Name prefixes assumed present on the build host
pub const DEFAULT_SKIP_PREFIXES: &[&str] = &["python", "ncurses"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Mirror base URL; packages live at `<mirror_url>/<name>/`
    pub mirror_url: String,
    /// URL of the PEM-encoded signing key
    pub pubkey_url: String,
    /// Root of the target trees; each architecture gets a subdirectory
    pub libs_dir: PathBuf,
    /// Download cache shared by all architectures
    pub cache_dir: PathBuf,
    /// Package name prefixes that are never fetched
    pub skip_prefixes: Vec<String>,
    pub http_timeout_secs: u64,
    /// Extra attempts for transient transport failures
    pub retries: u32,
    /// Root packages installed when none are given explicitly
    pub packages: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror_url: DEFAULT_MIRROR.to_string(),
            pubkey_url: DEFAULT_PUBKEY_URL.to_string(),
            libs_dir: PathBuf::from("macos-libs"),
            cache_dir: PathBuf::from("macos-pkgs"),
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|s| s.to_string()).collect(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            retries: 2,
            packages: DEFAULT_PACKAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration.
    ///
    /// Reads `path` if given, otherwise the user config file if it exists,
    /// otherwise starts from defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match user_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mirror) = lookup(MIRROR_ENV).filter(|s| !s.is_empty()) {
            self.mirror_url = mirror;
        }
        if let Some(secs) = lookup(HTTP_TIMEOUT_ENV).and_then(|s| s.parse::<u64>().ok()) {
            self.http_timeout_secs = secs;
        }
    }

    /// HTTP timeout, clamped to a reasonable range (5-300 seconds)
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.clamp(5, 300))
    }

    /// Mirror URL without trailing slashes
    pub fn mirror_base(&self) -> &str {
        self.mirror_url.trim_end_matches('/')
    }
}

/// `<config_dir>/portlibs/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("portlibs").join("config.toml"))
}
