//! portlibs CLI - install signed MacPorts libraries for cross-building
//!
//! Usage:
//!   portlibs arm64                     Install the configured package set
//!   portlibs x86_64 libsdl2 glib2      Install specific packages
//!   portlibs arm64 --mirror URL        Use another mirror

use anyhow::Result;
use clap::Parser;
use portlibs::{Arch, Config, DependencyInstaller, TrustAnchor, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portlibs")]
#[command(about = "Install signed MacPorts binary packages into a per-architecture tree")]
#[command(version)]
struct Cli {
    /// Target architecture
    #[arg(value_enum)]
    arch: Arch,

    /// Packages to install (defaults to the configured set)
    packages: Vec<String>,

    /// Config file (defaults to the user config, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mirror base URL
    #[arg(short, long)]
    mirror: Option<String>,

    /// Root of the per-architecture target trees
    #[arg(long)]
    libs_dir: Option<PathBuf>,

    /// Download cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl Cli {
    /// Flags take precedence over file and environment
    fn apply_to(&self, config: &mut Config) {
        if let Some(mirror) = &self.mirror {
            config.mirror_url = mirror.clone();
        }
        if let Some(dir) = &self.libs_dir {
            config.libs_dir = dir.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if !self.packages.is_empty() {
            config.packages = self.packages.clone();
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);

    let mut installer = DependencyInstaller::new(&config, cli.arch, TrustAnchor::MACPORTS)?;
    let report = installer.install(config.packages.as_slice())?;

    output::success(&format!(
        "{}: {}",
        installer.target_tree().display(),
        report.summary()
    ));
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
