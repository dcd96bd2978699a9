//! Dependency discovery from package manifests
//!
//! Every MacPorts archive carries a `+CONTENTS` packing list. Dependencies
//! appear as `@pkgdep <name>-<version>` records.

use crate::core::output;
use crate::core::version::strip_version_suffix;
use crate::installer::extract::open_archive;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Component, Path};

/// Name of the packing list inside an archive
pub const MANIFEST_NAME: &str = "+CONTENTS";

const PKGDEP: &str = "@pkgdep";

/// Read the dependency names declared by an artifact.
///
/// A missing or unreadable manifest yields no dependencies and a warning.
/// Errors reading the archive itself are returned.
pub fn read_dependencies(artifact: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(artifact)?;
    let entries = archive
        .entries()
        .with_context(|| format!("Failed to read archive: {}", artifact.display()))?;

    for entry in entries {
        let mut entry =
            entry.with_context(|| format!("Failed to read archive: {}", artifact.display()))?;
        let path = entry
            .path()
            .with_context(|| format!("Bad entry path in {}", artifact.display()))?
            .into_owned();
        if !is_manifest(&path) {
            continue;
        }

        let mut contents = String::new();
        if let Err(e) = entry.read_to_string(&mut contents) {
            output::warning(&format!(
                "cannot read {} in {}: {}",
                MANIFEST_NAME,
                artifact.display(),
                e
            ));
            return Ok(Vec::new());
        }
        return Ok(parse_pkgdeps(&contents));
    }

    output::warning(&format!(
        "{} has no {}, assuming no dependencies",
        artifact.display(),
        MANIFEST_NAME
    ));
    Ok(Vec::new())
}

/// `./+CONTENTS` or `+CONTENTS` at the archive root
fn is_manifest(path: &Path) -> bool {
    let mut parts = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(name)), None) if name == MANIFEST_NAME
    )
}

/// Extract dependency names from packing-list text.
///
/// Version suffixes are stripped; malformed records are skipped with a
/// warning.
pub fn parse_pkgdeps(contents: &str) -> Vec<String> {
    let mut deps = Vec::new();

    for line in contents.lines() {
        let Some(rest) = line.trim_start().strip_prefix(PKGDEP) else {
            continue;
        };
        // "@pkgdepfoo" is some other record
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            continue;
        }

        let token = rest.trim();
        let name = strip_version_suffix(token);
        if name.is_empty() || name.contains(char::is_whitespace) {
            output::warning(&format!("ignoring malformed dependency record: {}", line.trim()));
            continue;
        }

        output::detail(&format!("> {}", token));
        deps.push(name.to_string());
    }

    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const CONTENTS: &str = "@name glib2-2.76.4_1+x11
@cwd /opt/local
@pkgdep gettext-runtime-0.21.1_0
@pkgdep libiconv-1.17_0
@pkgdep libffi-3.4.4_0
@comment @pkgdep commented-1.0
@pkgdepnot-a-dep
@pkgdep
opt/local/lib/libglib-2.0.0.dylib
";

    fn write_tbz2(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_uid(501);
            header.set_gid(20);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_parse_pkgdeps() {
        assert_eq!(
            parse_pkgdeps(CONTENTS),
            vec!["gettext-runtime", "libiconv", "libffi"]
        );
    }

    #[test]
    fn test_parse_pkgdeps_without_version() {
        assert_eq!(parse_pkgdeps("@pkgdep zlib\n"), vec!["zlib"]);
    }

    #[test]
    fn test_is_manifest() {
        assert!(is_manifest(Path::new("./+CONTENTS")));
        assert!(is_manifest(Path::new("+CONTENTS")));
        assert!(!is_manifest(Path::new("opt/+CONTENTS")));
        assert!(!is_manifest(Path::new("./+DESC")));
    }

    #[test]
    fn test_read_dependencies_from_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("glib2-2.76.4_1.darwin_21.arm64.tbz2");
        write_tbz2(
            &archive,
            &[
                ("./+CONTENTS", CONTENTS.as_bytes()),
                ("./opt/local/lib/libglib-2.0.0.dylib", b"\xcf\xfa\xed\xfe".as_slice()),
            ],
        );

        let deps = read_dependencies(&archive).unwrap();
        assert_eq!(deps, vec!["gettext-runtime", "libiconv", "libffi"]);
        // Reading the manifest must not extract anything
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_manifest_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bare.tbz2");
        write_tbz2(&archive, &[("./opt/local/include/bare.h", b"int x;\n".as_slice())]);

        assert!(read_dependencies(&archive).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("corrupt.tbz2");
        std::fs::write(&archive, b"definitely not bzip2").unwrap();

        assert!(read_dependencies(&archive).is_err());
    }
}
