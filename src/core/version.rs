//! Package name and version handling
//!
//! MacPorts encodes versions inside names and filenames:
//!
//! ```text
//! @pkgdep libsdl2-2.0.20_0           -> dependency name "libsdl2"
//! libsdl2-2.0.20.darwin_21.arm64.tbz2 -> version "2.0.20"
//! ```
//!
//! A version always starts at the first `-` that is followed by a digit.

use crate::core::platform::PlatformTag;
use std::cmp::Ordering;

/// Byte offset of the first `-<digit>` boundary at or after `from`.
fn version_boundary(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    (from..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'-' && bytes[i + 1].is_ascii_digit())
}

/// Strip a trailing version suffix from a package token.
///
/// Truncates at the first `-<digit>` boundary. Tokens without one are
/// returned unchanged.
pub fn strip_version_suffix(token: &str) -> &str {
    match version_boundary(token, 0) {
        Some(idx) => &token[..idx],
        None => token,
    }
}

/// Infer the version embedded in an artifact filename.
///
/// The version starts after the first `-<digit>` boundary following the
/// package name and ends before the platform part of the filename
/// (`.any_any.`, `.darwin_any.` or `.<os>.`).
pub fn version_from_filename(filename: &str, name: &str, platform: &PlatformTag) -> Option<String> {
    let from = if filename.starts_with(name) { name.len() } else { 0 };
    let start = version_boundary(filename, from)? + 1;
    let rest = &filename[start..];

    let os_marker = format!(".{}.", platform.os);
    let end = [".any_any.", ".darwin_any.", os_marker.as_str()]
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()?;

    let version = &rest[..end];
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Num(u64),
    Alpha(&'a str),
}

/// Split a version into numeric and alphabetic runs, dropping separators.
fn segments(version: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let bytes = version.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        if bytes[i].is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            // Runs too long for u64 compare as the largest number
            let n = version[start..i].parse().unwrap_or(u64::MAX);
            out.push(Segment::Num(n));
        } else if bytes[i].is_ascii_alphabetic() {
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            out.push(Segment::Alpha(&version[start..i]));
        } else {
            i += 1;
        }
    }

    out
}

/// Compare two MacPorts-style versions.
///
/// Uses semver when both sides parse, otherwise compares numeric and
/// alphabetic runs in order: numbers numerically, words lexically, a number
/// outranks a word, and a longer version outranks its own prefix
/// (`2.0.20_1` > `2.0.20`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if let (Ok(va), Ok(vb)) = (semver::Version::parse(a), semver::Version::parse(b)) {
        return va.cmp(&vb);
    }

    let (sa, sb) = (segments(a), segments(b));
    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = match (x, y) {
            (Segment::Num(x), Segment::Num(y)) => x.cmp(y),
            (Segment::Alpha(x), Segment::Alpha(y)) => x.cmp(y),
            (Segment::Num(_), Segment::Alpha(_)) => Ordering::Greater,
            (Segment::Alpha(_), Segment::Num(_)) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len())
}
