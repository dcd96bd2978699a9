//! Test fixtures - keys and package archives.

#![allow(dead_code)]

use bzip2::Compression;
use bzip2::write::BzEncoder;
use portlibs::TrustAnchor;
use ripemd::Ripemd160;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};

/// Private half of the fixture signing key (PKCS#8, RSA 1024)
pub const TEST_KEY_PEM: &str = include_str!("../fixtures/test-key.pem");

/// Public half of the fixture signing key
pub const TEST_PUBKEY_PEM: &str = include_str!("../fixtures/test-pubkey.pem");

/// A valid key that is not the fixture signing key
pub const OTHER_PUBKEY_PEM: &str = include_str!("../fixtures/other-pubkey.pem");

/// Fingerprint of `test-pubkey.pem`
pub const TEST_ANCHOR: TrustAnchor = TrustAnchor {
    rmd160: "12558ab9587d559bfb70de765bf970fe2886500c",
    sha1: "bd89da05563ab0099584c66079258fa10d4b09a9",
};

/// Platform suffix of arm64 artifacts
pub const ARM64: &str = "darwin_21.arm64";

/// Numeric owner MacPorts packages carry (macports:staff style ids)
pub const OWNER_UID: u64 = 502;
pub const OWNER_GID: u64 = 20;

/// Sign `data` the way MacPorts signs artifacts.
pub fn sign(data: &[u8]) -> Vec<u8> {
    let key = RsaPrivateKey::from_pkcs8_pem(TEST_KEY_PEM).unwrap();
    SigningKey::<Ripemd160>::new(key).sign(data).to_vec()
}

/// A MacPorts-style package archive
#[derive(Debug, Clone)]
pub struct PackageFixture {
    pub name: String,
    pub version: String,
    pub platform: String,
    pub deps: Vec<String>,
    pub files: Vec<(String, Vec<u8>)>,
    /// Entry names written verbatim, bypassing tar's own path checks
    pub raw_entries: Vec<String>,
}

impl PackageFixture {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            platform: ARM64.to_string(),
            deps: Vec::new(),
            files: vec![(
                format!("opt/local/share/{}/VERSION", name),
                format!("{}\n", version).into_bytes(),
            )],
            raw_entries: Vec::new(),
        }
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    /// Add a `@pkgdep` record; `dep` may carry a version suffix
    pub fn dep(mut self, dep: &str) -> Self {
        self.deps.push(dep.to_string());
        self
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.files.push((path.to_string(), contents.as_bytes().to_vec()));
        self
    }

    pub fn raw_entry(mut self, path: &str) -> Self {
        self.raw_entries.push(path.to_string());
        self
    }

    pub fn filename(&self) -> String {
        format!("{}-{}.{}.tbz2", self.name, self.version, self.platform)
    }

    /// The `+CONTENTS` packing list
    pub fn contents(&self) -> String {
        let mut out = format!("@name {}-{}\n@cwd /opt/local\n", self.name, self.version);
        for dep in &self.deps {
            out.push_str(&format!("@pkgdep {}\n", dep));
        }
        for (path, _) in &self.files {
            out.push_str(path);
            out.push('\n');
        }
        out
    }

    /// Build the `.tbz2` bytes
    pub fn build(&self) -> Vec<u8> {
        let encoder = BzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        append(&mut builder, "./+CONTENTS", self.contents().as_bytes());
        append(&mut builder, "./+DESC", b"fixture package\n");
        for (path, data) in &self.files {
            append(&mut builder, &format!("./{}", path), data);
        }
        for path in &self.raw_entries {
            let data = b"escaped\n";
            let mut header = tar::Header::new_old();
            header.as_old_mut().name[..path.len()].copy_from_slice(path.as_bytes());
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_uid(OWNER_UID);
            header.set_gid(OWNER_GID);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append(&header, data.as_slice()).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }
}

fn append(builder: &mut tar::Builder<BzEncoder<Vec<u8>>>, path: &str, data: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_uid(OWNER_UID);
    header.set_gid(OWNER_GID);
    header.set_mtime(1_600_000_000);
    header.set_cksum();
    builder.append_data(&mut header, path, data).unwrap();
}
