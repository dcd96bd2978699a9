//! File digest helpers
//!
//! Streaming hex digests for the RustCrypto hash family (RIPEMD-160, SHA-1).

use ripemd::Digest;
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Rmd160,
    Sha1,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rmd160 => "RIPEMD-160",
            Self::Sha1 => "SHA-1",
        }
    }
}

/// Feed everything `reader` yields into a fresh `D`, chunk by chunk.
pub fn hash_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<D> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher)
}

/// Stream a file through a fresh `D` without loading it into memory.
pub fn hash_file<D: Digest>(path: &Path) -> std::io::Result<D> {
    let mut f = std::fs::File::open(path)?;
    hash_reader(&mut f)
}

/// Lowercase hex digest of an in-memory buffer.
pub fn bytes_digest(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Rmd160 => hex::encode(ripemd::Ripemd160::digest(data)),
        HashAlgorithm::Sha1 => hex::encode(sha1::Sha1::digest(data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmd160_hello_world() {
        assert_eq!(
            bytes_digest(b"hello world", HashAlgorithm::Rmd160),
            "98c615784ccb5fe5936fbc0cbe9dfdb408d92f0f"
        );
    }

    #[test]
    fn test_sha1_hello_world() {
        assert_eq!(
            bytes_digest(b"hello world", HashAlgorithm::Sha1),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[test]
    fn test_file_hash_spans_chunks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("big.bin");
        let data = vec![b'a'; CHUNK_SIZE * 2 + 7];
        std::fs::write(&file_path, &data).unwrap();

        let streamed = hash_file::<ripemd::Ripemd160>(&file_path).unwrap().finalize();
        assert_eq!(
            hex::encode(streamed),
            bytes_digest(&data, HashAlgorithm::Rmd160)
        );
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(hash_file::<sha1::Sha1>(&temp_dir.path().join("nope")).is_err());
    }
}
