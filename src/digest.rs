//! Content digests rendered as lowercase hex.

use crate::config::DigestAlgorithm;
use crate::error::{Error, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read buffer used when hashing a file.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Incremental hasher over one of the supported algorithms.
pub enum ContentHasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl ContentHasher {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => ContentHasher::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => ContentHasher::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            ContentHasher::Md5(h) => h.update(data),
            ContentHasher::Sha256(h) => h.update(data),
        }
    }

    /// Consume the hasher and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            ContentHasher::Md5(h) => hex::encode(h.finalize()),
            ContentHasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Digest an in-memory byte slice.
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> String {
    let mut hasher = ContentHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Digest everything a reader yields until end of stream.
pub fn digest_reader<R: Read>(mut reader: R, algorithm: DigestAlgorithm) -> Result<String> {
    let mut hasher = ContentHasher::new(algorithm);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// Digest a file on disk without loading it into memory.
///
/// # Example
///
/// ```no_run
/// use file_envelope::config::DigestAlgorithm;
/// use file_envelope::digest::digest_file;
/// use std::path::Path;
///
/// let hex = digest_file(Path::new("report.pdf"), DigestAlgorithm::Md5).unwrap();
/// assert_eq!(hex.len(), 32);
/// ```
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    let file = open_source(path)?;
    digest_reader(file, algorithm).map_err(|e| match e {
        Error::Io(source) => Error::not_found(path, source),
        other => other,
    })
}

/// Open a file for shared, read-only access. Directories are rejected.
pub(crate) fn open_source(path: &Path) -> Result<File> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::not_found(path, e))?;
    if metadata.is_dir() {
        return Err(Error::not_found(
            path,
            std::io::Error::new(ErrorKind::InvalidInput, "path is a directory"),
        ));
    }
    File::open(path).map_err(|e| Error::not_found(path, e))
}

/// Check that a string is non-empty lowercase hexadecimal.
pub fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MD5_EMPTY: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_known_vectors() {
        assert_eq!(digest_bytes(b"", DigestAlgorithm::Md5), MD5_EMPTY);
        assert_eq!(digest_bytes(b"", DigestAlgorithm::Sha256), SHA256_EMPTY);
        assert_eq!(
            digest_bytes(b"abc", DigestAlgorithm::Md5),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            digest_bytes(b"abc", DigestAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_digest_matches_bytes_and_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha256] {
            let first = digest_file(&path, algorithm).unwrap();
            let second = digest_file(&path, algorithm).unwrap();
            assert_eq!(first, second);
            assert_eq!(first, digest_bytes(&data, algorithm));
            assert_eq!(first.len(), algorithm.hex_len());
            assert!(is_lower_hex(&first));
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = digest_file(&dir.path().join("missing"), DigestAlgorithm::Md5);
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = digest_file(dir.path(), DigestAlgorithm::Sha256);
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_is_lower_hex() {
        assert!(is_lower_hex("0123456789abcdef"));
        assert!(!is_lower_hex("ABCDEF"));
        assert!(!is_lower_hex("xyz"));
        assert!(!is_lower_hex(""));
    }
}
