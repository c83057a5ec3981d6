//! Decoder from envelope text back to a verified file.

use crate::config::DecodeOptions;
use crate::digest::{digest_bytes, digest_file};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Prefix of the hidden staging file created next to the target.
const STAGING_PREFIX: &str = ".file-envelope-";

/// Decode an envelope into `target_dir`, returning the written path.
///
/// Never overwrites an existing file. The written file is read back from
/// storage and its digest compared with the recorded one; on mismatch the
/// file is kept and [`Error::Integrity`] is returned.
///
/// # Example
///
/// ```no_run
/// use file_envelope::encoding::{decode_envelope, encode_file};
/// use std::path::Path;
///
/// let envelope = encode_file(Path::new("notes.txt")).unwrap();
/// let written = decode_envelope(&envelope, Path::new("/tmp/restore")).unwrap();
/// assert_eq!(written, Path::new("/tmp/restore/notes.txt"));
/// ```
pub fn decode_envelope(text: &str, target_dir: &Path) -> Result<PathBuf> {
    decode_envelope_with(text, target_dir, &DecodeOptions::default())
}

/// Decode an envelope with explicit options.
pub fn decode_envelope_with(
    text: &str,
    target_dir: &Path,
    options: &DecodeOptions,
) -> Result<PathBuf> {
    let envelope = Envelope::parse(text)?;
    let algorithm = envelope.digest_algorithm()?;

    let target = target_dir.join(envelope.filename());
    if target.exists() {
        return Err(Error::AlreadyExists(target));
    }
    if !target_dir.is_dir() {
        return Err(Error::not_found(
            target_dir,
            std::io::Error::new(ErrorKind::NotFound, "target directory does not exist"),
        ));
    }

    let content = envelope.decode_content()?;
    write_new_file(target_dir, &target, &content)?;

    // Read back from storage rather than trusting the buffer.
    let actual = digest_file(&target, algorithm)?;
    if actual != envelope.checksum() {
        return Err(integrity_failure(
            envelope.checksum(),
            actual,
            target,
            options.remove_on_mismatch,
        ));
    }

    Ok(target)
}

/// Build the mismatch error, deleting the written file first if asked.
///
/// A failed deletion is ignored; the digests matter more to the caller.
fn integrity_failure(expected: &str, actual: String, path: PathBuf, remove: bool) -> Error {
    if remove {
        let _ = fs::remove_file(&path);
    }
    Error::Integrity {
        expected: expected.to_string(),
        actual,
        path,
    }
}

/// Check an envelope's payload against its digest without writing anything.
pub fn verify_envelope(text: &str) -> Result<Envelope> {
    let envelope = Envelope::parse(text)?;
    let algorithm = envelope.digest_algorithm()?;
    let actual = digest_bytes(&envelope.decode_content()?, algorithm);

    if actual != envelope.checksum() {
        return Err(Error::Integrity {
            expected: envelope.checksum().to_string(),
            actual,
            path: PathBuf::from(envelope.filename()),
        });
    }

    Ok(envelope)
}

/// Stage `content` in `dir` and move it to `target` only if that name is free.
///
/// The staging file is removed on every failure path, so nothing partial is
/// left under the target name.
fn write_new_file(dir: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".part")
        .tempfile_in(dir)?;

    staged.write_all(content)?;
    staged.as_file().sync_all()?;

    staged.persist_noclobber(target).map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            Error::AlreadyExists(target.to_path_buf())
        } else {
            Error::Io(e.error)
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DigestAlgorithm;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use tempfile::TempDir;

    fn envelope_for(data: &[u8], name: &str, algorithm: DigestAlgorithm) -> String {
        Envelope::new(STANDARD.encode(data), name, digest_bytes(data, algorithm))
            .to_xml()
            .unwrap()
    }

    fn staging_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count()
    }

    #[test]
    fn test_decode_writes_file() {
        let dir = TempDir::new().unwrap();
        let text = envelope_for(b"payload", "out.bin", DigestAlgorithm::Md5);

        let written = decode_envelope(&text, dir.path()).unwrap();

        assert_eq!(written, dir.path().join("out.bin"));
        assert_eq!(fs::read(&written).unwrap(), b"payload");
        assert_eq!(staging_files(dir.path()), 0);
    }

    #[test]
    fn test_decode_sha256_envelope() {
        let dir = TempDir::new().unwrap();
        let text = envelope_for(b"strong", "s.bin", DigestAlgorithm::Sha256);

        let written = decode_envelope(&text, dir.path()).unwrap();
        assert_eq!(fs::read(written).unwrap(), b"strong");
    }

    #[test]
    fn test_decode_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("out.bin"), b"original").unwrap();
        let text = envelope_for(b"payload", "out.bin", DigestAlgorithm::Md5);

        let result = decode_envelope(&text, dir.path());

        assert!(matches!(result, Err(Error::AlreadyExists(_))));
        assert_eq!(fs::read(dir.path().join("out.bin")).unwrap(), b"original");
        assert_eq!(staging_files(dir.path()), 0);
    }

    #[test]
    fn test_mismatch_keeps_file_by_default() {
        let dir = TempDir::new().unwrap();
        let wrong = digest_bytes(b"something else", DigestAlgorithm::Md5);
        let text = Envelope::new(STANDARD.encode(b"payload"), "out.bin", wrong.clone())
            .to_xml()
            .unwrap();

        match decode_envelope(&text, dir.path()) {
            Err(Error::Integrity {
                expected,
                actual,
                path,
            }) => {
                assert_eq!(expected, wrong);
                assert_eq!(actual, digest_bytes(b"payload", DigestAlgorithm::Md5));
                assert_eq!(path, dir.path().join("out.bin"));
            }
            other => panic!("expected integrity error, got {:?}", other),
        }
        assert!(dir.path().join("out.bin").exists());
    }

    #[test]
    fn test_mismatch_removes_file_when_asked() {
        let dir = TempDir::new().unwrap();
        let wrong = digest_bytes(b"something else", DigestAlgorithm::Md5);
        let text = Envelope::new(STANDARD.encode(b"payload"), "out.bin", wrong)
            .to_xml()
            .unwrap();
        let options = DecodeOptions {
            remove_on_mismatch: true,
        };

        let result = decode_envelope_with(&text, dir.path(), &options);

        assert!(matches!(result, Err(Error::Integrity { .. })));
        assert!(!dir.path().join("out.bin").exists());
    }

    #[test]
    fn test_failed_removal_still_reports_integrity() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("never-written.bin");

        let err = integrity_failure("aa", "bb".to_string(), gone.clone(), true);

        match err {
            Error::Integrity {
                expected,
                actual,
                path,
            } => {
                assert_eq!(expected, "aa");
                assert_eq!(actual, "bb");
                assert_eq!(path, gone);
            }
            other => panic!("expected integrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_payload_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let text = Envelope::new("@@@@", "out.bin", digest_bytes(b"", DigestAlgorithm::Md5))
            .to_xml()
            .unwrap();

        let result = decode_envelope(&text, dir.path());

        assert!(matches!(result, Err(Error::Parse(_))));
        assert!(!dir.path().join("out.bin").exists());
        assert_eq!(staging_files(dir.path()), 0);
    }

    #[test]
    fn test_missing_target_dir() {
        let dir = TempDir::new().unwrap();
        let text = envelope_for(b"x", "x.bin", DigestAlgorithm::Md5);

        let result = decode_envelope(&text, &dir.path().join("absent"));
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_verify_envelope() {
        let good = envelope_for(b"check me", "c.txt", DigestAlgorithm::Sha256);
        assert_eq!(verify_envelope(&good).unwrap().filename(), "c.txt");

        let bad = Envelope::new(
            STANDARD.encode(b"check me"),
            "c.txt",
            digest_bytes(b"other", DigestAlgorithm::Sha256),
        )
        .to_xml()
        .unwrap();
        assert!(matches!(verify_envelope(&bad), Err(Error::Integrity { .. })));
    }
}
