//! Streaming encoder from a file to envelope text.

use crate::config::CodecConfig;
use crate::digest::{open_source, ContentHasher};
use crate::envelope::{is_xml_text, EnvelopeWriter};
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

/// What was recorded for an encoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeInfo {
    /// Bare file name written into the envelope.
    pub filename: String,
    /// Lowercase hex digest of the original bytes.
    pub checksum: String,
    /// Number of bytes read from the source.
    pub size: u64,
}

/// An envelope together with its recorded metadata.
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub envelope: String,
    pub info: EncodeInfo,
}

/// Encode a file with the default configuration.
///
/// # Example
///
/// ```no_run
/// use file_envelope::encoding::encode_file;
/// use std::path::Path;
///
/// let envelope = encode_file(Path::new("notes.txt")).unwrap();
/// assert!(envelope.contains("<filename>notes.txt</filename>"));
/// ```
pub fn encode_file(path: &Path) -> Result<String> {
    encode_file_with(path, &CodecConfig::default())
}

/// Encode a file with a custom configuration.
pub fn encode_file_with(path: &Path, config: &CodecConfig) -> Result<String> {
    Ok(encode_file_report(path, config)?.envelope)
}

/// Encode a file and return the envelope along with what it records.
pub fn encode_file_report(path: &Path, config: &CodecConfig) -> Result<EncodedFile> {
    let mut buffer = Vec::new();
    let info = encode_to_writer(path, &mut buffer, config)?;
    let envelope = String::from_utf8(buffer)
        .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;

    Ok(EncodedFile { envelope, info })
}

/// Stream the envelope for `path` into `output`.
///
/// The file is read once in chunks of `config.chunk_size`; each chunk feeds
/// both the base64 stream and the digest. The source is opened read-only and
/// is never modified.
pub fn encode_to_writer<W: Write>(
    path: &Path,
    output: W,
    config: &CodecConfig,
) -> Result<EncodeInfo> {
    config.validate().map_err(Error::InvalidConfig)?;

    let mut source = open_source(path)?;
    // Control characters cannot be carried in an XML 1.0 document.
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| is_xml_text(name))
        .ok_or_else(|| Error::UnsupportedFilename(path.to_path_buf()))?
        .to_string();

    let mut writer = EnvelopeWriter::start(output)?;
    let mut hasher = ContentHasher::new(config.digest);
    let mut chunk = vec![0u8; config.chunk_size];
    let mut size = 0u64;

    {
        let mut base64 = EncoderWriter::new(writer.content(), &STANDARD);
        loop {
            let n = read_chunk(&mut source, &mut chunk)?;
            hasher.update(&chunk[..n]);
            base64.write_all(&chunk[..n])?;
            size += n as u64;

            // A short chunk means end of stream. A full one is followed by
            // another read, which returns 0 for exact multiples.
            if n < chunk.len() {
                break;
            }
        }
        base64.finish()?;
    }

    let checksum = hasher.finalize_hex();
    writer.finish(&filename, &checksum)?;

    Ok(EncodeInfo {
        filename,
        checksum,
        size,
    })
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
