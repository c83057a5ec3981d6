//! Configuration constants and types for envelope encoding.

use std::fmt;
use std::str::FromStr;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Largest accepted streaming chunk size (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Element names of the envelope document.
pub mod tags {
    /// Root element.
    pub const ROOT: &str = "FileToBase64";

    /// Base64 encoded file content.
    pub const BASE64_FILE: &str = "Base64File";

    /// Bare file name used on decode.
    pub const FILENAME: &str = "filename";

    /// Lowercase hex digest of the original bytes.
    pub const CHECKSUM: &str = "MD5";
}

/// Digest algorithm used for the envelope checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// 128-bit MD5, interchangeable with envelopes produced by the desktop tool.
    #[default]
    Md5,
    /// 256-bit SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the lowercase hex rendering of this digest.
    pub fn hex_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 32,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    /// Infer the algorithm that produced a hex digest of the given length.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(DigestAlgorithm::Md5),
            64 => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(format!("unknown digest algorithm '{}'", other)),
        }
    }
}

/// Configuration for encoding a file into an envelope.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Bytes read from the source per streaming step.
    pub chunk_size: usize,

    /// Digest recorded in the envelope.
    pub digest: DigestAlgorithm,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            digest: DigestAlgorithm::default(),
        }
    }
}

impl CodecConfig {
    /// Create a new codec configuration with custom settings.
    pub fn new(chunk_size: usize, digest: DigestAlgorithm) -> Self {
        Self { chunk_size, digest }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(format!(
                "Chunk size must not exceed {} bytes",
                MAX_CHUNK_SIZE
            ));
        }
        Ok(())
    }
}

/// Options controlling how a decode treats its output.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Delete the written file when its digest does not match.
    ///
    /// Off by default: the file is kept so partially recovered data can be
    /// inspected.
    pub remove_on_mismatch: bool,
}
