//! Non-blocking wrappers for callers running on a tokio runtime.
//!
//! Each call moves the synchronous operation onto the blocking pool. Once
//! started it runs to completion even if the returned future is dropped;
//! decoding stages its output, so no partial target file is ever visible.

use crate::config::{CodecConfig, DecodeOptions, DigestAlgorithm};
use crate::digest::digest_file;
use crate::encoding::{decode_envelope_with, encode_file_report, EncodedFile};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tokio::task::{spawn_blocking, JoinError};

/// Encode a file on the blocking pool.
pub async fn encode_file_async(path: PathBuf, config: CodecConfig) -> Result<EncodedFile> {
    spawn_blocking(move || encode_file_report(&path, &config))
        .await
        .map_err(join_error)?
}

/// Decode an envelope on the blocking pool.
pub async fn decode_envelope_async(
    text: String,
    target_dir: PathBuf,
    options: DecodeOptions,
) -> Result<PathBuf> {
    spawn_blocking(move || decode_envelope_with(&text, &target_dir, &options))
        .await
        .map_err(join_error)?
}

/// Digest a file on the blocking pool.
pub async fn digest_file_async(path: PathBuf, algorithm: DigestAlgorithm) -> Result<String> {
    spawn_blocking(move || digest_file(&path, algorithm))
        .await
        .map_err(join_error)?
}

fn join_error(e: JoinError) -> Error {
    if e.is_panic() {
        std::panic::resume_unwind(e.into_panic());
    }
    Error::Cancelled
}
