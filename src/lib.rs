//! File Envelope
//!
//! Turns a single file into a self-describing text payload and back, with a
//! content digest guarding against corruption in transit or on disk.
//!
//! # Architecture
//!
//! ```text
//! File → Encode (chunked base64 + digest) → Envelope text → [transport]
//!      → Decode (parse → write new file → re-digest from disk) → File
//! ```
//!
//! The envelope is a small XML document carrying the base64 content, the bare
//! file name and a lowercase hex digest. Decoding never overwrites an existing
//! file and reports [`Error::Integrity`] when the written bytes do not match.
//!
//! # Example
//!
//! ```rust,no_run
//! use file_envelope::{decode_envelope, encode_file};
//! use std::path::Path;
//!
//! let envelope = encode_file(Path::new("./report.pdf")).unwrap();
//! let restored = decode_envelope(&envelope, Path::new("./restored")).unwrap();
//! assert!(restored.ends_with("report.pdf"));
//! ```

pub mod config;
pub mod digest;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod task;

pub use config::{CodecConfig, DecodeOptions, DigestAlgorithm};
pub use digest::digest_file;
pub use encoding::{decode_envelope, encode_file};
pub use envelope::Envelope;
pub use error::{Error, Result};
