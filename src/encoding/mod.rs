//! Conversion between files and envelope text.
//!
//! ```text
//! File → [chunked read → base64 + digest] → Envelope text
//! Envelope text → [parse → base64 decode → stage → persist → re-digest] → File
//! ```

mod decoder;
mod encoder;

pub use decoder::{decode_envelope, decode_envelope_with, verify_envelope};
pub use encoder::{
    encode_file, encode_file_report, encode_file_with, encode_to_writer, EncodeInfo, EncodedFile,
};
