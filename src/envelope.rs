//! The envelope document exchanged between encoder and decoder.
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <FileToBase64>
//!   <Base64File>...</Base64File>
//!   <filename>report.pdf</filename>
//!   <MD5>...</MD5>
//! </FileToBase64>
//! ```
//!
//! The `MD5` element holds whichever digest the encoder was configured with;
//! the algorithm is recovered from the digest length.

use crate::config::{tags, DigestAlgorithm};
use crate::digest::is_lower_hex;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{self, Write};

/// A parsed envelope. Fields are fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    base64_content: String,
    filename: String,
    checksum: String,
}

/// Leaf elements of the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Content,
    Filename,
    Checksum,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            n if n == tags::BASE64_FILE.as_bytes() => Some(Field::Content),
            n if n == tags::FILENAME.as_bytes() => Some(Field::Filename),
            n if n == tags::CHECKSUM.as_bytes() => Some(Field::Checksum),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Field::Content => tags::BASE64_FILE,
            Field::Filename => tags::FILENAME,
            Field::Checksum => tags::CHECKSUM,
        }
    }
}

/// Field text collected while reading the document.
#[derive(Default)]
struct Fields {
    content: Option<String>,
    filename: Option<String>,
    checksum: Option<String>,
}

impl Fields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Content => &mut self.content,
            Field::Filename => &mut self.filename,
            Field::Checksum => &mut self.checksum,
        }
    }

    /// Mark a field as present, rejecting duplicates.
    fn open(&mut self, field: Field) -> Result<()> {
        let slot = self.slot(field);
        if slot.is_some() {
            return Err(Error::Parse(format!("duplicate <{}> element", field.tag())));
        }
        *slot = Some(String::new());
        Ok(())
    }

    fn push(&mut self, field: Field, text: &str) {
        if let Some(value) = self.slot(field) {
            value.push_str(text);
        }
    }

    fn take(&mut self, field: Field) -> Result<String> {
        self.slot(field)
            .take()
            .ok_or_else(|| Error::Parse(format!("missing <{}> element", field.tag())))
    }
}

impl Envelope {
    /// Build an envelope from already encoded parts.
    pub fn new(
        base64_content: impl Into<String>,
        filename: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            base64_content: base64_content.into(),
            filename: filename.into(),
            checksum: checksum.into(),
        }
    }

    /// Parse envelope text, rejecting missing or malformed fields.
    ///
    /// Element order is not significant and unknown elements are skipped.
    /// The filename is kept exactly as written; surrounding whitespace is
    /// trimmed from the payload and the checksum only.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        let mut fields = Fields::default();
        let mut depth = 0usize;
        let mut has_root = false;
        let mut current: Option<Field> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if let Some(field) = current {
                        return Err(Error::Parse(format!(
                            "unexpected element inside <{}>",
                            field.tag()
                        )));
                    }
                    depth += 1;
                    match depth {
                        1 if has_root => {
                            return Err(Error::Parse("multiple root elements".to_string()))
                        }
                        1 => has_root = true,
                        2 => {
                            current = Field::from_tag(e.name().as_ref());
                            if let Some(field) = current {
                                fields.open(field)?;
                            }
                        }
                        _ => {}
                    }
                }
                Event::Empty(e) => match depth {
                    0 if has_root => {
                        return Err(Error::Parse("multiple root elements".to_string()))
                    }
                    0 => has_root = true,
                    1 => {
                        if let Some(field) = Field::from_tag(e.name().as_ref()) {
                            fields.open(field)?;
                        }
                    }
                    _ => {}
                },
                Event::End(_) => {
                    if depth == 2 {
                        current = None;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    match current {
                        Some(field) => fields.push(field, &text),
                        None if depth == 0 && !text.trim().is_empty() => {
                            return Err(Error::Parse("text outside the root element".to_string()))
                        }
                        None => {}
                    }
                }
                Event::CData(c) => {
                    if let Some(field) = current {
                        let text = String::from_utf8(c.into_inner().into_owned())
                            .map_err(|e| Error::Parse(e.to_string()))?;
                        fields.push(field, &text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !has_root {
            return Err(Error::Parse("no root element".to_string()));
        }
        if depth != 0 {
            return Err(Error::Parse("unclosed element".to_string()));
        }

        let envelope = Envelope {
            base64_content: fields.take(Field::Content)?.trim().to_string(),
            filename: fields.take(Field::Filename)?,
            checksum: fields.take(Field::Checksum)?.trim().to_string(),
        };
        envelope.validate()?;

        Ok(envelope)
    }

    fn validate(&self) -> Result<()> {
        if !is_bare_filename(&self.filename) {
            return Err(Error::Parse(format!(
                "'{}' is not a bare file name",
                self.filename
            )));
        }
        if !is_lower_hex(&self.checksum) {
            return Err(Error::Parse(format!(
                "checksum '{}' is not lowercase hex",
                self.checksum
            )));
        }
        if DigestAlgorithm::from_hex_len(self.checksum.len()).is_none() {
            return Err(Error::Parse(format!(
                "checksum has unsupported length {}",
                self.checksum.len()
            )));
        }
        Ok(())
    }

    pub fn base64_content(&self) -> &str {
        &self.base64_content
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Algorithm that produced the recorded checksum.
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        DigestAlgorithm::from_hex_len(self.checksum.len()).ok_or_else(|| {
            Error::Parse(format!(
                "checksum has unsupported length {}",
                self.checksum.len()
            ))
        })
    }

    /// Decode the base64 payload into raw bytes.
    ///
    /// Line breaks and other ASCII whitespace inserted by a transport are
    /// ignored.
    pub fn decode_content(&self) -> Result<Vec<u8>> {
        if self.base64_content.bytes().any(|b| b.is_ascii_whitespace()) {
            let compact: String = self
                .base64_content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            return Ok(STANDARD.decode(compact)?);
        }
        Ok(STANDARD.decode(&self.base64_content)?)
    }

    /// Serialize to envelope text.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = EnvelopeWriter::start(Vec::new())?;
        writer.content().write_all(self.base64_content.as_bytes())?;
        let bytes = writer.finish(&self.filename, &self.checksum)?;

        String::from_utf8(bytes).map_err(|e| Error::Parse(e.to_string()))
    }
}

/// Incremental envelope writer.
///
/// The base64 payload is streamed through [`EnvelopeWriter::content`]
/// between [`start`](EnvelopeWriter::start) and
/// [`finish`](EnvelopeWriter::finish). Only the base64 alphabet may be written
/// there since it bypasses markup escaping.
pub struct EnvelopeWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> EnvelopeWriter<W> {
    /// Write the declaration and open the root and payload elements.
    pub fn start(inner: W) -> Result<Self> {
        let mut writer = Writer::new(inner);
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
        )?;
        write_event(&mut writer, Event::Start(BytesStart::new(tags::ROOT)))?;
        write_event(&mut writer, Event::Start(BytesStart::new(tags::BASE64_FILE)))?;
        Ok(Self { writer })
    }

    /// Raw sink for the base64 payload.
    pub fn content(&mut self) -> &mut W {
        self.writer.get_mut()
    }

    /// Close the payload, write the name and checksum, close the root.
    pub fn finish(mut self, filename: &str, checksum: &str) -> Result<W> {
        write_event(&mut self.writer, Event::End(BytesEnd::new(tags::BASE64_FILE)))?;
        write_text_element(&mut self.writer, tags::FILENAME, filename)?;
        write_text_element(&mut self.writer, tags::CHECKSUM, checksum)?;
        write_event(&mut self.writer, Event::End(BytesEnd::new(tags::ROOT)))?;
        Ok(self.writer.into_inner())
    }
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new(tag)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(tag)))
}

fn write_event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(io::Error::other)?;
    Ok(())
}

/// A name usable verbatim as a single path component.
fn is_bare_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && is_xml_text(name)
}

/// Text made only of characters XML 1.0 allows in a document.
pub(crate) fn is_xml_text(text: &str) -> bool {
    text.chars().all(|c| {
        matches!(c, '\t' | '\n' | '\r')
            || ('\u{20}'..='\u{D7FF}').contains(&c)
            || ('\u{E000}'..='\u{FFFD}').contains(&c)
            || c >= '\u{10000}'
    })
}
