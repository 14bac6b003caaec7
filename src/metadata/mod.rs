//! The extended metadata block.
//!
//! Problems with metadata never abort a parse: a font with broken metadata
//! still yields its tables. [`MetadataReader::process`] therefore returns
//! either a document or the list of problems, never an error.

pub mod document;
pub mod schema;

use log::debug;

use crate::decompress::Decompressor;
use crate::error::MetadataViolation;
use crate::types::WoffHeader;
use document::MetadataDocument;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Either the parsed metadata or everything that is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    Document(MetadataDocument),
    Violations(Vec<MetadataViolation>),
}

pub struct MetadataReader<'a> {
    bytes: &'a [u8],
    header: &'a WoffHeader,
}

impl<'a> MetadataReader<'a> {
    /// `bytes` is the compressed metadata block as stored in the file.
    pub fn new(bytes: &'a [u8], header: &'a WoffHeader) -> Self {
        Self { bytes, header }
    }

    pub fn process(&self, decompress: &mut Decompressor<'_>) -> MetadataOutcome {
        let stated = self.header.meta_orig_length;
        let xml = match decompress(self.bytes, stated as usize) {
            Ok(xml) => xml,
            Err(err) => {
                return MetadataOutcome::Violations(vec![MetadataViolation::Uncompress(
                    err.to_string(),
                )]);
            }
        };
        debug!("metadata: {} bytes compressed, {} uncompressed", self.bytes.len(), xml.len());

        // Nothing after a length mismatch can be trusted
        if xml.len() != stated as usize {
            return MetadataOutcome::Violations(vec![MetadataViolation::InvalidRange {
                stated,
                actual: u32::try_from(xml.len()).unwrap_or(u32::MAX),
            }]);
        }

        let text = match decode_utf8(&xml) {
            Ok(text) => text,
            Err(violation) => return MetadataOutcome::Violations(vec![violation]),
        };
        let document = match MetadataDocument::parse(text) {
            Ok(document) => document,
            Err(violation) => return MetadataOutcome::Violations(vec![violation]),
        };

        let mut violations = Vec::new();
        if let Some(encoding) = document.encoding() {
            if !encoding.eq_ignore_ascii_case("utf-8") {
                violations.push(MetadataViolation::EncodingNotSupported(format!(
                    "declared encoding {encoding:?}, metadata must be UTF-8"
                )));
            }
        }
        violations.extend(schema::validate(&document));

        if violations.is_empty() {
            MetadataOutcome::Document(document)
        } else {
            MetadataOutcome::Violations(violations)
        }
    }
}

/// Metadata must be UTF-8. A UTF-8 byte order mark is tolerated; any other
/// byte order mark means the document uses another encoding.
fn decode_utf8(xml: &[u8]) -> Result<&str, MetadataViolation> {
    let bom = match xml {
        [0x00, 0x00, 0xFE, 0xFF, ..] | [0xFF, 0xFE, 0x00, 0x00, ..] => Some("UTF-32"),
        [0xFE, 0xFF, ..] | [0xFF, 0xFE, ..] => Some("UTF-16"),
        _ => None,
    };
    if let Some(encoding) = bom {
        return Err(MetadataViolation::EncodingNotSupported(format!(
            "found {encoding} byte order mark, metadata must be UTF-8"
        )));
    }

    let xml = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
    std::str::from_utf8(xml).map_err(|err| {
        MetadataViolation::EncodingNotSupported(format!("metadata is not valid UTF-8: {err}"))
    })
}
