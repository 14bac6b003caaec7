//! Pure Rust WOFF 1.0 reader that proves the byte layout of a file is
//! internally consistent.
//!
//! Every block of a WOFF file (header, table directory, font tables, metadata
//! and private data) is placed into a tree of byte intervals which is checked
//! for overlaps, alignment and padding before any table is decompressed. Fatal
//! problems abort the parse with a [`WoffError`]; lesser findings are
//! collected per stage and reported together.
//!
//! ```no_run
//! # fn main() -> Result<(), woffcheck::WoffError> {
//! let file = std::fs::File::open("font.woff")?;
//! let mut reader = woffcheck::WoffReader::new(std::io::BufReader::new(file));
//! reader.process()?;
//! for table in reader.font_tables() {
//!     println!("{}: {} bytes", table.entry.tag, table.data.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod buffer;
mod decompress;
pub mod error;
pub mod metadata;
pub mod parse;
pub mod reader;
pub mod region;
pub mod types;

use font_types::Tag;

pub use block::{Block, next_byte_padding};
#[cfg(feature = "z")]
pub use decompress::decompress_z;
pub use decompress::Decompressor;
pub use error::{MetadataViolation, Stage, Violation, WoffError};
pub use metadata::{MetadataOutcome, MetadataReader};
pub use metadata::document::MetadataDocument;
pub use parse::Parse;
pub use reader::{FontTable, WoffReader};
pub use region::{Node, Region, RegionOptions, ValidationReport};
pub use types::{HeaderState, TableDirectory, TableDirectoryEntry, WoffHeader};

const HEAD: Tag = Tag::new(b"head");

/// Byte offset of `checkSumAdjustment` within the `head` table
const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// Compute the sfnt checksum of `buf`: the wrapping sum of its big-endian
/// `u32` words, with a trailing partial word padded with zeroes.
pub fn compute_checksum(buf: &[u8]) -> u32 {
    let mut checksum: u32 = 0;
    let mut iter = buf.chunks_exact(4);
    for chunk in &mut iter {
        checksum = checksum.wrapping_add(u32::from_be_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3],
        ]));
    }

    let remainder = iter.remainder();
    if !remainder.is_empty() {
        let mut last = [0u8; 4];
        last[..remainder.len()].copy_from_slice(remainder);
        checksum = checksum.wrapping_add(u32::from_be_bytes(last));
    }

    checksum
}

/// Checksum of a font table as stored in the table directory.
///
/// The `head` table is summed with its `checkSumAdjustment` field taken as zero.
pub fn table_checksum(tag: Tag, data: &[u8]) -> u32 {
    let checksum = compute_checksum(data);
    if tag != HEAD {
        return checksum;
    }
    match data.get(CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4) {
        Some(&[a, b, c, d]) => checksum.wrapping_sub(u32::from_be_bytes([a, b, c, d])),
        _ => checksum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_words() {
        assert_eq!(compute_checksum(&[]), 0);
        assert_eq!(compute_checksum(&[0, 0, 0, 1, 0, 0, 0, 2]), 3);
        assert_eq!(compute_checksum(&[0xFF; 8]), 0xFFFF_FFFE);
    }

    #[test]
    fn checksum_pads_trailing_bytes() {
        assert_eq!(compute_checksum(&[1]), 0x0100_0000);
        assert_eq!(compute_checksum(&[0, 0, 0, 1, 1, 2, 3]), 0x0102_0301);
    }

    #[test]
    fn head_checksum_ignores_adjustment() {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        let expected = table_checksum(HEAD, &head);
        head[8..12].copy_from_slice(&0x1234_5678u32.to_be_bytes());
        assert_eq!(table_checksum(HEAD, &head), expected);
        assert_ne!(table_checksum(Tag::new(b"maxp"), &head), expected);
    }
}
