use std::ops::Deref;

use arrayvec::ArrayVec;
use font_types::Tag;

use crate::block::{Block, next_byte_padding};
use crate::buffer::Buffer;
use crate::error::{WoffError, bail, bail_if};
use crate::parse::Parse;

/// `wOFF`
pub const WOFF_SIGNATURE: u32 = 0x774F4646;

/// Size of the WOFF header in bytes
pub const HEADER_SIZE: u32 = 44;

/// Size of one table directory entry in bytes
pub const TABLE_DIRECTORY_ENTRY_SIZE: u32 = 20;

/// Byte offsets of the header fields
mod header_field {
    pub const SIGNATURE: usize = 0;
    pub const FLAVOR: usize = 4;
    pub const LENGTH: usize = 8;
    pub const NUM_TABLES: usize = 12;
    pub const RESERVED: usize = 14;
    pub const TOTAL_SFNT_SIZE: usize = 16;
    pub const MAJOR_VERSION: usize = 20;
    pub const MINOR_VERSION: usize = 22;
    pub const META_OFFSET: usize = 24;
    pub const META_LENGTH: usize = 28;
    pub const META_ORIG_LENGTH: usize = 32;
    pub const PRIV_OFFSET: usize = 36;
    pub const PRIV_LENGTH: usize = 40;
}

/// Byte offsets of the table directory entry fields
mod directory_field {
    pub const TAG: usize = 0;
    pub const OFFSET: usize = 4;
    pub const COMP_LENGTH: usize = 8;
    pub const ORIG_LENGTH: usize = 12;
    pub const ORIG_CHECKSUM: usize = 16;
}

/// WOFF 1.0 header
///
/// <https://www.w3.org/TR/WOFF/#WOFFHeader>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WoffHeader {
    /// 0x774F4646 `wOFF`
    pub signature: u32,
    /// The "sfnt version" of the input font.
    pub flavor: Tag,
    /// Total size of the WOFF file.
    pub length: u32,
    /// Number of entries in directory of font tables.
    pub num_tables: u16,
    /// Reserved; set to 0.
    pub reserved: u16,
    /// Total size needed for the uncompressed font data, including the sfnt header, directory, and font tables (including padding).
    pub total_sfnt_size: u32,
    /// Major version of the WOFF file.
    pub major_version: u16,
    /// Minor version of the WOFF file.
    pub minor_version: u16,
    /// Offset to metadata block, from beginning of WOFF file.
    pub meta_offset: u32,
    /// Length of compressed metadata block.
    pub meta_length: u32,
    /// Uncompressed size of metadata block.
    pub meta_orig_length: u32,
    /// Offset to private data block, from beginning of WOFF file.
    pub priv_offset: u32,
    /// Length of private data block.
    pub priv_length: u32,
}

impl Parse for WoffHeader {
    const SIZE: usize = HEADER_SIZE as usize;

    /// Decode the header, failing on a bad signature, a non-zero reserved
    /// field or a total sfnt size that is not a multiple of four. Nothing
    /// after a malformed header can be trusted, so these are always fatal.
    fn parse(input: &[u8]) -> Result<Self, WoffError> {
        Self::check_size(input)?;
        let mut input = Buffer::new(input);

        let signature = input.u32_at(header_field::SIGNATURE)?;
        bail_if!(
            signature != WOFF_SIGNATURE,
            WoffError::InvalidMagicNumber(signature)
        );

        let reserved = input.u16_at(header_field::RESERVED)?;
        bail_if!(reserved != 0, WoffError::InvalidReservedValue(reserved));

        let total_sfnt_size = input.u32_at(header_field::TOTAL_SFNT_SIZE)?;
        bail_if!(
            total_sfnt_size % 4 != 0,
            WoffError::InvalidTotalSfntSize(total_sfnt_size)
        );

        Ok(Self {
            signature,
            flavor: Tag::from_u32(input.u32_at(header_field::FLAVOR)?),
            length: input.u32_at(header_field::LENGTH)?,
            num_tables: input.u16_at(header_field::NUM_TABLES)?,
            reserved,
            total_sfnt_size,
            major_version: input.u16_at(header_field::MAJOR_VERSION)?,
            minor_version: input.u16_at(header_field::MINOR_VERSION)?,
            meta_offset: input.u32_at(header_field::META_OFFSET)?,
            meta_length: input.u32_at(header_field::META_LENGTH)?,
            meta_orig_length: input.u32_at(header_field::META_ORIG_LENGTH)?,
            priv_offset: input.u32_at(header_field::PRIV_OFFSET)?,
            priv_length: input.u32_at(header_field::PRIV_LENGTH)?,
        })
    }
}

impl WoffHeader {
    /// Offset and length must be both zero or both set, and a metadata block
    /// must declare its uncompressed size.
    pub fn has_illegal_metadata(&self) -> bool {
        (self.meta_offset == 0) != (self.meta_length == 0)
            || (self.meta_offset != 0 && self.meta_orig_length == 0)
    }

    pub fn has_illegal_private_data(&self) -> bool {
        (self.priv_offset == 0) != (self.priv_length == 0)
    }

    pub fn has_metadata(&self) -> bool {
        !self.has_illegal_metadata() && self.meta_offset > 0
    }

    pub fn has_private_data(&self) -> bool {
        !self.has_illegal_private_data() && self.priv_offset > 0
    }

    /// Size of the table directory in bytes
    pub fn table_directory_size(&self) -> u32 {
        self.num_tables as u32 * TABLE_DIRECTORY_ENTRY_SIZE
    }

    pub fn metadata_block(&self) -> Result<Option<Block>, WoffError> {
        if !self.has_metadata() {
            return Ok(None);
        }
        Block::from_start_and_distance(self.meta_offset, self.meta_length).map(Some)
    }

    pub fn private_data_block(&self) -> Result<Option<Block>, WoffError> {
        if !self.has_private_data() {
            return Ok(None);
        }
        Block::from_start_and_distance(self.priv_offset, self.priv_length).map(Some)
    }

    /// The declared metadata and private data blocks, in file order.
    pub fn optional_blocks(&self) -> Result<ArrayVec<Block, 2>, WoffError> {
        let mut blocks = ArrayVec::new();
        blocks.extend(self.metadata_block()?);
        blocks.extend(self.private_data_block()?);
        blocks.sort_unstable();
        Ok(blocks)
    }
}

/// Whether the optional blocks declared by a header are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderState {
    pub metadata_is_valid: bool,
    pub private_data_is_valid: bool,
}

impl HeaderState {
    pub fn from_header(header: &WoffHeader) -> Self {
        Self {
            metadata_is_valid: !header.has_illegal_metadata(),
            private_data_is_valid: !header.has_illegal_private_data(),
        }
    }
}

/// <https://www.w3.org/TR/WOFF/#TableDirectory>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableDirectoryEntry {
    pub tag: Tag,
    /// Offset of the table data from the start of the WOFF file
    pub offset: u32,
    /// Length of the (possibly compressed) table data in the WOFF file
    pub comp_length: u32,
    /// Length of the uncompressed table, excluding padding
    pub orig_length: u32,
    /// Checksum of the uncompressed table
    pub orig_checksum: u32,
    /// Zero bytes expected after the table data. Computed, not read.
    pub padding: u32,
}

impl Parse for TableDirectoryEntry {
    const SIZE: usize = TABLE_DIRECTORY_ENTRY_SIZE as usize;

    fn parse(input: &[u8]) -> Result<Self, WoffError> {
        Self::check_size(input)?;
        let mut input = Buffer::new(input);
        Ok(Self {
            tag: Tag::from_u32(input.u32_at(directory_field::TAG)?),
            offset: input.u32_at(directory_field::OFFSET)?,
            comp_length: input.u32_at(directory_field::COMP_LENGTH)?,
            orig_length: input.u32_at(directory_field::ORIG_LENGTH)?,
            orig_checksum: input.u32_at(directory_field::ORIG_CHECKSUM)?,
            padding: 0,
        })
    }
}

impl TableDirectoryEntry {
    /// Table data is zlib compressed iff it is shorter than the original
    pub fn is_compressed(&self) -> bool {
        self.comp_length < self.orig_length
    }

    /// End of the table data, excluding padding
    pub fn data_end(&self) -> Option<u32> {
        self.offset.checked_add(self.comp_length)
    }

    /// The bytes covered by the table data and its padding.
    ///
    /// Fails for an empty table or one that ends beyond `u32::MAX`.
    pub fn block(&self) -> Result<Block, WoffError> {
        let block = self
            .comp_length
            .checked_add(self.padding)
            .and_then(|distance| Block::from_start_and_distance(self.offset, distance).ok());
        let Some(block) = block else {
            bail!(WoffError::InvalidTableBlock {
                tag: self.tag,
                offset: self.offset,
                comp_length: self.comp_length,
            });
        };
        Ok(block)
    }
}

/// The table directory, in stream order (strictly ascending by tag)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDirectory {
    tables: Vec<TableDirectoryEntry>,
}

impl Deref for TableDirectory {
    type Target = [TableDirectoryEntry];
    fn deref(&self) -> &Self::Target {
        &self.tables
    }
}

impl TableDirectory {
    /// Decode `num_tables` consecutive entries.
    ///
    /// Entries must be sorted by tag in ascending order with no duplicates;
    /// anything else is a fatal format error.
    pub fn parse(input: &[u8], num_tables: usize) -> Result<Self, WoffError> {
        let mut tables: Vec<TableDirectoryEntry> = Vec::with_capacity(num_tables);
        for idx in 0..num_tables {
            let start = idx * TableDirectoryEntry::SIZE;
            let entry = TableDirectoryEntry::parse(input.get(start..).unwrap_or_default())?;
            if let Some(previous) = tables.last() {
                bail_if!(
                    previous.tag >= entry.tag,
                    WoffError::TableDirectoryNotSorted {
                        previous: previous.tag,
                        current: entry.tag,
                    }
                );
            }
            tables.push(entry);
        }
        Ok(Self { tables })
    }

    /// Size of the table directory (in the WOFF) in bytes
    pub fn size(&self) -> u32 {
        self.tables.len() as u32 * TABLE_DIRECTORY_ENTRY_SIZE
    }

    /// Indices of the entries, ordered by where their data lives in the file
    pub fn indices_by_offset(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.tables.len()).collect();
        indices.sort_by_key(|&idx| self.tables[idx].offset);
        indices
    }

    /// Derive the padding that must follow each table.
    ///
    /// Every table but the last (in file order) is padded to a 4-byte
    /// boundary. The last one is padded only when more data follows it.
    pub fn assign_padding(&mut self, data_follows_last: bool) {
        let indices = self.indices_by_offset();
        let last = indices.len().saturating_sub(1);
        for (position, idx) in indices.into_iter().enumerate() {
            let entry = &mut self.tables[idx];
            entry.padding = match entry.data_end() {
                Some(end) if position != last || data_follows_last => next_byte_padding(end, 4),
                _ => 0,
            };
        }
    }
}
