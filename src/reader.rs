//! The WOFF 1.0 reader.
//!
//! [`WoffReader::process`] runs these stages in order, each only if the
//! previous one succeeded:
//!
//! 1. header: decode and sanity check the 44-byte header
//! 2. table directory: decode the entries, which must be sorted by tag
//! 3. structural validation: the interval tree without padding rules. On
//!    failure the aggregate also carries the padding findings.
//! 4. spatial validation: the interval tree with padding rules
//! 5. font tables: decompress and check every table
//! 6. metadata: decompress, parse and check the metadata (never fatal)
//! 7. padding between the metadata and private data blocks
//! 8. private data
//!
//! Public state is filled in as stages complete, so after a failure the
//! accessors expose everything read up to the failing stage.

use std::io::{Read, Seek, SeekFrom};

use arrayvec::ArrayVec;
use bytes::Bytes;
use log::{debug, trace, warn};

use crate::block::Block;
use crate::decompress::Decompressor;
use crate::error::{MetadataViolation, Stage, Violation, WoffError, bail, bail_if};
use crate::metadata::document::MetadataDocument;
use crate::metadata::{MetadataOutcome, MetadataReader};
use crate::parse::Parse;
use crate::region::{Region, RegionOptions};
use crate::table_checksum;
use crate::types::{HEADER_SIZE, HeaderState, TableDirectory, TableDirectoryEntry, WoffHeader};

/// A font table as stored in the file and once decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontTable {
    pub entry: TableDirectoryEntry,
    /// `comp_length` bytes exactly as stored in the file
    pub raw: Bytes,
    /// The uncompressed table. Shares its storage with `raw` when the table is
    /// stored uncompressed.
    pub data: Bytes,
}

pub struct WoffReader<R> {
    reader: R,
    header: Option<WoffHeader>,
    header_state: Option<HeaderState>,
    table_directory: Option<TableDirectory>,
    font_tables: Vec<FontTable>,
    metadata: Option<MetadataDocument>,
    metadata_violations: Option<Vec<MetadataViolation>>,
    private_data: Option<Bytes>,
}

impl<R: Read + Seek> WoffReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: None,
            header_state: None,
            table_directory: None,
            font_tables: Vec::new(),
            metadata: None,
            metadata_violations: None,
            private_data: None,
        }
    }

    #[cfg(feature = "z")]
    /// Read and validate the whole file using the built-in zlib decompressor
    pub fn process(&mut self) -> Result<(), WoffError> {
        self.process_with_custom_z(&mut crate::decompress::decompress_z)
    }

    /// Read and validate the whole file using a custom zlib decompressor
    /// passed as a closure.
    pub fn process_with_custom_z(
        &mut self,
        decompress: &mut Decompressor<'_>,
    ) -> Result<(), WoffError> {
        self.reset();

        let header = self.read_header()?;
        let mut root = seed_tree(&header)?;

        let directory = self.read_table_directory(&header)?;
        root.add_child(tables_region(&header, &directory)?);

        debug!("validating file structure");
        if !root.validate(false).is_valid() {
            // The padding rules only add checks, so this reports the
            // structural findings together with any padding findings.
            bail!(WoffError::Violations {
                stage: Stage::Structure,
                violations: root.validate(true).into_violations(),
            });
        }
        debug!("validating padding between blocks");
        let report = root.validate(true);
        bail_if!(
            !report.is_valid(),
            WoffError::Violations {
                stage: Stage::Spatial,
                violations: report.into_violations(),
            }
        );

        self.read_font_tables(&directory, decompress)?;

        if header.has_metadata() {
            self.read_metadata(&header, decompress)?;
        }

        self.check_inter_block_padding(&header)?;

        if header.has_private_data() {
            debug!("reading private data");
            let data = read_at(&mut self.reader, header.priv_offset, header.priv_length)?;
            self.private_data = Some(Bytes::from(data));
        }

        debug!("finished reading {} tables", self.font_tables.len());
        Ok(())
    }

    pub fn header(&self) -> Option<&WoffHeader> {
        self.header.as_ref()
    }

    pub fn header_state(&self) -> Option<HeaderState> {
        self.header_state
    }

    /// Directory entries in stream order, with their padding computed
    pub fn table_directory(&self) -> Option<&TableDirectory> {
        self.table_directory.as_ref()
    }

    /// Tables in directory order
    pub fn font_tables(&self) -> &[FontTable] {
        &self.font_tables
    }

    /// The metadata document, if present and valid
    pub fn metadata(&self) -> Option<&MetadataDocument> {
        self.metadata.as_ref()
    }

    /// Everything wrong with the metadata block, if it was rejected
    pub fn metadata_violations(&self) -> Option<&[MetadataViolation]> {
        self.metadata_violations.as_deref()
    }

    pub fn private_data(&self) -> Option<&[u8]> {
        self.private_data.as_deref()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn reset(&mut self) {
        self.header = None;
        self.header_state = None;
        self.table_directory = None;
        self.font_tables.clear();
        self.metadata = None;
        self.metadata_violations = None;
        self.private_data = None;
    }

    fn read_header(&mut self) -> Result<WoffHeader, WoffError> {
        debug!("reading header");
        let bytes = read_at(&mut self.reader, 0, HEADER_SIZE)?;
        let header = WoffHeader::parse(&bytes)?;
        let state = HeaderState::from_header(&header);
        self.header = Some(header);
        self.header_state = Some(state);

        bail_if!(header.num_tables == 0, WoffError::NoTables);
        bail_if!(
            !state.metadata_is_valid,
            WoffError::IllegalMetadata {
                offset: header.meta_offset,
                length: header.meta_length,
                orig_length: header.meta_orig_length,
            }
        );
        bail_if!(
            !state.private_data_is_valid,
            WoffError::IllegalPrivateData {
                offset: header.priv_offset,
                length: header.priv_length,
            }
        );

        let actual = self.reader.seek(SeekFrom::End(0))?;
        bail_if!(
            actual != header.length as u64,
            WoffError::LengthMismatch {
                declared: header.length,
                actual,
            }
        );

        Ok(header)
    }

    fn read_table_directory(&mut self, header: &WoffHeader) -> Result<TableDirectory, WoffError> {
        debug!("reading {} table directory entries", header.num_tables);
        let bytes = read_at(&mut self.reader, HEADER_SIZE, header.table_directory_size())?;
        let mut directory = TableDirectory::parse(&bytes, header.num_tables as usize)?;

        let last_end = directory
            .iter()
            .filter_map(|entry| entry.data_end())
            .max()
            .unwrap_or(0);
        directory.assign_padding(last_end < header.length);

        self.table_directory = Some(directory.clone());
        Ok(directory)
    }

    fn read_font_tables(
        &mut self,
        directory: &TableDirectory,
        decompress: &mut Decompressor<'_>,
    ) -> Result<(), WoffError> {
        let mut violations = Vec::new();

        for entry in directory.iter() {
            trace!(
                "table {}: offset {}, {} -> {} bytes",
                entry.tag, entry.offset, entry.comp_length, entry.orig_length
            );
            let raw = Bytes::from(read_at(&mut self.reader, entry.offset, entry.comp_length)?);

            let data = if entry.is_compressed() {
                let data = decompress(&raw, entry.orig_length as usize).map_err(|err| {
                    WoffError::Uncompress {
                        tag: entry.tag,
                        message: err.to_string(),
                    }
                })?;
                bail_if!(
                    data.len() != entry.orig_length as usize,
                    WoffError::TableLengthMismatch {
                        tag: entry.tag,
                        expected: entry.orig_length,
                        actual: data.len(),
                    }
                );
                Bytes::from(data)
            } else {
                raw.clone()
            };

            if entry.comp_length > entry.orig_length {
                violations.push(Violation::CompressedLargerThanOriginal {
                    tag: entry.tag,
                    comp_length: entry.comp_length,
                    orig_length: entry.orig_length,
                });
            } else {
                let actual = table_checksum(entry.tag, &data);
                if actual != entry.orig_checksum {
                    violations.push(Violation::ChecksumMismatch {
                        tag: entry.tag,
                        expected: entry.orig_checksum,
                        actual,
                    });
                }
            }

            if entry.padding > 0 {
                let padding_offset = entry.offset + entry.comp_length;
                let padding = read_at(&mut self.reader, padding_offset, entry.padding)?;
                if padding.iter().any(|&byte| byte != 0) {
                    violations.push(Violation::NonZeroTablePadding { tag: entry.tag });
                }
            }

            self.font_tables.push(FontTable {
                entry: *entry,
                raw,
                data,
            });
        }

        bail_if!(
            !violations.is_empty(),
            WoffError::Violations {
                stage: Stage::FontTables,
                violations,
            }
        );
        Ok(())
    }

    fn read_metadata(
        &mut self,
        header: &WoffHeader,
        decompress: &mut Decompressor<'_>,
    ) -> Result<(), WoffError> {
        debug!("reading metadata");
        let bytes = read_at(&mut self.reader, header.meta_offset, header.meta_length)?;
        match MetadataReader::new(&bytes, header).process(decompress) {
            MetadataOutcome::Document(document) => self.metadata = Some(document),
            MetadataOutcome::Violations(violations) => {
                warn!("metadata rejected with {} violation(s)", violations.len());
                self.metadata_violations = Some(violations);
            }
        }
        Ok(())
    }

    /// The bytes between the metadata and private data blocks must all be zero.
    fn check_inter_block_padding(&mut self, header: &WoffHeader) -> Result<(), WoffError> {
        let blocks: ArrayVec<Block, 2> = header.optional_blocks()?;
        let [first, second] = blocks.as_slice() else {
            return Ok(());
        };
        if second.start() <= first.end() {
            return Ok(());
        }

        let padding = read_at(
            &mut self.reader,
            first.end(),
            second.start() - first.end(),
        )?;
        if padding.iter().any(|&byte| byte != 0) {
            bail!(WoffError::InvalidNullPadding {
                first: *first,
                second: *second,
            });
        }
        Ok(())
    }
}

/// Root of the interval tree: the whole file, holding the header, the table
/// directory and whichever optional blocks the header declares.
fn seed_tree(header: &WoffHeader) -> Result<Region, WoffError> {
    let mut root = Region::new(Block::new(0, header.length)?, RegionOptions::WOFF);
    root.add_child(Block::new(0, HEADER_SIZE)?);
    root.add_range(header.optional_blocks()?);
    root.add_child(Block::from_start_and_distance(
        HEADER_SIZE,
        header.table_directory_size(),
    )?);
    Ok(root)
}

/// A region holding one block per font table (data plus padding).
///
/// It starts right after the table directory and ends at the end of the last
/// table, or at the start of the next optional block if one follows. When no
/// table ends past the directory the region still covers at least one byte,
/// so misplaced tables are reported against it.
fn tables_region(header: &WoffHeader, directory: &TableDirectory) -> Result<Region, WoffError> {
    let blocks = directory
        .iter()
        .map(|entry| entry.block())
        .collect::<Result<Vec<Block>, WoffError>>()?;

    let start = HEADER_SIZE + directory.size();
    let last_end = blocks.iter().map(Block::end).max().unwrap_or(start);
    let optional_starts: ArrayVec<u32, 2> =
        header.optional_blocks()?.iter().map(Block::start).collect();
    let next_optional = |from: u32| optional_starts.iter().copied().find(|&offset| offset >= from);
    let end = if last_end > start {
        next_optional(last_end).unwrap_or(last_end)
    } else {
        next_optional(start).unwrap_or(header.length)
    };
    let end = end.max(start + 1);

    let mut region = Region::new(Block::new(start, end)?, RegionOptions::WOFF);
    region.add_range(blocks);
    Ok(region)
}

/// Read exactly `length` bytes at `offset`.
fn read_at<R: Read + Seek>(reader: &mut R, offset: u32, length: u32) -> Result<Vec<u8>, WoffError> {
    reader.seek(SeekFrom::Start(offset as u64))?;
    let mut bytes = Vec::with_capacity(length as usize);
    reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
    bail_if!(
        bytes.len() != length as usize,
        WoffError::UnexpectedEof {
            requested: length as usize,
            available: bytes.len(),
        }
    );
    Ok(bytes)
}
