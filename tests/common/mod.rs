//! Builds WOFF files in memory. Every file is valid as built; tests corrupt
//! individual fields afterwards with [`set_u16`] and [`set_u32`].

#![allow(dead_code)]

use std::io::Write as _;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use font_types::Tag;

pub const HEADER_SIZE: usize = 44;
pub const ENTRY_SIZE: usize = 20;

/// Header field offsets
pub mod header {
    pub const SIGNATURE: usize = 0;
    pub const LENGTH: usize = 8;
    pub const NUM_TABLES: usize = 12;
    pub const RESERVED: usize = 14;
    pub const TOTAL_SFNT_SIZE: usize = 16;
    pub const META_OFFSET: usize = 24;
    pub const META_LENGTH: usize = 28;
    pub const META_ORIG_LENGTH: usize = 32;
    pub const PRIV_OFFSET: usize = 36;
    pub const PRIV_LENGTH: usize = 40;
}

/// Offset of a field of the `idx`th table directory entry
pub mod entry {
    pub const OFFSET: usize = 4;
    pub const COMP_LENGTH: usize = 8;
    pub const ORIG_LENGTH: usize = 12;
    pub const ORIG_CHECKSUM: usize = 16;

    pub fn field(idx: usize, field: usize) -> usize {
        super::HEADER_SIZE + idx * super::ENTRY_SIZE + field
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn set_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn set_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub fn get_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn pad4(len: usize) -> usize {
    (4 - len % 4) % 4
}

struct TableSource {
    tag: Tag,
    data: Vec<u8>,
    compress: bool,
}

/// Tables are written in the order they are added, both in the directory
/// and in the data area.
#[derive(Default)]
pub struct WoffBuilder {
    tables: Vec<TableSource>,
    table_gap: usize,
    metadata: Option<Vec<u8>>,
    private_data: Option<Vec<u8>>,
}

impl WoffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, tag: &[u8; 4], data: &[u8]) -> Self {
        self.tables.push(TableSource {
            tag: Tag::new(tag),
            data: data.to_vec(),
            compress: false,
        });
        self
    }

    /// Stored zlib compressed if that makes it smaller
    pub fn compressed_table(mut self, tag: &[u8; 4], data: &[u8]) -> Self {
        self.tables.push(TableSource {
            tag: Tag::new(tag),
            data: data.to_vec(),
            compress: true,
        });
        self
    }

    /// Zero bytes inserted between consecutive tables, beyond their padding
    pub fn table_gap(mut self, gap: usize) -> Self {
        self.table_gap = gap;
        self
    }

    pub fn metadata(mut self, xml: &str) -> Self {
        self.metadata = Some(xml.as_bytes().to_vec());
        self
    }

    pub fn private_data(mut self, data: &[u8]) -> Self {
        self.private_data = Some(data.to_vec());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let num_tables = self.tables.len();
        let mut directory = Vec::with_capacity(num_tables * ENTRY_SIZE);
        let mut data = Vec::new();
        let mut offset = HEADER_SIZE + num_tables * ENTRY_SIZE;
        let mut total_sfnt_size = 12 + 16 * num_tables;

        for (idx, table) in self.tables.iter().enumerate() {
            let stored = match table.compress {
                true => Some(zlib(&table.data)).filter(|z| z.len() < table.data.len()),
                false => None,
            }
            .unwrap_or_else(|| table.data.clone());

            directory.extend_from_slice(&table.tag.to_be_bytes());
            directory.extend_from_slice(&(offset as u32).to_be_bytes());
            directory.extend_from_slice(&(stored.len() as u32).to_be_bytes());
            directory.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
            let checksum = woffcheck::table_checksum(table.tag, &table.data);
            directory.extend_from_slice(&checksum.to_be_bytes());
            total_sfnt_size += table.data.len() + pad4(table.data.len());

            data.extend_from_slice(&stored);
            offset += stored.len();
            let is_last = idx + 1 == num_tables;
            if !is_last || self.metadata.is_some() || self.private_data.is_some() {
                let padding = pad4(stored.len());
                data.resize(data.len() + padding, 0);
                offset += padding;
            }
            if !is_last {
                data.resize(data.len() + self.table_gap, 0);
                offset += self.table_gap;
            }
        }

        let (mut meta_offset, mut meta_length, mut meta_orig_length) = (0, 0, 0);
        if let Some(xml) = &self.metadata {
            let stored = zlib(xml);
            meta_offset = offset;
            meta_length = stored.len();
            meta_orig_length = xml.len();
            data.extend_from_slice(&stored);
            offset += stored.len();
            if self.private_data.is_some() {
                let padding = pad4(stored.len());
                data.resize(data.len() + padding, 0);
                offset += padding;
            }
        }

        let (mut priv_offset, mut priv_length) = (0, 0);
        if let Some(private) = &self.private_data {
            priv_offset = offset;
            priv_length = private.len();
            data.extend_from_slice(private);
            offset += private.len();
        }

        let mut bytes = Vec::with_capacity(offset);
        bytes.extend_from_slice(b"wOFF");
        bytes.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // flavor
        bytes.extend_from_slice(&(offset as u32).to_be_bytes()); // length
        bytes.extend_from_slice(&(num_tables as u16).to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // reserved
        bytes.extend_from_slice(&(total_sfnt_size as u32).to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
        bytes.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
        for value in [
            meta_offset,
            meta_length,
            meta_orig_length,
            priv_offset,
            priv_length,
        ] {
            bytes.extend_from_slice(&(value as u32).to_be_bytes());
        }
        bytes.extend_from_slice(&directory);
        bytes.extend_from_slice(&data);
        assert_eq!(bytes.len(), offset);
        bytes
    }
}
