use std::fmt;

use font_types::Tag;
use thiserror::Error;

use crate::block::Block;

/// The stage of [`WoffReader::process`](crate::WoffReader::process) that
/// produced an aggregate of [`Violation`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Interval tree validated without padding rules
    Structure,
    /// Interval tree validated with padding rules
    Spatial,
    /// Decompression and consistency checks of every font table
    FontTables,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Structure => "structural validation",
            Stage::Spatial => "spatial validation",
            Stage::FontTables => "font table validation",
        })
    }
}

/// A non-fatal finding. Findings are collected across a whole stage and
/// reported together in [`WoffError::Violations`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("block {block} starts beyond the end of its container {container}")]
    StartsBeyondContainer { block: Block, container: Block },
    #[error("block {block} starts before its container {container}")]
    StartsBeforeContainer { block: Block, container: Block },
    #[error("block {first} overlaps {second}")]
    Overlapping { first: Block, second: Block },
    #[error("block {block} does not start on a {boundary} byte boundary")]
    NotOnBoundary { block: Block, boundary: u32 },
    #[error("{padding} bytes of padding after block {block} exceed the maximum of {max_padding}")]
    MaxPaddingExceeded {
        block: Block,
        padding: i64,
        max_padding: u32,
    },
    #[error("{padding} bytes of padding before the first child of {container} exceed the maximum of {max_padding}")]
    LeadingPaddingExceeded {
        container: Block,
        padding: i64,
        max_padding: u32,
    },
    #[error("table {tag} is stored in {comp_length} bytes but is only {orig_length} bytes long")]
    CompressedLargerThanOriginal {
        tag: Tag,
        comp_length: u32,
        orig_length: u32,
    },
    #[error("padding after table {tag} contains non-zero bytes")]
    NonZeroTablePadding { tag: Tag },
    #[error("table {tag} has checksum {actual:#010x}, directory states {expected:#010x}")]
    ChecksumMismatch { tag: Tag, expected: u32, actual: u32 },
}

/// A finding about the extended metadata block.
///
/// These never abort a parse; they are exposed through
/// [`WoffReader::metadata_violations`](crate::WoffReader::metadata_violations).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataViolation {
    #[error("cannot uncompress metadata: {0}")]
    Uncompress(String),
    #[error("metadata is {actual} bytes long once uncompressed, header states {stated}")]
    InvalidRange { stated: u32, actual: u32 },
    #[error("metadata encoding is not supported: {0}")]
    EncodingNotSupported(String),
    #[error("metadata is not well-formed XML: {0}")]
    MalformedXml(String),
    #[error("invalid metadata element <{element}>: {reason}")]
    InvalidElement { element: String, reason: String },
}

/// A fatal error. The stage that raised it aborted and no later stage ran.
#[derive(Debug, Error)]
pub enum WoffError {
    #[error("unexpected end of data: needed {requested} bytes, {available} available")]
    UnexpectedEof { requested: usize, available: usize },
    #[error("stream is {actual} bytes long but the header states {declared}")]
    LengthMismatch { declared: u32, actual: u64 },
    #[error("signature {0:#010x} is not the WOFF magic number")]
    InvalidMagicNumber(u32),
    #[error("reserved header field must be zero, found {0}")]
    InvalidReservedValue(u16),
    #[error("total sfnt size {0} is not a multiple of four")]
    InvalidTotalSfntSize(u32),
    #[error("header declares zero font tables")]
    NoTables,
    #[error("metadata offset {offset}, length {length} and original length {orig_length} are inconsistent")]
    IllegalMetadata {
        offset: u32,
        length: u32,
        orig_length: u32,
    },
    #[error("private data offset {offset} and length {length} are inconsistent")]
    IllegalPrivateData { offset: u32, length: u32 },
    #[error("table directory is not sorted: {current} follows {previous}")]
    TableDirectoryNotSorted { previous: Tag, current: Tag },
    #[error("invalid block: start {start} must be less than end {end}")]
    InvalidBlock { start: u64, end: u64 },
    #[error("table {tag} at offset {offset} with stored length {comp_length} does not cover a byte range")]
    InvalidTableBlock {
        tag: Tag,
        offset: u32,
        comp_length: u32,
    },
    #[error("{} violation(s) found during {stage}", .violations.len())]
    Violations {
        stage: Stage,
        violations: Vec<Violation>,
    },
    #[error("cannot uncompress table {tag}: {message}")]
    Uncompress { tag: Tag, message: String },
    #[error("table {tag} is {actual} bytes long once uncompressed, directory states {expected}")]
    TableLengthMismatch { tag: Tag, expected: u32, actual: usize },
    #[error("padding between {first} and {second} contains non-zero bytes")]
    InvalidNullPadding { first: Block, second: Block },
    #[error(transparent)]
    Io(std::io::Error),
}

impl WoffError {
    /// The collected findings if this is an aggregate, otherwise an empty slice.
    pub fn violations(&self) -> &[Violation] {
        match self {
            WoffError::Violations { violations, .. } => violations,
            _ => &[],
        }
    }
}

impl From<bytes::TryGetError> for WoffError {
    fn from(value: bytes::TryGetError) -> Self {
        Self::UnexpectedEof {
            requested: value.requested,
            available: value.available,
        }
    }
}

impl From<std::io::Error> for WoffError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            // read_exact does not report how much it got
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof {
                requested: 0,
                available: 0,
            },
            _ => Self::Io(value),
        }
    }
}

#[cfg(not(feature = "debug"))]
mod regular {
    macro_rules! bail {
        ($err: expr) => {
            return Err($err.into())
        };
    }
    pub(crate) use bail;

    macro_rules! bail_if {
        ($cond: expr, $err: expr) => {
            if $cond {
                return Err($err.into());
            }
        };
    }
    pub(crate) use bail_if;
}
#[cfg(not(feature = "debug"))]
pub(crate) use regular::*;

#[cfg(feature = "debug")]
mod debug {
    macro_rules! bail {
        ($err: expr) => {
            panic!("{}", $err)
        };
    }
    pub(crate) use bail;

    macro_rules! bail_if {
        ($cond: expr, $err: expr) => {
            if $cond {
                panic!("{}: {}", stringify!($cond), $err)
            }
        };
    }
    pub(crate) use bail_if;
}
#[cfg(feature = "debug")]
pub(crate) use debug::*;
