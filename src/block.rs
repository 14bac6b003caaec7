//! Half-open byte intervals and the arithmetic used to lay them out.

use std::fmt;

use crate::error::{WoffError, bail_if};

/// An immutable, non-empty byte interval `[start, end)` within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block {
    start: u32,
    end: u32,
}

impl Block {
    pub fn new(start: u32, end: u32) -> Result<Self, WoffError> {
        bail_if!(
            start >= end,
            WoffError::InvalidBlock {
                start: start as u64,
                end: end as u64,
            }
        );
        Ok(Self { start, end })
    }

    /// Create the block `[start, start + distance)`.
    ///
    /// Fails when `distance` is zero or the end does not fit in a `u32`.
    pub fn from_start_and_distance(start: u32, distance: u32) -> Result<Self, WoffError> {
        let Some(end) = start.checked_add(distance) else {
            return Err(WoffError::InvalidBlock {
                start: start as u64,
                end: start as u64 + distance as u64,
            });
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Whether the two blocks share at least one byte.
    ///
    /// Blocks that only touch (`self.end == other.start`) do not overlap.
    pub fn is_overlapping(&self, other: &Block) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Number of bytes needed to advance `position` to the next multiple of
/// `boundary`. Zero when `position` is already aligned, and always less than
/// `boundary`. A zero `boundary` imposes no alignment.
pub fn next_byte_padding(position: u32, boundary: u32) -> u32 {
    match position.checked_rem(boundary) {
        Some(0) | None => 0,
        Some(rem) => boundary - rem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start: u32, end: u32) -> Block {
        Block::new(start, end).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_blocks() {
        assert!(Block::new(10, 10).is_err());
        assert!(Block::new(11, 10).is_err());
        assert!(Block::new(10, 11).is_ok());
    }

    #[test]
    fn from_start_and_distance() {
        for (start, distance) in [(0, 2), (10, 2), (4, 1), (u32::MAX - 5, 5)] {
            let b = Block::from_start_and_distance(start, distance).unwrap();
            assert_eq!(b, block(start, start + distance));
            assert_eq!(b.end() - b.start(), distance);
        }
        assert!(Block::from_start_and_distance(10, 0).is_err());
        assert!(matches!(
            Block::from_start_and_distance(u32::MAX, 2),
            Err(WoffError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn overlapping() {
        let main = block(40, 100);
        // inside, right, outside
        assert!(main.is_overlapping(&block(50, 80)));
        assert!(main.is_overlapping(&block(80, 120)));
        assert!(block(80, 100).is_overlapping(&block(0, 120)));
        // left
        assert!(block(80, 120).is_overlapping(&main));
        // same start or identical
        assert!(main.is_overlapping(&block(40, 60)));
        assert!(main.is_overlapping(&main));
    }

    #[test]
    fn touching_blocks_do_not_overlap() {
        assert!(!block(40, 100).is_overlapping(&block(100, 120)));
        assert!(!block(0, 40).is_overlapping(&block(40, 120)));
        assert!(!block(80, 120).is_overlapping(&block(0, 40)));
        assert!(!block(0, 40).is_overlapping(&block(80, 120)));
    }

    #[test]
    fn overlapping_is_symmetric() {
        let blocks = [
            block(0, 4),
            block(0, 44),
            block(2, 6),
            block(4, 8),
            block(40, 100),
            block(44, 64),
            block(99, 100),
            block(100, 120),
        ];
        for a in &blocks {
            for b in &blocks {
                assert_eq!(a.is_overlapping(b), b.is_overlapping(a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn padding_to_boundary() {
        assert_eq!(next_byte_padding(0, 4), 0);
        assert_eq!(next_byte_padding(1, 4), 3);
        assert_eq!(next_byte_padding(2, 4), 2);
        assert_eq!(next_byte_padding(3, 4), 1);
        assert_eq!(next_byte_padding(44, 4), 0);
        assert_eq!(next_byte_padding(13, 8), 3);
        assert_eq!(next_byte_padding(13, 0), 0);
        for position in 0..64 {
            assert!(next_byte_padding(position, 4) < 4);
            assert_eq!((position + next_byte_padding(position, 4)) % 4, 0);
        }
    }
}
