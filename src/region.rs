//! Validation of nested byte intervals.
//!
//! A [`Region`] is a [`Block`] that owns child nodes, each of which is either a
//! plain block or another region. [`Region::validate`] proves that every child
//! lies inside the region, that siblings do not overlap, that every child
//! starts on the region's boundary and, optionally, that the padding between
//! children stays within bounds. Every child is visited and every violation is
//! reported; validation never stops at the first problem.

use log::trace;

use crate::block::{Block, next_byte_padding};
use crate::error::Violation;

/// Layout rules a [`Region`] imposes on its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOptions {
    /// Largest gap allowed between two consecutive children
    pub max_padding: u32,
    /// Every child must start on a multiple of this value
    pub boundary: u32,
}

impl RegionOptions {
    /// WOFF blocks start on 4-byte boundaries and are padded with at most 3 bytes.
    pub const WOFF: RegionOptions = RegionOptions::new(3, 4);

    pub const fn new(max_padding: u32, boundary: u32) -> Self {
        Self {
            max_padding,
            boundary,
        }
    }
}

/// A child of a [`Region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Block(Block),
    Region(Region),
}

impl Node {
    /// The byte range covered by this node
    pub fn block(&self) -> Block {
        match self {
            Node::Block(block) => *block,
            Node::Region(region) => region.block,
        }
    }

    /// The node as a region, if it owns children of its own
    pub fn as_region(&self) -> Option<&Region> {
        match self {
            Node::Block(_) => None,
            Node::Region(region) => Some(region),
        }
    }
}

impl From<Block> for Node {
    fn from(value: Block) -> Self {
        Node::Block(value)
    }
}

impl From<Region> for Node {
    fn from(value: Region) -> Self {
        Node::Region(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    block: Block,
    options: RegionOptions,
    children: Vec<Node>,
}

impl Region {
    pub fn new(block: Block, options: RegionOptions) -> Self {
        Self {
            block,
            options,
            children: Vec::with_capacity(8),
        }
    }

    pub fn add_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn add_range<I>(&mut self, children: I)
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
    }

    /// Validate every child (recursively) against this region's layout rules.
    ///
    /// With `check_padding`, the gap before the first child and between
    /// consecutive children must not exceed `max_padding`, and the last child
    /// must end exactly where the region ends.
    ///
    /// The report is built from scratch on each call.
    pub fn validate(&self, check_padding: bool) -> ValidationReport {
        let mut violations = Vec::new();
        let valid = self.validate_into(check_padding, &mut violations);
        debug_assert_eq!(valid, violations.is_empty());
        ValidationReport { violations }
    }

    fn validate_into(&self, check_padding: bool, violations: &mut Vec<Violation>) -> bool {
        trace!(
            "validating region {} with {} children (padding: {check_padding})",
            self.block,
            self.children.len()
        );

        let container = self.block;
        let RegionOptions {
            max_padding,
            boundary,
        } = self.options;
        let initial_len = violations.len();

        // Order among children sharing a start is unspecified
        let mut sorted: Vec<&Node> = self.children.iter().collect();
        sorted.sort_by_key(|child| child.block().start());

        if let (true, Some(first)) = (check_padding, sorted.first()) {
            let lead = first.block().start() as i64 - container.start() as i64;
            if lead > max_padding as i64 {
                violations.push(Violation::LeadingPaddingExceeded {
                    container,
                    padding: lead,
                    max_padding,
                });
            }
        }

        for (idx, child) in sorted.iter().enumerate() {
            let block = child.block();

            if let Some(region) = child.as_region() {
                region.validate_into(check_padding, violations);
            }

            if block.start() > container.end() {
                violations.push(Violation::StartsBeyondContainer { block, container });
            }
            if block.start() < container.start() {
                violations.push(Violation::StartsBeforeContainer { block, container });
            }
            if block.end() > container.end() {
                violations.push(Violation::Overlapping {
                    first: block,
                    second: container,
                });
            }
            if next_byte_padding(block.start(), boundary) != 0 {
                violations.push(Violation::NotOnBoundary { block, boundary });
            }

            // Each pair is checked once, from its lower-starting member
            for other in &sorted[idx + 1..] {
                let other = other.block();
                if block.is_overlapping(&other) {
                    violations.push(Violation::Overlapping {
                        first: block,
                        second: other,
                    });
                }
            }

            if check_padding {
                match sorted.get(idx + 1) {
                    Some(next) => {
                        let gap = next.block().start() as i64 - block.end() as i64;
                        if gap > max_padding as i64 {
                            violations.push(Violation::MaxPaddingExceeded {
                                block,
                                padding: gap,
                                max_padding,
                            });
                        }
                    }
                    None => {
                        // Negative slack is the overlap with the container
                        // already reported above
                        let slack = container.end() as i64 - block.end() as i64;
                        if slack > 0 {
                            violations.push(Violation::MaxPaddingExceeded {
                                block,
                                padding: slack,
                                max_padding,
                            });
                        }
                    }
                }
            }
        }

        violations.len() == initial_len
    }
}

/// Outcome of [`Region::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}
