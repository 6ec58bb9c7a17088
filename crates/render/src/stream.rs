//! The intermediate content stream produced by transduction.
//!
//! A rendered body is a sequence of [`Piece`]s — literal text runs
//! interleaved with indexed link references — plus a FIFO [`LinkQueue`] of
//! the descriptors those references stand for. Carrying the index inside
//! each reference (instead of a sentinel token in a flat string) makes the
//! reference-to-descriptor correspondence checkable when the chunker drains
//! the queue.

use std::collections::VecDeque;

/// A deferred hyperlink or media reference: human description plus target
/// URL. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub description: String,
    pub target: String,
}

impl LinkRef {
    #[must_use]
    pub fn new(description: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            target: target.into(),
        }
    }
}

/// Ordered queue of link descriptors, scoped to one body's rendering.
///
/// Each descriptor is pushed exactly once by the transducer and popped
/// exactly once by the chunker; the queue must be empty when chunking
/// completes. Push and pop positions are tracked so a disagreement between
/// stream references and queue order is detectable.
#[derive(Debug, Default)]
pub struct LinkQueue {
    entries: VecDeque<LinkRef>,
    pushed: usize,
    popped: usize,
}

impl LinkQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor, returning the index its stream reference must
    /// carry.
    pub fn push(&mut self, link: LinkRef) -> usize {
        let index = self.pushed;
        self.entries.push_back(link);
        self.pushed += 1;
        index
    }

    /// Remove the head descriptor together with its original push index.
    pub fn pop(&mut self) -> Option<(usize, LinkRef)> {
        let link = self.entries.pop_front()?;
        let position = self.popped;
        self.popped += 1;
        Some((position, link))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One unit of the intermediate stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Escaped literal text.
    Text(String),
    /// Reference to the link descriptor pushed under this index.
    Link(usize),
}

/// A fully transduced body: the piece stream and its link queue.
#[derive(Debug, Default)]
pub struct Rendered {
    pub pieces: Vec<Piece>,
    pub links: LinkQueue,
}

impl Rendered {
    /// Number of link references in the piece stream.
    #[must_use]
    pub fn link_reference_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Link(_)))
            .count()
    }
}
