use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A link reference appeared in the piece stream with no matching
    /// queue entry.
    #[error("link reference {reference} has no queued descriptor")]
    LinkQueueEmpty { reference: usize },

    /// A link reference popped a descriptor queued under a different index.
    #[error("link reference {reference} popped queue position {position}")]
    LinkQueueOrder { reference: usize, position: usize },

    /// Descriptors were still queued after every piece was consumed.
    #[error("{remaining} link descriptor(s) left undrained after chunking")]
    LinkQueueLeftover { remaining: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
