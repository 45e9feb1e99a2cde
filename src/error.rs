use thiserror::Error;
use crate::{OpKind, PeerId};

/// An incoming operation which can't be applied to the document.
///
/// Duplicate delivery is *not* an error. Peers resend operations all the time to tell us what
/// they've seen, and [`Peer::merge_op`](crate::Peer::merge_op) absorbs those silently.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum MergeError {
    /// The operation names a slot past the end of the document. For inserts the index can equal
    /// `len` (appending).
    #[error("{kind} at index {index} is outside the document ({len} slots allocated)")]
    IndexOutOfRange { kind: OpKind, index: u64, len: u64 },
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum SequencerError {
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    /// Operation number `offset` in a batch from `peer` was rejected. The operations before it in
    /// the batch have already been merged.
    #[error("operation {offset} in batch from peer {peer} rejected")]
    InvalidOp {
        peer: PeerId,
        offset: usize,
        #[source]
        source: MergeError,
    },
}
