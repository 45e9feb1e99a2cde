//! A small operational transform engine for collaborative plain text editing.
//!
//! Every character ever inserted into a document owns a slot in an *absolute* coordinate space.
//! Deleted characters leave a tombstone behind and keep their slot. Operations from peers are
//! expressed in absolute coordinates, so deletes never need transforming past anything and the
//! only transform we need is "shift past a concurrent insert".
//!
//! A central sequencer puts every operation it receives into one canonical log. For each peer it
//! remembers which prefix of that log the peer has seen, plus which later operations the peer has
//! also seen. That's enough to rewrite each incoming operation into canonical coordinates with a
//! couple of [`IndexTransformTree`]s, even when the peer is arbitrarily far behind.
//!
//! The pieces:
//!
//! - [`IndexTransformTree`]: a persistent, balanced set of absolute positions. Used for the set of
//!   tombstones, and as scratch space while merging.
//! - [`Operation`] and the [transform functions](transform_ins).
//! - [`DocState`]: the canonical log, tombstone set and resulting text.
//! - [`Peer`]: per-peer merge state and [`merge_op`](Peer::merge_op).
//! - [`Sequencer`]: a peer registry with batched receive and broadcast.
//!
//! ## Example
//!
//! ```
//! use tombstone_ot::*;
//!
//! let mut seq = Sequencer::new(SequencerConfig::default());
//! let alice = seq.connect();
//! let bob = seq.connect();
//!
//! let mut sent = Vec::new();
//! let mut sink = |ops: &[Operation]| sent.extend_from_slice(ops);
//!
//! // Both peers type at the start of the empty document at the same time.
//! seq.handle_update(alice, &[Operation::new_insert(0, 'a', 0, 1)], &mut sink).unwrap();
//! seq.handle_update(bob, &[Operation::new_insert(0, 'b', 1, 2)], &mut sink).unwrap();
//!
//! // Bob's insert has the higher priority, so it goes second.
//! assert_eq!(seq.doc().text(), "ab");
//! assert_eq!(sent[1], Operation::new_insert(1, 'b', 1, 2));
//! ```

pub mod ost;
mod operation;
mod transform;
mod doc;
mod peer;
mod sequencer;
mod error;
mod check;

#[cfg(test)]
mod fuzzer_tools;

pub use ost::IndexTransformTree;
pub use operation::{OpId, OpKind, Operation};
pub use transform::{transform, transform_ins};
pub use doc::DocState;
pub use peer::{MergeOutcome, Peer};
pub use sequencer::{Broadcast, PeerId, Sequencer, SequencerConfig};
pub use error::{MergeError, SequencerError};
