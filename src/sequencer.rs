//! The sequencer serializes incoming operations from every connected peer into one canonical log,
//! and hands newly appended operations to a broadcast sink.
//!
//! There's no transport in here. Whatever owns the sockets should call
//! [`handle_update`](Sequencer::handle_update) (or [`receive`](Sequencer::receive) and
//! [`flush`](Sequencer::flush)) as batches arrive, one batch at a time.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::ops::Range;
use tracing::{debug, info, warn};
use crate::{DocState, Operation, Peer, SequencerError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct PeerId(pub u32);

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SequencerConfig {
    /// Warn when a peer's context grows to this many operations. A big context means the peer
    /// has been missing some early operation for a long time, and probably needs a resync.
    pub context_warn_len: usize,

    /// If set, [`Sequencer::handle_update`] doesn't broadcast. Callers flush whenever they like,
    /// and each flush sends everything appended since the last one.
    pub coalesce_broadcasts: bool,
}

impl SequencerConfig {
    /// Has this peer been missing an old operation for long enough that we should warn about it?
    pub fn needs_resync(&self, peer: &Peer) -> bool {
        peer.context().len() >= self.context_warn_len
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            context_warn_len: 64,
            coalesce_broadcasts: false,
        }
    }
}

/// Somewhere to send newly sequenced operations. Operations always arrive in log order, and every
/// operation is sent exactly once.
pub trait Broadcast {
    fn broadcast(&mut self, ops: &[Operation]);
}

impl<F: FnMut(&[Operation])> Broadcast for F {
    fn broadcast(&mut self, ops: &[Operation]) {
        self(ops)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    config: SequencerConfig,
    doc: DocState,
    peers: BTreeMap<PeerId, Peer>,
    next_peer: u32,

    /// Everything in `ops[..watermark]` has been broadcast.
    watermark: usize,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn doc(&self) -> &DocState {
        &self.doc
    }

    /// Register a new peer. New peers start with an empty view of the document.
    pub fn connect(&mut self) -> PeerId {
        let id = PeerId(self.next_peer);
        self.next_peer += 1;
        self.peers.insert(id, Peer::new());
        info!(peer = %id, "Peer connected");
        id
    }

    pub fn disconnect(&mut self, peer: PeerId) -> Option<Peer> {
        let removed = self.peers.remove(&peer);
        if let Some(p) = removed.as_ref() {
            info!(%peer, rev = p.rev(), "Peer disconnected");
        }
        removed
    }

    pub fn peer(&self, peer: PeerId) -> Option<&Peer> {
        self.peers.get(&peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = (PeerId, &Peer)> + '_ {
        self.peers.iter().map(|(id, p)| (*id, p))
    }

    /// Peers whose context has grown past [`SequencerConfig::context_warn_len`].
    pub fn peers_needing_resync(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers.iter()
            .filter(|(_, p)| self.config.needs_resync(p))
            .map(|(id, _)| *id)
    }

    /// Merge a batch of operations from a peer. Returns the range of log positions appended.
    ///
    /// Processing stops at the first invalid operation. Operations before it in the batch stay
    /// merged.
    pub fn receive(&mut self, peer_id: PeerId, ops: &[Operation]) -> Result<Range<usize>, SequencerError> {
        let peer = self.peers.get_mut(&peer_id)
            .ok_or(SequencerError::UnknownPeer(peer_id))?;

        let start = self.doc.num_ops();
        for (offset, op) in ops.iter().enumerate() {
            if let Err(source) = peer.merge_op(&mut self.doc, *op) {
                warn!(peer = %peer_id, offset, %op, %source, "Rejecting invalid operation");
                return Err(SequencerError::InvalidOp { peer: peer_id, offset, source });
            }
        }
        let end = self.doc.num_ops();

        if self.config.needs_resync(peer) {
            warn!(peer = %peer_id, context_len = peer.context().len(), rev = peer.rev(), "Peer is missing an old operation. Consider resyncing it");
        }

        debug!(peer = %peer_id, batch = ops.len(), appended = end - start, len = self.doc.len_chars(), "Merged batch");
        Ok(start..end)
    }

    /// Operations appended since the last flush.
    pub fn pending_broadcast(&self) -> &[Operation] {
        &self.doc.ops()[self.watermark..]
    }

    /// Send everything appended since the last flush. Returns the number of operations sent.
    pub fn flush<B: Broadcast + ?Sized>(&mut self, sink: &mut B) -> usize {
        let pending = &self.doc.ops()[self.watermark..];
        let n = pending.len();
        if n > 0 {
            sink.broadcast(pending);
            self.watermark += n;
        }
        n
    }

    /// Receive a batch from a peer, then broadcast the result (unless broadcasts are being
    /// coalesced). Anything merged before an invalid operation is still broadcast.
    pub fn handle_update<B: Broadcast + ?Sized>(&mut self, peer: PeerId, ops: &[Operation], sink: &mut B) -> Result<Range<usize>, SequencerError> {
        let result = self.receive(peer, ops);
        if !self.config.coalesce_broadcasts {
            self.flush(sink);
        }
        result
    }
}
