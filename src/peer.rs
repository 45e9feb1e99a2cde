//! Per-peer merge state.
//!
//! The sequencer keeps one [`Peer`] for every connected client. It tracks which prefix of the
//! canonical log the client has fully seen (`rev`) and which operations past that prefix the
//! client has also seen (`context`). Together those describe the client's view of the document,
//! which is exactly what we need to transform the client's next operation into canonical form.

use std::collections::BTreeSet;
use smallvec::SmallVec;
use tracing::trace;
use crate::{DocState, MergeError, OpId, Operation, transform_ins};
use crate::ost::IndexTransformTree;
use crate::Operation::*;

/// What happened when an operation from a peer was merged.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MergeOutcome {
    /// The operation was the next one in the log the peer hadn't seen. The peer's revision moved
    /// forward, possibly by more than one.
    Advanced,
    /// The operation is already in the log, but further along than the peer has seen everything.
    /// It now sits in the peer's context.
    Known,
    /// The peer already acknowledged this operation. Nothing changed.
    Duplicate,
    /// The operation was new. It was transformed and appended to the log at this position.
    Appended(usize),
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Peer {
    /// The peer has seen every operation in `ops[..rev]`.
    rev: usize,

    /// Operations in `ops[rev..]` which the peer has also seen. This never contains the id of
    /// `ops[rev]` itself. (If it did, rev would have moved forward.)
    context: BTreeSet<OpId>,
}

impl Peer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rev(&self) -> usize {
        self.rev
    }

    pub fn context(&self) -> &BTreeSet<OpId> {
        &self.context
    }

    /// Has the peer seen every operation in the document?
    pub fn is_current(&self, doc: &DocState) -> bool {
        self.rev == doc.num_ops()
    }

    fn advance(&mut self, doc: &DocState) {
        self.rev += 1;
        let ops = doc.ops();
        while self.rev < ops.len() && self.context.remove(&ops[self.rev].id()) {
            self.rev += 1;
        }
    }

    /// Merge an operation received from this peer into the document.
    ///
    /// The operation is either an acknowledgement of something already in the log (which only
    /// updates this peer's state) or a new operation. New operations are expressed in the peer's
    /// view of the document. They get transformed past every concurrent insert the peer hasn't
    /// seen, then appended.
    ///
    /// On error neither the document nor the peer are modified.
    pub fn merge_op(&mut self, doc: &mut DocState, op: Operation) -> Result<MergeOutcome, MergeError> {
        let id = op.id();

        if let Some(pos) = doc.position_of(id) {
            return Ok(if pos < self.rev {
                trace!(%id, pos, rev = self.rev, "Duplicate operation");
                MergeOutcome::Duplicate
            } else if pos == self.rev {
                self.advance(doc);
                trace!(%id, rev = self.rev, "Peer advanced");
                MergeOutcome::Advanced
            } else {
                self.context.insert(id);
                trace!(%id, pos, rev = self.rev, "Operation added to context");
                MergeOutcome::Known
            });
        }

        // Walk back through everything the peer might not have seen. S accumulates the slots of
        // every insert we pass, so each insert's index can be expressed in coordinates from
        // before any of them happened. T does the same for only the inserts the peer hasn't
        // seen, and gives us the index each of those had in the peer's frame.
        let ops = doc.ops();
        let mut s = IndexTransformTree::new();
        let mut t = IndexTransformTree::new();
        let mut concurrent: SmallVec<[(u64, i64); 8]> = SmallVec::new();
        for prev in ops[self.rev..].iter().rev() {
            if let Ins { index, priority, id: prev_id, .. } = *prev {
                let i = s.expand(index);
                if !self.context.contains(&prev_id) {
                    concurrent.push((t.collapse(i), priority));
                    t = t.insert(i);
                }
                s = s.insert(i);
            }
        }

        let op = concurrent.iter().rev()
            .fold(op, |op, &(ix, pri)| transform_ins(op, ix, pri));

        doc.check_op(&op)?;

        let was_current = self.is_current(doc);
        let pos = doc.append(op);
        if was_current {
            self.rev = pos + 1;
        } else {
            self.context.insert(id);
        }

        trace!(%op, concurrent = concurrent.len(), pos, "Appended operation");
        Ok(MergeOutcome::Appended(pos))
    }
}
