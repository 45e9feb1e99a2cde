use std::collections::HashMap;
use jumprope::JumpRope;
use tracing::trace;
use crate::{MergeError, OpId, Operation};
use crate::ost::IndexTransformTree;
use crate::Operation::*;

/// The canonical document, owned by the sequencer.
///
/// This stores the log of every operation accepted so far, the set of deleted (tombstoned)
/// absolute positions and the resulting text. Operations are only ever added through
/// [`append`](DocState::append), which [`Peer::merge_op`](crate::Peer::merge_op) calls once an
/// incoming operation has been transformed up to date.
#[derive(Debug, Clone)]
pub struct DocState {
    /// Every operation we've accepted, in arrival order.
    ops: Vec<Operation>,

    /// Log position of each operation, by id.
    positions: HashMap<OpId, usize>,

    /// Absolute positions of deleted characters.
    dels: IndexTransformTree,

    /// The visible document content.
    text: JumpRope,

    /// Tracked cursor positions, in visible coordinates.
    points: Vec<u64>,

    /// Number of absolute slots handed out so far. (Equal to the number of inserts applied.)
    allocated: u64,
}

impl Default for DocState {
    fn default() -> Self {
        Self::new()
    }
}

impl DocState {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            positions: HashMap::new(),
            dels: IndexTransformTree::new(),
            text: JumpRope::new(),
            points: Vec::new(),
            allocated: 0,
        }
    }

    /// Build a document by appending each operation in turn. The operations must already be in
    /// canonical (transformed) form.
    pub fn from_ops<I: IntoIterator<Item=Operation>>(ops: I) -> Self {
        let mut doc = Self::new();
        for op in ops {
            doc.append(op);
        }
        doc
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Find where an operation sits in the log.
    pub fn position_of(&self, id: OpId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// The set of deleted absolute positions.
    pub fn dels(&self) -> &IndexTransformTree {
        &self.dels
    }

    pub fn content(&self) -> &JumpRope {
        &self.text
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// The size of the absolute coordinate space. Inserts may target any index up to and including
    /// this. Deletes must target an index below it.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Expand `ix` through the delete set. Given a visible offset this returns the absolute slot of
    /// that character.
    pub fn xform_ix(&self, ix: u64) -> u64 {
        self.dels.expand(ix)
    }

    /// Map an absolute slot to its offset in the visible text. Returns None if the character at
    /// that slot has been deleted.
    pub fn visible_ix(&self, ix: u64) -> Option<u64> {
        if self.dels.contains(ix) { None }
        else { Some(self.dels.collapse(ix)) }
    }

    /// Check that an (already transformed) operation fits the document.
    pub fn check_op(&self, op: &Operation) -> Result<(), MergeError> {
        let fits = match *op {
            Ins { index, .. } => index <= self.allocated,
            Del { index, .. } => index < self.allocated,
        };

        if fits { Ok(()) }
        else {
            Err(MergeError::IndexOutOfRange {
                kind: op.kind(),
                index: op.index(),
                len: self.allocated,
            })
        }
    }

    /// Apply a single operation to the document state. This does not touch the log.
    ///
    /// Deleting a character which is already deleted does nothing.
    pub fn add(&mut self, op: &Operation) {
        debug_assert!(self.check_op(op).is_ok(), "Operation {op} out of range");

        match *op {
            Del { index, .. } => {
                if self.dels.contains(index) {
                    trace!(index, "Ignoring delete of tombstone");
                    return;
                }

                let ix = self.dels.collapse(index);
                self.dels = self.dels.insert(index);
                let pos = ix as usize;
                self.text.remove(pos..pos + 1);
                for p in self.points.iter_mut() {
                    if *p > ix { *p -= 1; }
                }
            }
            Ins { index, ch, .. } => {
                // Tombstones at or after the new slot move up to make room.
                self.dels = self.dels.shift_from(index);
                self.allocated += 1;

                let ix = self.dels.collapse(index);
                let mut buf = [0u8; 4];
                self.text.insert(ix as usize, ch.encode_utf8(&mut buf));
                for p in self.points.iter_mut() {
                    if *p > ix { *p += 1; }
                }
            }
        }
    }

    /// Append an operation to the log and apply it. Returns the operation's position in the log.
    ///
    /// The operation's id must not already be in the log. [`Peer::merge_op`](crate::Peer::merge_op)
    /// checks this before appending; other callers should check [`position_of`](Self::position_of)
    /// first. In release builds a repeated id replaces the old entry in the id index.
    pub fn append(&mut self, op: Operation) -> usize {
        let pos = self.ops.len();
        let old = self.positions.insert(op.id(), pos);
        debug_assert!(old.is_none(), "Duplicate operation id {}", op.id());
        self.ops.push(op);
        self.add(&op);
        pos
    }

    /// Start tracking a cursor at the given visible offset. Returns a handle for the point.
    pub fn track_point(&mut self, pos: u64) -> usize {
        debug_assert!(pos as usize <= self.len_chars());
        self.points.push(pos);
        self.points.len() - 1
    }

    pub fn point(&self, idx: usize) -> Option<u64> {
        self.points.get(idx).copied()
    }

    /// Move a tracked point. Returns the point's old position, or None if there's no point with
    /// that handle.
    pub fn set_point(&mut self, idx: usize, pos: u64) -> Option<u64> {
        debug_assert!(pos as usize <= self.len_chars());
        self.points.get_mut(idx).map(|p| std::mem::replace(p, pos))
    }

    pub fn points(&self) -> &[u64] {
        &self.points
    }
}
