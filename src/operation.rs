use std::fmt::{Display, Formatter};
use Operation::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Globally unique operation identifier. Peers generate these; the sequencer only ever compares
/// them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct OpId(pub u64);

impl From<u64> for OpId {
    fn from(id: u64) -> Self { OpId(id) }
}

impl Display for OpId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpKind { Ins, Del }

impl Display for OpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Ins => f.write_str("Ins"),
            OpKind::Del => f.write_str("Del"),
        }
    }
}

/// A single character edit.
///
/// Indexes are *absolute*. Every character ever inserted owns one slot in the absolute coordinate
/// space forever, including after it has been deleted. So deletes never move anything, and only
/// inserts need transforming past.
///
/// With the `serde` feature this (de)serializes as the JSON the browser client speaks:
/// `{"ty": "ins", "ix": 0, "ch": "a", "pri": 0, "id": 1}` and `{"ty": "del", "ix": 0, "id": 2}`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(tag = "ty", rename_all = "lowercase"))]
pub enum Operation {
    Ins {
        #[cfg_attr(feature = "serde", serde(rename = "ix"))]
        index: u64,
        ch: char,
        /// Tie break for concurrent inserts at the same index. The lower priority ends up first.
        #[cfg_attr(feature = "serde", serde(rename = "pri"))]
        priority: i64,
        id: OpId,
    },
    Del {
        #[cfg_attr(feature = "serde", serde(rename = "ix"))]
        index: u64,
        id: OpId,
    },
}

impl Operation {
    pub fn new_insert(index: u64, ch: char, priority: i64, id: impl Into<OpId>) -> Self {
        Ins { index, ch, priority, id: id.into() }
    }

    pub fn new_delete(index: u64, id: impl Into<OpId>) -> Self {
        Del { index, id: id.into() }
    }

    #[inline]
    pub fn id(&self) -> OpId {
        match self {
            Ins { id, .. } | Del { id, .. } => *id,
        }
    }

    #[inline]
    pub fn index(&self) -> u64 {
        match self {
            Ins { index, .. } | Del { index, .. } => *index,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Ins { .. } => OpKind::Ins,
            Del { .. } => OpKind::Del,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Ins { .. })
    }

    /// The same operation, moved to a different absolute index.
    pub fn with_index(self, index: u64) -> Self {
        match self {
            Ins { ch, priority, id, .. } => Ins { index, ch, priority, id },
            Del { id, .. } => Del { index, id },
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ins { index, ch, priority, id } => write!(f, "{id} Ins {ch:?} at {index} (pri {priority})"),
            Del { index, id } => write!(f, "{id} Del at {index}"),
        }
    }
}
