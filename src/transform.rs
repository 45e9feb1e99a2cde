//! Transform functions.
//!
//! Because indexes are absolute and deleted characters keep their slot, deletes never move any
//! other operation. The only thing an operation ever needs transforming past is a concurrent
//! insert, which pushes everything at or after its slot up by one.

use crate::Operation;
use crate::Operation::*;

/// Adjust `op` so it still applies correctly after a concurrent insert at absolute index `ix`
/// with priority `pri` has been applied first.
///
/// Two inserts at the same index are ordered by priority. The lower priority stays in front.
/// (Equal priorities put the transformed op second.)
pub fn transform_ins(op: Operation, ix: u64, pri: i64) -> Operation {
    match op {
        Ins { index, priority, .. } => {
            if index < ix || (index == ix && priority < pri) { op }
            else { op.with_index(index + 1) }
        }
        Del { index, .. } => {
            if index < ix { op }
            else { op.with_index(index + 1) }
        }
    }
}

/// Transform `op` by `applied`, an operation which has already been applied.
pub fn transform(op: Operation, applied: &Operation) -> Operation {
    match *applied {
        Ins { index, priority, .. } => transform_ins(op, index, priority),
        Del { .. } => op,
    }
}
