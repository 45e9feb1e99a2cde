use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use rand::prelude::SmallRng;
use rand::Rng;
use crate::{OpId, Operation};
use crate::Operation::*;

const UCHARS: [char; 23] = [
    'a', 'b', 'c', '1', '2', '3', ' ', '\n', // ASCII
    '\u{a9}', '\u{a5}', '\u{bd}', // The Latin-1 suppliment (U+80 - U+ff)
    '\u{38e}', '\u{394}', '\u{3b4}', '\u{3e0}', // Greek (U+0370 - U+03FF)
    '\u{2190}', '\u{21af}', '\u{21bb}', '\u{21c8}', // Arrows (U+2190 - U+21FF)
    '\u{10190}', '\u{10194}', '\u{10198}', '\u{1019a}', // Ancient roman symbols (U+10190 - U+101CF)
];

pub(crate) fn random_char(rng: &mut SmallRng) -> char {
    UCHARS[rng.gen_range(0..UCHARS.len())]
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub id: OpId,
    pub ch: char,
    pub deleted: bool,
}

/// Dead simple reference document. Every absolute slot is stored in order in a vec, tombstones and
/// all.
#[derive(Debug, Clone, Default)]
pub(crate) struct NaiveDoc {
    pub slots: Vec<Slot>,
}

impl NaiveDoc {
    pub fn from_ops(ops: &[Operation]) -> Self {
        let mut doc = Self::default();
        for op in ops {
            doc.apply(op);
        }
        doc
    }

    /// The document as seen by someone who has only seen some of the operations. Slots of unseen
    /// inserts are left out, and only seen deletes mark anything deleted.
    pub fn project<F: Fn(OpId) -> bool>(ops: &[Operation], seen: F) -> Self {
        let mut doc = Self::default();
        for op in ops {
            match *op {
                Ins { .. } => doc.apply(op),
                Del { index, id } => {
                    if seen(id) { doc.slots[index as usize].deleted = true; }
                }
            }
        }
        doc.slots.retain(|s| seen(s.id));
        doc
    }

    pub fn apply(&mut self, op: &Operation) {
        match *op {
            Ins { index, ch, id, .. } => {
                self.slots.insert(index as usize, Slot { id, ch, deleted: false });
            }
            Del { index, .. } => {
                self.slots[index as usize].deleted = true;
            }
        }
    }

    pub fn text(&self) -> String {
        self.slots.iter()
            .filter(|s| !s.deleted)
            .map(|s| s.ch)
            .collect()
    }

    /// The absolute position of the character inserted by `id`.
    pub fn position_of(&self, id: OpId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    /// The id of the insert which created the slot at `ix`.
    pub fn id_at(&self, ix: usize) -> Option<OpId> {
        self.slots.get(ix).map(|s| s.id)
    }

    /// Generate a random operation which is valid against this document. Deletes normally target a
    /// live character, but occasionally hit a tombstone.
    pub fn random_op(&self, rng: &mut SmallRng, id: OpId, priority: i64) -> Operation {
        let live: Vec<usize> = self.slots.iter().enumerate()
            .filter_map(|(i, s)| if s.deleted { None } else { Some(i) })
            .collect();
        let insert_weight = if live.len() < 100 { 0.6 } else { 0.45 };

        if self.slots.is_empty() || rng.gen_bool(insert_weight) {
            let index = rng.gen_range(0..=self.slots.len()) as u64;
            Operation::new_insert(index, random_char(rng), priority, id)
        } else if live.is_empty() || rng.gen_bool(0.05) {
            let index = rng.gen_range(0..self.slots.len()) as u64;
            Operation::new_delete(index, id)
        } else {
            let index = live[rng.gen_range(0..live.len())] as u64;
            Operation::new_delete(index, id)
        }
    }
}

pub(crate) struct Seed(pub u64);
impl Drop for Seed {
    fn drop(&mut self) {
        if std::thread::panicking() {
            eprintln!("*** CRASHED ON SEED {} ***", self.0);
            drop(std::io::stderr().flush());
        }
    }
}

pub(crate) fn fuzz_multithreaded<F: Fn(u64) + Send + Sync + Copy + Clone + 'static>(num_iter: u64, f: F) {
    let num_threads: usize = std::thread::available_parallelism().map_or(4, |n| n.into());
    let mut threads = vec![];
    let is_error = Arc::new(AtomicBool::new(false));

    for t in 0..num_threads {
        let is_error = is_error.clone();
        let is_error2 = is_error.clone();
        threads.push(std::thread::spawn(move || {
            let orig_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                // Signal to the other threads to stop iterating.
                is_error2.store(true, Ordering::Relaxed);
                orig_hook(info);
            }));

            let chunk_size = u64::MAX / (num_threads as u64);
            let seed_start = (chunk_size * t as u64) / 1000 * 1000;
            for seed_n in seed_start..seed_start.saturating_add(num_iter) {
                let seed = Seed(seed_n);
                f(seed.0);
                if is_error.load(Ordering::Relaxed) { break; }
            }
        }));
    }

    for t in threads {
        t.join().unwrap();
    }
}
