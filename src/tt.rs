//! Shared transposition table.
//!
//! A fixed-size array of single-entry buckets behind one reader-writer
//! lock: probes take the shared side, stores the exclusive side, so a
//! multi-word entry can never be read torn. All search threads share
//! one table.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::board::Move;

/// Bound classification of a stored score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    None,
    Upper,
    Lower,
    Exact,
}

#[derive(Clone, Copy)]
struct Entry {
    key: u64,
    depth: i16,
    score: i32,
    bound: Bound,
    mv: Move,
    age: u16,
    dtz: i16,
}

const EMPTY_ENTRY: Entry = Entry {
    key: 0,
    depth: -1,
    score: 0,
    bound: Bound::None,
    mv: Move::NONE,
    age: 0,
    dtz: 0,
};

/// Result of a probe. `mv`, `score` and `dtz` are exposed whenever the
/// stored key matches, even when depth or bound requirements fail, so
/// callers can still use them for ordering and singular-extension
/// heuristics; `hit` alone says whether the score is authoritative for
/// the caller's window.
#[derive(Clone, Copy, Debug)]
pub struct TtProbe {
    pub hit: bool,
    pub score: i32,
    pub mv: Move,
    pub dtz: i16,
}

impl TtProbe {
    const MISS: TtProbe = TtProbe {
        hit: false,
        score: 0,
        mv: Move::NONE,
        dtz: 0,
    };
}

pub struct TranspositionTable {
    table: RwLock<Vec<Entry>>,
    age: AtomicU16,
}

impl TranspositionTable {
    /// Allocate a table of roughly `mb` megabytes.
    #[must_use]
    pub fn new(mb: usize) -> Self {
        let count = (mb.max(1) * 1024 * 1024 / std::mem::size_of::<Entry>()).max(1024);
        TranspositionTable {
            table: RwLock::new(vec![EMPTY_ENTRY; count]),
            age: AtomicU16::new(0),
        }
    }

    /// Reallocate at a new size and reset the age.
    pub fn resize(&self, mb: usize) {
        let count = (mb.max(1) * 1024 * 1024 / std::mem::size_of::<Entry>()).max(1024);
        let mut table = self.table.write();
        table.clear();
        table.resize(count, EMPTY_ENTRY);
        self.age.store(0, Ordering::Relaxed);
    }

    /// Wipe every entry.
    pub fn clear(&self) {
        let mut table = self.table.write();
        for entry in table.iter_mut() {
            *entry = EMPTY_ENTRY;
        }
        self.age.store(0, Ordering::Relaxed);
    }

    /// Bump the age; called once per root search.
    pub fn new_search(&self) {
        self.age.fetch_add(1, Ordering::Relaxed);
    }

    /// Store a search result. The incoming entry wins unless the
    /// resident has the same key at strictly greater depth.
    pub fn store(&self, key: u64, depth: i16, score: i32, bound: Bound, mv: Move, dtz: i16) {
        let age = self.age.load(Ordering::Relaxed);
        let mut table = self.table.write();
        let len = table.len();
        let entry = &mut table[(key % len as u64) as usize];
        if entry.key == key && entry.depth > depth {
            return;
        }
        *entry = Entry {
            key,
            depth,
            score,
            bound,
            mv,
            age,
            dtz,
        };
    }

    /// Probe for `key`. `hit` is true only when the key matches, the
    /// stored depth reaches `depth`, and the bound is compatible with
    /// the `[alpha, beta]` window (Exact always; Lower only at
    /// score >= beta; Upper only at score <= alpha).
    #[must_use]
    pub fn probe(&self, key: u64, depth: i16, alpha: i32, beta: i32) -> TtProbe {
        let table = self.table.read();
        let len = table.len();
        let entry = &table[(key % len as u64) as usize];
        if entry.key != key || entry.bound == Bound::None {
            return TtProbe::MISS;
        }
        let hit = entry.depth >= depth
            && match entry.bound {
                Bound::Exact => true,
                Bound::Lower => entry.score >= beta,
                Bound::Upper => entry.score <= alpha,
                Bound::None => false,
            };
        TtProbe {
            hit,
            score: entry.score,
            mv: entry.mv,
            dtz: entry.dtz,
        }
    }
}
