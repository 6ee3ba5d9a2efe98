//! Persistent learning table.
//!
//! A bounded hash table of 2^20 entries keyed by position hash, each
//! holding a cumulative game-result score and a visit count. When
//! enabled, the search adds the clipped average (scaled by the learning
//! rate) to its static evaluation. Load/save use a flat little-endian
//! binary file.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::board::Color;

const TABLE_SIZE: usize = 1 << 20;

#[derive(Clone, Copy, Default)]
struct LearnEntry {
    total_score: i32,
    count: u32,
}

pub struct LearningTable {
    entries: Mutex<Vec<LearnEntry>>,
    enabled: AtomicBool,
    learning_rate: AtomicI32,
    max_adjust: AtomicI32,
    filename: Mutex<Option<PathBuf>>,
}

impl LearningTable {
    #[must_use]
    pub fn new() -> Self {
        LearningTable {
            entries: Mutex::new(vec![LearnEntry::default(); TABLE_SIZE]),
            enabled: AtomicBool::new(false),
            learning_rate: AtomicI32::new(100),
            max_adjust: AtomicI32::new(50),
            filename: Mutex::new(None),
        }
    }

    #[inline]
    fn index(hash: u64) -> usize {
        (hash & (TABLE_SIZE as u64 - 1)) as usize
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_filename(&self, path: PathBuf) {
        *self.filename.lock() = Some(path);
    }

    pub fn set_learning_rate(&self, rate: i32) {
        self.learning_rate.store(rate, Ordering::Relaxed);
    }

    pub fn set_max_adjust(&self, max: i32) {
        self.max_adjust.store(max, Ordering::Relaxed);
    }

    /// Centipawn adjustment for a position, clipped to ±max_adjust.
    /// Zero while disabled or for unvisited positions.
    #[must_use]
    pub fn probe(&self, hash: u64) -> i32 {
        if !self.is_enabled() {
            return 0;
        }
        let entries = self.entries.lock();
        let entry = entries[Self::index(hash)];
        if entry.count == 0 {
            return 0;
        }
        let rate = self.learning_rate.load(Ordering::Relaxed);
        let max = self.max_adjust.load(Ordering::Relaxed);
        ((entry.total_score * rate) / entry.count as i32).clamp(-max, max)
    }

    /// Credit a game result (+1 win, 0 draw, -1 loss from White's view)
    /// to a position, sign-adjusted for the side to move.
    pub fn update(&self, hash: u64, result: i32, side_to_move: Color) {
        if !self.is_enabled() {
            return;
        }
        let signed = match side_to_move {
            Color::White => result,
            Color::Black => -result,
        };
        let mut entries = self.entries.lock();
        let entry = &mut entries[Self::index(hash)];
        entry.total_score = entry.total_score.saturating_add(signed);
        entry.count = entry.count.saturating_add(1);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.fill(LearnEntry::default());
    }

    /// Read the table back from its configured file.
    pub fn load(&self) -> io::Result<()> {
        let path = self
            .filename
            .lock()
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no learning file set"))?;
        let mut reader = BufReader::new(File::open(path)?);
        let mut entries = self.entries.lock();
        for entry in entries.iter_mut() {
            entry.total_score = reader.read_i32::<LittleEndian>()?;
            entry.count = reader.read_u32::<LittleEndian>()?;
        }
        Ok(())
    }

    /// Write the table to its configured file.
    pub fn save(&self) -> io::Result<()> {
        let path = self
            .filename
            .lock()
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no learning file set"))?;
        let mut writer = BufWriter::new(File::create(path)?);
        let entries = self.entries.lock();
        for entry in entries.iter() {
            writer.write_i32::<LittleEndian>(entry.total_score)?;
            writer.write_u32::<LittleEndian>(entry.count)?;
        }
        Ok(())
    }
}

impl Default for LearningTable {
    fn default() -> Self {
        LearningTable::new()
    }
}
