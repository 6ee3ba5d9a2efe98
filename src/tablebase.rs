//! Syzygy tablebase interface.
//!
//! The search consumes tablebases through this wrapper: root probing
//! for a recommended move and in-tree WDL probes at shallow depth. The
//! built-in implementation carries the full interface but reports
//! unavailable, exactly like a build without a table decoder; all call
//! sites degrade to plain search with zero tbhits.

use std::path::{Path, PathBuf};

use crate::board::{Board, Move};

/// Win/draw/loss classification from the side to move's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    BlessedLoss,
    Draw,
    CursedWin,
    Win,
}

impl Wdl {
    /// Map to a search score at the given ply: real wins and losses are
    /// mate-bounded, cursed/blessed results collapse to near-draw.
    #[must_use]
    pub fn to_score(self, ply: usize, mate_score: i32) -> i32 {
        match self {
            Wdl::Win => mate_score - ply as i32 - 1,
            Wdl::Loss => -mate_score + ply as i32 + 1,
            Wdl::CursedWin => 1,
            Wdl::BlessedLoss => -1,
            Wdl::Draw => 0,
        }
    }
}

#[derive(Default)]
pub struct SyzygyTablebase {
    path: Option<PathBuf>,
    max_pieces: u32,
}

impl SyzygyTablebase {
    #[must_use]
    pub fn new() -> Self {
        SyzygyTablebase::default()
    }

    /// Point at a directory of table files. Returns false when the
    /// tables cannot be used; the engine then searches without them.
    pub fn init<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        if !path.is_dir() {
            log::warn!("syzygy path {} is not a directory", path.display());
            return false;
        }
        self.path = Some(path.to_path_buf());
        // No table decoder is linked into this build.
        self.max_pieces = 0;
        false
    }

    /// Whether the position is within probing range.
    #[must_use]
    pub fn can_probe(&self, board: &Board) -> bool {
        self.max_pieces > 0 && board.occupied_bb().popcount() <= self.max_pieces
    }

    /// In-tree WDL probe.
    #[must_use]
    pub fn probe_wdl(&self, board: &Board) -> Option<Wdl> {
        if !self.can_probe(board) {
            return None;
        }
        None
    }

    /// Distance-to-zero probe (plies to a zeroing move under optimal
    /// play; positive when winning).
    #[must_use]
    pub fn probe_dtz(&self, board: &Board) -> Option<i16> {
        if !self.can_probe(board) {
            return None;
        }
        None
    }

    /// Root probe: a tablebase-recommended move for the position.
    #[must_use]
    pub fn probe_root(&self, board: &Board) -> Option<Move> {
        if !self.can_probe(board) {
            return None;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_by_default() {
        let tb = SyzygyTablebase::new();
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(!tb.can_probe(&board));
        assert!(tb.probe_wdl(&board).is_none());
        assert!(tb.probe_root(&board).is_none());
    }

    #[test]
    fn test_init_missing_dir_fails() {
        let mut tb = SyzygyTablebase::new();
        assert!(!tb.init("/nonexistent/syzygy"));
    }

    #[test]
    fn test_wdl_score_mapping() {
        assert_eq!(Wdl::Draw.to_score(4, 32000), 0);
        assert_eq!(Wdl::Win.to_score(4, 32000), 32000 - 5);
        assert_eq!(Wdl::Loss.to_score(4, 32000), -32000 + 5);
        assert_eq!(Wdl::CursedWin.to_score(4, 32000), 1);
        assert_eq!(Wdl::BlessedLoss.to_score(4, 32000), -1);
    }
}
