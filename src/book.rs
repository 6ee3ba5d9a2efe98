//! Polyglot opening book.
//!
//! Reads the standard binary format: big-endian records of
//! (u64 key, u16 move, u16 weight, u32 learn). Probing matches the
//! position's zobrist-style key and either plays the heaviest move or,
//! with variety > 0, samples with exponent-skewed weights.

use byteorder::{BigEndian, ReadBytesExt};
use rand::Rng;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::board::{Board, Move, Piece};

#[derive(Clone, Copy, Debug)]
struct BookEntry {
    key: u64,
    mv: u16,
    weight: u16,
}

#[derive(Default)]
pub struct OpeningBook {
    entries: Vec<BookEntry>,
    variety: f64,
}

impl OpeningBook {
    #[must_use]
    pub fn new() -> Self {
        OpeningBook::default()
    }

    /// Load a Polyglot .bin file, replacing any previous book.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        loop {
            let key = match reader.read_u64::<BigEndian>() {
                Ok(key) => key,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let mv = reader.read_u16::<BigEndian>()?;
            let weight = reader.read_u16::<BigEndian>()?;
            let _learn = reader.read_u32::<BigEndian>()?;
            entries.push(BookEntry { key, mv, weight });
        }
        self.entries = entries;
        Ok(())
    }

    /// Forget the loaded book.
    pub fn unload(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Random-variety strength, 0 (always the heaviest move) to 10.
    pub fn set_variety(&mut self, variety: f64) {
        self.variety = variety;
    }

    /// Look up a book move for the position, if any.
    #[must_use]
    pub fn probe(&self, board: &Board) -> Move {
        if self.entries.is_empty() {
            return Move::NONE;
        }
        let key = board.hash();
        let matches: Vec<&BookEntry> = self.entries.iter().filter(|e| e.key == key).collect();
        if matches.is_empty() {
            return Move::NONE;
        }

        if self.variety == 0.0 {
            let best = matches
                .iter()
                .max_by_key(|e| e.weight)
                .expect("non-empty matches");
            return decode_polyglot_move(best.mv, board);
        }

        let exponent = 1.0 + self.variety / 10.0;
        let weights: Vec<f64> = matches
            .iter()
            .map(|e| f64::from(e.weight).powf(exponent))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return decode_polyglot_move(matches[0].mv, board);
        }
        let mut roll = rand::thread_rng().gen_range(0.0..total);
        for (entry, weight) in matches.iter().zip(&weights) {
            roll -= weight;
            if roll < 0.0 {
                return decode_polyglot_move(entry.mv, board);
            }
        }
        decode_polyglot_move(matches[0].mv, board)
    }
}

/// Decode a Polyglot move (file/rank bit fields, promotion nibble)
/// against the position's generated moves, so castling and en passant
/// come back in the engine's own encoding. Returns `Move::NONE` when
/// nothing matches.
fn decode_polyglot_move(pg: u16, board: &Board) -> Move {
    let from_file = (pg >> 6) & 7;
    let from_rank = (pg >> 9) & 7;
    let to_file = pg & 7;
    let to_rank = (pg >> 3) & 7;
    let promo = (pg >> 12) & 7;

    let promo_piece = match promo {
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => None,
    };

    for &mv in &board.generate_moves() {
        if mv.from().file() != from_file as usize
            || mv.from().rank() != from_rank as usize
            || mv.to().file() != to_file as usize
            || mv.to().rank() != to_rank as usize
        {
            continue;
        }
        if mv.promotion_piece() == promo_piece {
            return mv;
        }
    }
    Move::NONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_book_misses() {
        let book = OpeningBook::new();
        assert!(!book.is_loaded());
        assert_eq!(book.probe(&Board::new()), Move::NONE);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut book = OpeningBook::new();
        assert!(book.load("/nonexistent/book.bin").is_err());
    }

    #[test]
    fn test_decode_polyglot_move() {
        let board = Board::new();
        // e2e4: from file 4 rank 1, to file 4 rank 3.
        let pg: u16 = (1 << 9) | (4 << 6) | (3 << 3) | 4;
        let mv = decode_polyglot_move(pg, &board);
        assert_eq!(mv.to_string(), "e2e4");
        // A move with no match in the position decodes to NONE.
        let bogus: u16 = (4 << 9) | (0 << 6) | (5 << 3) | 7;
        assert_eq!(decode_polyglot_move(bogus, &board), Move::NONE);
    }

    #[test]
    fn test_probe_picks_heaviest() {
        let board = Board::new();
        let e2e4: u16 = (1 << 9) | (4 << 6) | (3 << 3) | 4;
        let d2d4: u16 = (1 << 9) | (3 << 6) | (3 << 3) | 3;
        let mut book = OpeningBook::new();
        book.entries = vec![
            BookEntry {
                key: board.hash(),
                mv: d2d4,
                weight: 10,
            },
            BookEntry {
                key: board.hash(),
                mv: e2e4,
                weight: 90,
            },
        ];
        assert_eq!(book.probe(&board).to_string(), "e2e4");
    }
}
