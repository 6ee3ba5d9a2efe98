//! Zobrist hashing keys.
//!
//! Process-wide key tables, generated once from a fixed seed so that
//! position hashes are stable across runs (the learning file keys
//! positions by hash).

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ZOBRIST_SEED: u64 = 0x5EED_CAB1_E5ED_2024;

pub struct ZobristKeys {
    /// [color][piece type 0-6][square]; slot 0 of the piece axis unused.
    pub pieces: [[[u64; 64]; 7]; 2],
    /// XORed in when Black is to move.
    pub side: u64,
    /// Keyed by the 4-bit castling-rights mask over the rook slots.
    pub castling: [u64; 16],
    /// Keyed by the en-passant file.
    pub en_passant: [u64; 8],
}

pub static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
    let mut keys = ZobristKeys {
        pieces: [[[0; 64]; 7]; 2],
        side: 0,
        castling: [0; 16],
        en_passant: [0; 8],
    };
    for color in &mut keys.pieces {
        for piece in &mut color[1..] {
            for key in piece.iter_mut() {
                *key = rng.gen();
            }
        }
    }
    keys.side = rng.gen();
    for key in &mut keys.castling {
        *key = rng.gen();
    }
    for key in &mut keys.en_passant {
        *key = rng.gen();
    }
    keys
});
