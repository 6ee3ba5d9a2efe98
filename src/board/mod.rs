mod attack_tables;
mod fen;
mod make_unmake;
mod movegen;
mod see;
mod state;
mod types;

pub mod error;
pub mod eval;
pub mod search;

#[cfg(test)]
mod tests;

pub use make_unmake::{NullMoveInfo, UnmakeInfo};
pub use state::Board;
pub use types::{Bitboard, Color, Move, MoveList, Piece, Square};
