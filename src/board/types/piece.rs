//! Piece and color types.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Chess piece types.
///
/// The discriminants start at 1 so piece arrays can reserve slot 0 for
/// "no piece", matching the mailbox encoding `(color << 3) | type`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Piece {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
}

impl Piece {
    /// All piece types in index order.
    pub const ALL: [Piece; 6] = [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ];

    /// Index into per-piece arrays (1-6; slot 0 is "no piece").
    #[inline]
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Decode a mailbox piece-type code (1-6).
    #[inline]
    #[must_use]
    pub(crate) const fn from_code(code: u8) -> Option<Piece> {
        match code {
            1 => Some(Piece::Pawn),
            2 => Some(Piece::Knight),
            3 => Some(Piece::Bishop),
            4 => Some(Piece::Rook),
            5 => Some(Piece::Queen),
            6 => Some(Piece::King),
            _ => None,
        }
    }

    /// Parse a piece from a character (case-insensitive).
    #[must_use]
    pub fn from_char(c: char) -> Option<Piece> {
        match c.to_ascii_lowercase() {
            'p' => Some(Piece::Pawn),
            'n' => Some(Piece::Knight),
            'b' => Some(Piece::Bishop),
            'r' => Some(Piece::Rook),
            'q' => Some(Piece::Queen),
            'k' => Some(Piece::King),
            _ => None,
        }
    }

    /// Convert to a lowercase character.
    #[inline]
    #[must_use]
    pub const fn to_char(self) -> char {
        match self {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        }
    }

    /// Convert to a FEN character (uppercase for White).
    #[inline]
    #[must_use]
    pub fn to_fen_char(self, color: Color) -> char {
        if color == Color::White {
            self.to_char().to_ascii_uppercase()
        } else {
            self.to_char()
        }
    }

    /// Material value in centipawns, also used by SEE.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Piece::Pawn => 100,
            Piece::Knight => 320,
            Piece::Bishop => 330,
            Piece::Rook => 500,
            Piece::Queen => 900,
            Piece::King => 20000,
        }
    }

    /// Game-phase weight (knights/bishops 1, rooks 2, queens 4).
    #[inline]
    #[must_use]
    pub(crate) const fn phase_weight(self) -> i32 {
        match self {
            Piece::Knight | Piece::Bishop => 1,
            Piece::Rook => 2,
            Piece::Queen => 4,
            Piece::Pawn | Piece::King => 0,
        }
    }
}

/// Promotion choices in generation order (queen first).
pub(crate) const PROMOTION_PIECES: [Piece; 4] =
    [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Side to move.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    /// Both colors in index order.
    pub const BOTH: [Color; 2] = [Color::White, Color::Black];

    #[inline]
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// The opposite color.
    #[inline]
    #[must_use]
    pub const fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) const fn from_index(idx: usize) -> Color {
        if idx == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Back rank (0 for White, 7 for Black).
    #[inline]
    #[must_use]
    pub(crate) const fn back_rank(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Pawn push direction in index space (+8 for White, -8 for Black).
    #[inline]
    #[must_use]
    pub(crate) const fn forward(self) -> i8 {
        match self {
            Color::White => 8,
            Color::Black => -8,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_codes_round_trip() {
        for piece in Piece::ALL {
            assert_eq!(Piece::from_code(piece.index() as u8), Some(piece));
        }
        assert_eq!(Piece::from_code(0), None);
        assert_eq!(Piece::from_code(7), None);
    }

    #[test]
    fn test_piece_chars() {
        assert_eq!(Piece::from_char('n'), Some(Piece::Knight));
        assert_eq!(Piece::from_char('Q'), Some(Piece::Queen));
        assert_eq!(Piece::from_char('x'), None);
        assert_eq!(Piece::Knight.to_fen_char(Color::White), 'N');
        assert_eq!(Piece::Knight.to_fen_char(Color::Black), 'n');
    }

    #[test]
    fn test_piece_value_ordering() {
        assert!(Piece::Pawn.value() < Piece::Knight.value());
        assert!(Piece::Knight.value() < Piece::Bishop.value());
        assert!(Piece::Bishop.value() < Piece::Rook.value());
        assert!(Piece::Rook.value() < Piece::Queen.value());
        assert!(Piece::Queen.value() < Piece::King.value());
    }

    #[test]
    fn test_phase_weights() {
        assert_eq!(Piece::Pawn.phase_weight(), 0);
        assert_eq!(Piece::Knight.phase_weight(), 1);
        assert_eq!(Piece::Rook.phase_weight(), 2);
        assert_eq!(Piece::Queen.phase_weight(), 4);
        assert_eq!(Piece::King.phase_weight(), 0);
    }

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
        assert_eq!(Color::White.back_rank(), 0);
        assert_eq!(Color::Black.back_rank(), 7);
    }
}
