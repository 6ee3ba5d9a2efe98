//! Error types for board construction and move parsing.

use std::fmt;

/// Errors from square notation parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    InvalidNotation { notation: String },
}

impl fmt::Display for SquareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquareError::InvalidNotation { notation } => {
                write!(f, "invalid square notation '{notation}'")
            }
        }
    }
}

impl std::error::Error for SquareError {}

/// Errors from FEN parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// The FEN has fewer fields than required.
    MissingFields,
    /// An unrecognized character in the piece-placement field.
    InvalidPiece(char),
    /// A rank described more or fewer than 8 squares.
    BadRankWidth { rank: usize },
    /// The side-to-move field was not "w" or "b".
    InvalidSideToMove(String),
    /// The en-passant field was not "-" or a square.
    InvalidEnPassant(String),
    /// A clock field did not parse as a number.
    InvalidClock(String),
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::MissingFields => write!(f, "FEN is missing required fields"),
            FenError::InvalidPiece(c) => write!(f, "invalid piece character '{c}' in FEN"),
            FenError::BadRankWidth { rank } => {
                write!(f, "rank {} does not describe 8 squares", rank + 1)
            }
            FenError::InvalidSideToMove(s) => write!(f, "invalid side to move '{s}'"),
            FenError::InvalidEnPassant(s) => write!(f, "invalid en-passant square '{s}'"),
            FenError::InvalidClock(s) => write!(f, "invalid clock value '{s}'"),
        }
    }
}

impl std::error::Error for FenError {}

/// Errors from UCI move-text parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move text too short or malformed.
    Malformed(String),
    /// The move does not match any legal move in the position.
    Illegal(String),
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::Malformed(s) => write!(f, "malformed move '{s}'"),
            MoveParseError::Illegal(s) => write!(f, "illegal move '{s}'"),
        }
    }
}

impl std::error::Error for MoveParseError {}
