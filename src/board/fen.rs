//! FEN parsing and printing.
//!
//! The castling field accepts both standard `KQkq` letters and the
//! Chess960 Shredder-FEN form where a letter names the rook's file.

use super::error::FenError;
use super::state::Board;
use super::types::{Color, Piece, Square};

impl Board {
    /// Parse a FEN string. The two clock fields may be omitted.
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::MissingFields)?;
        let side = fields.next().ok_or(FenError::MissingFields)?;
        let castling = fields.next().ok_or(FenError::MissingFields)?;
        let en_passant = fields.next().ok_or(FenError::MissingFields)?;
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut board = Board::empty();

        let mut rank = 7usize;
        let mut file = 0usize;
        for c in placement.chars() {
            match c {
                '/' => {
                    if file != 8 {
                        return Err(FenError::BadRankWidth { rank });
                    }
                    if rank == 0 {
                        return Err(FenError::BadRankWidth { rank });
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += c as usize - '0' as usize;
                    if file > 8 {
                        return Err(FenError::BadRankWidth { rank });
                    }
                }
                _ => {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece(c))?;
                    if file >= 8 {
                        return Err(FenError::BadRankWidth { rank });
                    }
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    board.set_piece(Square::new(rank, file), color, piece);
                    file += 1;
                }
            }
        }
        if rank != 0 || file != 8 {
            return Err(FenError::BadRankWidth { rank });
        }

        board.side = match side {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidSideToMove(other.to_string())),
        };

        if castling != "-" {
            for ch in castling.chars() {
                board.parse_castling_letter(ch);
            }
        }
        board.chess960 = board.castle_rook[0][0]
            .is_some_and(|sq| sq != Square::new(0, 7))
            || board.castle_rook[0][1].is_some_and(|sq| sq != Square::new(0, 0))
            || board.castle_rook[1][0].is_some_and(|sq| sq != Square::new(7, 7))
            || board.castle_rook[1][1].is_some_and(|sq| sq != Square::new(7, 0));

        board.ep_square = match en_passant {
            "-" => None,
            text => Some(
                text.parse::<Square>()
                    .map_err(|_| FenError::InvalidEnPassant(text.to_string()))?,
            ),
        };

        board.halfmove = halfmove
            .parse()
            .map_err(|_| FenError::InvalidClock(halfmove.to_string()))?;
        board.fullmove = fullmove
            .parse()
            .map_err(|_| FenError::InvalidClock(fullmove.to_string()))?;

        board.hash = board.calculate_hash();
        board.history.clear();
        board.history.push(board.hash);
        Ok(board)
    }

    /// Resolve one castling letter into a rook slot.
    ///
    /// `K`/`k` and `Q`/`q` locate the first rook on the back rank to the
    /// king's right respectively left; any other letter names the rook's
    /// file directly (Shredder-FEN). Letters that do not resolve to a
    /// rook are ignored.
    fn parse_castling_letter(&mut self, ch: char) {
        let color = if ch.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let rank = color.back_rank();
        let Some(ksq) = self.king_square(color) else {
            return;
        };
        let rooks = self.bb(color, Piece::Rook);

        let file = match ch.to_ascii_lowercase() {
            'k' => (ksq.file() + 1..8).find(|&f| rooks.contains(Square::new(rank, f))),
            'q' => (0..ksq.file()).rev().find(|&f| rooks.contains(Square::new(rank, f))),
            c @ 'a'..='h' => Some(c as usize - 'a' as usize),
            _ => None,
        };
        let Some(file) = file else { return };
        let rook_sq = Square::new(rank, file);
        if !rooks.contains(rook_sq) {
            return;
        }
        let side = usize::from(file < ksq.file());
        self.castle_rook[color.index()][side] = Some(rook_sq);
    }

    /// Emit the position as a FEN string.
    #[must_use]
    pub fn fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    None => empty += 1,
                    Some((color, piece)) => {
                        if empty > 0 {
                            fen.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        fen.push(piece.to_fen_char(color));
                    }
                }
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side == Color::White { 'w' } else { 'b' });
        fen.push(' ');

        let mut castling = String::new();
        if self.chess960 {
            for (c_idx, slots) in self.castle_rook.iter().enumerate() {
                for slot in slots {
                    if let Some(rook_sq) = slot {
                        let letter = (b'a' + rook_sq.file() as u8) as char;
                        castling.push(if c_idx == 0 {
                            letter.to_ascii_uppercase()
                        } else {
                            letter
                        });
                    }
                }
            }
        } else {
            if self.castle_rook[0][0].is_some() {
                castling.push('K');
            }
            if self.castle_rook[0][1].is_some() {
                castling.push('Q');
            }
            if self.castle_rook[1][0].is_some() {
                castling.push('k');
            }
            if self.castle_rook[1][1].is_some() {
                castling.push('q');
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        fen.push_str(&castling);

        fen.push(' ');
        match self.ep_square {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(" {} {}", self.halfmove, self.fullmove));
        fen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_startpos_round_trip() {
        let board = Board::from_fen(STARTPOS).unwrap();
        assert_eq!(board.fen(), STARTPOS);
        assert_eq!(board.hash(), Board::new().hash());
    }

    #[test]
    fn test_kiwipete_parses() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.fen(), fen);
        assert_eq!(board.castle_rook(Color::White, 0), Some(Square::new(0, 7)));
        assert_eq!(board.castle_rook(Color::Black, 1), Some(Square::new(7, 0)));
        assert!(!board.is_chess960());
    }

    #[test]
    fn test_en_passant_and_clocks() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.ep_square(), Some(Square::new(2, 4)));
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.fen(), fen);
    }

    #[test]
    fn test_shredder_fen_castling() {
        // Chess960 start with king on d-file, rooks on b and g.
        let fen = "1r1k2r1/pppppppp/8/8/8/8/PPPPPPPP/1R1K2R1 w GBgb - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert!(board.is_chess960());
        assert_eq!(board.castle_rook(Color::White, 0), Some(Square::new(0, 6)));
        assert_eq!(board.castle_rook(Color::White, 1), Some(Square::new(0, 1)));
        assert_eq!(board.castle_rook(Color::Black, 0), Some(Square::new(7, 6)));
        assert_eq!(board.castle_rook(Color::Black, 1), Some(Square::new(7, 1)));
        assert_eq!(board.fen(), fen);
    }

    #[test]
    fn test_kq_letters_find_rooks_in_chess960_position() {
        // KQkq letters in a shuffled position resolve to the outermost
        // rooks relative to the king.
        let fen = "rkr5/pppppppp/8/8/8/8/PPPPPPPP/RKR5 w KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.castle_rook(Color::White, 0), Some(Square::new(0, 2)));
        assert_eq!(board.castle_rook(Color::White, 1), Some(Square::new(0, 0)));
        assert!(board.is_chess960());
    }

    #[test]
    fn test_malformed_fens_rejected() {
        assert!(Board::from_fen("").is_err());
        assert!(Board::from_fen("rnbqkbnr/pppppppp w KQkq - 0 1").is_err());
        assert!(Board::from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"
        )
        .is_err());
        assert!(Board::from_fen(
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        )
        .is_err());
        assert!(Board::from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1"
        )
        .is_err());
    }
}
