//! Pseudo-legal move generation.
//!
//! Captures-only generation (for quiescence and ProbCut) emits exactly
//! the subset of full generation whose destination is enemy-occupied or
//! which is en passant. The enemy king is never a capture target.

use super::attack_tables::{
    bishop_attacks, queen_attacks, rook_attacks, KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS,
};
use super::error::MoveParseError;
use super::state::Board;
use super::types::{pop_lsb, Move, MoveList, Piece, Square, PROMOTION_PIECES};

impl Board {
    /// Generate all pseudo-legal moves.
    #[must_use]
    pub fn generate_moves(&self) -> MoveList {
        self.generate(false)
    }

    /// Generate pseudo-legal captures (including en passant) only.
    #[must_use]
    pub fn generate_captures(&self) -> MoveList {
        self.generate(true)
    }

    fn generate(&self, captures_only: bool) -> MoveList {
        let mut moves = MoveList::new();
        let us = self.side;
        let them = us.opponent();
        let targets_no_king = self.color_bb(them).0 & !self.bb(them, Piece::King).0;
        let empty = !self.occupied.0;
        let occ = self.occupied.0;

        for piece in [
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ] {
            let mut from_bb = self.bb(us, piece).0;
            while from_bb != 0 {
                let from = pop_lsb(&mut from_bb);
                let attacks = match piece {
                    Piece::Knight => KNIGHT_ATTACKS[from.index()],
                    Piece::Bishop => bishop_attacks(from, occ),
                    Piece::Rook => rook_attacks(from, occ),
                    Piece::Queen => queen_attacks(from, occ),
                    _ => KING_ATTACKS[from.index()],
                };
                let mut caps = attacks & targets_no_king;
                while caps != 0 {
                    let to = pop_lsb(&mut caps);
                    moves.push(Move::capture(from, to));
                }
                if !captures_only {
                    let mut quiets = attacks & empty;
                    while quiets != 0 {
                        let to = pop_lsb(&mut quiets);
                        moves.push(Move::quiet(from, to));
                    }
                }
            }
        }

        let promo_rank = if us == super::types::Color::White { 7 } else { 0 };
        let start_rank = if us == super::types::Color::White { 1 } else { 6 };
        let mut pawns = self.bb(us, Piece::Pawn).0;
        while pawns != 0 {
            let from = pop_lsb(&mut pawns);

            // A pawn parked on the final rank (possible only in corrupt
            // FENs) has no forward square.
            if !captures_only && from.rank() != promo_rank {
                let to = from.offset(us.forward());
                if self.is_empty_square(to) {
                    if to.rank() == promo_rank {
                        for promo in PROMOTION_PIECES {
                            moves.push(Move::promotion(from, to, promo, false));
                        }
                    } else {
                        moves.push(Move::quiet(from, to));
                        if from.rank() == start_rank {
                            let to2 = to.offset(us.forward());
                            if self.is_empty_square(to2) {
                                moves.push(Move::quiet(from, to2));
                            }
                        }
                    }
                }
            }

            let mut caps = PAWN_ATTACKS[us.index()][from.index()] & targets_no_king;
            while caps != 0 {
                let to = pop_lsb(&mut caps);
                if to.rank() == promo_rank {
                    for promo in PROMOTION_PIECES {
                        moves.push(Move::promotion(from, to, promo, true));
                    }
                } else {
                    moves.push(Move::capture(from, to));
                }
            }

            if let Some(ep) = self.ep_square {
                if PAWN_ATTACKS[us.index()][from.index()] & ep.bit() != 0 {
                    moves.push(Move::en_passant(from, ep));
                }
            }
        }

        if !captures_only && !self.is_check() {
            self.generate_castling(&mut moves);
        }

        moves
    }

    /// Castling, Chess960 included. The king's destination is always the
    /// g (kingside) or c (queenside) file, the rook's always f or d.
    fn generate_castling(&self, moves: &mut MoveList) {
        let us = self.side;
        let them = us.opponent();
        let Some(ksq) = self.king_square(us) else {
            return;
        };
        let rank = us.back_rank();

        for side_idx in 0..2 {
            let Some(rook_sq) = self.castle_rook[us.index()][side_idx] else {
                continue;
            };
            if !self.bb(us, Piece::Rook).contains(rook_sq) {
                continue;
            }
            // The slot's rook must sit on the expected side of the king.
            let kingside = side_idx == 0;
            if kingside != (rook_sq.index() > ksq.index()) {
                continue;
            }

            let king_dest = Square::new(rank, if kingside { 6 } else { 2 });
            let rook_dest = Square::new(rank, if kingside { 5 } else { 3 });

            // King path: every square it crosses, destination included,
            // must be unattacked, and empty unless holding the castling
            // rook itself (Chess960 king and rook can be adjacent).
            let mut ok = true;
            if king_dest != ksq {
                let step: i8 = if king_dest.index() > ksq.index() { 1 } else { -1 };
                let mut s = ksq.offset(step);
                while s != king_dest {
                    if (!self.is_empty_square(s) && s != rook_sq) || self.is_attacked(s, them) {
                        ok = false;
                        break;
                    }
                    s = s.offset(step);
                }
                if ok && !self.is_empty_square(king_dest) && king_dest != rook_sq {
                    ok = false;
                }
                if ok && self.is_attacked(king_dest, them) {
                    ok = false;
                }
            }

            // Rook path: strictly-between squares empty except for the
            // king's origin (vacated mid-castle), and the destination
            // free unless one of the two castling pieces occupies it.
            if ok && rook_dest != rook_sq {
                let step: i8 = if rook_dest.index() > rook_sq.index() { 1 } else { -1 };
                let mut s = rook_sq.offset(step);
                while s != rook_dest {
                    if s != ksq && !self.is_empty_square(s) {
                        ok = false;
                        break;
                    }
                    s = s.offset(step);
                }
                if ok
                    && !self.is_empty_square(rook_dest)
                    && rook_dest != ksq
                    && rook_dest != rook_sq
                {
                    ok = false;
                }
            }

            if ok {
                moves.push(Move::castle(ksq, king_dest));
            }
        }
    }

    /// Strictly legal moves: pseudo-legal filtered through a speculative
    /// make and `mover_in_check`.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut scratch = self.clone();
        let mut legal = MoveList::new();
        for &mv in &self.generate_moves() {
            let info = scratch.make_move(mv);
            if !scratch.mover_in_check() {
                legal.push(mv);
            }
            scratch.unmake_move(mv, info);
        }
        legal
    }

    /// True if `mv` is pseudo-legal here and does not leave the mover's
    /// king attacked. Used to vet TT moves and PV replay.
    #[must_use]
    pub fn is_legal_move(&self, mv: Move) -> bool {
        if !self.generate_moves().contains(mv) {
            return false;
        }
        let mut scratch = self.clone();
        let info = scratch.make_move(mv);
        let legal = !scratch.mover_in_check();
        scratch.unmake_move(mv, info);
        legal
    }

    /// Format a move as UCI text for this position. In Chess960 mode
    /// castling is emitted as king-to-rook-origin; otherwise as the
    /// king's destination.
    #[must_use]
    pub fn move_to_uci(&self, mv: Move) -> String {
        if mv == Move::NONE || mv == Move::NULL {
            return "0000".to_string();
        }
        if mv.is_castle() && self.chess960 {
            let side_idx = usize::from(mv.to().file() != 6);
            if let Some((color, _)) = self.piece_at(mv.from()) {
                if let Some(rook_sq) = self.castle_rook[color.index()][side_idx] {
                    return format!("{}{}", mv.from(), rook_sq);
                }
            }
        }
        mv.to_string()
    }

    /// Parse UCI move text against this position.
    ///
    /// A king-to-own-rook move and a king two-file jump both read as
    /// castling; a pawn's diagonal move to the en-passant square reads
    /// as en passant. The result is the exact generated encoding.
    pub fn parse_move(&self, text: &str) -> Result<Move, MoveParseError> {
        let bytes = text.as_bytes();
        if !text.is_ascii() || bytes.len() < 4 || bytes.len() > 5 {
            return Err(MoveParseError::Malformed(text.to_string()));
        }
        let from: Square = text[0..2]
            .parse()
            .map_err(|_| MoveParseError::Malformed(text.to_string()))?;
        let mut to: Square = text[2..4]
            .parse()
            .map_err(|_| MoveParseError::Malformed(text.to_string()))?;
        let promo = if bytes.len() == 5 {
            Some(
                Piece::from_char(bytes[4] as char)
                    .ok_or_else(|| MoveParseError::Malformed(text.to_string()))?,
            )
        } else {
            None
        };

        // Chess960 castling arrives as king-onto-own-rook; remap to the
        // internal king-destination encoding.
        if promo.is_none() {
            let from_piece = self.piece_at(from);
            let to_piece = self.piece_at(to);
            if let (Some((fc, Piece::King)), Some((tc, Piece::Rook))) = (from_piece, to_piece) {
                if fc == tc {
                    let kingside = to.file() > from.file();
                    to = Square::new(fc.back_rank(), if kingside { 6 } else { 2 });
                }
            }
        }

        let found = self
            .generate_moves()
            .iter()
            .copied()
            .find(|m| m.from() == from && m.to() == to && m.promotion_piece() == promo)
            .ok_or_else(|| MoveParseError::Illegal(text.to_string()))?;

        let mut scratch = self.clone();
        let info = scratch.make_move(found);
        let legal = !scratch.mover_in_check();
        scratch.unmake_move(found, info);
        if legal {
            Ok(found)
        } else {
            Err(MoveParseError::Illegal(text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::Color;

    #[test]
    fn test_startpos_has_twenty_moves() {
        let board = Board::new();
        assert_eq!(board.generate_moves().len(), 20);
        assert_eq!(board.legal_moves().len(), 20);
        assert!(board.generate_captures().is_empty());
    }

    #[test]
    fn test_captures_only_is_subset() {
        let board =
            Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .unwrap();
        let all = board.generate_moves();
        let caps = board.generate_captures();
        for mv in &caps {
            assert!(all.contains(*mv));
            assert!(mv.is_capture());
        }
        let cap_count = all.iter().filter(|m| m.is_capture()).count();
        assert_eq!(caps.len(), cap_count);
    }

    #[test]
    fn test_king_never_captured() {
        // Black king adjacent to a white queen: the queen must not list
        // the king square as a capture target.
        let board = Board::from_fen("3k4/3Q4/3K4/8/8/8/8/8 w - - 0 1").unwrap();
        for mv in &board.generate_moves() {
            assert_ne!(board.piece_at(mv.to()).map(|(_, p)| p), Some(Piece::King));
        }
    }

    #[test]
    fn test_castling_blocked_by_attack() {
        // Black rook on f2 covers f1, so only queenside survives.
        let board = Board::from_fen("4k3/8/8/8/8/8/5r2/R3K2R w KQ - 0 1").unwrap();
        let castles: Vec<Move> = board
            .generate_moves()
            .iter()
            .copied()
            .filter(|m| m.is_castle())
            .collect();
        assert_eq!(castles.len(), 1);
        assert_eq!(castles[0].to(), Square::new(0, 2));
    }

    #[test]
    fn test_castling_blocked_by_piece() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R2QK2R w KQ - 0 1").unwrap();
        let castles: Vec<Move> = board
            .generate_moves()
            .iter()
            .copied()
            .filter(|m| m.is_castle())
            .collect();
        assert_eq!(castles.len(), 1);
        assert_eq!(castles[0].to(), Square::new(0, 6));
    }

    #[test]
    fn test_chess960_adjacent_king_rook_castle() {
        // King f1, rook g1: kingside castling swaps them through
        // overlapping squares.
        let mut board = Board::from_fen("7k/8/8/8/8/8/8/5KR1 w G - 0 1").unwrap();
        assert!(board.is_chess960());
        let castles: Vec<Move> = board
            .generate_moves()
            .iter()
            .copied()
            .filter(|m| m.is_castle())
            .collect();
        assert_eq!(castles.len(), 1);
        let mv = castles[0];
        let info = board.make_move(mv);
        assert_eq!(
            board.piece_at(Square::new(0, 6)),
            Some((Color::White, Piece::King))
        );
        assert_eq!(
            board.piece_at(Square::new(0, 5)),
            Some((Color::White, Piece::Rook))
        );
        assert_eq!(board.hash, board.calculate_hash());
        board.unmake_move(mv, info);
        assert_eq!(board.fen(), "7k/8/8/8/8/8/8/5KR1 w G - 0 1");
    }

    #[test]
    fn test_parse_move_basics() {
        let board = Board::new();
        let mv = board.parse_move("e2e4").unwrap();
        assert_eq!(mv.from(), Square::new(1, 4));
        assert_eq!(mv.to(), Square::new(3, 4));
        assert!(board.parse_move("e2e5").is_err());
        assert!(board.parse_move("e7e5").is_err());
        assert!(board.parse_move("xyz").is_err());
    }

    #[test]
    fn test_parse_move_castling_forms() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        // Standard king-two-squares form.
        let std_form = board.parse_move("e1g1").unwrap();
        assert!(std_form.is_castle());
        // King-onto-rook form (what GUIs send in Chess960 mode).
        let frc_form = board.parse_move("e1h1").unwrap();
        assert_eq!(std_form, frc_form);
    }

    #[test]
    fn test_parse_move_en_passant_and_promotion() {
        let board =
            Board::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();
        let ep = board.parse_move("e5f6").unwrap();
        assert!(ep.is_en_passant());

        let promo_board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let promo = promo_board.parse_move("a7a8q").unwrap();
        assert_eq!(promo.promotion_piece(), Some(Piece::Queen));
        let under = promo_board.parse_move("a7a8n").unwrap();
        assert_eq!(under.promotion_piece(), Some(Piece::Knight));
    }

    #[test]
    fn test_pinned_piece_moves_rejected_by_legality() {
        // White knight on d2 is pinned against the king by a rook on d8.
        let board = Board::from_fen("3r3k/8/8/8/8/8/3N4/3K4 w - - 0 1").unwrap();
        let pseudo = board.generate_moves();
        let legal = board.legal_moves();
        assert!(pseudo.len() > legal.len());
        for mv in &legal {
            assert_ne!(mv.from(), Square::new(1, 3));
        }
    }
}
