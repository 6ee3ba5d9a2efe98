//! Static Exchange Evaluation.
//!
//! Estimates the signed material outcome of the capture sequence on a
//! move's destination square, assuming both sides always recapture with
//! their cheapest attacker and may stand pat when continuing loses.

use super::state::Board;
use super::types::{Move, Piece};

const MAX_EXCHANGES: usize = 32;

impl Board {
    /// Signed material gain of `mv` for the side to move, in
    /// centipawns. Zero when the move captures nothing.
    #[must_use]
    pub fn see(&self, mv: Move) -> i32 {
        if mv == Move::NONE || mv == Move::NULL {
            return 0;
        }
        let from = mv.from();
        let to = mv.to();
        let us = self.side;

        // The initial attacker leaves its square; the victim leaves the
        // board before the attacker lands, exposing x-ray attackers on
        // every later attacks_to recomputation.
        let mut occ = self.occupied.0 & !from.bit();

        let victim = if mv.is_en_passant() {
            let cap_sq = to.offset(-us.forward());
            occ &= !cap_sq.bit();
            Piece::Pawn
        } else {
            match self.piece_at(to) {
                Some((_, piece)) => {
                    occ &= !to.bit();
                    piece
                }
                None => return 0,
            }
        };

        let initial = match self.piece_at(from) {
            Some((_, piece)) => piece,
            None => return 0,
        };
        let mut piece_on_to = mv.promotion_piece().unwrap_or(initial);
        occ |= to.bit();

        let mut gain = [0i32; MAX_EXCHANGES];
        let mut depth = 0;
        gain[0] = victim.value();

        let mut stm = us.opponent();
        loop {
            // Cheapest attacker of the side to move that still reaches
            // the square under the current occupancy.
            let attackers = self.attacks_to(to, occ) & occ;
            let mut next: Option<(Piece, u64)> = None;
            for piece in Piece::ALL {
                let bb = self.bb(stm, piece).0 & attackers;
                if bb != 0 {
                    next = Some((piece, bb & bb.wrapping_neg()));
                    break;
                }
            }
            let Some((attacker, attacker_bit)) = next else {
                break;
            };

            depth += 1;
            if depth >= MAX_EXCHANGES {
                break;
            }
            gain[depth] = piece_on_to.value() - gain[depth - 1];

            occ &= !attacker_bit;
            piece_on_to = attacker;
            stm = stm.opponent();
        }

        // Minimax roll-up: each side captures only if it helps.
        while depth > 0 {
            gain[depth - 1] = -(-gain[depth - 1]).max(gain[depth]);
            depth -= 1;
        }
        gain[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn see_of(fen: &str, mv_text: &str) -> i32 {
        let board = Board::from_fen(fen).unwrap();
        let mv = board.parse_move(mv_text).unwrap();
        board.see(mv)
    }

    #[test]
    fn test_free_pawn() {
        assert_eq!(see_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 100);
    }

    #[test]
    fn test_defended_pawn_equal_trade() {
        assert_eq!(
            see_of("4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"),
            0
        );
    }

    #[test]
    fn test_knight_takes_defended_pawn_loses() {
        let see = see_of("4k3/8/2p5/3p4/4N3/8/8/4K3 w - - 0 1", "e4d5");
        assert_eq!(see, 100 - 320);
    }

    #[test]
    fn test_queen_takes_defended_pawn_loses_badly() {
        let see = see_of("4k3/8/2p5/3p4/4Q3/8/8/4K3 w - - 0 1", "e4d5");
        assert_eq!(see, 100 - 900);
    }

    #[test]
    fn test_xray_recapture_counts() {
        // Rook takes the d5 pawn; a second black rook behind the first
        // recaptures through the x-ray.
        let see = see_of("3r4/3r4/8/3p4/8/8/3R4/3RK2k w - - 0 1", "d2d5");
        // RxP, rxR, RxR, rxR: 100 - 500 + 500 - 500 = -300... both sides
        // play optimally so White just loses rook for pawn if it starts.
        assert!(see < 0);
    }

    #[test]
    fn test_en_passant_is_a_pawn_trade() {
        let board =
            Board::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();
        let mv = board.parse_move("e5f6").unwrap();
        assert!(mv.is_en_passant());
        // Winning a pawn, but g7 recaptures: net zero.
        assert_eq!(board.see(mv), 0);
    }

    #[test]
    fn test_non_capture_is_zero() {
        let board = Board::new();
        let mv = board.parse_move("e2e4").unwrap();
        assert_eq!(board.see(mv), 0);
        assert_eq!(board.see(Move::NULL), 0);
        assert_eq!(board.see(Move::NONE), 0);
    }

    #[test]
    fn test_sign_matches_simple_outcomes() {
        // Bishop takes knight defended by pawn: roughly even minus the
        // minor exchange difference, must not be positive.
        let see = see_of("4k3/8/5p2/4n3/8/2B5/8/4K3 w - - 0 1", "c3e5");
        assert!(see <= 0);
        // Undefended knight: clean win.
        let see = see_of("4k3/8/8/4n3/8/2B5/8/4K3 w - - 0 1", "c3e5");
        assert_eq!(see, 320);
    }
}
