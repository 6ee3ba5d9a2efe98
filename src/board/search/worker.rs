//! Per-thread search worker: negamax with the full pruning and
//! extension set, quiescence, move ordering, and the root
//! iterative-deepening loop over the worker's root-move partition.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::board::eval::Evaluate;
use crate::board::state::decode_piece;
use crate::board::types::{Color, Move, Piece, ScoredMove, ScoredMoveList, Square, MAX_PLY};
use crate::board::Board;
use crate::engine::time::TimeManager;
use crate::learning::LearningTable;
use crate::tablebase::SyzygyTablebase;
use crate::tt::{Bound, TranspositionTable};

use super::constants::*;
use super::history::{piece_index, HistoryTables};
use super::parallel::{help_search, try_split, SharedSearch};
use super::Frame;

pub(crate) struct SearchWorker {
    pub(crate) thread_id: usize,
    pub(crate) root_pos: Board,
    pub(crate) tt: Arc<TranspositionTable>,
    pub(crate) tb: Arc<SyzygyTablebase>,
    pub(crate) evaluator: Arc<dyn Evaluate>,
    pub(crate) learning: Arc<LearningTable>,
    pub(crate) time: Arc<TimeManager>,
    pub(crate) shared: Arc<SharedSearch>,
    pub(crate) stack: Vec<Frame>,
    pub(crate) history: HistoryTables,
    /// Set while running the work-stealing helper loop; an idle worker
    /// must not open split points of its own.
    pub(crate) idle: bool,
    pub(crate) root_moves: Vec<ScoredMove>,
}

impl SearchWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        thread_id: usize,
        root_pos: Board,
        root_moves: Vec<ScoredMove>,
        tt: Arc<TranspositionTable>,
        tb: Arc<SyzygyTablebase>,
        evaluator: Arc<dyn Evaluate>,
        learning: Arc<LearningTable>,
        time: Arc<TimeManager>,
        shared: Arc<SharedSearch>,
    ) -> Self {
        SearchWorker {
            thread_id,
            root_pos,
            tt,
            tb,
            evaluator,
            learning,
            time,
            shared,
            stack: Frame::fresh_stack(),
            history: HistoryTables::new(),
            idle: false,
            root_moves,
        }
    }

    /// Static evaluation plus the learning adjustment.
    #[inline]
    fn evaluate(&self, pos: &Board) -> i32 {
        self.evaluator.evaluate(pos) + self.learning.probe(pos.hash())
    }

    /// Count one node; every 256 nodes poll the stop flag and the time
    /// manager. Returns true when the search must unwind.
    #[inline]
    fn count_node_and_poll(&self) -> bool {
        let nodes = self.shared.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.shared.node_limit > 0 && nodes >= self.shared.node_limit {
            self.shared.stop.set();
            return true;
        }
        if nodes % 256 == 0 {
            if self.shared.stop.is_set() {
                return true;
            }
            if self.time.stop_early() {
                self.shared.stop.set();
                return true;
            }
        }
        false
    }

    /// Order a move for the search at `ply`.
    fn score_move(&self, pos: &mut Board, mv: Move, ply: usize, tt_move: Move) -> i32 {
        let mut score = 0;
        if mv == tt_move {
            score += TT_MOVE_SCORE;
        }
        if ply < MAX_PLY {
            if mv == self.stack[ply].killers[0] {
                score += KILLER1_SCORE;
            } else if mv == self.stack[ply].killers[1] {
                score += KILLER2_SCORE;
            }
        }
        if ply > 0 {
            let prev = self.stack[ply - 1].current_move;
            if prev != Move::NONE && mv == self.history.counter_move(prev) {
                score += COUNTER_SCORE;
            }
        }
        if ply > 1 {
            let prev2 = self.stack[ply - 2].current_move;
            if prev2 != Move::NONE && mv == self.history.follow_up_move(prev2) {
                score += FOLLOW_UP_SCORE;
            }
        }

        let us = pos.side_to_move();
        let Some((_, moving_piece)) = pos.piece_at(mv.from()) else {
            return score;
        };
        let moving_idx = piece_index(us, moving_piece);

        score += self.history.main(us, mv);
        score += self.history.butterfly(moving_idx, mv) / 4;
        score += self.history.correction(us, mv) / 8;
        if ply > 0 {
            let prev_idx = self.stack[ply - 1].current_piece_idx;
            if prev_idx >= 0 {
                let prev_to = self.stack[ply - 1].current_move.to().index();
                score +=
                    self.history
                        .continuation(prev_idx as usize, prev_to, moving_idx, mv)
                        / 8;
            }
        }

        if let Some((_, victim)) = pos.piece_at(mv.to()) {
            score += self.history.capture(moving_idx, victim, mv) / 4;
            score += CAPTURE_SCORE + pos.see(mv) * 100;
        } else if mv.is_en_passant() {
            score += CAPTURE_SCORE + pos.see(mv) * 100;
        }
        if pos.gives_check(mv) {
            score += CHECK_SCORE;
        }
        score
    }

    fn order_moves(
        &self,
        pos: &mut Board,
        moves: &crate::board::types::MoveList,
        ply: usize,
        tt_move: Move,
        excluded: Move,
    ) -> ScoredMoveList {
        let mut scored = ScoredMoveList::new();
        for &mv in moves {
            if mv == excluded {
                continue;
            }
            scored.push(mv, self.score_move(pos, mv, ply, tt_move));
        }
        scored.sort_desc();
        scored
    }

    /// Quiescence search: evasions when in check, captures otherwise,
    /// capped at `MAX_QSEARCH_DEPTH` plies past the entry point.
    pub(crate) fn quiescence(
        &mut self,
        pos: &mut Board,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        qdepth: i32,
    ) -> i32 {
        if ply >= MAX_PLY || qdepth >= MAX_QSEARCH_DEPTH {
            return self.evaluate(pos);
        }
        if self.count_node_and_poll() {
            return 0;
        }
        if pos.is_repetition(2) {
            return 0;
        }
        if self.tb.can_probe(pos) {
            if let Some(wdl) = self.tb.probe_wdl(pos) {
                self.shared.tb_hits.fetch_add(1, Ordering::Relaxed);
                return wdl.to_score(ply, MATE_SCORE);
            }
        }

        let in_check = pos.is_check();

        // Stand pat is meaningless in check: the side to move must play.
        let stand_pat = self.evaluate(pos);
        if !in_check {
            if stand_pat >= beta {
                return beta;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        }

        let moves = if in_check {
            pos.generate_moves()
        } else {
            pos.generate_captures()
        };

        // Sort by SEE, best exchanges first.
        let mut scored = ScoredMoveList::new();
        for &mv in &moves {
            scored.push(mv, pos.see(mv));
        }
        scored.sort_desc();

        let mut legal = 0u32;
        for sm in scored.iter() {
            let mv = sm.mv;
            if pos.piece_at(mv.to()).map(|(_, p)| p) == Some(Piece::King) {
                continue;
            }
            // Delta pruning: skip captures that cannot lift alpha even
            // with a safety margin.
            if !in_check && sm.score + 200 + stand_pat < alpha {
                continue;
            }

            let captured = pos.code_at(mv.to());
            let us = pos.side_to_move();
            let moving = pos.piece_at(mv.from()).map(|(_, p)| p);
            let info = pos.make_move(mv);
            if pos.mover_in_check() {
                pos.unmake_move(mv, info);
                continue;
            }
            if ply < MAX_PLY {
                self.stack[ply].current_move = mv;
                self.stack[ply].captured_piece = captured;
                let placed = mv.promotion_piece().or(moving);
                self.stack[ply].current_piece_idx =
                    placed.map_or(-1, |p| piece_index(us, p) as i16);
            }
            legal += 1;
            let score = -self.quiescence(pos, -beta, -alpha, ply + 1, qdepth + 1);
            pos.unmake_move(mv, info);

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        if in_check && legal == 0 {
            return -MATE_SCORE + ply as i32;
        }
        alpha
    }

    /// ProbCut: a reduced-depth null-window search over promising
    /// captures; a fail high over beta prunes this node.
    fn probcut(
        &mut self,
        pos: &mut Board,
        depth: i32,
        alpha: i32,
        beta: i32,
        ply: usize,
    ) -> Option<i32> {
        let margin = PROBCUT_MARGIN_BASE + PROBCUT_MARGIN_PER_DEPTH * depth;
        let captures = pos.generate_captures();
        for &mv in &captures {
            let Some((_, victim)) = pos.piece_at(mv.to()) else {
                continue;
            };
            if victim == Piece::King {
                continue;
            }
            let Some((_, attacker)) = pos.piece_at(mv.from()) else {
                continue;
            };
            if victim.value() - attacker.value() + margin < alpha {
                continue;
            }

            let info = pos.make_move(mv);
            if pos.mover_in_check() {
                pos.unmake_move(mv, info);
                continue;
            }
            let mut dummy = Vec::new();
            let score = -self.negamax(
                pos,
                depth - 4,
                -beta,
                -beta + 1,
                ply + 1,
                false,
                &mut dummy,
                Move::NONE,
            );
            pos.unmake_move(mv, info);
            if self.shared.stop.is_set() {
                return None;
            }
            if score >= beta {
                return Some(score);
            }
        }
        None
    }

    /// Negamax alpha-beta.
    #[allow(clippy::too_many_arguments, clippy::too_many_lines)]
    pub(crate) fn negamax(
        &mut self,
        pos: &mut Board,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        cut: bool,
        pv: &mut Vec<Move>,
        excluded: Move,
    ) -> i32 {
        pv.clear();
        if ply >= MAX_PLY {
            return self.evaluate(pos);
        }
        if self.count_node_and_poll() {
            return 0;
        }
        if pos.is_repetition(2) {
            return 0;
        }
        if depth <= 0 && self.tb.can_probe(pos) {
            if let Some(wdl) = self.tb.probe_wdl(pos) {
                self.shared.tb_hits.fetch_add(1, Ordering::Relaxed);
                return wdl.to_score(ply, MATE_SCORE);
            }
        }

        // Mate distance pruning.
        alpha = alpha.max(-MATE_SCORE + ply as i32);
        beta = beta.min(MATE_SCORE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        let in_check = pos.is_check();
        let static_eval = self.evaluate(pos);
        self.stack[ply].static_eval = static_eval;
        self.stack[ply].in_check = in_check;
        self.stack[ply].excluded_move = excluded;

        let key = pos.hash();
        let is_pv = beta > alpha + 1;
        let excluded_active = excluded != Move::NONE;
        let probe = self.tt.probe(key, depth as i16, alpha, beta);
        let mut tt_move = probe.mv;
        let tt_score = probe.score;

        // PV nodes keep searching so the principal variation stays
        // intact; the stored move still drives ordering.
        if probe.hit && !excluded_active && !is_pv {
            if probe.dtz != 0 {
                let dist = i32::from(probe.dtz.unsigned_abs());
                return if probe.dtz > 0 {
                    MATE_SCORE - dist - ply as i32
                } else {
                    -MATE_SCORE + dist + ply as i32
                };
            }
            // Mate scores are stored root-relative; bring them back to
            // this node's ply.
            let mut score = tt_score;
            if score > MATE_BOUND {
                score = (score - ply as i32).min(MATE_SCORE - 1);
            } else if score < -MATE_BOUND {
                score = (score + ply as i32).max(-MATE_SCORE + 1);
            }
            return score;
        }

        // Singular extension: with an exposed TT move whose score is not
        // a mate, verify at half depth that no other move reaches
        // tt_score - margin; if none does the TT move is forced.
        let mut singular_extension = 0;
        if !excluded_active
            && depth >= SINGULAR_EXTENSION_DEPTH
            && tt_move != Move::NONE
            && !in_check
            && tt_score.abs() < MATE_BOUND
        {
            let singular_beta = tt_score - SINGULAR_MARGIN;
            let mut dummy = Vec::new();
            let singular_score = self.negamax(
                pos,
                depth / 2,
                singular_beta - 1,
                singular_beta,
                ply,
                false,
                &mut dummy,
                tt_move,
            );
            if singular_score < singular_beta {
                singular_extension = 1;
            }
            // The verification ran at this same ply and overwrote the
            // frame's exclusion marker.
            self.stack[ply].excluded_move = excluded;
        }

        if depth <= 0 {
            return self.quiescence(pos, alpha, beta, ply, 0);
        }

        if !in_check && !excluded_active {
            // ProbCut.
            if depth >= PROBCUT_DEPTH && beta.abs() < MATE_SCORE - 1000 {
                if let Some(score) = self.probcut(pos, depth, alpha, beta, ply) {
                    return score;
                }
            }

            // Null move: hand the opponent a free move; if the reduced
            // search still fails high the node is good enough to prune.
            // Requires a non-pawn piece to dodge zugzwang traps.
            if depth >= 2 && cut {
                let us = pos.side_to_move();
                let has_non_pawn = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
                    .iter()
                    .any(|&p| !pos.bb(us, p).is_empty());
                if has_non_pawn {
                    let r = NULL_MOVE_R + depth / 6;
                    let info = pos.make_null_move();
                    let mut dummy = Vec::new();
                    let score = -self.negamax(
                        pos,
                        depth - r - 1,
                        -beta,
                        -beta + 1,
                        ply + 1,
                        false,
                        &mut dummy,
                        Move::NONE,
                    );
                    pos.unmake_null_move(info);
                    if self.shared.stop.is_set() {
                        return 0;
                    }
                    if score >= beta {
                        return beta;
                    }
                }
            }

            // Razoring: hopeless static eval drops into quiescence (or a
            // reduced search at higher depth) to confirm the fail low.
            if depth <= 6 {
                let margin = match depth {
                    d if d <= 1 => RAZOR_MARGIN_D1,
                    2 => RAZOR_MARGIN_D2,
                    3 => RAZOR_MARGIN_D3,
                    d => RAZOR_MARGIN_D3 + 50 * (d - 3),
                };
                if static_eval + margin < alpha {
                    let razor_score = if depth <= 3 {
                        self.quiescence(pos, alpha, alpha + 1, ply, 0)
                    } else {
                        let mut dummy = Vec::new();
                        self.negamax(
                            pos,
                            depth - 4,
                            alpha,
                            alpha + 1,
                            ply,
                            false,
                            &mut dummy,
                            Move::NONE,
                        )
                    };
                    if razor_score <= alpha {
                        return razor_score;
                    }
                }
            }

            // Static null move (reverse futility).
            if depth > 7 && static_eval - STATIC_NULL_MARGIN >= beta {
                return static_eval;
            }

            // Full-node futility.
            if depth <= 7 && static_eval - FUTILITY_MARGIN_FACTOR * depth >= beta {
                return static_eval;
            }
        }

        // Internal iterative deepening: without a TT move at real depth,
        // run a reduced search just to seed one for ordering.
        if tt_move == Move::NONE && depth >= IID_DEPTH && !excluded_active {
            let mut dummy = Vec::new();
            self.negamax(
                pos,
                depth - IID_REDUCTION,
                alpha,
                beta,
                ply,
                false,
                &mut dummy,
                Move::NONE,
            );
            tt_move = self.tt.probe(key, 0, alpha, beta).mv;
        }

        let moves = pos.generate_moves();
        if moves.is_empty() {
            return if in_check {
                -MATE_SCORE + ply as i32
            } else {
                0
            };
        }
        let scored = self.order_moves(pos, &moves, ply, tt_move, excluded);

        // Multi-cut: if several reduced-depth siblings already beat
        // beta, trust the cut without a full search.
        if depth >= MULTICUT_DEPTH && !in_check && cut && tt_move != Move::NONE && !excluded_active
        {
            let mut fail_highs = 0;
            for sm in scored.iter().take(4) {
                let mv = sm.mv;
                if mv == tt_move {
                    continue;
                }
                if pos.piece_at(mv.to()).map(|(_, p)| p) == Some(Piece::King) {
                    continue;
                }
                if fail_highs >= 2 {
                    break;
                }
                let info = pos.make_move(mv);
                if pos.mover_in_check() {
                    pos.unmake_move(mv, info);
                    continue;
                }
                let mut dummy = Vec::new();
                let score = -self.negamax(
                    pos,
                    depth / 2,
                    -beta,
                    -beta + 1,
                    ply + 1,
                    false,
                    &mut dummy,
                    Move::NONE,
                );
                pos.unmake_move(mv, info);
                if self.shared.stop.is_set() {
                    return 0;
                }
                if score >= beta {
                    fail_highs += 1;
                    if fail_highs >= 2 {
                        return beta;
                    }
                }
            }
        }

        // YBWC: at a wide, deep node offer the siblings to idle workers.
        if !excluded_active {
            if let Some((split_score, split_move, split_pv)) =
                try_split(self, pos, &scored, depth, ply, alpha, beta, cut)
            {
                if split_score != -INF {
                    let bound = if split_score >= beta {
                        Bound::Lower
                    } else if split_score > alpha {
                        Bound::Exact
                    } else {
                        Bound::Upper
                    };
                    if !self.shared.stop.is_set() {
                        self.tt.store(
                            key,
                            depth as i16,
                            Self::score_to_tt(split_score, ply),
                            bound,
                            split_move,
                            0,
                        );
                    }
                    *pv = split_pv;
                    return split_score;
                }
            }
        }

        self.search_moves(
            pos, &scored, depth, alpha, beta, ply, in_check, static_eval, key, excluded, pv,
            singular_extension, tt_move,
        )
    }

    /// The main move loop of a node.
    #[allow(clippy::too_many_arguments, clippy::too_many_lines)]
    fn search_moves(
        &mut self,
        pos: &mut Board,
        scored: &ScoredMoveList,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        in_check: bool,
        static_eval: i32,
        key: u64,
        excluded: Move,
        pv: &mut Vec<Move>,
        singular_extension: i32,
        tt_move: Move,
    ) -> i32 {
        // Improving: static eval rose against the same side's previous
        // frame; meaningless when either position was in check.
        let improving = ply >= 2
            && !in_check
            && !self.stack[ply - 2].in_check
            && static_eval > self.stack[ply - 2].static_eval;

        let mut best_score = -INF;
        let mut best_move = Move::NONE;
        let mut bound = Bound::Upper;
        let mut legal = 0u32;

        for (i, sm) in scored.iter().enumerate() {
            let mv = sm.mv;
            if pos.piece_at(mv.to()).map(|(_, p)| p) == Some(Piece::King) {
                continue;
            }
            let captured = pos.code_at(mv.to());
            let is_capture_target = captured != 0;

            // Per-move futility on quiet moves at shallow depth.
            if depth <= 3 && !in_check && !is_capture_target {
                let mut margin = SEE_QUIET_MARGIN + depth * 50;
                if sm.score < CAPTURE_SCORE {
                    margin += 4 * depth;
                }
                if static_eval + margin <= alpha {
                    continue;
                }
            }

            // Late move pruning: quiet moves sorted this late rarely
            // rescue the node; improving positions get a looser bound.
            if !is_capture_target
                && !in_check
                && depth <= 7
                && i >= LMP_BASE + depth as usize * LMP_FACTOR
            {
                if !improving {
                    continue;
                }
                if i >= LMP_BASE + depth as usize * LMP_FACTOR * 2 {
                    continue;
                }
            }

            let us = pos.side_to_move();
            let moving_piece = pos.piece_at(mv.from()).map(|(_, p)| p);
            let gives_check = pos.gives_check(mv);

            let info = pos.make_move(mv);
            if pos.mover_in_check() {
                pos.unmake_move(mv, info);
                continue;
            }
            legal += 1;

            self.stack[ply].current_move = mv;
            self.stack[ply].captured_piece = captured;
            let placed = mv.promotion_piece().or(moving_piece);
            self.stack[ply].current_piece_idx = placed.map_or(-1, |p| piece_index(us, p) as i16);

            // Extensions: evading check, recapturing on the previous
            // ply's capture square, pushing a passed pawn past the
            // midline, or giving check; capped at depth + 2 total.
            let mut new_depth = depth - 1;
            if in_check {
                new_depth += 1;
            }
            let mut extension = 0;
            if ply > 0
                && self.stack[ply - 1].captured_piece != 0
                && mv.to() == self.stack[ply - 1].current_move.to()
            {
                extension = 1;
            } else if moving_piece == Some(Piece::Pawn)
                && pos.is_passed_pawn(mv.to(), us)
                && Self::crosses_midline(mv.to(), us)
            {
                extension = 1;
            }
            if gives_check {
                extension += 1;
            }
            if mv == tt_move {
                extension += singular_extension;
            }
            new_depth = (new_depth + extension).min(depth + 2);

            let mut child_pv = Vec::new();
            let mut score;
            if legal == 1 {
                score = -self.negamax(
                    pos,
                    new_depth,
                    -beta,
                    -alpha,
                    ply + 1,
                    true,
                    &mut child_pv,
                    Move::NONE,
                );
            } else {
                let reduction = if is_capture_target {
                    0
                } else {
                    Self::reduction(improving, depth, i, sm.score, gives_check)
                };
                score = -self.negamax(
                    pos,
                    new_depth - reduction,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                    true,
                    &mut child_pv,
                    Move::NONE,
                );
                if score > alpha && score < beta {
                    score = -self.negamax(
                        pos,
                        new_depth,
                        -beta,
                        -alpha,
                        ply + 1,
                        true,
                        &mut child_pv,
                        Move::NONE,
                    );
                }
            }
            pos.unmake_move(mv, info);

            if self.shared.stop.is_set() {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                pv.clear();
                pv.push(mv);
                pv.append(&mut child_pv);
                if score > alpha {
                    alpha = score;
                    bound = Bound::Exact;
                    if score >= beta {
                        bound = Bound::Lower;
                        self.record_cutoff(pos, scored, i, mv, is_capture_target, depth, ply);
                        break;
                    }
                }
            }
        }

        if legal == 0 {
            best_score = if in_check {
                -MATE_SCORE + ply as i32
            } else {
                0
            };
            bound = Bound::Exact;
            best_move = Move::NONE;
        }

        if !self.shared.stop.is_set() && excluded == Move::NONE {
            self.tt.store(
                key,
                depth as i16,
                Self::score_to_tt(best_score, ply),
                bound,
                best_move,
                0,
            );
        }
        best_score
    }

    /// Beta-cutoff bookkeeping: killers, counter/follow-up slots and
    /// history boosts for the cutoff move, penalties for the moves
    /// ordered before it.
    fn record_cutoff(
        &mut self,
        pos: &Board,
        scored: &ScoredMoveList,
        cutoff_idx: usize,
        mv: Move,
        was_capture: bool,
        depth: i32,
        ply: usize,
    ) {
        let us = pos.side_to_move();
        let moving = pos.piece_at(mv.from()).map(|(_, p)| p);
        let Some(moving) = moving else { return };
        let moving_idx = piece_index(us, moving);

        if !was_capture {
            // Singular verification searches run with a move excluded;
            // their cutoffs must not displace real killers.
            if ply < MAX_PLY
                && self.stack[ply].excluded_move == Move::NONE
                && self.stack[ply].killers[0] != mv
            {
                self.stack[ply].killers[1] = self.stack[ply].killers[0];
                self.stack[ply].killers[0] = mv;
            }
            self.history
                .update_history(us, moving_idx, mv, None, depth, true);
            self.history.update_correction(us, mv, depth, true);
            self.update_continuation_at(ply, moving_idx, mv, depth, true);

            for sm in scored.iter().take(cutoff_idx) {
                let earlier = sm.mv;
                if pos.code_at(earlier.to()) != 0 {
                    continue;
                }
                let Some((_, earlier_piece)) = pos.piece_at(earlier.from()) else {
                    continue;
                };
                let earlier_idx = piece_index(us, earlier_piece);
                self.history
                    .update_history(us, earlier_idx, earlier, None, depth, false);
                self.history.update_correction(us, earlier, depth, false);
                self.update_continuation_at(ply, earlier_idx, earlier, depth, false);
            }

            if ply > 0 {
                let prev = self.stack[ply - 1].current_move;
                if prev != Move::NONE {
                    self.history.set_counter_move(prev, mv);
                }
            }
            if ply > 1 {
                let prev2 = self.stack[ply - 2].current_move;
                if prev2 != Move::NONE {
                    self.history.set_follow_up_move(prev2, mv);
                }
            }
        } else {
            let victim = decode_piece(pos.code_at(mv.to())).map(|(_, p)| p);
            self.history
                .update_history(us, moving_idx, mv, victim, depth, true);
            for sm in scored.iter().take(cutoff_idx) {
                let earlier = sm.mv;
                let Some((_, earlier_victim)) = pos.piece_at(earlier.to()) else {
                    continue;
                };
                let Some((_, earlier_piece)) = pos.piece_at(earlier.from()) else {
                    continue;
                };
                self.history.update_history(
                    us,
                    piece_index(us, earlier_piece),
                    earlier,
                    Some(earlier_victim),
                    depth,
                    false,
                );
            }
        }
    }

    fn update_continuation_at(
        &mut self,
        ply: usize,
        moving_idx: usize,
        mv: Move,
        depth: i32,
        good: bool,
    ) {
        if ply == 0 {
            return;
        }
        let prev_idx = self.stack[ply - 1].current_piece_idx;
        if prev_idx < 0 {
            return;
        }
        let prev_to = self.stack[ply - 1].current_move.to().index();
        self.history
            .update_continuation(prev_idx as usize, prev_to, moving_idx, mv, depth, good);
    }

    /// Late-move reduction amount.
    fn reduction(improving: bool, depth: i32, move_idx: usize, move_score: i32, check: bool) -> i32 {
        let mut r = LMR_BASE + (move_idx / LMR_DIV) as i32;
        if depth < 3 {
            r = 0;
        }
        if !improving {
            r += 1;
        }
        if check {
            r -= 1;
        }
        if move_score < LMR_SCORE_THRESHOLD {
            r += 1;
        }
        r.max(0).min((depth - 2).max(0))
    }

    /// A pawn on `sq` has crossed its own half of the board.
    fn crosses_midline(sq: Square, us: Color) -> bool {
        match us {
            Color::White => sq.rank() >= 4,
            Color::Black => sq.rank() <= 3,
        }
    }

    /// Convert a node-relative mate score to the root-relative form the
    /// transposition table stores.
    fn score_to_tt(score: i32, ply: usize) -> i32 {
        if score > MATE_BOUND {
            score + ply as i32
        } else if score < -MATE_BOUND {
            score - ply as i32
        } else {
            score
        }
    }

    /// Root iterative deepening over this worker's partition.
    pub(crate) fn search_root(&mut self, max_depth: i32) {
        let mut best_move = self.root_moves.first().map_or(Move::NONE, |sm| sm.mv);
        let mut best_score = -INF;
        let mut prev_best = Move::NONE;
        let root_pos = self.root_pos.clone();

        'deepening: for depth in 1..=max_depth.max(1) {
            if self.shared.stop.is_set() {
                break;
            }
            if depth > 1 && !self.time.time_for_depth() {
                break;
            }

            // Re-score the partition with the freshest heuristics; the
            // previous best is pinned to the front.
            {
                let mut scratch = root_pos.clone();
                let pin = best_move;
                for i in 0..self.root_moves.len() {
                    let mv = self.root_moves[i].mv;
                    let score = if mv == pin && pin != Move::NONE {
                        ROOT_PREV_BEST_SCORE
                    } else {
                        self.score_move(&mut scratch, mv, 0, prev_best)
                    };
                    self.root_moves[i].score = score;
                }
            }
            self.root_moves.sort_by(|a, b| b.score.cmp(&a.score));

            let (mut alpha, mut beta) = if depth >= 5 && best_score.abs() < INF {
                (best_score - ASPIRATION_WINDOW, best_score + ASPIRATION_WINDOW)
            } else {
                (-INF, INF)
            };

            let mut depth_best = Move::NONE;
            let mut depth_score = -INF;
            let mut depth_pv: Vec<Move> = Vec::new();
            let mut widen = ASPIRATION_WIDEN;

            loop {
                depth_best = Move::NONE;
                depth_score = -INF;
                let mut window_alpha = alpha;

                for i in 0..self.root_moves.len() {
                    if self.shared.stop.is_set() {
                        break;
                    }
                    let mv = self.root_moves[i].mv;
                    let mut pos = root_pos.clone();
                    let captured = pos.code_at(mv.to());
                    let us = pos.side_to_move();
                    let moving = pos.piece_at(mv.from()).map(|(_, p)| p);

                    let info = pos.make_move(mv);
                    if pos.mover_in_check() {
                        pos.unmake_move(mv, info);
                        continue;
                    }
                    self.stack[0].current_move = mv;
                    self.stack[0].captured_piece = captured;
                    let placed = mv.promotion_piece().or(moving);
                    self.stack[0].current_piece_idx =
                        placed.map_or(-1, |p| piece_index(us, p) as i16);

                    let mut line = Vec::new();
                    let mut score;
                    if depth_best == Move::NONE || window_alpha == -INF {
                        score = -self.negamax(
                            &mut pos,
                            depth - 1,
                            -beta,
                            -window_alpha,
                            1,
                            true,
                            &mut line,
                            Move::NONE,
                        );
                    } else {
                        score = -self.negamax(
                            &mut pos,
                            depth - 1,
                            -window_alpha - 1,
                            -window_alpha,
                            1,
                            true,
                            &mut line,
                            Move::NONE,
                        );
                        if !self.shared.stop.is_set() && score > window_alpha && score < beta {
                            score = -self.negamax(
                                &mut pos,
                                depth - 1,
                                -beta,
                                -window_alpha,
                                1,
                                true,
                                &mut line,
                                Move::NONE,
                            );
                        }
                    }

                    if self.shared.stop.is_set() {
                        break;
                    }

                    let mut full_line = vec![mv];
                    full_line.append(&mut line);
                    self.shared.publish_root_info(mv, score, &full_line);

                    if score > depth_score {
                        depth_score = score;
                        depth_best = mv;
                        depth_pv = full_line;
                    }
                    if score > window_alpha {
                        window_alpha = score;
                    }
                }

                if self.shared.stop.is_set() || depth < 5 {
                    break;
                }
                // Widen the failed side; the step doubles per retry and
                // mate-bound fails jump straight to the full window so a
                // forced mate cannot grind through dozens of re-searches.
                if depth_score <= alpha && alpha > -INF {
                    alpha = if depth_score <= -MATE_BOUND {
                        -INF
                    } else {
                        (alpha - widen).max(-INF)
                    };
                    widen *= 2;
                } else if depth_score >= beta && beta < INF {
                    beta = if depth_score >= MATE_BOUND {
                        INF
                    } else {
                        (beta + widen).min(INF)
                    };
                    widen *= 2;
                } else {
                    break;
                }
            }

            if !self.shared.stop.is_set() && depth_best != Move::NONE {
                best_move = depth_best;
                best_score = depth_score;
                if self.thread_id == 0 {
                    let changed = depth_best != prev_best;
                    self.time.update(best_score, changed);
                    if self.shared.multi_pv <= 1 {
                        self.output_info(depth, best_score, &depth_pv);
                    }
                }
                prev_best = depth_best;
            }

            if self.shared.multi_pv > 1 {
                if !self.shared.barrier.wait(&self.shared.stop) {
                    break 'deepening;
                }
                if self.thread_id == 0 {
                    self.output_multipv(depth);
                }
                if !self.shared.barrier.wait(&self.shared.stop) {
                    break 'deepening;
                }
            }
        }

        if best_move != Move::NONE {
            self.shared.publish_best(best_move, best_score);
        }

        self.shared.barrier.leave();
        let remaining = self.shared.searching.fetch_sub(1, Ordering::AcqRel) - 1;
        self.shared.wake_helpers();
        if remaining > 0 && self.shared.total_threads > 1 {
            self.idle = true;
            help_search(self);
        }
    }

    /// One `info` line per completed depth (thread 0, single-PV mode).
    /// The PV is replayed from the root and truncated at the first move
    /// that fails legality validation, guarding against hash collisions.
    fn output_info(&self, depth: i32, score: i32, pv: &[Move]) {
        let elapsed = self.time.elapsed_ms().max(0) as u64;
        let nodes = self.shared.nodes.load(Ordering::Relaxed);
        let nps = if elapsed > 0 { nodes * 1000 / elapsed } else { 0 };
        let tb_hits = self.shared.tb_hits.load(Ordering::Relaxed);

        let mut line = format!(
            "info depth {} {} nodes {} nps {} time {} tbhits {} pv",
            depth,
            Self::format_score(score),
            nodes,
            nps,
            elapsed,
            tb_hits
        );
        let mut replay = self.root_pos.clone();
        for &mv in pv {
            if !replay.is_legal_move(mv) {
                break;
            }
            line.push(' ');
            line.push_str(&replay.move_to_uci(mv));
            replay.make_move(mv);
        }
        println!("{line}");
    }

    /// Top-K `info ... multipv` lines after a depth barrier.
    fn output_multipv(&self, depth: i32) {
        let mut infos = self.shared.root_infos.lock().clone();
        infos.sort_by(|a, b| b.score.cmp(&a.score));
        let elapsed = self.time.elapsed_ms().max(0) as u64;
        let nodes = self.shared.nodes.load(Ordering::Relaxed);
        let nps = if elapsed > 0 { nodes * 1000 / elapsed } else { 0 };

        for (rank, entry) in infos
            .iter()
            .filter(|info| info.score > -INF + 1000)
            .take(self.shared.multi_pv as usize)
            .enumerate()
        {
            let mut line = format!(
                "info depth {} multipv {} {} nodes {} nps {} time {} pv",
                depth,
                rank + 1,
                Self::format_score(entry.score),
                nodes,
                nps,
                elapsed
            );
            let mut replay = self.root_pos.clone();
            for &mv in &entry.pv {
                if !replay.is_legal_move(mv) {
                    break;
                }
                line.push(' ');
                line.push_str(&replay.move_to_uci(mv));
                replay.make_move(mv);
            }
            println!("{line}");
        }
    }

    /// `cp N`, or `mate N` in full moves once a mate bound is reached.
    fn format_score(score: i32) -> String {
        if score > MATE_SCORE - 1000 {
            let plies = MATE_SCORE - score;
            format!("score mate {}", (plies + 1) / 2)
        } else if score < -(MATE_SCORE - 1000) {
            let plies = MATE_SCORE + score;
            format!("score mate -{}", (plies + 1) / 2)
        } else {
            format!("score cp {score}")
        }
    }
}
