//! Search sanity tests at shallow depth.

use std::sync::Arc;

use crate::board::eval::ClassicalEval;
use crate::board::search::{run_search, SearchOutcome, SearchSpec};
use crate::board::Board;
use crate::engine::time::TimeManager;
use crate::learning::LearningTable;
use crate::sync::StopFlag;
use crate::tablebase::SyzygyTablebase;
use crate::tt::TranspositionTable;

fn search(fen: &str, depth: i32, threads: usize) -> SearchOutcome {
    search_multipv(fen, depth, threads, 1)
}

fn search_multipv(fen: &str, depth: i32, threads: usize, multi_pv: u32) -> SearchOutcome {
    let spec = SearchSpec {
        board: Board::from_fen(fen).expect("valid fen"),
        max_depth: depth,
        node_limit: 0,
        threads,
        multi_pv,
    };
    let tt = Arc::new(TranspositionTable::new(16));
    let tb = Arc::new(SyzygyTablebase::new());
    let evaluator: Arc<dyn crate::board::eval::Evaluate> = Arc::new(ClassicalEval::new(0));
    let learning = Arc::new(LearningTable::new());
    let time = Arc::new(TimeManager::new());
    let stop = StopFlag::new();
    run_search(&spec, &tt, &tb, &evaluator, &learning, &time, &stop)
}

const MATE: i32 = 32000;

#[test]
fn test_depth_one_returns_legal_move() {
    let outcome = search(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        1,
        1,
    );
    let board = Board::new();
    assert!(board.is_legal_move(outcome.best_move));
}

#[test]
fn test_finds_back_rank_mate_in_one() {
    let outcome = search("6k1/5ppp/8/8/8/8/8/4R1K1 w - - 0 1", 4, 1);
    assert_eq!(outcome.best_move.to_string(), "e1e8");
    assert_eq!(outcome.best_score, MATE - 1);
}

#[test]
fn test_mate_score_prefers_shortest() {
    // Kf3 + Qg2 vs Kh3: mate in two moves (three plies).
    let outcome = search("8/8/8/8/8/5K1k/6Q1/8 w - - 0 1", 7, 1);
    assert_eq!(outcome.best_score, MATE - 3);
    // The winning line must actually mate when replayed.
    let mut board = Board::from_fen("8/8/8/8/8/5K1k/6Q1/8 w - - 0 1").unwrap();
    for mv in &outcome.pv {
        assert!(board.is_legal_move(*mv), "pv move {mv} not legal");
        board.make_move(*mv);
    }
    assert!(board.is_check());
    assert!(board.legal_moves().is_empty());
}

#[test]
fn test_avoids_hanging_the_queen() {
    // Qxd5 would lose the queen to exd5.
    let outcome = search("3k4/8/4p3/3p4/8/3Q4/8/3K4 w - - 0 1", 4, 1);
    assert_ne!(outcome.best_move.to_string(), "d3d5");
}

#[test]
fn test_no_legal_moves_reports_none() {
    // Stalemate: there is nothing to search.
    let outcome = search("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 3, 1);
    assert_eq!(outcome.best_move, crate::board::Move::NONE);
}

#[test]
fn test_single_threaded_determinism() {
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
    let first = search(fen, 5, 1);
    let second = search(fen, 5, 1);
    assert_eq!(first.best_move, second.best_move);
}

#[test]
fn test_multipv_barrier_single_thread() {
    let outcome = search_multipv(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        4,
        1,
        2,
    );
    assert!(Board::new().is_legal_move(outcome.best_move));
}

#[test]
fn test_multipv_barrier_two_threads() {
    let outcome = search_multipv(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        5,
        2,
        2,
    );
    assert!(Board::new().is_legal_move(outcome.best_move));
}

#[test]
fn test_multithreaded_search_completes_with_legal_move() {
    let outcome = search(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        6,
        4,
    );
    let board = Board::new();
    assert!(board.is_legal_move(outcome.best_move));
}
