use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use peregrine::board::eval::{ClassicalEval, Evaluate};
use peregrine::board::search::{run_search, SearchSpec};
use peregrine::board::Board;
use peregrine::engine::time::TimeManager;
use peregrine::learning::LearningTable;
use peregrine::perft::perft;
use peregrine::sync::StopFlag;
use peregrine::tablebase::SyzygyTablebase;
use peregrine::tt::TranspositionTable;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_movegen(c: &mut Criterion) {
    let board = Board::from_fen(KIWIPETE).unwrap();
    c.bench_function("movegen_kiwipete", |b| {
        b.iter(|| black_box(board.generate_moves().len()));
    });
    c.bench_function("movegen_captures_kiwipete", |b| {
        b.iter(|| black_box(board.generate_captures().len()));
    });
}

fn bench_make_unmake(c: &mut Criterion) {
    let mut board = Board::from_fen(KIWIPETE).unwrap();
    let moves: Vec<_> = board.legal_moves().iter().copied().collect();
    c.bench_function("make_unmake_kiwipete", |b| {
        b.iter(|| {
            for &mv in &moves {
                let info = board.make_move(mv);
                board.unmake_move(mv, info);
            }
        });
    });
}

fn bench_see(c: &mut Criterion) {
    let board = Board::from_fen(KIWIPETE).unwrap();
    let captures: Vec<_> = board.generate_captures().iter().copied().collect();
    c.bench_function("see_kiwipete", |b| {
        b.iter(|| {
            let mut total = 0;
            for &mv in &captures {
                total += board.see(mv);
            }
            black_box(total)
        });
    });
}

fn bench_eval(c: &mut Criterion) {
    let board = Board::from_fen(KIWIPETE).unwrap();
    let evaluator = ClassicalEval::new(0);
    c.bench_function("eval_kiwipete", |b| {
        b.iter(|| black_box(evaluator.evaluate(&board)));
    });
}

fn bench_perft(c: &mut Criterion) {
    let mut board = Board::new();
    c.bench_function("perft_3_startpos", |b| {
        b.iter(|| black_box(perft(&mut board, 3)));
    });
}

fn bench_search(c: &mut Criterion) {
    c.bench_function("search_depth_5_startpos", |b| {
        b.iter(|| {
            let spec = SearchSpec {
                board: Board::new(),
                max_depth: 5,
                node_limit: 0,
                threads: 1,
                multi_pv: 1,
            };
            let tt = Arc::new(TranspositionTable::new(16));
            let tb = Arc::new(SyzygyTablebase::new());
            let evaluator: Arc<dyn Evaluate> = Arc::new(ClassicalEval::new(0));
            let learning = Arc::new(LearningTable::new());
            let time = Arc::new(TimeManager::new());
            let stop = StopFlag::new();
            black_box(run_search(&spec, &tt, &tb, &evaluator, &learning, &time, &stop).best_move)
        });
    });
}

criterion_group!(
    benches,
    bench_movegen,
    bench_make_unmake,
    bench_see,
    bench_eval,
    bench_perft,
    bench_search
);
criterion_main!(benches);
