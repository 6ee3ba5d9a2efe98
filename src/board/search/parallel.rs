//! Parallel search coordination.
//!
//! The coordinator partitions the legal root moves contiguously across
//! worker threads, each running its own iterative deepening. Workers
//! share the transposition table, the stop flag, a node counter and a
//! best-move/best-score latch. Deep, wide nodes may be opened as YBWC
//! split points; workers whose partition is exhausted steal sibling
//! moves from published split points until the whole search winds down.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::board::eval::Evaluate;
use crate::board::types::{Move, ScoredMove, ScoredMoveList};
use crate::board::Board;
use crate::engine::time::TimeManager;
use crate::learning::LearningTable;
use crate::sync::StopFlag;
use crate::tablebase::SyzygyTablebase;
use crate::tt::TranspositionTable;

use super::constants::INF;
use super::worker::SearchWorker;
use super::RootMoveInfo;

/// Worker threads get a deep stack; the search recursion plus move
/// lists would overflow the platform default.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

pub(crate) const MAX_THREADS: usize = 64;

/// Split-point eligibility bounds.
const SPLIT_MIN_DEPTH: i32 = 6;
const SPLIT_MIN_MOVES: usize = 6;

const HELPER_POLL: Duration = Duration::from_millis(10);

/// State shared by every worker of one search.
pub(crate) struct SharedSearch {
    pub stop: StopFlag,
    pub nodes: AtomicU64,
    pub node_limit: u64,
    pub tb_hits: AtomicU64,
    pub multi_pv: u32,
    pub total_threads: usize,
    best_score: AtomicI32,
    best_move: AtomicU32,
    splits: Mutex<Vec<Arc<SplitPoint>>>,
    splits_cv: Condvar,
    /// Workers still inside their root loop; helpers exit at zero.
    pub searching: AtomicUsize,
    pub root_infos: Mutex<Vec<RootMoveInfo>>,
    pub barrier: DepthBarrier,
}

impl SharedSearch {
    fn new(
        stop: StopFlag,
        node_limit: u64,
        multi_pv: u32,
        total_threads: usize,
        root_moves: &[Move],
    ) -> Self {
        let infos = root_moves
            .iter()
            .map(|&mv| RootMoveInfo {
                mv,
                score: -INF,
                pv: Vec::new(),
            })
            .collect();
        SharedSearch {
            stop,
            nodes: AtomicU64::new(0),
            node_limit,
            tb_hits: AtomicU64::new(0),
            multi_pv,
            total_threads,
            best_score: AtomicI32::new(-INF),
            best_move: AtomicU32::new(Move::NONE.as_u32()),
            splits: Mutex::new(Vec::new()),
            splits_cv: Condvar::new(),
            searching: AtomicUsize::new(total_threads),
            root_infos: Mutex::new(infos),
            barrier: DepthBarrier::new(total_threads),
        }
    }

    /// Publish a worker's result; only strictly improving scores win.
    pub(crate) fn publish_best(&self, mv: Move, score: i32) {
        let mut prev = self.best_score.load(Ordering::Relaxed);
        while score > prev {
            match self.best_score.compare_exchange_weak(
                prev,
                score,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.best_move.store(mv.as_u32(), Ordering::Relaxed);
                    break;
                }
                Err(current) => prev = current,
            }
        }
    }

    fn best(&self) -> (Move, i32) {
        (
            Move::from_u32(self.best_move.load(Ordering::Relaxed)),
            self.best_score.load(Ordering::Relaxed),
        )
    }

    /// Record the latest score and line for one root move.
    pub(crate) fn publish_root_info(&self, mv: Move, score: i32, pv: &[Move]) {
        let mut infos = self.root_infos.lock();
        if let Some(entry) = infos.iter_mut().find(|info| info.mv == mv) {
            entry.score = score;
            entry.pv = pv.to_vec();
        }
    }

    pub(crate) fn wake_helpers(&self) {
        let _guard = self.splits.lock();
        self.splits_cv.notify_all();
    }
}

/// Barrier for the per-depth MultiPV synchronization. Participants are
/// the spawned workers; a worker that abandons iterative deepening
/// calls `leave` so the others never wait for it.
pub(crate) struct DepthBarrier {
    state: Mutex<BarrierState>,
    cv: Condvar,
}

struct BarrierState {
    participants: usize,
    arrived: usize,
    generation: u64,
}

impl DepthBarrier {
    fn new(participants: usize) -> Self {
        DepthBarrier {
            state: Mutex::new(BarrierState {
                participants,
                arrived: 0,
                generation: 0,
            }),
            cv: Condvar::new(),
        }
    }

    /// Wait for every remaining participant. Returns false when the
    /// rendezvous was abandoned (stop flag set while waiting).
    pub(crate) fn wait(&self, stop: &StopFlag) -> bool {
        let mut state = self.state.lock();
        if state.participants <= 1 {
            return true;
        }
        state.arrived += 1;
        if state.arrived >= state.participants {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cv.notify_all();
            return true;
        }
        let generation = state.generation;
        while state.generation == generation {
            if stop.is_set() {
                state.arrived = state.arrived.saturating_sub(1);
                return false;
            }
            self.cv.wait_for(&mut state, HELPER_POLL);
        }
        true
    }

    /// Permanently drop out; releases any peers already waiting.
    pub(crate) fn leave(&self) {
        let mut state = self.state.lock();
        state.participants = state.participants.saturating_sub(1);
        if state.participants > 0 && state.arrived >= state.participants {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
        }
        self.cv.notify_all();
    }
}

/// A YBWC split point: a snapshot of the node plus its remaining moves,
/// consumed by any worker via an atomic cursor and reduced into a
/// shared best under the split's mutex.
pub(crate) struct SplitPoint {
    pos: Board,
    moves: Vec<ScoredMove>,
    cursor: AtomicUsize,
    depth: i32,
    ply: usize,
    alpha: AtomicI32,
    beta: i32,
    cut: bool,
    state: Mutex<SplitState>,
    cv: Condvar,
}

struct SplitState {
    workers: u32,
    finished: bool,
    best_score: i32,
    best_move: Move,
    pv: Vec<Move>,
}

/// Open a split point for the scored moves of the current node, help
/// drain it, and wait for every subscriber to finish. Returns `None`
/// when the node is not worth splitting.
#[allow(clippy::too_many_arguments)]
pub(crate) fn try_split(
    worker: &mut SearchWorker,
    pos: &Board,
    scored: &ScoredMoveList,
    depth: i32,
    ply: usize,
    alpha: i32,
    beta: i32,
    cut: bool,
) -> Option<(i32, Move, Vec<Move>)> {
    if worker.shared.total_threads <= 1
        || worker.idle
        || depth < SPLIT_MIN_DEPTH
        || scored.len() < SPLIT_MIN_MOVES
    {
        return None;
    }

    let sp = Arc::new(SplitPoint {
        pos: pos.clone(),
        moves: scored.to_vec(),
        cursor: AtomicUsize::new(0),
        depth,
        ply,
        alpha: AtomicI32::new(alpha),
        beta,
        cut,
        state: Mutex::new(SplitState {
            workers: 0,
            finished: false,
            best_score: -INF,
            best_move: Move::NONE,
            pv: Vec::new(),
        }),
        cv: Condvar::new(),
    });

    {
        let mut splits = worker.shared.splits.lock();
        splits.push(Arc::clone(&sp));
        worker.shared.splits_cv.notify_all();
    }

    // The master works its own split like any helper, then waits for
    // stragglers still searching their stolen move.
    help_at_split(worker, &sp);
    {
        let mut state = sp.state.lock();
        while !state.finished && state.workers > 0 {
            sp.cv.wait_for(&mut state, HELPER_POLL);
        }
    }
    {
        let mut splits = worker.shared.splits.lock();
        splits.retain(|other| !Arc::ptr_eq(other, &sp));
    }

    let state = sp.state.lock();
    Some((state.best_score, state.best_move, state.pv.clone()))
}

/// Pull sibling moves from a split point until its queue is dry.
pub(crate) fn help_at_split(worker: &mut SearchWorker, sp: &SplitPoint) {
    sp.state.lock().workers += 1;

    loop {
        if worker.shared.stop.is_set() {
            break;
        }
        let idx = sp.cursor.fetch_add(1, Ordering::Relaxed);
        if idx >= sp.moves.len() {
            break;
        }
        let mv = sp.moves[idx].mv;
        if sp.pos.piece_at(mv.to()).map(|(_, p)| p)
            == Some(crate::board::types::Piece::King)
        {
            continue;
        }

        let mut pos = sp.pos.clone();
        let captured = pos.code_at(mv.to());
        let us = pos.side_to_move();
        let moving = pos.piece_at(mv.from()).map(|(_, p)| p);
        let node_in_check = pos.is_check();

        let info = pos.make_move(mv);
        if pos.mover_in_check() {
            pos.unmake_move(mv, info);
            continue;
        }
        worker.stack[sp.ply].current_move = mv;
        worker.stack[sp.ply].captured_piece = captured;
        let placed = mv.promotion_piece().or(moving);
        worker.stack[sp.ply].current_piece_idx = placed.map_or(-1, |piece| {
            super::history::piece_index(us, piece) as i16
        });

        let mut new_depth = sp.depth - 1;
        if node_in_check {
            new_depth += 1;
        }
        let window_alpha = sp.alpha.load(Ordering::Relaxed);
        let mut child_pv = Vec::new();
        let score = -worker.negamax(
            &mut pos,
            new_depth,
            -sp.beta,
            -window_alpha,
            sp.ply + 1,
            sp.cut,
            &mut child_pv,
            Move::NONE,
        );

        let mut state = sp.state.lock();
        if score > state.best_score {
            state.best_score = score;
            state.best_move = mv;
            state.pv.clear();
            state.pv.push(mv);
            state.pv.append(&mut child_pv);
            sp.alpha.fetch_max(score, Ordering::Relaxed);
        }
    }

    let finished = {
        let mut state = sp.state.lock();
        state.workers -= 1;
        if state.workers == 0 {
            state.finished = true;
            true
        } else {
            false
        }
    };
    if finished {
        sp.cv.notify_all();
    }
}

/// Work-stealing loop for workers whose root partition is exhausted:
/// block on the global condition variable, wake when a split point is
/// published, help at it, repeat until the search winds down.
pub(crate) fn help_search(worker: &mut SearchWorker) {
    loop {
        if worker.shared.stop.is_set() || worker.shared.searching.load(Ordering::Acquire) == 0 {
            return;
        }
        let shared = Arc::clone(&worker.shared);
        let found = {
            let mut splits = shared.splits.lock();
            loop {
                if let Some(sp) = splits
                    .iter()
                    .find(|sp| sp.cursor.load(Ordering::Relaxed) < sp.moves.len())
                {
                    break Some(Arc::clone(sp));
                }
                if shared.stop.is_set() || shared.searching.load(Ordering::Acquire) == 0 {
                    break None;
                }
                shared.splits_cv.wait_for(&mut splits, HELPER_POLL);
            }
        };
        match found {
            Some(sp) => help_at_split(worker, &sp),
            None => return,
        }
    }
}

/// Inputs to a search run.
pub struct SearchSpec {
    pub board: Board,
    pub max_depth: i32,
    pub node_limit: u64,
    pub threads: usize,
    pub multi_pv: u32,
}

/// The coordinator's result.
pub struct SearchOutcome {
    pub best_move: Move,
    pub best_score: i32,
    pub pv: Vec<Move>,
    pub nodes: u64,
}

/// Run a full parallel search and block until every worker has joined.
pub fn run_search(
    spec: &SearchSpec,
    tt: &Arc<TranspositionTable>,
    tb: &Arc<SyzygyTablebase>,
    evaluator: &Arc<dyn Evaluate>,
    learning: &Arc<LearningTable>,
    time: &Arc<TimeManager>,
    stop: &StopFlag,
) -> SearchOutcome {
    let legal = spec.board.legal_moves();
    if legal.is_empty() {
        return SearchOutcome {
            best_move: Move::NONE,
            best_score: -INF,
            pv: Vec::new(),
            nodes: 0,
        };
    }

    // Fewer legal moves deserve less thinking time.
    time.scale(0.5 + legal.len() as f64 / 64.0);
    tt.new_search();

    let root_moves: Vec<Move> = legal.iter().copied().collect();
    let threads = spec.threads.clamp(1, MAX_THREADS).min(root_moves.len());
    let chunk = root_moves.len().div_ceil(threads);
    let partitions: Vec<Vec<ScoredMove>> = root_moves
        .chunks(chunk)
        .map(|part| {
            part.iter()
                .map(|&mv| ScoredMove { mv, score: 0 })
                .collect()
        })
        .collect();

    let shared = Arc::new(SharedSearch::new(
        stop.clone(),
        spec.node_limit,
        spec.multi_pv,
        partitions.len(),
        &root_moves,
    ));

    thread::scope(|scope| {
        for (thread_id, partition) in partitions.into_iter().enumerate() {
            let mut worker = SearchWorker::new(
                thread_id,
                spec.board.clone(),
                partition,
                Arc::clone(tt),
                Arc::clone(tb),
                Arc::clone(evaluator),
                Arc::clone(learning),
                Arc::clone(time),
                Arc::clone(&shared),
            );
            let max_depth = spec.max_depth;
            thread::Builder::new()
                .name(format!("search-{thread_id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(scope, move || worker.search_root(max_depth))
                .expect("failed to spawn search worker");
        }
    });

    let (mut best_move, best_score) = shared.best();
    if best_move == Move::NONE {
        best_move = root_moves[0];
    }

    let infos = shared.root_infos.lock();
    let pv = infos
        .iter()
        .find(|info| info.mv == best_move)
        .map(|info| info.pv.clone())
        .unwrap_or_else(|| vec![best_move]);

    SearchOutcome {
        best_move,
        best_score,
        pv,
        nodes: shared.nodes.load(Ordering::Relaxed),
    }
}
