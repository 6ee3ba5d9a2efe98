//! Engine controller: owns the position, the shared tables and the
//! collaborator components, and runs searches on a background thread so
//! the UCI loop stays responsive to `stop` and `ponderhit`.

pub mod time;

use parking_lot::Mutex;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::board::eval::{ClassicalEval, Evaluate};
use crate::board::search::{run_search, SearchSpec};
use crate::board::{Board, Color, Move};
use crate::book::OpeningBook;
use crate::learning::LearningTable;
use crate::sync::StopFlag;
use crate::tablebase::SyzygyTablebase;
use crate::tt::TranspositionTable;
use crate::uci::command::GoParams;
use time::TimeManager;

pub const DEFAULT_HASH_MB: usize = 256;
pub const MAX_THREADS: usize = 64;

/// Option state mirrored from `setoption`.
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub ponder: bool,
    pub multi_pv: u32,
    pub contempt: i32,
    pub move_overhead_ms: i64,
    pub own_book: bool,
    pub book_variety: i32,
    pub chess960: bool,
    pub limit_strength: bool,
    pub elo: i32,
    pub learning: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: DEFAULT_HASH_MB,
            threads: 1,
            ponder: false,
            multi_pv: 1,
            contempt: 0,
            move_overhead_ms: 100,
            own_book: true,
            book_variety: 0,
            chess960: false,
            limit_strength: false,
            elo: 1500,
            learning: false,
        }
    }
}

struct SearchJob {
    stop: StopFlag,
    handle: JoinHandle<()>,
}

pub struct Engine {
    board: Board,
    tt: Arc<TranspositionTable>,
    book: OpeningBook,
    tb: Arc<SyzygyTablebase>,
    learning: Arc<LearningTable>,
    evaluator: Arc<dyn Evaluate>,
    time: Arc<TimeManager>,
    pub options: EngineOptions,
    job: Option<SearchJob>,
    last_pv: Arc<Mutex<Vec<Move>>>,
    tuning_mode: bool,
    tuning_file: Option<PathBuf>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Engine {
            board: Board::new(),
            tt: Arc::new(TranspositionTable::new(DEFAULT_HASH_MB)),
            book: OpeningBook::new(),
            tb: Arc::new(SyzygyTablebase::new()),
            learning: Arc::new(LearningTable::new()),
            evaluator: Arc::new(ClassicalEval::new(0)),
            time: Arc::new(TimeManager::new()),
            options: EngineOptions::default(),
            job: None,
            last_pv: Arc::new(Mutex::new(Vec::new())),
            tuning_mode: false,
            tuning_file: None,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Replace the position (after stopping any running search).
    pub fn set_board(&mut self, mut board: Board) {
        self.stop_search();
        if self.options.chess960 {
            board.set_chess960(true);
        }
        self.board = board;
    }

    /// `ucinewgame`: reset to the start position, wipe the hash table.
    pub fn new_game(&mut self) {
        self.stop_search();
        self.board = Board::new();
        if self.options.chess960 {
            self.board.set_chess960(true);
        }
        self.tt.clear();
    }

    /// Set the stop flag and join the search thread, if any. The job
    /// itself prints the final `bestmove`.
    pub fn stop_search(&mut self) {
        if let Some(job) = self.job.take() {
            job.stop.set();
            let _ = job.handle.join();
        }
    }

    /// Reap a finished search job without blocking a live one.
    pub fn reap_finished_search(&mut self) {
        if self
            .job
            .as_ref()
            .is_some_and(|job| job.handle.is_finished())
        {
            self.stop_search();
        }
    }

    pub fn ponderhit(&mut self) {
        self.time.ponderhit();
    }

    /// Launch a search per the `go` parameters. Book and tablebase hits
    /// short-circuit with an immediate `bestmove`.
    pub fn go(&mut self, params: &GoParams) {
        self.stop_search();

        let side = self.board.side_to_move();
        let (time_left, increment) = match side {
            Color::White => (params.wtime, params.winc),
            Color::Black => (params.btime, params.binc),
        };
        // Without any clock or movetime the search is untimed even if
        // "infinite" was not spelled out.
        let untimed =
            params.infinite || (params.movetime.is_none() && time_left.is_none());

        let mut depth = params.depth.unwrap_or(64) as i32;
        if self.options.limit_strength && !params.infinite {
            let cap = (1 + (self.options.elo - 800) / 100).clamp(1, 30);
            depth = depth.min(cap);
        }

        self.time.set_move_overhead(self.options.move_overhead_ms);
        self.time.start_search(
            time_left.unwrap_or(0) as i64,
            increment.unwrap_or(0) as i64,
            params.movestogo.unwrap_or(0) as i64,
            params.movetime.unwrap_or(0) as i64,
            untimed,
            params.ponder,
        );
        self.time.set_game_phase(self.board.game_phase());

        if !params.ponder && !params.infinite && self.options.own_book && self.book.is_loaded() {
            let book_move = self.book.probe(&self.board);
            if book_move != Move::NONE {
                println!("bestmove {}", self.board.move_to_uci(book_move));
                return;
            }
        }

        if !params.ponder && self.tb.can_probe(&self.board) {
            if let Some(tb_move) = self.tb.probe_root(&self.board) {
                println!("bestmove {}", self.board.move_to_uci(tb_move));
                return;
            }
        }

        let spec = SearchSpec {
            board: self.board.clone(),
            max_depth: depth,
            node_limit: params.nodes.unwrap_or(0),
            threads: self.options.threads,
            multi_pv: self.options.multi_pv,
        };

        let stop = StopFlag::new();
        let stop_clone = stop.clone();
        let tt = Arc::clone(&self.tt);
        let tb = Arc::clone(&self.tb);
        let evaluator = Arc::clone(&self.evaluator);
        let learning = Arc::clone(&self.learning);
        let time = Arc::clone(&self.time);
        let last_pv = Arc::clone(&self.last_pv);
        let tuning_file = if self.tuning_mode {
            self.tuning_file.clone()
        } else {
            None
        };

        let handle = thread::Builder::new()
            .name("search-main".to_string())
            .spawn(move || {
                let outcome =
                    run_search(&spec, &tt, &tb, &evaluator, &learning, &time, &stop_clone);
                *last_pv.lock() = outcome.pv.clone();
                println!("bestmove {}", spec.board.move_to_uci(outcome.best_move));
                let _ = std::io::stdout().flush();

                if let Some(path) = tuning_file {
                    if let Ok(mut file) = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                    {
                        let _ = writeln!(file, "{}\t{}\t?", spec.board.fen(), outcome.best_score);
                    }
                }
            })
            .expect("failed to spawn search thread");

        self.job = Some(SearchJob { stop, handle });
    }

    /// Apply one UCI option.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) {
        let value = value.unwrap_or("");
        match name {
            "Hash" => {
                if let Ok(mb) = value.parse::<usize>() {
                    let mb = mb.clamp(1, 8192);
                    self.options.hash_mb = mb;
                    self.tt.resize(mb);
                }
            }
            "Clear Hash" => self.tt.clear(),
            "Threads" => {
                if let Ok(threads) = value.parse::<usize>() {
                    self.options.threads = threads.clamp(1, MAX_THREADS);
                }
            }
            "Ponder" => self.options.ponder = value == "true",
            "MultiPV" => {
                if let Ok(multi_pv) = value.parse::<u32>() {
                    self.options.multi_pv = multi_pv.clamp(1, 5);
                }
            }
            "Contempt" => {
                if let Ok(contempt) = value.parse::<i32>() {
                    self.options.contempt = contempt.clamp(-100, 100);
                    self.evaluator = Arc::new(ClassicalEval::new(self.options.contempt));
                }
            }
            "Move Overhead" => {
                if let Ok(ms) = value.parse::<i64>() {
                    self.options.move_overhead_ms = ms.clamp(0, 5000);
                }
            }
            "OwnBook" => self.options.own_book = value == "true",
            "BookFile" => {
                if !value.is_empty() {
                    if let Err(e) = self.book.load(value) {
                        log::warn!("failed to load book {value}: {e}");
                        println!("info string book file {value} unavailable");
                    }
                }
            }
            "BookVariety" => {
                if let Ok(variety) = value.parse::<i32>() {
                    self.options.book_variety = variety.clamp(0, 10);
                    self.book.set_variety(f64::from(self.options.book_variety));
                }
            }
            "SyzygyPath" => {
                if !value.is_empty() {
                    let mut tb = SyzygyTablebase::new();
                    if !tb.init(value) {
                        println!("info string tablebases at {value} unavailable");
                    }
                    self.tb = Arc::new(tb);
                }
            }
            "EvalFile" => {
                if !value.is_empty() {
                    // No network loader is linked in; the classical
                    // evaluator keeps serving.
                    println!("info string eval file {value} unavailable, using classical eval");
                }
            }
            "UCI_Chess960" => {
                self.options.chess960 = value == "true";
                self.board.set_chess960(self.options.chess960);
            }
            "UCI_LimitStrength" => self.options.limit_strength = value == "true",
            "UCI_Elo" => {
                if let Ok(elo) = value.parse::<i32>() {
                    self.options.elo = elo.clamp(800, 3000);
                }
            }
            "Learning" => {
                self.options.learning = value == "true";
                self.learning.set_enabled(self.options.learning);
                if self.options.learning && self.learning.load().is_ok() {
                    println!("info string learning data loaded");
                }
            }
            "LearningFile" => {
                if !value.is_empty() {
                    self.learning.set_filename(PathBuf::from(value));
                }
            }
            "LearningRate" => {
                if let Ok(rate) = value.parse::<i32>() {
                    self.learning.set_learning_rate(rate.clamp(1, 1000));
                }
            }
            "LearningMaxAdjust" => {
                if let Ok(max) = value.parse::<i32>() {
                    self.learning.set_max_adjust(max.clamp(0, 200));
                }
            }
            "Clear Learning" => self.learning.clear(),
            "Save Learning" => {
                if self.learning.save().is_err() {
                    println!("info string failed to save learning data");
                }
            }
            "TuningMode" => self.tuning_mode = value == "true",
            "TuningFile" => {
                if !value.is_empty() {
                    self.tuning_file = Some(PathBuf::from(value));
                }
            }
            _ => log::debug!("ignoring unknown option {name}"),
        }
    }

    /// Credit a reported game result to every position on the last
    /// search's principal variation.
    pub fn learn_result(&mut self, result: i32) {
        let pv = self.last_pv.lock().clone();
        if pv.is_empty() {
            println!("info string no pv available from the last search");
            return;
        }
        let mut pos = self.board.clone();
        for mv in &pv {
            self.learning.update(pos.hash(), result, pos.side_to_move());
            if !pos.is_legal_move(*mv) {
                break;
            }
            pos.make_move(*mv);
        }
        println!("info string learning updated with {} positions", pv.len());
    }

    pub fn learning_table(&self) -> &Arc<LearningTable> {
        &self.learning
    }

    #[must_use]
    pub fn evaluate_current(&self) -> i32 {
        self.evaluator.evaluate(&self.board)
    }

    /// Board, FEN and castling diagnostics for the `d` command.
    #[must_use]
    pub fn display(&self) -> String {
        let board = &self.board;
        let mut out = String::new();
        out.push('\n');
        for rank in (0..8).rev() {
            out.push_str(&format!(" {}  ", rank + 1));
            for file in 0..8 {
                let sq = crate::board::Square::new(rank, file);
                match board.piece_at(sq) {
                    Some((color, piece)) => out.push(piece.to_fen_char(color)),
                    None => out.push('.'),
                }
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("\n     a b c d e f g h\n\n");
        out.push_str(&format!("FEN  : {}\n", board.fen()));
        out.push_str(&format!("Side : {}\n", board.side_to_move()));
        match board.ep_square() {
            Some(sq) => out.push_str(&format!("EP   : {sq}\n")),
            None => out.push_str("EP   : -\n"),
        }
        out.push_str(&format!("50mr : {}\n", board.halfmove_clock()));

        out.push_str("Castle rights:\n");
        let names = [
            ["White-K (O-O)", "White-Q (O-O-O)"],
            ["Black-k (o-o)", "Black-q (o-o-o)"],
        ];
        let mut any = false;
        for (c_idx, color) in Color::BOTH.iter().enumerate() {
            for side_idx in 0..2 {
                out.push_str(&format!("  {}: ", names[c_idx][side_idx]));
                match board.castle_rook(*color, side_idx) {
                    None => out.push_str("NONE\n"),
                    Some(rook_sq) => {
                        let rank = c_idx * 7;
                        let king_dest = crate::board::Square::new(
                            rank,
                            if side_idx == 0 { 6 } else { 2 },
                        );
                        let rook_dest = crate::board::Square::new(
                            rank,
                            if side_idx == 0 { 5 } else { 3 },
                        );
                        out.push_str(&format!(
                            "ROOK on {rook_sq} -> king lands {king_dest}, rook lands {rook_dest}\n"
                        ));
                        any = true;
                    }
                }
            }
        }
        if !any {
            out.push_str("  (no castling rights)\n");
        }
        out
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
