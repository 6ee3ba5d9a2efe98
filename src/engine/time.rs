//! Time management.
//!
//! Two limits are derived on `go`: a soft limit consulted between
//! iterative-deepening depths (scaled adaptively by best-move stability,
//! score drops and game phase) and a hard limit polled inside the
//! search every 256 nodes. The manager is consulted, never signalled.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Instant;

const MIN_MOVES_TO_GO: i64 = 5;
const SOFT_HARD_RATIO: i64 = 5;
const SCORE_DROP_MARGIN: i32 = 50;

struct AdaptiveState {
    start: Instant,
    prev_score: i32,
    score_drops: i32,
    stability: i32,
    game_phase: i32,
}

pub struct TimeManager {
    state: Mutex<AdaptiveState>,
    soft_limit_ms: AtomicI64,
    hard_limit_ms: AtomicI64,
    move_time_ms: AtomicI64,
    move_overhead_ms: AtomicI64,
    infinite: AtomicBool,
    pondering: AtomicBool,
}

impl TimeManager {
    #[must_use]
    pub fn new() -> Self {
        TimeManager {
            state: Mutex::new(AdaptiveState {
                start: Instant::now(),
                prev_score: 0,
                score_drops: 0,
                stability: 0,
                game_phase: 0,
            }),
            soft_limit_ms: AtomicI64::new(i64::MAX),
            hard_limit_ms: AtomicI64::new(i64::MAX),
            move_time_ms: AtomicI64::new(0),
            move_overhead_ms: AtomicI64::new(100),
            infinite: AtomicBool::new(true),
            pondering: AtomicBool::new(false),
        }
    }

    /// Configure limits for a new search.
    ///
    /// `soft = time_left / max(moves_to_go, 5) + increment / 2` and
    /// `hard = min(time_left / 2, soft * 5)`; a fixed `movetime` pins
    /// both limits, and infinite/ponder searches suspend them.
    #[allow(clippy::too_many_arguments)]
    pub fn start_search(
        &self,
        time_left: i64,
        increment: i64,
        moves_to_go: i64,
        move_time: i64,
        infinite: bool,
        ponder: bool,
    ) {
        {
            let mut state = self.state.lock();
            state.start = Instant::now();
            state.prev_score = 0;
            state.score_drops = 0;
            state.stability = 0;
        }
        self.pondering.store(ponder, Ordering::Relaxed);
        self.move_time_ms.store(move_time, Ordering::Relaxed);

        if move_time > 0 {
            self.infinite.store(false, Ordering::Relaxed);
            self.soft_limit_ms.store(move_time, Ordering::Relaxed);
            self.hard_limit_ms.store(move_time, Ordering::Relaxed);
            return;
        }
        if infinite || time_left <= 0 {
            self.infinite.store(true, Ordering::Relaxed);
            self.soft_limit_ms.store(i64::MAX, Ordering::Relaxed);
            self.hard_limit_ms.store(i64::MAX, Ordering::Relaxed);
            return;
        }

        self.infinite.store(false, Ordering::Relaxed);
        let mtg = if moves_to_go > 0 { moves_to_go } else { 40 };
        let soft = time_left / mtg.max(MIN_MOVES_TO_GO) + increment / 2;
        let hard = (time_left / 2).min(soft * SOFT_HARD_RATIO);
        self.soft_limit_ms.store(soft.max(1), Ordering::Relaxed);
        self.hard_limit_ms.store(hard.max(1), Ordering::Relaxed);
    }

    pub fn set_move_overhead(&self, ms: i64) {
        self.move_overhead_ms.store(ms, Ordering::Relaxed);
    }

    pub fn set_game_phase(&self, phase: i32) {
        self.state.lock().game_phase = phase;
    }

    /// Scale both limits by a factor clamped to [0.2, 1.5].
    pub fn scale(&self, factor: f64) {
        let factor = factor.clamp(0.2, 1.5);
        for limit in [&self.soft_limit_ms, &self.hard_limit_ms] {
            let current = limit.load(Ordering::Relaxed);
            if current != i64::MAX {
                limit.store((current as f64 * factor) as i64, Ordering::Relaxed);
            }
        }
    }

    /// Record the result of a completed depth for adaptive scaling.
    pub fn update(&self, score: i32, best_move_changed: bool) {
        let mut state = self.state.lock();
        if score < state.prev_score - SCORE_DROP_MARGIN {
            state.score_drops += 1;
        } else {
            state.score_drops = (state.score_drops - 1).max(0);
        }
        state.stability = if best_move_changed {
            0
        } else {
            state.stability + 1
        };
        state.prev_score = score;
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.state.lock().start.elapsed().as_millis() as i64
    }

    /// Whether another iterative-deepening depth should start.
    #[must_use]
    pub fn time_for_depth(&self) -> bool {
        if self.infinite.load(Ordering::Relaxed) || self.pondering.load(Ordering::Relaxed) {
            return true;
        }
        let soft = self.soft_limit_ms.load(Ordering::Relaxed);
        if soft == i64::MAX {
            return true;
        }
        let (elapsed, factor) = {
            let state = self.state.lock();
            let mut factor = 1.0f64;
            if state.stability < 3 {
                factor *= 1.5;
            }
            if state.score_drops > 2 {
                factor *= 1.3;
            }
            factor *= 1.0 + 0.5 * (1.0 - (state.game_phase as f64 - 12.0).abs() / 12.0);
            (state.start.elapsed().as_millis() as i64, factor)
        };
        (elapsed as f64) < soft as f64 * factor
    }

    /// Hard-limit check, polled from inside the search.
    #[must_use]
    pub fn stop_early(&self) -> bool {
        if self.infinite.load(Ordering::Relaxed) || self.pondering.load(Ordering::Relaxed) {
            return false;
        }
        let overhead = self.move_overhead_ms.load(Ordering::Relaxed);
        let elapsed = self.elapsed_ms();
        let move_time = self.move_time_ms.load(Ordering::Relaxed);
        if move_time > 0 {
            return elapsed + overhead >= move_time;
        }
        let hard = self.hard_limit_ms.load(Ordering::Relaxed);
        hard != i64::MAX && elapsed + overhead >= hard
    }

    /// `ponderhit`: drop out of ponder mode in place; the limits set at
    /// `go` take effect against a restarted clock.
    pub fn ponderhit(&self) {
        self.state.lock().start = Instant::now();
        self.pondering.store(false, Ordering::Relaxed);
        if self.move_time_ms.load(Ordering::Relaxed) == 0
            && self.hard_limit_ms.load(Ordering::Relaxed) != i64::MAX
        {
            self.infinite.store(false, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn is_pondering(&self) -> bool {
        self.pondering.load(Ordering::Relaxed)
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        TimeManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_formulas() {
        let tm = TimeManager::new();
        tm.start_search(60_000, 1_000, 30, 0, false, false);
        // soft = 60000/30 + 500 = 2500; hard = min(30000, 12500).
        assert_eq!(tm.soft_limit_ms.load(Ordering::Relaxed), 2500);
        assert_eq!(tm.hard_limit_ms.load(Ordering::Relaxed), 12500);
    }

    #[test]
    fn test_movestogo_floor() {
        let tm = TimeManager::new();
        tm.start_search(10_000, 0, 1, 0, false, false);
        // moves_to_go is floored at 5.
        assert_eq!(tm.soft_limit_ms.load(Ordering::Relaxed), 2000);
    }

    #[test]
    fn test_movetime_pins_both_limits() {
        let tm = TimeManager::new();
        tm.start_search(0, 0, 0, 300, false, false);
        assert_eq!(tm.soft_limit_ms.load(Ordering::Relaxed), 300);
        assert_eq!(tm.hard_limit_ms.load(Ordering::Relaxed), 300);
        assert!(!tm.stop_early() || tm.elapsed_ms() >= 200);
    }

    #[test]
    fn test_infinite_never_stops() {
        let tm = TimeManager::new();
        tm.start_search(0, 0, 0, 0, true, false);
        assert!(tm.time_for_depth());
        assert!(!tm.stop_early());
    }

    #[test]
    fn test_pondering_suspends_limits_until_ponderhit() {
        let tm = TimeManager::new();
        tm.start_search(1, 0, 1, 0, false, true);
        assert!(!tm.stop_early());
        tm.ponderhit();
        std::thread::sleep(std::time::Duration::from_millis(5));
        // 1ms of remaining clock plus overhead is long gone.
        assert!(tm.stop_early());
    }

    #[test]
    fn test_scale_clamps() {
        let tm = TimeManager::new();
        tm.start_search(60_000, 0, 30, 0, false, false);
        tm.scale(10.0); // clamped to 1.5
        assert_eq!(tm.soft_limit_ms.load(Ordering::Relaxed), 3000);
    }
}
