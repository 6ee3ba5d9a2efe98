//! UCI option advertisement.

use crate::engine::EngineOptions;

pub const ENGINE_NAME: &str = "Peregrine 1.0";
pub const ENGINE_AUTHOR: &str = "the Peregrine authors";

/// Print the `id` lines and every `option` line, ending with `uciok`.
pub fn print_uci_identity(options: &EngineOptions) {
    println!("id name {ENGINE_NAME}");
    println!("id author {ENGINE_AUTHOR}");
    println!(
        "option name Hash type spin default {} min 1 max 8192",
        options.hash_mb
    );
    println!(
        "option name Threads type spin default {} min 1 max 64",
        options.threads
    );
    println!(
        "option name Ponder type check default {}",
        options.ponder
    );
    println!(
        "option name MultiPV type spin default {} min 1 max 5",
        options.multi_pv
    );
    println!(
        "option name Contempt type spin default {} min -100 max 100",
        options.contempt
    );
    println!(
        "option name Move Overhead type spin default {} min 0 max 5000",
        options.move_overhead_ms
    );
    println!(
        "option name OwnBook type check default {}",
        options.own_book
    );
    println!("option name BookFile type string default");
    println!(
        "option name BookVariety type spin default {} min 0 max 10",
        options.book_variety
    );
    println!("option name SyzygyPath type string default");
    println!("option name EvalFile type string default");
    println!(
        "option name UCI_Chess960 type check default {}",
        options.chess960
    );
    println!(
        "option name UCI_LimitStrength type check default {}",
        options.limit_strength
    );
    println!(
        "option name UCI_Elo type spin default {} min 800 max 3000",
        options.elo
    );
    println!(
        "option name Learning type check default {}",
        options.learning
    );
    println!("option name LearningFile type string default");
    println!("option name LearningRate type spin default 100 min 1 max 1000");
    println!("option name LearningMaxAdjust type spin default 50 min 0 max 200");
    println!("option name Clear Learning type button");
    println!("option name Save Learning type button");
    println!("option name TuningMode type check default false");
    println!("option name TuningFile type string default");
    println!("option name Clear Hash type button");
    println!("uciok");
}
