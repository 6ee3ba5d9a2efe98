//! UCI protocol loop.
//!
//! Reads commands from stdin, dispatches to the engine, writes protocol
//! output to stdout. Malformed input is logged and ignored; the engine
//! never exits on bad input.

pub mod command;
pub mod options;

use std::io::{self, BufRead, Write};
use std::time::Instant;

use crate::board::Board;
use crate::engine::Engine;
use crate::perft;

use command::{parse_go_params, parse_setoption, parse_uci_command, UciCommand};

/// Apply a `position` command. On a malformed FEN the board is left
/// empty, so the next `go` finds no legal moves and answers
/// `bestmove 0000`; an illegal move aborts the rest of the move list.
fn apply_position(engine: &mut Engine, parts: &[String]) {
    let mut i = 1;
    let board = if parts.get(i).map(String::as_str) == Some("startpos") {
        i += 1;
        Some(Board::new())
    } else if parts.get(i).map(String::as_str) == Some("fen") {
        i += 1;
        let mut fen = String::new();
        while i < parts.len() && parts[i] != "moves" {
            if !fen.is_empty() {
                fen.push(' ');
            }
            fen.push_str(&parts[i]);
            i += 1;
        }
        match Board::from_fen(&fen) {
            Ok(board) => Some(board),
            Err(e) => {
                log::warn!("bad FEN in position command: {e}");
                println!("info string invalid fen: {e}");
                None
            }
        }
    } else {
        None
    };

    let Some(board) = board else {
        engine.set_board(Board::empty_position());
        return;
    };
    engine.set_board(board);

    if parts.get(i).map(String::as_str) == Some("moves") {
        i += 1;
        while i < parts.len() {
            let text = &parts[i];
            match engine.board().parse_move(text) {
                Ok(mv) => {
                    engine.board_mut().make_move(mv);
                }
                Err(e) => {
                    log::warn!("bad move in position command: {e}");
                    println!("info string invalid move {text}: {e}");
                    break;
                }
            }
            i += 1;
        }
    }
}

fn run_perft(engine: &mut Engine, depth: u32) {
    engine.stop_search();
    let mut board = engine.board().clone();
    let start = Instant::now();
    let (counts, total) = perft::divide(&mut board, depth.max(1));
    for (mv, nodes) in &counts {
        println!("{}: {}", board.move_to_uci(*mv), nodes);
    }
    let ms = start.elapsed().as_millis() as u64;
    let nps = if ms > 0 { total * 1000 / ms } else { 0 };
    println!("\nNodes searched: {total}  depth: {depth}  time: {ms}ms  nps: {nps}");
}

fn handle_learn(engine: &mut Engine, parts: &[String]) {
    match parts.get(1).map(String::as_str) {
        Some("result") => {
            let result = match parts.get(2).map(String::as_str) {
                Some("win") => 1,
                Some("loss") => -1,
                _ => 0,
            };
            engine.learn_result(result);
        }
        Some("clear") => {
            engine.learning_table().clear();
            println!("info string learning table cleared");
        }
        Some("save") => {
            if engine.learning_table().save().is_ok() {
                println!("info string learning saved");
            } else {
                println!("info string failed to save learning");
            }
        }
        _ => println!("info string usage: learn result win|draw|loss, clear, save"),
    }
}

/// Run the UCI loop until `quit` or end of input. Returns the process
/// exit code (always 0 on clean shutdown).
pub fn run() -> i32 {
    let stdin = io::stdin();
    let mut engine = Engine::new();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let Some(cmd) = parse_uci_command(&line) else {
            continue;
        };

        engine.reap_finished_search();

        match cmd {
            UciCommand::Uci => options::print_uci_identity(&engine.options),
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => engine.new_game(),
            UciCommand::Position(parts) => apply_position(&mut engine, &parts),
            UciCommand::SetOption(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                match parse_setoption(&refs) {
                    Some((name, value)) => engine.set_option(&name, value.as_deref()),
                    None => log::warn!("malformed setoption: {}", parts.join(" ")),
                }
            }
            UciCommand::Go(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                engine.go(&parse_go_params(&refs));
            }
            UciCommand::Stop => engine.stop_search(),
            UciCommand::PonderHit => engine.ponderhit(),
            UciCommand::Display => print!("{}", engine.display()),
            UciCommand::Eval => {
                println!(
                    "Evaluation: {} cp (from side to move)",
                    engine.evaluate_current()
                );
            }
            UciCommand::Perft(depth) => run_perft(&mut engine, depth),
            UciCommand::Learn(parts) => handle_learn(&mut engine, &parts),
            UciCommand::Quit => {
                engine.stop_search();
                break;
            }
            UciCommand::Unknown(text) => log::debug!("ignoring unknown command: {text}"),
        }
        let _ = io::stdout().flush();
    }

    engine.stop_search();
    0
}
