use std::process;

fn main() {
    // Attack and zobrist tables build lazily; touching them here keeps
    // the first search latency out of the measurement window.
    let _ = peregrine::board::Board::new().legal_moves();

    process::exit(peregrine::uci::run());
}
