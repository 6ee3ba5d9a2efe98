//! Deep perft verification. The multi-hundred-million-node counts are
//! ignored by default; run them with `cargo test --release -- --ignored`.

use peregrine::board::Board;
use peregrine::perft::perft;

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

#[test]
fn perft_startpos_depth_1() {
    let mut board = Board::from_fen(STARTPOS).unwrap();
    assert_eq!(perft(&mut board, 1), 20);
}

#[test]
fn perft_startpos_depth_5() {
    let mut board = Board::from_fen(STARTPOS).unwrap();
    assert_eq!(perft(&mut board, 5), 4_865_609);
}

#[test]
#[ignore = "large: ~119M leaves"]
fn perft_startpos_depth_6() {
    let mut board = Board::from_fen(STARTPOS).unwrap();
    assert_eq!(perft(&mut board, 6), 119_060_324);
}

#[test]
fn perft_kiwipete_depth_4() {
    let mut board = Board::from_fen(KIWIPETE).unwrap();
    assert_eq!(perft(&mut board, 4), 4_085_603);
}

#[test]
#[ignore = "large: ~11M leaves"]
fn perft_position_3_depth_6() {
    let mut board = Board::from_fen(POSITION_3).unwrap();
    assert_eq!(perft(&mut board, 6), 11_030_083);
}
