use std::sync::atomic::AtomicBool;

use chess_engine::board::{find_best_move, Board, SearchState};
use chess_engine::tt::{Bound, TranspositionTable};
use chess_engine::uci::format_uci_move;

struct TestPosition {
    name: &'static str,
    fen: &'static str,
    depths: &'static [(usize, u64)],
}

const TEST_POSITIONS: &[TestPosition] = &[
    TestPosition {
        name: "Initial Position",
        fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        depths: &[(1, 20), (2, 400), (3, 8902)],
    },
    TestPosition {
        name: "Kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        depths: &[(1, 48), (2, 2039)],
    },
];

#[test]
fn perft_positions() {
    for position in TEST_POSITIONS {
        let mut board = Board::from_fen(position.fen);
        for &(depth, expected) in position.depths {
            let nodes = board.perft(depth);
            assert_eq!(nodes, expected, "Perft failed for {} at depth {}", position.name, depth);
        }
    }
}

#[test]
fn draw_by_fifty_move_rule_via_fen() {
    // Halfmove clock field set to 99; one quiet move pushes it to 100.
    let mut board = Board::try_from_fen("8/8/8/8/8/8/8/K6k w - - 99 1").expect("valid fen");
    board.make_move_uci("a1a2").expect("legal quiet move");
    assert!(board.is_draw(), "100 halfmove plies should be a draw");
}

#[test]
fn transposition_table_store_probe_replacement_policy() {
    let tt = TranspositionTable::new(1);
    let hash = 0xdead_beef_u64;
    let mv = chess_engine::board::Move::null();

    tt.store(hash, Bound::Exact, 1, 100, mv, false, false);
    let entry = tt.probe(hash).expect("entry missing");
    assert_eq!(entry.depth, 1);

    // A shallower store for the same position must not overwrite a deeper entry.
    tt.store(hash, Bound::Upper, 0, 50, mv, false, false);
    let entry2 = tt.probe(hash).expect("entry missing after shallower store");
    assert_eq!(entry2.depth, 1);

    // A deeper store must replace it.
    tt.store(hash, Bound::Exact, 5, 200, mv, false, false);
    let entry3 = tt.probe(hash).expect("entry missing after deeper store");
    assert_eq!(entry3.depth, 5);
}

#[test]
fn make_move_uci_round_trips_through_search() {
    let mut board = Board::from_fen("6k1/5ppp/8/8/8/8/8/4Q2K w - - 0 1");
    let mut state = SearchState::new(16);
    let stop = AtomicBool::new(false);

    let best = find_best_move(&mut board, &mut state, 4, &stop).expect("should find a move");
    assert_eq!(format_uci_move(&best), "e1e8");
}
