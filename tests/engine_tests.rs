use std::sync::mpsc;

use chess_engine::board::Board;
use chess_engine::engine::{EngineController, SearchParams};

#[test]
fn engine_depth_search_returns_move() {
    let mut controller = EngineController::new(16);
    controller.set_board(Board::new());

    let (tx, rx) = mpsc::channel();
    controller.start_search(
        SearchParams {
            depth: Some(1),
            ..Default::default()
        },
        move |result| {
            let _ = tx.send(result);
        },
    );

    let result = rx.recv_timeout(std::time::Duration::from_secs(10)).expect("search did not complete");
    assert!(result.best_move.is_some(), "depth-1 search from startpos must return a move");
}

#[test]
fn engine_time_limited_search_returns_within_budget() {
    let mut controller = EngineController::new(16);
    controller.set_board(Board::new());

    let (tx, rx) = mpsc::channel();
    let start = std::time::Instant::now();
    controller.start_search(
        SearchParams {
            soft_time_ms: 50,
            hard_time_ms: 200,
            ..Default::default()
        },
        move |result| {
            let _ = tx.send(result);
        },
    );

    let result = rx.recv_timeout(std::time::Duration::from_secs(5)).expect("search did not complete");
    assert!(result.best_move.is_some(), "time-limited search from startpos must return a move");
    assert!(start.elapsed().as_secs() < 5, "search overran its time budget");
}

#[test]
fn stop_search_halts_an_infinite_search() {
    let mut controller = EngineController::new(16);
    controller.set_board(Board::new());

    let (tx, rx) = mpsc::channel();
    controller.start_search(
        SearchParams {
            infinite: true,
            ..Default::default()
        },
        move |result| {
            let _ = tx.send(result);
        },
    );

    std::thread::sleep(std::time::Duration::from_millis(50));
    controller.stop_search();

    let result = rx.recv_timeout(std::time::Duration::from_secs(10)).expect("search did not complete after stop");
    assert!(result.best_move.is_some());
}
