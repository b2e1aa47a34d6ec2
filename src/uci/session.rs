//! UCI session: turns parsed [`UciCommand`]s into [`EngineController`] calls
//! and prints the responses. Search completion is reported from the
//! background search thread itself (mirroring how a Lazy-SMP worker pool's
//! caller never blocks the command loop on a `go`).

use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::board::{Board, SearchIterationInfo, SearchResult};
use crate::cluster::{self, LocalCandidate};
use crate::engine::{
    build_search_request, CommandResult, EngineController, PonderHandle, Protocol,
    SearchParams as ControllerSearchParams, TimeControl,
};

use super::command::{parse_go_params, parse_uci_command, GoParams, UciCommand};
use super::format_uci_move;
use super::options::{parse_setoption, UciOptionAction, UciOptions};
use super::parse_position_command;
use super::print::print_perft_info;
use super::report::print_ready;

/// Ratio applied to the soft deadline to get the hard backstop deadline the
/// controller arms its [`crate::timer::DeadlineTimer`] with. Mirrors the
/// spirit of a 70%/90%-of-budget soft/hard split against our single
/// spec-formula deadline (§4.7) rather than introducing a second formula.
const HARD_TIME_NUMERATOR: u64 = 9;
const HARD_TIME_DENOMINATOR: u64 = 7;

fn hard_time_ms(soft_time_ms: u64) -> u64 {
    if soft_time_ms == 0 {
        0
    } else {
        soft_time_ms
            .saturating_mul(HARD_TIME_NUMERATOR)
            .saturating_div(HARD_TIME_DENOMINATOR)
            .max(soft_time_ms)
    }
}

/// Prints `info depth ... score cp ... nodes ... nps ... pv ...` for one
/// completed iteration (§4.4, §6).
fn print_iteration_info(info: &SearchIterationInfo) {
    let score_field = match info.mate_in {
        Some(plies) => format!("mate {plies}"),
        None => format!("cp {}", info.score),
    };
    println!(
        "info depth {} seldepth {} score {} nodes {} nps {} time {} pv {}",
        info.depth, info.seldepth, score_field, info.nodes, info.nps, info.time_ms, info.pv
    );
}

fn print_search_result(result: &SearchResult) {
    println!(
        "bestmove {}{}",
        result
            .best_move
            .as_ref()
            .map_or_else(|| "(none)".to_string(), format_uci_move),
        result
            .ponder_move
            .as_ref()
            .map_or_else(String::new, |mv| format!(" ponder {}", format_uci_move(mv)))
    );
    let _ = io::stdout().flush();
}

/// The move token a `position ... moves ...` command applied last, kept so
/// the next `go`'s ponder-hit check (§4.6) can compare it against what the
/// just-cancelled ponder search had settled on.
fn last_move_token(parts: &[&str]) -> Option<String> {
    let moves_idx = parts.iter().position(|p| *p == "moves")?;
    if parts.len() <= moves_idx + 1 {
        return None;
    }
    parts.last().map(|s| (*s).to_string())
}

/// Relaunch the ponder search on the post-move position once a `go` has
/// committed to a move (§4.6).
fn relaunch_ponder(handle: &PonderHandle, board_before_move: &Board, result: &SearchResult) {
    if let Some(mv) = result.best_move {
        let mut board = board_before_move.clone();
        board.make_move(mv);
        handle.start(board);
    }
}

/// Subtract the ponder-hit time credit from a freshly computed think time,
/// floored at 1ms rather than going to zero (§4.6, mirroring the original
/// "if it exceeds think_time, just use 1ms" fallback).
fn apply_ponder_credit(soft_time_ms: u64, credit_ms: u64) -> u64 {
    if credit_ms == 0 || soft_time_ms == 0 {
        soft_time_ms
    } else if credit_ms < soft_time_ms {
        soft_time_ms - credit_ms
    } else {
        1
    }
}

/// Owns the board, the engine controller, and the small bits of session
/// state (`setoption` values, the cluster peer list) that don't belong in
/// the controller itself.
pub struct UciSession {
    controller: EngineController,
    options: UciOptions,
    cluster_peers: Vec<SocketAddr>,
    syzygy_path: Option<String>,
    debug: bool,
    /// Move token the last `position ... moves ...` command applied, used
    /// to detect a ponder hit (§4.6).
    last_applied_move: Option<String>,
}

impl UciSession {
    #[must_use]
    pub fn new(tt_mb: usize, threads: usize) -> Self {
        let mut controller = EngineController::new(tt_mb);
        controller.set_threads(threads);
        let mut options = UciOptions::new(tt_mb);
        options.threads = threads;
        UciSession {
            controller,
            options,
            cluster_peers: Vec::new(),
            syzygy_path: None,
            debug: false,
            last_applied_move: None,
        }
    }

    /// Build a session around an already-constructed controller, e.g. one
    /// wired up to the TT replicator by the caller.
    #[must_use]
    pub fn with_controller(controller: EngineController, tt_mb: usize, threads: usize) -> Self {
        let mut options = UciOptions::new(tt_mb);
        options.threads = threads;
        UciSession {
            controller,
            options,
            cluster_peers: Vec::new(),
            syzygy_path: None,
            debug: false,
            last_applied_move: None,
        }
    }

    pub fn set_cluster_peers(&mut self, peers: Vec<SocketAddr>) {
        self.cluster_peers = peers;
    }

    pub fn set_syzygy_path(&mut self, path: Option<String>) {
        self.syzygy_path = path;
    }

    fn handle_uci(&self) {
        self.options.print(&self.controller.with_search_state_ref(|s| s.params().clone()));
    }

    fn handle_position(&mut self, parts: &[&str]) {
        let mut board = self.controller.board().clone();
        parse_position_command(&mut board, parts);
        self.controller.set_board(board);
        self.last_applied_move = last_move_token(parts);
    }

    /// Cancel any ponder search in flight and, if it had already settled on
    /// the move the opponent actually played, return how long it ran so
    /// that time can be credited against the upcoming `go` (§4.6).
    fn reconcile_ponder(&mut self) -> u64 {
        let Some((predicted, elapsed)) = self.controller.stop_ponder() else {
            return 0;
        };
        let predicted_str = predicted.as_ref().map(format_uci_move);
        if predicted_str.is_some() && predicted_str == self.last_applied_move {
            elapsed.as_millis() as u64
        } else {
            0
        }
    }

    fn handle_setoption(&mut self, parts: &[&str]) {
        let Some((name, value)) = parse_setoption(parts) else {
            return;
        };
        match self.options.apply_setoption(&name, value.as_deref()) {
            Some(UciOptionAction::ReinitHash(mb)) => self.controller.resize_hash(mb),
            Some(UciOptionAction::SetThreads(threads)) => self.controller.set_threads(threads),
            Some(UciOptionAction::SetSyzygyPath(path)) => {
                self.syzygy_path = if path.is_empty() { None } else { Some(path) };
            }
            None => {}
        }
    }

    fn handle_go(&mut self, parts: &[&str]) {
        let go_params = parse_go_params(parts);
        self.dispatch_search(go_params);
    }

    fn dispatch_search(&mut self, go_params: GoParams) {
        let white_to_move = self.controller.board().white_to_move();
        let time_control = if let Some(movetime) = go_params.movetime {
            TimeControl::move_time_ms(movetime)
        } else {
            let (time_left_ms, inc_ms) = if white_to_move {
                (go_params.wtime.unwrap_or(0), go_params.winc.unwrap_or(0))
            } else {
                (go_params.btime.unwrap_or(0), go_params.binc.unwrap_or(0))
            };
            if go_params.depth.is_some() && time_left_ms == 0 {
                TimeControl::Depth
            } else if time_left_ms == 0 && !go_params.infinite {
                TimeControl::Infinite
            } else {
                TimeControl::Incremental {
                    time_left_ms,
                    inc_ms,
                    movestogo: go_params.movestogo,
                }
            }
        };

        let ponder_credit_ms = self.reconcile_ponder();

        let request = build_search_request(
            time_control,
            go_params.depth,
            go_params.nodes,
            go_params.infinite,
        );

        let cluster_idx = 0; // the local node is always slice 0; peers take 1..N
        let peers = self.cluster_peers.clone();
        let position_fen = self.controller.board().to_fen();
        let soft_time_ms = apply_ponder_credit(request.time_limit_ms, ponder_credit_ms);

        let params = ControllerSearchParams {
            depth: request.depth,
            soft_time_ms,
            hard_time_ms: hard_time_ms(soft_time_ms),
            infinite: request.infinite,
            cluster_idx,
        };
        self.controller.set_max_nodes(request.max_nodes);
        self.controller
            .set_info_callback(Some(Arc::new(print_iteration_info)));

        let think_time_ms = soft_time_ms.max(1);
        let depth_hint = request.depth;
        let ponder_handle = self.controller.ponder_handle();
        let board_before_move = self.controller.board().clone();

        self.controller.start_search(params, move |result| {
            let mut result = result;
            if !peers.is_empty() {
                let replies = cluster::dispatch(&peers, &position_fen, think_time_ms, depth_hint);
                if let Some(local_mv) = result.best_move {
                    let local_str = format_uci_move(&local_mv);
                    let candidate = LocalCandidate {
                        depth: depth_hint.unwrap_or(0),
                        score: 0,
                    };
                    let chosen = cluster::select_best(&local_str, candidate, &replies).to_string();
                    if chosen != local_str {
                        // A peer's move wins the tiebreak; ponder move no
                        // longer corresponds to our own root move.
                        result.ponder_move = None;
                    }
                    print_search_result(&result);
                    relaunch_ponder(&ponder_handle, &board_before_move, &result);
                    return;
                }
            }
            print_search_result(&result);
            relaunch_ponder(&ponder_handle, &board_before_move, &result);
        });
    }

    fn handle_perft(&mut self, depth: usize) {
        let start = Instant::now();
        let mut board = self.controller.board().clone();
        let nodes = board.perft(depth);
        print_perft_info(depth, nodes, start.elapsed());
    }

    /// `sdiv <depth>`: per-root-move breakdown, each child searched to
    /// `depth - 1` using the session's own TT and history tables.
    fn handle_sdiv(&mut self, depth: u32) {
        if depth == 0 {
            println!("info string sdiv requires depth >= 1");
            return;
        }
        let mut board = self.controller.board().clone();
        let moves = board.generate_moves();
        let mut total = 0u64;

        for mv in &moves {
            let info = board.make_move(mv);
            let score = if depth > 1 {
                use crate::board::SearchConfig;
                use std::sync::atomic::AtomicBool;

                let last_score = Arc::new(parking_lot::Mutex::new(0i32));
                let sink = Arc::clone(&last_score);
                let config = SearchConfig::depth(depth - 1)
                    .with_ponder(false)
                    .with_info_callback(Arc::new(move |iter: &SearchIterationInfo| {
                        *sink.lock() = iter.score;
                    }));
                let stop = AtomicBool::new(false);
                self.controller
                    .with_search_state(|state| crate::board::search(&mut board, state, config, &stop));
                -*last_score.lock()
            } else {
                -board.evaluate()
            };
            board.unmake_move(mv, info);
            total += 1;
            println!("info string sdiv {} score cp {}", format_uci_move(mv), score);
        }
        println!("info string sdiv total {total}");
    }

    fn handle_eval(&self) {
        let score = self.controller.board().evaluate();
        println!("info string eval cp {score}");
    }

    fn handle_fen(&self) {
        println!("info string fen {}", self.controller.board().to_fen());
    }

    fn handle_syzygy(&self) {
        match &self.syzygy_path {
            Some(path) => println!("info string syzygy configured path={path}"),
            None => println!("info string syzygy not configured"),
        }
    }

    /// Blocking main loop: read commands from stdin until `quit` or EOF.
    pub fn run_loop(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match self.process_command(&line) {
                CommandResult::Quit => break,
                CommandResult::Ok(Some(msg)) => println!("{msg}"),
                CommandResult::Ok(None) => {}
                CommandResult::Unknown(cmd) => {
                    log::debug!("ignoring unrecognized command: {cmd}");
                }
            }
        }
        self.controller.stop_search();
        self.controller.stop_ponder();
    }
}

impl Protocol for UciSession {
    fn process_command(&mut self, line: &str) -> CommandResult {
        let Some(command) = parse_uci_command(line) else {
            return CommandResult::Ok(None);
        };
        let parts: Vec<&str> = line.split_whitespace().collect();

        match command {
            UciCommand::Uci => {
                self.handle_uci();
                CommandResult::Ok(None)
            }
            UciCommand::IsReady => {
                print_ready();
                CommandResult::Ok(None)
            }
            UciCommand::UciNewGame => {
                self.controller.new_game();
                self.last_applied_move = None;
                CommandResult::Ok(None)
            }
            UciCommand::Position(_) => {
                self.handle_position(&parts);
                CommandResult::Ok(None)
            }
            UciCommand::Go(_) => {
                self.handle_go(&parts);
                CommandResult::Ok(None)
            }
            UciCommand::Perft(depth) => {
                self.handle_perft(depth);
                CommandResult::Ok(None)
            }
            UciCommand::SetOption(_) => {
                self.handle_setoption(&parts);
                CommandResult::Ok(None)
            }
            UciCommand::Debug(value) => {
                self.debug = value.as_deref() == Some("on");
                CommandResult::Ok(None)
            }
            UciCommand::Stop => {
                self.controller.signal_stop();
                CommandResult::Ok(None)
            }
            UciCommand::Quit => CommandResult::Quit,
            UciCommand::Play(ms) => {
                self.dispatch_search(GoParams {
                    movetime: Some(ms),
                    ..GoParams::default()
                });
                CommandResult::Ok(None)
            }
            UciCommand::SDiv(depth) => {
                self.handle_sdiv(depth);
                CommandResult::Ok(None)
            }
            UciCommand::Eval => {
                self.handle_eval();
                CommandResult::Ok(None)
            }
            UciCommand::Fen => {
                self.handle_fen();
                CommandResult::Ok(None)
            }
            UciCommand::Syzygy => {
                self.handle_syzygy();
                CommandResult::Ok(None)
            }
            UciCommand::Unknown(cmd) => CommandResult::Unknown(cmd),
        }
    }

    fn on_search_complete(&mut self, result: SearchResult) {
        print_search_result(&result);
    }

    fn name(&self) -> &'static str {
        "uci"
    }

    fn run(&mut self) {
        self.run_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uci_command_prints_id_and_uciok() {
        let mut session = UciSession::new(1, 1);
        let result = session.process_command("uci");
        assert!(matches!(result, CommandResult::Ok(None)));
    }

    #[test]
    fn quit_is_reported() {
        let mut session = UciSession::new(1, 1);
        assert!(matches!(session.process_command("quit"), CommandResult::Quit));
    }

    #[test]
    fn unknown_command_is_passed_through() {
        let mut session = UciSession::new(1, 1);
        assert!(matches!(
            session.process_command("notacommand"),
            CommandResult::Unknown(_)
        ));
    }

    #[test]
    fn hard_time_is_at_least_soft_time() {
        assert_eq!(hard_time_ms(0), 0);
        assert!(hard_time_ms(1000) >= 1000);
    }

    #[test]
    fn last_move_token_takes_final_move_in_list() {
        let parts: Vec<&str> = "position startpos moves e2e4 e7e5".split_whitespace().collect();
        assert_eq!(last_move_token(&parts), Some("e7e5".to_string()));
    }

    #[test]
    fn last_move_token_none_without_moves_keyword() {
        let parts: Vec<&str> = "position startpos".split_whitespace().collect();
        assert_eq!(last_move_token(&parts), None);
    }

    #[test]
    fn last_move_token_none_with_empty_moves_list() {
        let parts: Vec<&str> = "position startpos moves".split_whitespace().collect();
        assert_eq!(last_move_token(&parts), None);
    }

    #[test]
    fn ponder_credit_reduces_think_time() {
        assert_eq!(apply_ponder_credit(1000, 400), 600);
    }

    #[test]
    fn ponder_credit_floors_at_one_ms() {
        assert_eq!(apply_ponder_credit(500, 900), 1);
    }

    #[test]
    fn ponder_credit_no_effect_on_unbounded_search() {
        assert_eq!(apply_ponder_credit(0, 900), 0);
    }

    #[test]
    fn zero_credit_leaves_think_time_unchanged() {
        assert_eq!(apply_ponder_credit(1000, 0), 1000);
    }

    #[test]
    fn go_after_position_cancels_any_ponder_without_crediting() {
        // No ponder was ever started, so reconciling before the first `go`
        // must be a harmless no-op rather than panicking on a missing job.
        let mut session = UciSession::new(1, 1);
        assert_eq!(session.reconcile_ponder(), 0);
    }
}
