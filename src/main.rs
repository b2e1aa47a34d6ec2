//! Process entry point: parses CLI flags (§6), installs logging, wires the
//! transposition table to the replicator, and either runs the interactive
//! UCI session on stdin/stdout or serves as a headless cluster peer (`-N`).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use chess_engine::board::{search, Board, SearchConfig, SearchParams, SearchState};
use chess_engine::cluster;
use chess_engine::config::{Cli, EngineConfig};
use chess_engine::engine::EngineController;
use chess_engine::logging;
use chess_engine::replicator;
use chess_engine::tt::TranspositionTable;
use chess_engine::tuner;
use chess_engine::uci::{format_uci_move, UciSession};

/// UDP port the TT replicator broadcasts/listens on. Not a CLI flag (§6
/// lists no replication-port override, unlike `-N`'s cluster-request port).
const REPLICATION_PORT: u16 = replicator::DEFAULT_REPLICATION_PORT;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap prints --help/--version output through Ok(), but a real
            // parse failure reaches here; §6: exit code 1 on unrecognized flag.
            if e.exit_code() == 0 {
                print!("{e}");
                std::process::exit(0);
            }
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let config = EngineConfig::from_cli(&cli);
    logging::init(config.log_path.as_deref(), config.log_tag.as_deref());

    if let Some(epd_path) = &config.tune_epd {
        run_tuner(&config, epd_path);
        return;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (tt, _replicator) = replicator::spawn(config.hash_mb, REPLICATION_PORT, Arc::clone(&stop));
    let starting_params = load_starting_params(&config);

    if let Some(_port) = config.cluster_port {
        run_cluster_peer(&config, Arc::clone(&tt), starting_params.clone());
        if !config.also_local {
            stop.store(true, std::sync::atomic::Ordering::Relaxed);
            return;
        }
    }

    let mut session = build_session(&config, tt, starting_params);
    session.set_cluster_peers(config.peers.clone());
    session.set_syzygy_path(config.syzygy_path.clone());
    session.run_loop();
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
}

fn build_session(config: &EngineConfig, tt: Arc<TranspositionTable>, params: SearchParams) -> UciSession {
    let mut controller = EngineController::with_tt(tt);
    controller.set_threads(config.threads);
    controller.set_ponder_enabled(config.ponder);
    controller.with_search_state(|state| state.set_params(params));
    UciSession::with_controller(controller, config.hash_mb, config.threads)
}

fn load_starting_params(config: &EngineConfig) -> SearchParams {
    let mut params = SearchParams::default();
    let Some(path) = &config.tune_file else { return params };
    match std::fs::read_to_string(path) {
        Ok(text) => {
            for (name, value) in chess_engine::board::parse_tuning_file(&text) {
                if !params.set_by_name(&name, value) {
                    log::warn!("tuning file {path}: unrecognized parameter {name:?}, ignored");
                }
            }
        }
        Err(e) => log::warn!("failed to read tuning file {path}: {e}"),
    }
    params
}

/// Run this node as a headless cluster peer (`-N <port>`): block forever
/// answering [`cluster::ClusterRequest`]s with a local, fixed-depth-or-time
/// search over the shared replicated TT.
fn run_cluster_peer(config: &EngineConfig, tt: Arc<TranspositionTable>, params: SearchParams) {
    let port = config.effective_cluster_port();
    let mut state = SearchState::with_tt(tt);
    state.set_params(params);

    let run = move |fen: &str, think_time_ms: u64, depth: i32, idx: usize| -> Option<(String, u32, i32)> {
        let mut board = Board::try_from_fen(fen).unwrap_or_else(|_| Board::new());
        let search_config = if depth >= 0 {
            SearchConfig::depth(depth as u32).with_ponder(false)
        } else {
            SearchConfig::time(think_time_ms.max(1)).with_ponder(false)
        };
        let search_config = search_config.with_cluster_idx(idx);
        let last_score = Arc::new(std::sync::atomic::AtomicI32::new(0));
        let score_slot = Arc::clone(&last_score);
        let search_config = search_config.with_info_callback(Arc::new(move |info| {
            score_slot.store(info.score, std::sync::atomic::Ordering::Relaxed);
        }));
        let stop = AtomicBool::new(false);
        let result = search(&mut board, &mut state, search_config, &stop);
        let mv = result.best_move?;
        let depth_reached = state.stats.seldepth.max(1);
        let score = last_score.load(std::sync::atomic::Ordering::Relaxed);
        Some((format_uci_move(&mv), depth_reached, score))
    };

    if config.also_local {
        std::thread::spawn(move || {
            if let Err(e) = cluster::serve(port, run) {
                log::warn!("cluster peer serve failed: {e}");
            }
        });
    } else if let Err(e) = cluster::serve(port, run) {
        log::warn!("cluster peer serve failed: {e}");
    }
}

/// `-t <epd>`: run the offline solve-rate tuner and print the resulting
/// parameter set in `-T`-compatible `key=integer` form, then exit.
fn run_tuner(config: &EngineConfig, epd_path: &str) {
    let text = match std::fs::read_to_string(epd_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("failed to read tuning EPD {epd_path}: {e}");
            std::process::exit(1);
        }
    };
    let positions = tuner::load_epd(&text);
    if positions.is_empty() {
        eprintln!("no usable `bm`-opcode positions found in {epd_path}");
        std::process::exit(1);
    }
    let starting = load_starting_params(config);
    let (tuned, score) = tuner::tune(&positions, starting, config.threads);
    println!("# solved {score}/{} suite positions", positions.len());
    print!("{}", tuner::render_tuning_file(&tuned));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_starting_params_with_no_file_returns_defaults() {
        let config = EngineConfig {
            hash_mb: 1,
            threads: 1,
            ponder: false,
            syzygy_path: None,
            tune_epd: None,
            tune_file: None,
            log_path: None,
            log_tag: None,
            peers: Vec::new(),
            cluster_port: None,
            also_local: false,
        };
        let params = load_starting_params(&config);
        assert_eq!(params.get_by_name("lmr_min_played"), SearchParams::default().get_by_name("lmr_min_played"));
    }
}
