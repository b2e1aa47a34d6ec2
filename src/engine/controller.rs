//! Engine controller implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::board::{
    search, Board, Move, SearchConfig, SearchInfoCallback, SearchResult, SearchState,
};
use crate::timer::DeadlineTimer;
use crate::tt::TranspositionTable;

/// Search thread stack size (32 MB). Alpha-beta recursion depth can run deep
/// on the default stack, especially with quiescence layered on top.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Ponder search depth cap (§4.6: "think-time = ∞ and `max_depth = 255`");
/// `search` clamps this to the engine's own ply limit anyway.
const PONDER_MAX_DEPTH: u32 = 255;

/// Active search job state
pub struct SearchJob {
    /// Stop flag for the search
    pub stop: Arc<AtomicBool>,
    /// Planned soft time limit
    pub planned_soft_time_ms: u64,
    /// Planned hard time limit
    pub planned_hard_time_ms: u64,
    /// Handle to the search thread
    handle: JoinHandle<()>,
    /// Timer enforcing the hard deadline.
    timer: Option<DeadlineTimer>,
}

impl SearchJob {
    /// Stop the search and wait for the thread to finish
    pub fn stop_and_wait(self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(timer) = self.timer {
            timer.notify();
        }
        let _ = self.handle.join();
    }

    /// Signal stop without waiting
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(timer) = &self.timer {
            timer.notify();
        }
    }
}

/// One self-directed ponder search in flight (§4.6), keyed off its own
/// cancel flag and join handle rather than [`SearchJob`]'s: it carries no
/// timer and is never converted into a real search in place, only stopped
/// and replaced.
struct PonderJob {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Option<Move>>,
    started_at: Instant,
}

/// Cloneable handle for starting or cancelling the ponder search from
/// outside the controller: the `go` completion callback that relaunches it
/// runs on the search thread, after the session's own call into
/// [`EngineController::start_search`] has already returned.
#[derive(Clone)]
pub struct PonderHandle {
    search_state: Arc<Mutex<SearchState>>,
    slot: Arc<Mutex<Option<PonderJob>>>,
    num_threads: usize,
    enabled: bool,
}

impl PonderHandle {
    /// Launch the pool on `board` (the position with our own move already
    /// applied) with an unbounded deadline. A no-op if pondering is
    /// disabled; cancels whatever ponder search was already running.
    pub fn start(&self, board: Board) {
        if !self.enabled {
            return;
        }
        self.stop();

        let stop = Arc::new(AtomicBool::new(false));
        let search_state = Arc::clone(&self.search_state);
        let stop_clone = Arc::clone(&stop);
        let num_threads = self.num_threads;

        let Ok(handle) = thread::Builder::new()
            .name("ponder".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut board = board;
                let config = SearchConfig::depth(PONDER_MAX_DEPTH)
                    .with_ponder(false)
                    .with_threads(num_threads);
                let result = {
                    let mut guard = search_state.lock();
                    search(&mut board, &mut guard, config, &stop_clone)
                };
                result.best_move
            })
        else {
            return;
        };

        *self.slot.lock() = Some(PonderJob {
            stop,
            handle,
            started_at: Instant::now(),
        });
    }

    /// Cancel any ponder search in flight and return the move it had
    /// settled on plus how long it ran, for the caller's ponder-hit
    /// time-credit reconciliation (§4.6).
    pub fn stop(&self) -> Option<(Option<Move>, Duration)> {
        let job = self.slot.lock().take()?;
        job.stop.store(true, Ordering::Relaxed);
        let elapsed = job.started_at.elapsed();
        let best_move = job.handle.join().unwrap_or(None);
        Some((best_move, elapsed))
    }
}

/// Search parameters for starting a new search
#[derive(Default)]
pub struct SearchParams {
    /// Maximum depth to search (None = unlimited)
    pub depth: Option<u32>,
    /// Soft time limit in milliseconds
    pub soft_time_ms: u64,
    /// Hard time limit in milliseconds
    pub hard_time_ms: u64,
    /// Whether to search infinitely
    pub infinite: bool,
    /// Cluster-peer root-move-skip ordinal (§4.8); 0 when not clustered.
    pub cluster_idx: usize,
}

/// Engine controller managing search and game state
pub struct EngineController {
    /// Current board position
    board: Board,
    /// Search state (transposition table, history tables, etc.)
    search_state: Arc<Mutex<SearchState>>,
    /// Active search job (if any)
    current_job: Option<SearchJob>,
    /// Self-directed ponder job (§4.6), if one is running.
    ponder_slot: Arc<Mutex<Option<PonderJob>>>,
    /// Whether pondering was enabled at startup (`-p`).
    ponder_enabled: bool,
    /// Optional callback for per-iteration search info
    info_callback: Option<SearchInfoCallback>,
    /// Number of Lazy-SMP worker threads (1 = single-threaded)
    num_threads: usize,
}

impl EngineController {
    /// Create a new engine controller
    #[must_use]
    pub fn new(tt_mb: usize) -> Self {
        EngineController {
            board: Board::new(),
            search_state: Arc::new(Mutex::new(SearchState::new(tt_mb))),
            current_job: None,
            ponder_slot: Arc::new(Mutex::new(None)),
            ponder_enabled: false,
            info_callback: None,
            num_threads: 1,
        }
    }

    /// Build a controller around an already-constructed TT, e.g. one wired
    /// up to the cluster replicator by the caller.
    #[must_use]
    pub fn with_tt(tt: Arc<TranspositionTable>) -> Self {
        EngineController {
            board: Board::new(),
            search_state: Arc::new(Mutex::new(SearchState::with_tt(tt))),
            current_job: None,
            ponder_slot: Arc::new(Mutex::new(None)),
            ponder_enabled: false,
            info_callback: None,
            num_threads: 1,
        }
    }

    /// Enable or disable the self-directed ponder search (§4.6), normally
    /// set once at startup from the `-p` CLI flag.
    pub fn set_ponder_enabled(&mut self, enabled: bool) {
        self.ponder_enabled = enabled;
    }

    /// A cloneable handle for launching/cancelling the ponder search from
    /// a `go` completion callback running outside this controller.
    #[must_use]
    pub fn ponder_handle(&self) -> PonderHandle {
        PonderHandle {
            search_state: Arc::clone(&self.search_state),
            slot: Arc::clone(&self.ponder_slot),
            num_threads: self.num_threads,
            enabled: self.ponder_enabled,
        }
    }

    /// Cancel any ponder search in flight (§3: cancelled at the next `go`
    /// or `ucinewgame`) and return what it had settled on, for time-credit
    /// reconciliation.
    pub fn stop_ponder(&mut self) -> Option<(Option<Move>, Duration)> {
        let job = self.ponder_slot.lock().take()?;
        job.stop.store(true, Ordering::Relaxed);
        let elapsed = job.started_at.elapsed();
        let best_move = job.handle.join().unwrap_or(None);
        Some((best_move, elapsed))
    }

    /// Set the number of search threads for Lazy-SMP
    pub fn set_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads.max(1);
    }

    /// Get current thread count
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Get a reference to the current board
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Get a mutable reference to the current board
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Set the board position
    pub fn set_board(&mut self, board: Board) {
        self.stop_search();
        self.board = board;
    }

    /// Get a reference to the search state
    #[must_use]
    pub fn search_state(&self) -> &Arc<Mutex<SearchState>> {
        &self.search_state
    }

    /// Reset the board to starting position
    pub fn new_game(&mut self) {
        self.stop_search();
        self.stop_ponder();
        self.board = Board::new();
        let mut state = self.search_state.lock();
        state.new_search();
        state.tables.tt.bump_age();
    }

    /// Stop any active search
    pub fn stop_search(&mut self) {
        if let Some(job) = self.current_job.take() {
            job.stop_and_wait();
        }
    }

    /// Signal stop to active search (non-blocking)
    pub fn signal_stop(&mut self) {
        if let Some(job) = &self.current_job {
            job.signal_stop();
        }
    }

    /// Check if there's an active search
    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.current_job.is_some()
    }

    /// Set callback for iteration info reporting.
    pub fn set_info_callback(&mut self, cb: Option<SearchInfoCallback>) {
        self.info_callback = cb;
    }

    /// Resize the transposition table. Per §4.1, resizing discards all
    /// entries; callers must not have a search in flight.
    pub fn resize_hash(&mut self, mb: usize) {
        self.stop_search();
        self.search_state.lock().reset_tables(mb);
    }

    /// Set maximum nodes for the next search.
    pub fn set_max_nodes(&mut self, nodes: u64) {
        self.search_state.lock().set_max_nodes(nodes);
    }

    /// Set trace/debug mode.
    pub fn set_trace(&mut self, trace: bool) {
        self.search_state.lock().set_trace(trace);
    }

    fn build_config(&self, params: &SearchParams, node_limit: u64) -> SearchConfig {
        let mut config = params.depth.map_or_else(SearchConfig::default, SearchConfig::depth);

        if !params.infinite && params.soft_time_ms > 0 {
            config.time_limit_ms = params.soft_time_ms;
        }
        if node_limit > 0 {
            config = config.with_nodes(node_limit);
        }
        if let Some(cb) = &self.info_callback {
            config = config.with_info_callback(cb.clone());
        }
        config = config.with_threads(self.num_threads);
        config.with_cluster_idx(params.cluster_idx)
    }

    /// Start a search with the given parameters. Cancels any self-directed
    /// ponder search in flight first (§3: "cancelled at the next `go`").
    ///
    /// The `on_complete` callback fires once the worker pool has joined.
    pub fn start_search<F>(&mut self, params: SearchParams, on_complete: F)
    where
        F: FnOnce(SearchResult) + Send + 'static,
    {
        self.stop_search();
        self.stop_ponder();

        let node_limit = {
            let mut guard = self.search_state.lock();
            guard.new_search();
            guard.stats.max_nodes
        };

        let config = self.build_config(&params, node_limit);
        let stop = Arc::new(AtomicBool::new(false));

        // A depth-limited or infinite search has no wall-clock deadline of
        // its own; the hard-stop timer only applies to a timed `go`.
        let timer = if !params.infinite && params.hard_time_ms > 0 {
            DeadlineTimer::start(params.hard_time_ms, Arc::clone(&stop))
        } else {
            None
        };

        let search_board = self.board.clone();
        let search_state = Arc::clone(&self.search_state);
        let stop_clone = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("search".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut board = search_board;
                let mut guard = search_state.lock();
                let result: SearchResult = search(&mut board, &mut guard, config, &stop_clone);
                drop(guard);
                on_complete(result);
            })
            .expect("failed to spawn search thread");

        self.current_job = Some(SearchJob {
            stop,
            planned_soft_time_ms: params.soft_time_ms,
            planned_hard_time_ms: params.hard_time_ms,
            handle,
            timer,
        });
    }

    /// Execute a closure with mutable access to the search state.
    pub fn with_search_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SearchState) -> R,
    {
        f(&mut self.search_state.lock())
    }

    /// Execute a closure with immutable access to the search state.
    pub fn with_search_state_ref<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SearchState) -> R,
    {
        f(&self.search_state.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ponder_handle_disabled_is_a_no_op() {
        let controller = EngineController::new(1);
        let handle = controller.ponder_handle();
        handle.start(Board::new());
        assert!(handle.stop().is_none());
    }

    #[test]
    fn ponder_handle_start_then_stop_reports_elapsed_time() {
        let mut controller = EngineController::new(1);
        controller.set_ponder_enabled(true);
        let handle = controller.ponder_handle();
        handle.start(Board::new());
        let (_, elapsed) = handle.stop().expect("ponder job was running");
        assert!(elapsed.as_secs() < 5, "cooperative cancellation should unwind quickly");
    }

    #[test]
    fn stop_ponder_on_controller_with_no_job_is_none() {
        let mut controller = EngineController::new(1);
        assert!(controller.stop_ponder().is_none());
    }
}
