//! Lazy-SMP worker pool (§4.5). Every worker shares the same
//! `TranspositionTable` (an `Arc`, cheap to clone); everything else is
//! private per worker, per §3: its own board copy, its own history table,
//! its own completed depth. Worker 0 drives the externally visible `info`
//! stream; the rest desynchronize their depth so the pool explores more of
//! the tree per unit wall time than N copies of the same iterative
//! deepening would.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rand::Rng;

use super::constants::{ASPIRATION_GROWTH_DIVISOR, ASPIRATION_INITIAL_DELTA, MATE_THRESHOLD, SCORE_INFINITE};
use super::simple::SimpleSearchContext;
use super::{HistoryTable, SearchIterationInfo, SearchInfoCallback, SearchState};
use crate::board::{Board, Move, EMPTY_MOVE};

/// Tunables for one pool invocation, built from [`super::SearchConfig`] by
/// [`super::search`].
pub struct PoolConfig {
    pub num_threads: usize,
    pub max_depth: u32,
    pub time_limit_ms: u64,
    pub node_limit: u64,
    pub cluster_idx: usize,
    pub info_callback: Option<SearchInfoCallback>,
}

/// What one worker last committed: a fully-searched iteration, never a
/// partial one abandoned mid-search.
#[derive(Clone, Copy)]
struct WorkerOutcome {
    best_move: Option<Move>,
    depth: u32,
    score: i32,
}

/// Run the pool to completion and return the move judged best by §4.5's
/// selection rule. `stop` is the single shared cancel flag (§5: "the cancel
/// flag is the single coordination primitive... written by the timer or the
/// winning worker"): the time manager sets it from outside, and whichever
/// worker finishes first sets it too, so the rest wind down cooperatively.
pub fn run_pool(
    board: &mut Board,
    state: &mut SearchState,
    config: &PoolConfig,
    stop: &AtomicBool,
) -> Option<Move> {
    let num_threads = config.num_threads.max(1);
    let tt = state.tables.tt.clone();
    let start_time = Instant::now();
    let params = state.params().clone();

    // Worker 0 reuses the caller's own history table (keeps move-ordering
    // continuity across `go` commands); the rest start zeroed per §3.
    let primary_history = std::mem::replace(&mut state.tables.history, HistoryTable::new());

    let outcomes: Vec<Mutex<Option<WorkerOutcome>>> =
        (0..num_threads).map(|_| Mutex::new(None)).collect();
    let depths: Vec<AtomicU32> = (0..num_threads).map(|_| AtomicU32::new(0)).collect();
    let first_done = AtomicBool::new(false);
    let final_history: Mutex<Option<HistoryTable>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for worker_id in 0..num_threads {
            let tt_ref = tt.as_ref();
            let outcomes = &outcomes;
            let depths = &depths;
            let first_done = &first_done;
            let final_history = &final_history;
            let params = params.clone();
            let mut worker_board = board.clone();
            let mut history = if worker_id == 0 {
                primary_history.clone()
            } else {
                HistoryTable::new()
            };
            let info_callback = config.info_callback.clone();
            let cluster_idx = config.cluster_idx;
            let max_depth = config.max_depth.max(1);
            let time_limit_ms = config.time_limit_ms;
            let node_limit = config.node_limit;

            scope.spawn(move || {
                let mut ctx = SimpleSearchContext {
                    board: &mut worker_board,
                    history: &mut history,
                    tt: tt_ref,
                    params: &params,
                    stop,
                    start_time,
                    time_limit_ms,
                    node_limit,
                    nodes: 0,
                    seldepth: 0,
                    tt_hits: 0,
                    max_depth,
                    cluster_idx,
                    root_best_move: EMPTY_MOVE,
                };

                run_worker(
                    worker_id,
                    num_threads,
                    &mut ctx,
                    max_depth,
                    depths,
                    &outcomes[worker_id],
                    worker_id == 0,
                    info_callback.as_deref(),
                );

                if worker_id == 0 {
                    *final_history.lock() = Some(history);
                }

                if !first_done.swap(true, Ordering::AcqRel) {
                    stop.store(true, Ordering::Release);
                }
            });
        }
    });

    if let Some(history) = final_history.into_inner() {
        state.tables.history = history;
    } else {
        state.tables.history = primary_history;
    }

    select_result(board, &outcomes)
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    worker_id: usize,
    num_threads: usize,
    ctx: &mut SimpleSearchContext<'_>,
    max_depth: u32,
    depths: &[AtomicU32],
    outcome: &Mutex<Option<WorkerOutcome>>,
    reports_info: bool,
    info_callback: Option<&(dyn Fn(&SearchIterationInfo) + Send + Sync)>,
) {
    let mut depth: u32 = 1;
    let mut add_alpha = ASPIRATION_INITIAL_DELTA;
    let mut add_beta = ASPIRATION_INITIAL_DELTA;
    let mut alpha = -SCORE_INFINITE;
    let mut beta = SCORE_INFINITE;

    depths[worker_id].store(depth, Ordering::Relaxed);

    while depth <= max_depth {
        if ctx.should_stop() {
            break;
        }

        let score = ctx.alphabeta(depth, alpha, beta, 0, false);

        if ctx.should_stop() {
            break;
        }

        if score <= alpha {
            beta = (alpha + beta) / 2;
            alpha = (score - add_alpha).max(-10_000);
            add_alpha += add_alpha / ASPIRATION_GROWTH_DIVISOR + 1;
            continue;
        }
        if score >= beta {
            alpha = (alpha + beta) / 2;
            beta = (score + add_beta).min(10_000);
            add_beta += add_beta / ASPIRATION_GROWTH_DIVISOR + 1;
            continue;
        }

        let best_move = ctx.root_move();
        *outcome.lock() = Some(WorkerOutcome {
            best_move,
            depth,
            score,
        });

        if reports_info {
            if let Some(cb) = info_callback {
                let elapsed = ctx.start_time.elapsed();
                let nodes = ctx.nodes;
                let nps = if elapsed.as_millis() > 0 {
                    nodes * 1000 / elapsed.as_millis() as u64
                } else {
                    0
                };
                let mate_in = if score.abs() > MATE_THRESHOLD {
                    let plies = 10_000 - score.abs();
                    let mate_moves = (plies + 1) / 2;
                    Some(if score > 0 { mate_moves } else { -mate_moves })
                } else {
                    None
                };
                let pv = best_move
                    .map(|mv| crate::uci::format_uci_move(&mv))
                    .unwrap_or_default();
                cb(&SearchIterationInfo {
                    depth,
                    nodes,
                    nps,
                    time_ms: elapsed.as_millis() as u64,
                    score,
                    mate_in,
                    pv,
                    seldepth: ctx.seldepth,
                    tt_hits: ctx.tt_hits,
                });
            }
        }

        // Center the next iteration's window on the score just committed,
        // not the full-width fallback — an always-infinite window would
        // make the fail-low/fail-high branches above unreachable for any
        // real (non-mate-adjacent) score.
        alpha = (score - ASPIRATION_INITIAL_DELTA).max(-10_000);
        beta = (score + ASPIRATION_INITIAL_DELTA).min(10_000);
        add_alpha = ASPIRATION_INITIAL_DELTA;
        add_beta = ASPIRATION_INITIAL_DELTA;

        depth = next_depth(worker_id, num_threads, depth, depths);
        depths[worker_id].store(depth, Ordering::Relaxed);
    }
}

/// §4.5's depth-advance policy: worker 0 always steps by one; the rest, once
/// the pool is wide enough for it to matter, hop forward until they're not
/// bunched up with the majority of their peers.
fn next_depth(worker_id: usize, num_threads: usize, depth: u32, depths: &[AtomicU32]) -> u32 {
    if worker_id == 0 || num_threads <= 3 {
        return depth + 1;
    }
    let mut candidate = depth + 1;
    loop {
        let at_candidate = depths
            .iter()
            .filter(|d| d.load(Ordering::Relaxed) == candidate)
            .count();
        if at_candidate < num_threads / 2 {
            return candidate;
        }
        candidate += 1;
    }
}

/// §4.5 join procedure steps 3-4: highest depth wins, ties broken by score;
/// if nobody ever committed a result, fall back to a uniformly random legal
/// move so `bestmove` is never empty (§7).
fn select_result(board: &mut Board, outcomes: &[Mutex<Option<WorkerOutcome>>]) -> Option<Move> {
    let mut best: Option<WorkerOutcome> = None;
    for slot in outcomes {
        if let Some(candidate) = *slot.lock() {
            let better = match best {
                None => true,
                Some(current) => {
                    candidate.depth > current.depth
                        || (candidate.depth == current.depth && candidate.score > current.score)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
    }

    if let Some(outcome) = best {
        if let Some(mv) = outcome.best_move {
            return Some(mv);
        }
    }

    let moves = board.generate_moves();
    if moves.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..moves.len());
    moves.get(idx)
}
