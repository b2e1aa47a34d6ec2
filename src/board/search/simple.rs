//! The recursive negamax node function (search §4.4) and its quiescence leaf
//! (§4.3). This module is the per-thread node-evaluation kernel; iterative
//! deepening, aspiration windows, and worker fan-out live one layer up in
//! [`super::smp`].

mod quiescence;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::tt::{Bound, TranspositionTable};

use super::constants::{MATE_SCORE, MATE_THRESHOLD};
use super::move_order::score_move;
use super::{HistoryTable, SearchParams};
use crate::board::{Board, Move, MoveList, ScoredMoveList, EMPTY_MOVE};

/// Per-thread search context, owned entirely by one worker in the
/// [`super::smp`] pool. `tt` is shared (an `Arc` deref) with every other
/// worker; `history` and `board` are private per §3. `cluster_idx`
/// implements the cluster-peer root-move-skip described in §4.5: when a
/// node is running as peer `k` of a cluster dispatch, the first `k` root
/// moves (after ordering) are skipped so peers each explore a distinct
/// slice of the root.
pub struct SimpleSearchContext<'a> {
    pub board: &'a mut Board,
    pub history: &'a mut HistoryTable,
    pub tt: &'a TranspositionTable,
    pub params: &'a SearchParams,
    pub stop: &'a AtomicBool,
    pub start_time: Instant,
    pub time_limit_ms: u64,
    pub node_limit: u64,
    pub nodes: u64,
    pub seldepth: u32,
    pub tt_hits: u64,
    pub max_depth: u32,
    pub cluster_idx: usize,
    /// Root-level best move, updated every time the ply-0 move loop raises
    /// its running best. Read by the pool after an iteration completes.
    pub root_best_move: Move,
}

impl SimpleSearchContext<'_> {
    #[inline]
    pub fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        if self.node_limit > 0 && self.nodes >= self.node_limit {
            return true;
        }
        if self.time_limit_ms > 0 && self.nodes.trailing_zeros() >= 10 {
            let elapsed = self.start_time.elapsed().as_millis() as u64;
            if elapsed >= self.time_limit_ms {
                return true;
            }
        }
        false
    }

    #[inline]
    fn side_idx(&self) -> usize {
        self.board.current_color().index()
    }

    /// §4.3/§4.4's "immediate draw" test: halfmove-clock, in-tree repetition
    /// (a path position seen twice already is treated as drawn, so the
    /// search doesn't have to walk all the way to an actual threefold), or
    /// insufficient mating material.
    #[inline]
    fn is_repetition(&self) -> bool {
        self.board.repetition_counts.get(self.board.hash) > 1
            || self.board.is_theoretical_draw()
    }

    fn params(&self) -> SearchParams {
        self.params.clone()
    }

    /// The root move the last completed iteration settled on, if any.
    #[must_use]
    pub fn root_move(&self) -> Option<Move> {
        if self.root_best_move == EMPTY_MOVE {
            None
        } else {
            Some(self.root_best_move)
        }
    }

    /// Re-base a mate-adjacent score read out of the TT: it was stored
    /// relative to the node that wrote it, this call needs it relative to
    /// `ply` in the current search tree.
    fn rebase_from_tt(score: i32, ply: usize, max_depth: u32) -> i32 {
        if score.abs() <= MATE_THRESHOLD {
            return score;
        }
        let shift = max_depth as i32 - ply as i32;
        if score > 0 {
            score - shift
        } else {
            score + shift
        }
    }

    fn rebase_to_tt(score: i32, ply: usize, max_depth: u32) -> i32 {
        if score.abs() <= MATE_THRESHOLD {
            return score;
        }
        let shift = max_depth as i32 - ply as i32;
        if score > 0 {
            score + shift
        } else {
            score - shift
        }
    }

    /// Order the legal move list per §4.2, promoting the TT move and (if
    /// distinct) the IID move to forced-first.
    fn order_moves(&self, moves: &MoveList, tt_move: Move, extra_forced: Move) -> ScoredMoveList {
        let side_idx = self.side_idx();
        let mut forced = [EMPTY_MOVE; 2];
        let mut forced_count = 0;
        if tt_move != EMPTY_MOVE {
            forced[forced_count] = tt_move;
            forced_count += 1;
        }
        if extra_forced != EMPTY_MOVE && extra_forced != tt_move {
            forced[forced_count] = extra_forced;
            forced_count += 1;
        }

        let mut scored = ScoredMoveList::new();
        for mv in moves {
            let rank = forced[..forced_count]
                .iter()
                .position(|f| f == mv)
                .map(|idx| idx as i32);
            let score = score_move(self.board, *mv, rank, self.history, side_idx);
            scored.push(*mv, score);
        }
        scored.sort_by_score_desc();
        scored
    }

    /// Fail-soft alpha-beta negamax. Depth zero delegates to quiescence.
    /// `in_null_subtree` is true while recursing under an unresolved null
    /// move (§4.4: null-move pruning does not recurse into itself).
    pub fn alphabeta(
        &mut self,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        in_null_subtree: bool,
    ) -> i32 {
        if depth == 0 {
            return self.quiesce(alpha, beta, 0);
        }

        let is_root = ply == 0;

        if !is_root && self.is_repetition() {
            return 0;
        }

        self.nodes += 1;
        if ply as u32 + 1 > self.seldepth {
            self.seldepth = ply as u32 + 1;
        }

        if self.should_stop() {
            return 0;
        }

        let in_check = self.board.is_in_check(self.board.current_color());

        // TT probe: the stored move is legality-checked before being trusted
        // as the forced-first candidate (possible hash collision), and
        // mate-adjacent scores are rebased by the distance between the node
        // that stored the entry and this one.
        let probe = self.tt.probe(self.board.hash);
        let (tt_move, tt_score_raw, tt_bound, tt_depth) = match probe {
            Some(entry) => {
                let mv = entry.best_move().filter(|mv| {
                    let moves = self.board.generate_moves();
                    moves.iter().any(|m| m == mv)
                });
                (mv.unwrap_or(EMPTY_MOVE), entry.score, Some(entry.bound), entry.depth)
            }
            None => (EMPTY_MOVE, 0, None, 0),
        };

        if let Some(bound) = tt_bound {
            if tt_depth >= depth && !self.is_repetition() {
                let score = Self::rebase_from_tt(tt_score_raw, ply, self.max_depth);
                let usable = match bound {
                    Bound::Exact => true,
                    Bound::Lower => score >= beta,
                    Bound::Upper => score <= alpha,
                };
                // At root a usable hit only short-circuits when the TT
                // also carries a move to report as the chosen one; a
                // root hit with no move would leave `root_best_move`
                // unset (see original_source/search.cpp's `tt_move.value()`
                // guard on the root branch of this same check).
                if usable && (!is_root || tt_move != EMPTY_MOVE) {
                    self.tt_hits = self.tt_hits.saturating_add(1);
                    if is_root {
                        self.root_best_move = tt_move;
                    }
                    return score;
                }
            }
        }

        let moves = self.board.generate_moves();
        if moves.is_empty() {
            return if in_check {
                -MATE_SCORE + (self.max_depth as i32 - depth as i32)
            } else {
                0
            };
        }

        let check_extension: u32 = u32::from(in_check);
        let mut extra_forced = EMPTY_MOVE;
        let mut iid_extension: u32 = 0;
        let mut depth = depth;

        if !in_check {
            let static_eval = self.board.evaluate_simple();
            let params = self.params();

            // Reverse futility / static null pruning (§4.4): non-root only,
            // and only below the mate-score threshold so it doesn't prune
            // inside a mate search.
            if !is_root && beta <= 9800 {
                match depth {
                    1 if static_eval - params.rfp_knight_value > beta => return beta,
                    2 if static_eval - params.rfp_rook_value > beta => return beta,
                    3 if static_eval - params.rfp_queen_value > beta => depth -= 1,
                    _ => {}
                }
            }

            if !is_root && !in_null_subtree {
                if let Some(score) = self.try_null_move(depth, beta, ply, &params) {
                    return score;
                }
            }

            if tt_move == EMPTY_MOVE && depth >= 2 {
                let iid_score = self.alphabeta(depth - 2, alpha, beta, ply, in_null_subtree);
                if let Some(mv) = self.tt.probe(self.board.hash).and_then(|e| e.best_move()) {
                    extra_forced = mv;
                }
                if iid_score.abs() > MATE_THRESHOLD {
                    iid_extension = 1;
                }
            }
        }

        self.search_move_loop(
            depth + check_extension + iid_extension,
            alpha,
            beta,
            ply,
            in_check,
            tt_move,
            extra_forced,
            &moves,
            in_null_subtree,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn search_move_loop(
        &mut self,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        in_check: bool,
        tt_move: Move,
        extra_forced: Move,
        moves: &MoveList,
        in_null_subtree: bool,
    ) -> i32 {
        let is_root = ply == 0;
        let scored = self.order_moves(moves, tt_move, extra_forced);

        // Cluster peers each skip the first `cluster_idx` root moves so a
        // multi-node dispatch explores disjoint slices of the root.
        let skip = if is_root && self.cluster_idx > 0 && scored.len() > self.cluster_idx {
            self.cluster_idx
        } else {
            0
        };

        let params = self.params();
        let mut best_score = i32::MIN + 1;
        let mut best_move = EMPTY_MOVE;
        let mut raised_alpha = false;
        let mut played = 0usize;

        for scored_mv in scored.as_slice().iter().skip(skip) {
            if self.should_stop() {
                break;
            }
            let mv = scored_mv.mv;
            let is_quiet = !mv.is_capture() && !mv.is_promotion();

            let info = self.board.make_move(mv);
            let gives_check = self.board.is_in_check(self.board.current_color());
            played += 1;

            let new_depth = depth - 1;

            // LMR (§4.4): the reduced *target* depth, not a reduction amount
            // subtracted from `new_depth` — `depth - 2` once played 4-5,
            // `(depth - 1) * 2 / 3` once played >= 6.
            let reduced_depth = if depth >= 2
                && !in_check
                && !gives_check
                && is_quiet
                && played as u32 >= params.lmr_min_played
            {
                if played as u32 >= params.lmr_deeper_played {
                    Some((((depth as i32 - 1) * 2) / 3).max(0) as u32)
                } else {
                    Some(depth.saturating_sub(2))
                }
            } else {
                None
            };

            let score = if let Some(reduced_depth) = reduced_depth {
                let reduced = -self.alphabeta(reduced_depth, -beta, -alpha, ply + 1, in_null_subtree);
                if reduced > alpha {
                    -self.alphabeta(new_depth, -beta, -alpha, ply + 1, in_null_subtree)
                } else {
                    reduced
                }
            } else {
                -self.alphabeta(new_depth, -beta, -alpha, ply + 1, in_null_subtree)
            };

            self.board.unmake_move(mv, info);

            if self.should_stop() {
                break;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    alpha = score;
                    raised_alpha = true;
                }
                if score >= beta {
                    if is_quiet {
                        self.history.on_cutoff(self.side_idx(), &mv, depth);
                    }
                    if is_root {
                        self.root_best_move = best_move;
                    }
                    self.store_tt(depth, score, Bound::Lower, best_move, ply);
                    return score;
                }
            }
        }

        if played == 0 {
            return if in_check {
                -MATE_SCORE + (self.max_depth as i32 - depth as i32)
            } else {
                0
            };
        }

        if !self.should_stop() {
            let bound = if raised_alpha { Bound::Exact } else { Bound::Upper };
            let mv_to_store = if best_move == EMPTY_MOVE && tt_move != EMPTY_MOVE {
                tt_move
            } else {
                best_move
            };
            if is_root {
                self.root_best_move = mv_to_store;
            }
            self.store_tt(depth, best_score, bound, mv_to_store, ply);
        }

        best_score
    }

    /// Null-move pruning (§4.4): a reduced zero-window probe made inside a
    /// null-move subtree (so a second null move can't be tried directly
    /// beneath this one), confirmed on cutoff by a non-null zero-window
    /// search at the same reduced depth before trusting it. Gated only on
    /// `depth >= nm_reduce_depth`, not in check, not root, not already
    /// inside a null-move subtree (§4.4; `original_source/search.cpp`'s
    /// null-move block carries no additional material/eval precondition).
    fn try_null_move(
        &mut self,
        depth: u32,
        beta: i32,
        ply: usize,
        params: &SearchParams,
    ) -> Option<i32> {
        let reduction = if depth > params.null_move_depth_split {
            params.null_move_reduction_deep
        } else {
            params.null_move_reduction_shallow
        };
        if depth < reduction {
            return None;
        }

        let info = self.board.make_null_move();
        let probe_score = -self.alphabeta(depth - reduction, -beta, -beta + 1, ply + 1, true);
        self.board.unmake_null_move(info);

        if self.should_stop() || probe_score < beta {
            return None;
        }

        let verify_score = -self.alphabeta(depth - reduction, -beta, -beta + 1, ply + 1, false);
        if verify_score >= beta {
            Some(beta)
        } else {
            None
        }
    }

    fn store_tt(&mut self, depth: u32, score: i32, bound: Bound, mv: Move, ply: usize) {
        let stored_score = Self::rebase_to_tt(score, ply, self.max_depth);
        self.tt.store(
            self.board.hash,
            bound,
            depth,
            stored_score,
            mv,
            bound == Bound::Exact,
            false,
        );
    }
}
