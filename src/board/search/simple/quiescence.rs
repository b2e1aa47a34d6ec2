//! Quiescence search (§4.3): stand-pat with delta pruning, an SEE-lite
//! capture filter, and check evasion when the side to move is in check.

use super::super::constants::{MATE_SCORE, MAX_QSEARCH_DEPTH};
use super::super::move_order::piece_value;
use super::SimpleSearchContext;
use crate::board::{Piece, ScoredMoveList, EMPTY_MOVE};

impl SimpleSearchContext<'_> {
    pub fn quiesce(&mut self, alpha: i32, beta: i32, qdepth: i32) -> i32 {
        self.quiesce_inner(alpha, beta, qdepth, false)
    }

    fn quiesce_inner(&mut self, mut alpha: i32, beta: i32, qdepth: i32, after_promotion: bool) -> i32 {
        if self.is_repetition() {
            return 0;
        }

        let in_check = self.board.is_in_check(self.board.current_color());
        let params = self.params();

        let mut best_score;
        if in_check {
            best_score = -MATE_SCORE + self.max_depth as i32 + qdepth;
        } else {
            let stand_pat = self.board.evaluate_simple();
            if stand_pat >= beta {
                return stand_pat;
            }
            let margin = if after_promotion {
                params.qs_delta_margin_post_promotion
            } else {
                params.qs_delta_margin
            };
            if stand_pat + margin < alpha {
                return alpha;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
            best_score = stand_pat;
        }

        if qdepth >= MAX_QSEARCH_DEPTH {
            return best_score;
        }

        let moves = if in_check {
            self.board.generate_moves()
        } else {
            self.board.generate_tactical_moves()
        };

        if in_check && moves.is_empty() {
            return -MATE_SCORE + self.max_depth as i32 + qdepth;
        }

        let tt_move = self
            .tt
            .probe(self.board.hash)
            .and_then(|e| e.best_move())
            .unwrap_or(EMPTY_MOVE);

        let mut scored = ScoredMoveList::new();
        for mv in &moves {
            if !in_check && !mv.is_capture() && !mv.is_promotion() {
                continue;
            }
            let score = if *mv == tt_move {
                i32::MAX
            } else if mv.is_capture() {
                let victim = if mv.is_en_passant() {
                    Piece::Pawn
                } else {
                    self.board.piece_at(mv.to()).map_or(Piece::Pawn, |(_, p)| p)
                };
                piece_value(victim)
            } else {
                0
            };
            scored.push(*mv, score);
        }
        scored.sort_by_score_desc();

        let mut played_any = false;

        for scored_mv in scored.as_slice() {
            if self.should_stop() {
                break;
            }
            let mv = scored_mv.mv;
            let mover = self.board.current_color();

            // SEE-lite filter: skip a capture if the attacker is worth more
            // than the victim and the destination square is still defended.
            if !in_check && mv.is_capture() {
                if let Some((_, attacker)) = self.board.piece_at(mv.from()) {
                    let victim = if mv.is_en_passant() {
                        Piece::Pawn
                    } else {
                        self.board.piece_at(mv.to()).map_or(Piece::Pawn, |(_, p)| p)
                    };
                    if piece_value(attacker) > piece_value(victim)
                        && self.board.see(mv.from(), mv.to()) < 0
                    {
                        continue;
                    }
                }
            }

            self.nodes += 1;
            let info = self.board.make_move(mv);
            self.tt.prefetch(self.board.hash);

            // Post-make legality filter: `generate_tactical_moves` is
            // pseudo-legal, unlike `generate_moves`.
            if self.board.is_in_check(mover) {
                self.board.unmake_move(mv, info);
                continue;
            }

            played_any = true;
            let score = -self.quiesce_inner(-beta, -alpha, qdepth + 1, mv.is_promotion());
            self.board.unmake_move(mv, info);

            if score >= beta {
                return score;
            }
            if score > alpha {
                alpha = score;
            }
            if score > best_score {
                best_score = score;
            }
        }

        if in_check && !played_any {
            return -MATE_SCORE + self.max_depth as i32 + qdepth;
        }

        best_score
    }
}
