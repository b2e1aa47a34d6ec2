//! Move-ordering scorer (§4.2): forced-first moves, then promotion, capture,
//! quiet-history, and piece-square-delta scoring, all folded into one
//! integer priority per candidate move (higher sorts first).

use super::constants::{FORCED_FIRST_BASE, ORDER_HISTORY_SHIFT, ORDER_VALUE_SHIFT};
use super::history::HistoryTable;
use super::super::pst::{MATERIAL_MG, PST_MG};
use super::super::{Board, Color, Move, Piece};

/// Material value for a piece, in centipawns. Borrowed from the Evaluator's
/// midgame material table so move ordering and evaluation agree.
#[must_use]
pub fn piece_value(piece: Piece) -> i32 {
    MATERIAL_MG[piece.index()]
}

fn psq(color: Color, piece: Piece, sq_index: usize) -> i32 {
    let idx = if color == Color::White { sq_index ^ 56 } else { sq_index };
    PST_MG[piece.index()][idx]
}

/// Score one candidate move. `forced_rank`, if set, is this move's position
/// (0 = highest) in the forced-first list (TT move, then IID move).
#[must_use]
pub fn score_move(
    board: &Board,
    mv: Move,
    forced_rank: Option<i32>,
    history: &HistoryTable,
    side_idx: usize,
) -> i32 {
    if let Some(rank) = forced_rank {
        return FORCED_FIRST_BASE - rank;
    }

    if let Some(promo) = mv.promotion() {
        return piece_value(promo) << ORDER_VALUE_SHIFT;
    }

    if mv.is_capture() {
        let victim = if mv.is_en_passant() {
            Piece::Pawn
        } else {
            board
                .piece_at(mv.to())
                .map_or(Piece::Pawn, |(_, piece)| piece)
        };
        let mut score = piece_value(victim) << ORDER_VALUE_SHIFT;
        if let Some((_, attacker)) = board.piece_at(mv.from()) {
            if attacker != Piece::King {
                score += (piece_value(Piece::Queen) - piece_value(attacker)) << 8;
            }
        }
        return score;
    }

    let hist = history.score(side_idx, &mv) << ORDER_HISTORY_SHIFT;
    let color = board.current_color();
    let moving_piece = board.piece_at(mv.from()).map_or(Piece::Pawn, |(_, p)| p);
    let delta = psq(color, moving_piece, mv.to().as_index()) - psq(color, moving_piece, mv.from().as_index());
    hist + delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_outranks_capture_of_lesser_value() {
        assert!(piece_value(Piece::Queen) << ORDER_VALUE_SHIFT > piece_value(Piece::Pawn) << ORDER_VALUE_SHIFT);
    }

    #[test]
    fn forced_first_outranks_everything_else() {
        let forced = FORCED_FIRST_BASE - 1;
        let best_capture = piece_value(Piece::Queen) << ORDER_VALUE_SHIFT;
        assert!(forced > best_capture);
    }
}
