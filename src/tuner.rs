//! Offline search-parameter tuner (§6 `-t <epd>`).
//!
//! The Evaluator's weights are an out-of-scope collaborator (§1), so there
//! is no static-evaluation regression to tune here; what the search-side
//! [`SearchParams`] registry controls is pruning/reduction/aspiration
//! *behavior*, which only shows up in how well the search solves tactical
//! positions, not in the static eval number. This tuner therefore runs an
//! EPD best-move solve-rate hill-climb (`bm` opcode, the standard format
//! for tactical test suites like STS/WAC) rather than a Texel-style
//! eval-weight regression: for each candidate parameter nudge, re-run a
//! fixed-depth search over the suite and keep the nudge if it solves at
//! least as many positions. Parallelized across `-c` threads per §9
//! ("the number of OS threads used by parallelized helpers (e.g., the
//! tuner) tracks the `-c` count").

use std::sync::atomic::AtomicBool;

use crate::board::{search, Board, SearchConfig, SearchParams, SearchState, PARAM_NAMES};

/// One EPD test-suite entry: a position plus its accepted best move(s) in
/// SAN, as written after the `bm` opcode.
pub struct TuningPosition {
    pub fen: String,
    pub best_moves: Vec<String>,
}

/// Parse `<fen-4-to-6-fields> bm <san> [<san>...];[other opcodes...]` lines.
/// Blank lines and `#`-comments are skipped; lines without a `bm` opcode are
/// skipped (this tuner only understands best-move suites, not result-labeled
/// game suites).
#[must_use]
pub fn load_epd(text: &str) -> Vec<TuningPosition> {
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(bm_idx) = line.find(" bm ") else {
            log::debug!("tuning epd: skipping line with no bm opcode: {raw_line:?}");
            continue;
        };
        let fen = line[..bm_idx].trim().to_string();
        let rest = &line[bm_idx + 4..];
        let moves_part = rest.split(';').next().unwrap_or("").trim();
        let best_moves: Vec<String> = moves_part.split_whitespace().map(str::to_string).collect();
        if best_moves.is_empty() {
            continue;
        }
        out.push(TuningPosition { fen, best_moves });
    }
    out
}

/// Depth the solver searches each suite position to, per hill-climb trial.
/// Shallow by design: the tuner runs many trials and cares about relative
/// ordering between parameter sets, not absolute strength.
const TUNE_DEPTH: u32 = 6;

/// Perturbation step applied to one parameter per hill-climb trial.
const STEP: i32 = 4;

fn solve_one(position: &TuningPosition, params: &SearchParams) -> bool {
    let mut board = Board::try_from_fen(&position.fen).unwrap_or_else(|_| Board::new());
    let mut state = SearchState::new(16);
    state.set_params(params.clone());
    let stop = AtomicBool::new(false);
    let config = SearchConfig::depth(TUNE_DEPTH).with_ponder(false);
    let result = search(&mut board, &mut state, config, &stop);
    let Some(found) = result.best_move else { return false };

    position.best_moves.iter().any(|san| {
        let mut candidate_board = board.clone();
        candidate_board
            .make_move_san(san)
            .is_ok_and(|parsed| parsed == found)
    })
}

/// Count how many positions a given parameter set solves, splitting the
/// suite across `threads` OS threads.
fn solve_rate(positions: &[TuningPosition], params: &SearchParams, threads: usize) -> usize {
    if positions.is_empty() {
        return 0;
    }
    let threads = threads.max(1).min(positions.len());
    let chunk_size = (positions.len() + threads - 1) / threads;

    std::thread::scope(|scope| {
        let handles: Vec<_> = positions
            .chunks(chunk_size.max(1))
            .map(|chunk| scope.spawn(move || chunk.iter().filter(|p| solve_one(p, params)).count()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap_or(0)).sum()
    })
}

/// Run the hill-climb. Returns the best parameter set found and its solve
/// count out of `positions.len()`.
#[must_use]
pub fn tune(positions: &[TuningPosition], starting: SearchParams, threads: usize) -> (SearchParams, usize) {
    let mut best_params = starting;
    let mut best_score = solve_rate(positions, &best_params, threads);
    log::info!(
        "tuner: baseline solve rate {}/{}",
        best_score,
        positions.len()
    );

    for &name in PARAM_NAMES {
        for &delta in &[STEP, -STEP] {
            let mut candidate = best_params.clone();
            let Some(current) = candidate.get_by_name(name) else { continue };
            if !candidate.set_by_name(name, current + delta) {
                continue;
            }
            let score = solve_rate(positions, &candidate, threads);
            if score > best_score {
                log::info!("tuner: {name} {current}->{} improved solve rate to {score}", current + delta);
                best_score = score;
                best_params = candidate;
            }
        }
    }

    (best_params, best_score)
}

/// Render a tuned parameter set back into the `-T` file's `key=integer`
/// format, one assignment per line.
#[must_use]
pub fn render_tuning_file(params: &SearchParams) -> String {
    let mut out = String::new();
    for &name in PARAM_NAMES {
        if let Some(value) = params.get_by_name(name) {
            out.push_str(&format!("{name}={value}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bm_epd_lines() {
        let text = "\
            r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - bm Qxf7#; id \"mate1\";\n\
            # a comment\n\
            \n\
            not an epd line\n";
        let positions = load_epd(text);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].best_moves, vec!["Qxf7#"]);
    }

    #[test]
    fn solves_a_trivial_mate_in_one() {
        let positions = load_epd(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - bm Qxf7#;",
        );
        assert!(solve_one(&positions[0], &SearchParams::default()));
    }

    #[test]
    fn render_round_trips_through_parse_tuning_file() {
        let params = SearchParams::default();
        let rendered = render_tuning_file(&params);
        let parsed = crate::board::parse_tuning_file(&rendered);
        assert_eq!(parsed.len(), PARAM_NAMES.len());
    }
}
