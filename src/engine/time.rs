//! Time management (§4.7): turns a clock budget, increment, and moves-to-go
//! into a single deadline in milliseconds.

use std::time::Duration;

/// `moves_to_go` estimate used when the GUI doesn't send one.
pub const DEFAULT_MOVES_TO_GO: u64 = 40;

/// Time control settings for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No deadline; the caller relies on `max_depth` or an explicit `stop`.
    #[default]
    Infinite,
    /// Fixed depth search; depth is controlled externally, not time.
    Depth,
    /// Fixed time for this move.
    MoveTime { time_ms: u64 },
    /// Clock budget plus per-move increment and moves-to-go.
    Incremental {
        time_left_ms: u64,
        inc_ms: u64,
        movestogo: Option<u64>,
    },
}

impl TimeControl {
    #[must_use]
    pub fn incremental(time_left: Duration, inc: Duration, movestogo: Option<u64>) -> Self {
        TimeControl::Incremental {
            time_left_ms: time_left.as_millis() as u64,
            inc_ms: inc.as_millis() as u64,
            movestogo,
        }
    }

    #[must_use]
    pub fn move_time(time: Duration) -> Self {
        TimeControl::MoveTime {
            time_ms: time.as_millis() as u64,
        }
    }

    #[must_use]
    pub fn move_time_ms(time_ms: u64) -> Self {
        TimeControl::MoveTime { time_ms }
    }

    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, TimeControl::Infinite | TimeControl::Depth)
    }

    /// §4.7: `deadline = (clock + (n-1)·inc) / (n+7)`, `n = movestogo` if set
    /// else `DEFAULT_MOVES_TO_GO`, capped at `clock / 15`. `0` means "run
    /// until explicit cancel" (infinite/depth searches, or a zero clock).
    #[must_use]
    pub fn deadline_ms(&self) -> u64 {
        match self {
            TimeControl::Infinite | TimeControl::Depth => 0,
            TimeControl::MoveTime { time_ms } => (*time_ms).max(1),
            TimeControl::Incremental {
                time_left_ms,
                inc_ms,
                movestogo,
            } => incremental_deadline_ms(*time_left_ms, *inc_ms, *movestogo),
        }
    }
}

fn incremental_deadline_ms(side_clock_ms: u64, inc_ms: u64, movestogo: Option<u64>) -> u64 {
    if side_clock_ms == 0 {
        return 0;
    }
    let n = movestogo.filter(|&n| n > 0).unwrap_or(DEFAULT_MOVES_TO_GO);
    let deadline = (side_clock_ms + (n.saturating_sub(1)) * inc_ms) / (n + 7);
    deadline.min(side_clock_ms / 15)
}

/// Parameters for executing a search, built once per `go` command.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// `0` means run until the engine is told to stop.
    pub time_limit_ms: u64,
    pub max_nodes: u64,
    pub depth: Option<u32>,
    pub infinite: bool,
}

/// Build a search request from a time control and the rest of `go`'s
/// constraints. The self-directed ponder search (§4.6) is launched
/// separately, outside of a `go`, with its own `max_depth = 255` and no
/// deadline at all.
#[must_use]
pub fn build_search_request(
    time_control: TimeControl,
    depth: Option<u32>,
    nodes: Option<u64>,
    infinite: bool,
) -> SearchRequest {
    let time_limit_ms = if infinite { 0 } else { time_control.deadline_ms() };

    SearchRequest {
        time_limit_ms,
        max_nodes: nodes.unwrap_or(0),
        depth,
        infinite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_and_depth_have_no_deadline() {
        assert_eq!(TimeControl::Infinite.deadline_ms(), 0);
        assert_eq!(TimeControl::Depth.deadline_ms(), 0);
    }

    #[test]
    fn movetime_passes_through() {
        let tc = TimeControl::MoveTime { time_ms: 500 };
        assert_eq!(tc.deadline_ms(), 500);
    }

    #[test]
    fn movetime_zero_floors_at_one() {
        let tc = TimeControl::MoveTime { time_ms: 0 };
        assert_eq!(tc.deadline_ms(), 1);
    }

    #[test]
    fn incremental_matches_spec_formula() {
        // n = 40 (default), deadline = (300000 + 39*0) / 47 = 6382
        let tc = TimeControl::Incremental {
            time_left_ms: 300_000,
            inc_ms: 0,
            movestogo: None,
        };
        assert_eq!(tc.deadline_ms(), 300_000 / 47);
    }

    #[test]
    fn incremental_uses_explicit_movestogo() {
        // n = 20, deadline = (60000 + 19*1000) / 27 = 2925
        let tc = TimeControl::Incremental {
            time_left_ms: 60_000,
            inc_ms: 1000,
            movestogo: Some(20),
        };
        assert_eq!(tc.deadline_ms(), (60_000 + 19 * 1000) / 27);
    }

    #[test]
    fn incremental_movestogo_zero_falls_back_to_default() {
        let tc = TimeControl::Incremental {
            time_left_ms: 300_000,
            inc_ms: 0,
            movestogo: Some(0),
        };
        assert_eq!(tc.deadline_ms(), 300_000 / 47);
    }

    #[test]
    fn incremental_caps_at_clock_over_fifteen() {
        // Large increment would otherwise blow the budget; the cap wins.
        let tc = TimeControl::Incremental {
            time_left_ms: 10_000,
            inc_ms: 5000,
            movestogo: Some(1),
        };
        assert_eq!(tc.deadline_ms(), 10_000 / 15);
    }

    #[test]
    fn incremental_zero_clock_means_run_until_cancel() {
        let tc = TimeControl::Incremental {
            time_left_ms: 0,
            inc_ms: 0,
            movestogo: None,
        };
        assert_eq!(tc.deadline_ms(), 0);
    }

    #[test]
    fn build_search_request_infinite_has_no_deadline() {
        let tc = TimeControl::Incremental {
            time_left_ms: 300_000,
            inc_ms: 3000,
            movestogo: None,
        };
        let req = build_search_request(tc, None, None, true);
        assert!(req.infinite);
        assert_eq!(req.time_limit_ms, 0);
    }

    #[test]
    fn build_search_request_normal_has_positive_deadline() {
        let tc = TimeControl::Incremental {
            time_left_ms: 300_000,
            inc_ms: 3000,
            movestogo: None,
        };
        let req = build_search_request(tc, None, None, false);
        assert!(!req.infinite);
        assert!(req.time_limit_ms > 0);
    }

    #[test]
    fn build_search_request_carries_depth_and_nodes() {
        let req = build_search_request(TimeControl::Infinite, Some(12), Some(1_000_000), false);
        assert_eq!(req.depth, Some(12));
        assert_eq!(req.max_nodes, 1_000_000);
    }
}
