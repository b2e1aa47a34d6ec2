//! Tunable search parameters.
//!
//! Defaults mirror the fixed values in [`super::constants`]; this struct
//! exists so `setoption`/the offline tuner (`-T`) can override them at
//! runtime without touching the constants module's compile-time defaults.

use super::super::pst::MATERIAL_MG;
use super::constants;
use crate::board::Piece;

#[derive(Clone, Debug)]
pub struct SearchParams {
    pub aspiration_initial_delta: i32,
    pub aspiration_growth_divisor: i32,
    pub null_move_depth_split: u32,
    pub null_move_reduction_deep: u32,
    pub null_move_reduction_shallow: u32,
    pub lmr_min_played: u32,
    pub lmr_deeper_played: u32,
    pub rfp_knight_value: i32,
    pub rfp_rook_value: i32,
    pub rfp_queen_value: i32,
    pub qs_delta_margin: i32,
    pub qs_delta_margin_post_promotion: i32,
}

/// Recognized tuning-file / `setoption`-registry keys (§6, §9: "the
/// tunable representation is (name, value, recognized-options = closed
/// set)"). Kept in the same order as the struct fields it names.
pub const PARAM_NAMES: &[&str] = &[
    "aspiration_initial_delta",
    "aspiration_growth_divisor",
    "null_move_depth_split",
    "null_move_reduction_deep",
    "null_move_reduction_shallow",
    "lmr_min_played",
    "lmr_deeper_played",
    "rfp_knight_value",
    "rfp_rook_value",
    "rfp_queen_value",
    "qs_delta_margin",
    "qs_delta_margin_post_promotion",
];

impl SearchParams {
    /// Apply a single `name = value` pair. Returns `false` for a name
    /// outside [`PARAM_NAMES`] (the registry's closed set) instead of
    /// inserting an ad-hoc key, per §9's re-architecture note.
    pub fn set_by_name(&mut self, name: &str, value: i32) -> bool {
        match name {
            "aspiration_initial_delta" => self.aspiration_initial_delta = value,
            "aspiration_growth_divisor" => self.aspiration_growth_divisor = value,
            "null_move_depth_split" => self.null_move_depth_split = value.max(0) as u32,
            "null_move_reduction_deep" => self.null_move_reduction_deep = value.max(0) as u32,
            "null_move_reduction_shallow" => self.null_move_reduction_shallow = value.max(0) as u32,
            "lmr_min_played" => self.lmr_min_played = value.max(0) as u32,
            "lmr_deeper_played" => self.lmr_deeper_played = value.max(0) as u32,
            "rfp_knight_value" => self.rfp_knight_value = value,
            "rfp_rook_value" => self.rfp_rook_value = value,
            "rfp_queen_value" => self.rfp_queen_value = value,
            "qs_delta_margin" => self.qs_delta_margin = value,
            "qs_delta_margin_post_promotion" => self.qs_delta_margin_post_promotion = value,
            _ => return false,
        }
        true
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<i32> {
        Some(match name {
            "aspiration_initial_delta" => self.aspiration_initial_delta,
            "aspiration_growth_divisor" => self.aspiration_growth_divisor,
            "null_move_depth_split" => self.null_move_depth_split as i32,
            "null_move_reduction_deep" => self.null_move_reduction_deep as i32,
            "null_move_reduction_shallow" => self.null_move_reduction_shallow as i32,
            "lmr_min_played" => self.lmr_min_played as i32,
            "lmr_deeper_played" => self.lmr_deeper_played as i32,
            "rfp_knight_value" => self.rfp_knight_value,
            "rfp_rook_value" => self.rfp_rook_value,
            "rfp_queen_value" => self.rfp_queen_value,
            "qs_delta_margin" => self.qs_delta_margin,
            "qs_delta_margin_post_promotion" => self.qs_delta_margin_post_promotion,
            _ => return None,
        })
    }
}

/// Parse a `-T` tuning-parameter file: UTF-8 text, `#` comments, one
/// `key=integer` assignment per line (§6). Lines that don't parse as
/// `key=integer` are skipped and logged; recognized-but-reassigned keys
/// overwrite earlier ones in file order.
#[must_use]
pub fn parse_tuning_file(text: &str) -> Vec<(String, i32)> {
    let mut out = Vec::new();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::warn!("tuning file: skipping malformed line {}: {raw_line:?}", lineno + 1);
            continue;
        };
        let key = key.trim();
        match value.trim().parse::<i32>() {
            Ok(v) => out.push((key.to_string(), v)),
            Err(_) => log::warn!(
                "tuning file: skipping non-integer value on line {}: {raw_line:?}",
                lineno + 1
            ),
        }
    }
    out
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            aspiration_initial_delta: constants::ASPIRATION_INITIAL_DELTA,
            aspiration_growth_divisor: constants::ASPIRATION_GROWTH_DIVISOR,
            null_move_depth_split: constants::NULL_MOVE_DEPTH_SPLIT,
            null_move_reduction_deep: constants::NULL_MOVE_REDUCTION_DEEP,
            null_move_reduction_shallow: constants::NULL_MOVE_REDUCTION_SHALLOW,
            lmr_min_played: constants::LMR_MIN_PLAYED,
            lmr_deeper_played: constants::LMR_DEEPER_PLAYED,
            rfp_knight_value: MATERIAL_MG[Piece::Knight.index()],
            rfp_rook_value: MATERIAL_MG[Piece::Rook.index()],
            rfp_queen_value: MATERIAL_MG[Piece::Queen.index()],
            qs_delta_margin: constants::QS_DELTA_MARGIN,
            qs_delta_margin_post_promotion: constants::QS_DELTA_MARGIN_POST_PROMOTION,
        }
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip_for_every_name() {
        let mut params = SearchParams::default();
        for &name in PARAM_NAMES {
            assert!(params.set_by_name(name, 5));
            assert_eq!(params.get_by_name(name), Some(5));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let mut params = SearchParams::default();
        assert!(!params.set_by_name("not_a_real_param", 1));
        assert_eq!(params.get_by_name("not_a_real_param"), None);
    }

    #[test]
    fn parse_tuning_file_skips_comments_and_blank_lines() {
        let text = "# a comment\n\nlmr_min_played=6\nrfp_knight_value = 320\nbad line\nqs_delta_margin=abc\n";
        let parsed = parse_tuning_file(text);
        assert_eq!(parsed, vec![
            ("lmr_min_played".to_string(), 6),
            ("rfp_knight_value".to_string(), 320),
        ]);
    }
}
