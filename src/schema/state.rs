use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The mutable game-state blob: boolean flags and numeric variables.
///
/// Owned by the progression controller for the duration of a session and
/// written back to persistence after every node entry and every choice.
/// `BTreeMap` keeps serialization order stable so a persisted save
/// round-trips byte-identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub vars: BTreeMap<String, f64>,
}

impl GameState {
    /// Fresh state for a new game, with the canonical starting variables
    /// seeded.
    pub fn new_game() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("friendship_score".to_string(), 0.0);
        vars.insert("study_level".to_string(), 0.0);
        GameState {
            flags: BTreeMap::new(),
            vars,
        }
    }

    /// Flag lookup; a missing flag reads false.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Variable lookup; a missing variable reads 0.
    pub fn var(&self, name: &str) -> f64 {
        self.vars.get(name).copied().unwrap_or(0.0)
    }

    /// Display form used by text interpolation: variables drop a
    /// fractionless tail ("5" rather than "5.0"), flags read true/false.
    /// Returns `None` for names that exist as neither.
    pub fn display(&self, name: &str) -> Option<String> {
        if let Some(value) = self.vars.get(name) {
            return Some(format_number(*value));
        }
        self.flags.get(name).map(|flag| flag.to_string())
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_seeds_starting_vars() {
        let state = GameState::new_game();
        assert_eq!(state.var("friendship_score"), 0.0);
        assert_eq!(state.var("study_level"), 0.0);
        assert!(state.flags.is_empty());
    }

    #[test]
    fn missing_flag_reads_false() {
        let state = GameState::default();
        assert!(!state.flag("has_key"));
    }

    #[test]
    fn missing_var_reads_zero() {
        let state = GameState::default();
        assert_eq!(state.var("anything"), 0.0);
    }

    #[test]
    fn display_prefers_vars_over_flags() {
        let mut state = GameState::default();
        state.vars.insert("score".to_string(), 3.0);
        state.flags.insert("score".to_string(), true);
        assert_eq!(state.display("score").as_deref(), Some("3"));
    }

    #[test]
    fn display_formats_whole_numbers_without_fraction() {
        let mut state = GameState::default();
        state.vars.insert("a".to_string(), 5.0);
        state.vars.insert("b".to_string(), 2.5);
        assert_eq!(state.display("a").as_deref(), Some("5"));
        assert_eq!(state.display("b").as_deref(), Some("2.5"));
    }

    #[test]
    fn display_unknown_is_none() {
        let state = GameState::default();
        assert_eq!(state.display("missing"), None);
    }

    #[test]
    fn display_flag_truthiness() {
        let mut state = GameState::default();
        state.flags.insert("met_alex".to_string(), true);
        assert_eq!(state.display("met_alex").as_deref(), Some("true"));
    }
}
