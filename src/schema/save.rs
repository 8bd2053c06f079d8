use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::state::GameState;

fn default_reveal_rate() -> f64 {
    28.0
}

fn default_volume() -> f32 {
    1.0
}

/// Player-facing pacing and audio settings. Persisted under their own
/// storage key, independent of the save record, and written back on every
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Base typewriter delay in milliseconds per character.
    #[serde(default = "default_reveal_rate")]
    pub text_reveal_rate: f64,
    #[serde(default = "default_volume")]
    pub music_volume: f32,
    /// Effects volume is configurable independently of music volume.
    #[serde(default = "default_volume")]
    pub effects_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            text_reveal_rate: default_reveal_rate(),
            music_volume: default_volume(),
            effects_volume: default_volume(),
        }
    }
}

/// One line of the session transcript: who said what, already interpolated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub speaker: String,
    pub text: String,
    pub node_id: String,
}

/// The durable progress record.
///
/// Updated monotonically: `visited` and `played_choices` only ever gain
/// entries (set semantics, enforced here), and nothing is removed except by
/// an explicit reset that deletes the whole record.
/// Field names serialize in camelCase, matching the save blobs the browser
/// original left behind in localStorage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    #[serde(default)]
    pub last_node: Option<String>,
    /// Node ids in first-visit order.
    #[serde(default)]
    pub visited: Vec<String>,
    /// Node id → indices of choices the player has taken there.
    #[serde(default)]
    pub played_choices: BTreeMap<String, Vec<usize>>,
    #[serde(default)]
    pub game_state: GameState,
    /// Snapshot of the settings at the last write; the live copy is under
    /// the settings key.
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl SaveRecord {
    /// Append to the visited list unless already present.
    pub fn mark_visited(&mut self, node_id: &str) {
        if !self.visited.iter().any(|visited| visited == node_id) {
            self.visited.push(node_id.to_string());
        }
    }

    /// Record a played choice index, once.
    pub fn record_choice(&mut self, node_id: &str, index: usize) {
        let played = self.played_choices.entry(node_id.to_string()).or_default();
        if !played.contains(&index) {
            played.push(index);
        }
    }

    /// Number of distinct choices played at a node.
    pub fn played_count(&self, node_id: &str) -> usize {
        self.played_choices.get(node_id).map_or(0, Vec::len)
    }
}
