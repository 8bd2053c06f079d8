//! WASM bindings for dialogue-engine — powers the browser player.
//!
//! The page owns the DOM, audio elements, real timers, and localStorage; the
//! engine runs inside [`WebPlayer`] as a string-in/string-out API. Every
//! interaction returns a JSON batch of commands for the page to execute, and
//! `save_blob()` / `settings_blob()` expose the persisted records so the page
//! can mirror them into localStorage after each call.

use wasm_bindgen::prelude::*;

use dialogue_engine::core::command::Command;
use dialogue_engine::core::controller::{
    ContinueOutcome, DialogueEngine, NewGameGate, Phase,
};
use dialogue_engine::core::persistence::{MemoryStorage, SAVE_KEY, SETTINGS_KEY};
use dialogue_engine::core::store::StoryStore;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    needs_confirmation: bool,
    commands: Vec<Command>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ContinueResponse {
    all_branches_played: bool,
    commands: Vec<Command>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Loading => "loading",
        Phase::Presenting => "presenting",
        Phase::AwaitingInput => "awaiting_input",
        Phase::Ended => "ended",
    }
}

// ---------------------------------------------------------------------------
// WebPlayer — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct WebPlayer {
    engine: DialogueEngine,
}

#[wasm_bindgen]
impl WebPlayer {
    /// Create a player for a story JSON blob, optionally seeded with the
    /// save/settings blobs the page read back from localStorage.
    ///
    /// A story that fails to parse leaves the store empty rather than
    /// failing construction; the player is valid but inert, and
    /// `node_count()` reports 0 so the page can surface the problem.
    #[wasm_bindgen(constructor)]
    pub fn new(
        story_json: &str,
        save_blob: Option<String>,
        settings_blob: Option<String>,
    ) -> WebPlayer {
        let story = StoryStore::parse_json(story_json).unwrap_or_default();

        let mut storage = MemoryStorage::new();
        if let Some(ref blob) = save_blob {
            storage = storage.with_entry(SAVE_KEY, blob);
        }
        if let Some(ref blob) = settings_blob {
            storage = storage.with_entry(SETTINGS_KEY, blob);
        }

        let engine = DialogueEngine::builder()
            .story(story)
            .storage(Box::new(storage))
            .build();
        WebPlayer { engine }
    }

    /// Begin a new game. Returns `{needsConfirmation: true, commands: []}`
    /// when prior progress exists; the page shows its confirm dialog and
    /// calls `confirm_new_game` (or nothing, to decline).
    pub fn start_new_game(&mut self, now_ms: f64) -> Result<String, JsError> {
        let response = match self.engine.start_new_game(now_ms as u64) {
            NewGameGate::Started(commands) => StartResponse {
                needs_confirmation: false,
                commands,
            },
            NewGameGate::NeedsConfirmation => StartResponse {
                needs_confirmation: true,
                commands: Vec::new(),
            },
        };
        to_json(&response)
    }

    /// Confirmed destructive reset: wipe the save and start from the top.
    pub fn confirm_new_game(&mut self, now_ms: f64) -> Result<String, JsError> {
        to_json(&self.engine.confirm_new_game(now_ms as u64))
    }

    /// Resume on the first branch with an unplayed choice. Returns
    /// `{allBranchesPlayed: true, commands: []}` when nothing is left; the
    /// page then offers reset via `confirm_reset_and_restart`.
    pub fn continue_game(&mut self, now_ms: f64) -> Result<String, JsError> {
        let response = match self.engine.continue_game(now_ms as u64) {
            ContinueOutcome::Resumed(commands) => ContinueResponse {
                all_branches_played: false,
                commands,
            },
            ContinueOutcome::AllBranchesPlayed => ContinueResponse {
                all_branches_played: true,
                commands: Vec::new(),
            },
        };
        to_json(&response)
    }

    pub fn confirm_reset_and_restart(&mut self, now_ms: f64) -> Result<String, JsError> {
        to_json(&self.engine.confirm_reset_and_restart(now_ms as u64))
    }

    // -- timer callbacks ----------------------------------------------------

    /// Deliver a `schedule_tick` command's timeout.
    pub fn reveal_tick(&mut self, token: u64, now_ms: f64) -> Result<String, JsError> {
        to_json(&self.engine.reveal_tick(token, now_ms as u64))
    }

    /// Deliver a `schedule_advance` command's timeout.
    pub fn advance_fired(&mut self, token: u64, now_ms: f64) -> Result<String, JsError> {
        to_json(&self.engine.advance_fired(token, now_ms as u64))
    }

    /// Deliver a `schedule_skip_poll` command's timeout.
    pub fn skip_poll_fired(&mut self, token: u64, now_ms: f64) -> Result<String, JsError> {
        to_json(&self.engine.skip_poll_fired(token, now_ms as u64))
    }

    // -- player input -------------------------------------------------------

    /// Dialogue-box click.
    pub fn advance(&mut self, now_ms: f64) -> Result<String, JsError> {
        to_json(&self.engine.advance(now_ms as u64))
    }

    /// Choice button click. `index` is the `index` field of the rendered
    /// `ChoiceView`, not the button's position on screen.
    pub fn select_choice(
        &mut self,
        node_id: &str,
        index: usize,
        now_ms: f64,
    ) -> Result<String, JsError> {
        to_json(&self.engine.select_choice(node_id, index, now_ms as u64))
    }

    pub fn set_auto_advance(&mut self, on: bool) -> Result<String, JsError> {
        to_json(&self.engine.set_auto_advance(on))
    }

    pub fn toggle_auto_advance(&mut self) -> Result<String, JsError> {
        to_json(&self.engine.toggle_auto_advance())
    }

    pub fn set_skip_mode(&mut self, on: bool) -> Result<String, JsError> {
        to_json(&self.engine.set_skip_mode(on))
    }

    // -- settings -----------------------------------------------------------

    pub fn set_text_reveal_rate(&mut self, ms_per_char: f64) {
        self.engine.set_text_reveal_rate(ms_per_char);
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.engine.set_music_volume(volume);
    }

    pub fn set_effects_volume(&mut self, volume: f32) {
        self.engine.set_effects_volume(volume);
    }

    // -- state the page reads -----------------------------------------------

    /// Serialized save record as stored, for mirroring into localStorage.
    pub fn save_blob(&self) -> Option<String> {
        self.engine.save_blob()
    }

    /// Serialized settings record as stored.
    pub fn settings_blob(&self) -> Option<String> {
        self.engine.settings_blob()
    }

    pub fn phase(&self) -> String {
        phase_name(self.engine.phase()).to_string()
    }

    pub fn current_node(&self) -> Option<String> {
        self.engine.current_node().map(str::to_string)
    }

    pub fn displayed_text(&self) -> String {
        self.engine.displayed_text().to_string()
    }

    pub fn auto_advance(&self) -> bool {
        self.engine.auto_advance()
    }

    pub fn skip_mode(&self) -> bool {
        self.engine.skip_mode()
    }

    /// The session transcript as a JSON array of
    /// `{speaker, text, nodeId}` entries.
    pub fn history(&self) -> Result<String, JsError> {
        to_json(&self.engine.history())
    }

    /// Number of loaded story nodes; 0 means the story failed to parse.
    pub fn node_count(&self) -> usize {
        self.engine.story().len()
    }
}
