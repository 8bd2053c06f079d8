/// Progression controller — the node state machine.
///
/// Owns the story, the game-state blob, persistence, the session history,
/// and the typewriter, and decides every transition: manual clicks, timed
/// auto-advance, and rapid skip. All engine state lives on this one
/// instance with an explicit lifecycle — constructed at session start,
/// reset on new game — so there are no ambient globals. Hosts drive it with
/// clock readings and timer callbacks and execute the returned [`Command`]s.
///
/// Timer discipline: every scheduled timer carries a token; the controller
/// remembers at most one expected token per timer kind and forgets it on
/// any superseding transition, so a stale callback firing later is
/// structurally a no-op.

use log::{debug, warn};
use std::collections::HashMap;

use crate::core::command::{ChoiceView, Command};
use crate::core::evaluator;
use crate::core::persistence::{Persistence, Storage, SAVE_KEY, SETTINGS_KEY};
use crate::core::resume::{self, ResumeTarget};
use crate::core::store::StoryStore;
use crate::core::timing;
use crate::core::typewriter::{TickOutcome, Typewriter};
use crate::schema::node::StoryNode;
use crate::schema::save::{HistoryEntry, Settings};
use crate::schema::state::GameState;

/// Controller lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Picking a target node (menus, or mid node-load).
    Loading,
    /// A reveal is in flight.
    Presenting,
    /// Choices are visible or an advance is pending.
    AwaitingInput,
    /// A terminal node was reached.
    Ended,
}

/// Work queued behind a reveal; runs strictly after the last character and
/// strictly before the transition decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    RenderChoices,
}

/// Outcome of a new-game request.
#[derive(Debug, PartialEq)]
pub enum NewGameGate {
    /// No meaningful progress existed; the game started.
    Started(Vec<Command>),
    /// Prior progress exists; the caller must confirm the destructive reset
    /// (via [`DialogueEngine::confirm_new_game`]) before anything is
    /// cleared. Declining leaves the save untouched.
    NeedsConfirmation,
}

/// Outcome of a continue request.
#[derive(Debug, PartialEq)]
pub enum ContinueOutcome {
    Resumed(Vec<Command>),
    /// Every branch is unlocked. The caller chooses between
    /// [`DialogueEngine::confirm_reset_and_restart`] and doing nothing.
    AllBranchesPlayed,
}

/// Id of the canonical start node.
const START_NODE: &str = "start";
/// Ending treatment used when no per-node treatment is configured.
const DEFAULT_ENDING_TREATMENT: &str = "fade";
/// Ending text shown when a terminal node has none of its own.
const DEFAULT_ENDING_TEXT: &str = "The End";

pub struct DialogueEngine {
    story: StoryStore,
    persistence: Persistence,
    settings: Settings,
    game_state: GameState,
    initial_state: GameState,
    history: Vec<HistoryEntry>,
    typewriter: Typewriter<DeferredAction>,
    phase: Phase,
    current_node: Option<String>,
    auto_advance: bool,
    skip_mode: bool,
    /// Set when auto-advance is toggled on during a reveal; the next
    /// transition then uses the fixed grace delay instead of the formula.
    auto_armed_mid_reveal: bool,
    timer_seq: u64,
    expected_tick: Option<u64>,
    pending_advance: Option<u64>,
    pending_skip_poll: Option<u64>,
    start_node: String,
    ending_treatments: HashMap<String, String>,
    default_treatment: String,
}

/// Builder for constructing a [`DialogueEngine`].
pub struct DialogueEngineBuilder {
    story: StoryStore,
    storage: Option<Box<dyn Storage>>,
    start_node: String,
    initial_state: GameState,
    ending_treatments: HashMap<String, String>,
    default_treatment: String,
}

impl DialogueEngine {
    pub fn builder() -> DialogueEngineBuilder {
        DialogueEngineBuilder {
            story: StoryStore::new(),
            storage: None,
            start_node: START_NODE.to_string(),
            initial_state: GameState::new_game(),
            ending_treatments: HashMap::new(),
            default_treatment: DEFAULT_ENDING_TREATMENT.to_string(),
        }
    }

    // ---- session lifecycle ------------------------------------------------

    /// Begin a brand-new game. A save with any visited node demands explicit
    /// confirmation before it is destroyed.
    pub fn start_new_game(&mut self, now_ms: u64) -> NewGameGate {
        let has_progress = self
            .persistence
            .load_save()
            .is_some_and(|save| !save.visited.is_empty());
        if has_progress {
            return NewGameGate::NeedsConfirmation;
        }
        NewGameGate::Started(self.begin_fresh(now_ms))
    }

    /// Confirmed destructive reset: delete the save, restore the initial
    /// game state, and start from the canonical start node.
    pub fn confirm_new_game(&mut self, now_ms: u64) -> Vec<Command> {
        self.persistence.clear_save();
        self.begin_fresh(now_ms)
    }

    /// Resume a returning player on the first branch that still has an
    /// unplayed choice, restoring their game state and transcript.
    pub fn continue_game(&mut self, now_ms: u64) -> ContinueOutcome {
        let save = self.persistence.load_save();
        match resume::compute_resume_target(&self.story, save.as_ref(), &self.start_node) {
            ResumeTarget::Node(target) => {
                match save {
                    Some(save) => {
                        self.game_state = save.game_state;
                        self.history = save.history;
                    }
                    None => {
                        self.game_state = self.initial_state.clone();
                        self.history.clear();
                    }
                }
                ContinueOutcome::Resumed(self.enter_node(&target, now_ms))
            }
            ResumeTarget::AllBranchesPlayed => ContinueOutcome::AllBranchesPlayed,
        }
    }

    /// The reset side of the "all branches unlocked" decision.
    pub fn confirm_reset_and_restart(&mut self, now_ms: u64) -> Vec<Command> {
        self.persistence.clear_save();
        self.begin_fresh(now_ms)
    }

    /// Where a continue would land right now.
    pub fn resume_target(&self) -> ResumeTarget {
        let save = self.persistence.load_save();
        resume::compute_resume_target(&self.story, save.as_ref(), &self.start_node)
    }

    fn begin_fresh(&mut self, now_ms: u64) -> Vec<Command> {
        self.game_state = self.initial_state.clone();
        self.history.clear();
        let start = self.start_node.clone();
        self.enter_node(&start, now_ms)
    }

    // ---- the node state machine --------------------------------------------

    /// Load a node: record progress, run entry actions, hand presentation to
    /// the host, and begin the reveal. Unknown ids log and change nothing.
    pub fn enter_node(&mut self, node_id: &str, now_ms: u64) -> Vec<Command> {
        let mut out = Vec::new();

        // A node load supersedes every timer from the previous node.
        self.invalidate_timers();

        let Some(node) = self.story.get(node_id).cloned() else {
            warn!("cannot enter unknown node '{node_id}'");
            return out;
        };

        self.phase = Phase::Loading;
        self.current_node = Some(node_id.to_string());

        self.persistence.update_save(|save| {
            save.mark_visited(node_id);
            save.last_node = Some(node_id.to_string());
        });

        for raw in node.action.iter() {
            evaluator::apply_action(&mut self.game_state, raw);
        }

        let speaker = node
            .name
            .as_deref()
            .map(|name| evaluator::interpolate(&self.game_state, name))
            .unwrap_or_default();
        let text = evaluator::interpolate(&self.game_state, &node.text);

        out.push(Command::SetBackground {
            image: self.resolve_field(node.background.as_deref()),
        });
        out.push(Command::SetCharacter {
            image: self.resolve_field(node.character_image.as_deref()),
        });
        out.push(Command::SetSpeaker {
            name: speaker.clone(),
        });
        out.push(Command::ClearChoices);
        if let Some(track) = self.resolve_field(node.music.as_deref()) {
            out.push(Command::PlayMusic {
                track: Some(track),
                volume: self.settings.music_volume,
            });
        }
        if let Some(effect) = self.resolve_field(node.sound.as_deref()) {
            out.push(Command::PlaySound {
                effect,
                volume: self.settings.effects_volume,
            });
        }

        self.history.push(HistoryEntry {
            speaker,
            text: text.clone(),
            node_id: node_id.to_string(),
        });

        // Mutations only survive a reload once written back.
        let game_state = self.game_state.clone();
        let history = self.history.clone();
        let settings = self.settings.clone();
        self.persistence.update_save(move |save| {
            save.game_state = game_state;
            save.history = history;
            save.settings = settings;
        });

        let deferred = if node.has_choices() {
            vec![DeferredAction::RenderChoices]
        } else {
            Vec::new()
        };
        self.typewriter
            .start(&text, self.settings.text_reveal_rate, deferred, now_ms);
        self.phase = Phase::Presenting;

        // The first tick runs synchronously so the opening character (or an
        // empty text's completion) lands together with the node.
        self.pump_tick(now_ms, &mut out);

        if self.skip_mode && self.phase == Phase::Presenting && self.pending_skip_poll.is_none() {
            self.schedule_skip_poll(&mut out);
        }

        out
    }

    /// Host callback for a previously scheduled reveal tick.
    pub fn reveal_tick(&mut self, token: u64, now_ms: u64) -> Vec<Command> {
        let mut out = Vec::new();
        if self.expected_tick != Some(token) {
            debug!("ignoring stale reveal tick {token}");
            return out;
        }
        self.expected_tick = None;
        self.pump_tick(now_ms, &mut out);
        out
    }

    /// Player picked a choice. Guarded: requests against the wrong node, a
    /// choiceless node, or an out-of-range index are ignored.
    pub fn select_choice(&mut self, node_id: &str, index: usize, now_ms: u64) -> Vec<Command> {
        if self.current_node.as_deref() != Some(node_id) {
            debug!("ignoring choice on inactive node '{node_id}'");
            return Vec::new();
        }
        let Some(node) = self.story.get(node_id) else {
            return Vec::new();
        };
        let Some(choice) = node.choices.get(index).cloned() else {
            debug!("ignoring out-of-range choice {index} on '{node_id}'");
            return Vec::new();
        };

        self.invalidate_timers();

        for raw in choice.action.iter() {
            evaluator::apply_action(&mut self.game_state, raw);
        }

        let game_state = self.game_state.clone();
        self.persistence.update_save(move |save| {
            save.record_choice(node_id, index);
            save.game_state = game_state;
        });

        self.enter_node(&choice.goto, now_ms)
    }

    /// Dialogue-box click: finish an in-flight reveal, or advance a waiting
    /// linear node. Ignored while choices are up.
    pub fn advance(&mut self, now_ms: u64) -> Vec<Command> {
        let mut out = Vec::new();
        match self.phase {
            Phase::Presenting => {
                // Cancels the in-flight rapid-advance check; the skip-mode
                // flag itself stays as it is.
                self.pending_skip_poll = None;
                self.expected_tick = None;
                if let Some(deferred) = self.typewriter.skip_to_end(now_ms) {
                    out.push(Command::SetDialogueText {
                        text: self.typewriter.displayed().to_string(),
                    });
                    self.on_reveal_complete(deferred, &mut out);
                }
            }
            Phase::AwaitingInput => {
                if let Some(target) = self.current_linear_target() {
                    self.invalidate_timers();
                    return self.enter_node(&target, now_ms);
                }
            }
            Phase::Loading | Phase::Ended => {}
        }
        out
    }

    /// Host callback for the scheduled auto-advance transition.
    pub fn advance_fired(&mut self, token: u64, now_ms: u64) -> Vec<Command> {
        if self.pending_advance != Some(token) {
            debug!("ignoring stale advance timer {token}");
            return Vec::new();
        }
        self.pending_advance = None;
        match self.current_linear_target() {
            Some(target) => self.enter_node(&target, now_ms),
            None => Vec::new(),
        }
    }

    // ---- auto-advance and skip ----------------------------------------------

    pub fn toggle_auto_advance(&mut self) -> Vec<Command> {
        self.set_auto_advance(!self.auto_advance)
    }

    pub fn set_auto_advance(&mut self, on: bool) -> Vec<Command> {
        let mut out = Vec::new();
        self.auto_advance = on;

        if !on {
            // Turning auto off cancels any pending transition.
            self.auto_armed_mid_reveal = false;
            self.pending_advance = None;
            return out;
        }

        if self.typewriter.is_revealing() {
            // First-time grace: the reveal in flight finishes on the fixed
            // short fallback delay rather than the formula.
            self.auto_armed_mid_reveal = true;
            return out;
        }

        if self.phase == Phase::AwaitingInput && self.current_linear_target().is_some() {
            self.pending_advance = None;
            let read = timing::read_time_ms(self.typewriter.full_text());
            let delay = timing::auto_delay_without_typing(read);
            self.schedule_advance(delay, &mut out);
        }

        out
    }

    /// Turn skip mode on or off. Enabling it mid-reveal or on a waiting
    /// linear node starts the rapid-advance check; on a choice or terminal
    /// node the loop halts immediately with the flag intact.
    pub fn set_skip_mode(&mut self, on: bool) -> Vec<Command> {
        let mut out = Vec::new();
        self.skip_mode = on;

        if !on {
            self.pending_skip_poll = None;
            return out;
        }

        let eligible = match self.phase {
            Phase::Presenting => true,
            Phase::AwaitingInput => self.current_linear_target().is_some(),
            Phase::Loading | Phase::Ended => false,
        };
        if eligible && self.pending_skip_poll.is_none() {
            self.schedule_skip_poll(&mut out);
        }

        out
    }

    /// Host callback for the recurring skip-mode check: forces an in-flight
    /// reveal to finish, advances a waiting linear node, and halts on choice
    /// or terminal nodes without clearing the flag.
    pub fn skip_poll_fired(&mut self, token: u64, now_ms: u64) -> Vec<Command> {
        let mut out = Vec::new();
        if self.pending_skip_poll != Some(token) {
            debug!("ignoring stale skip poll {token}");
            return out;
        }
        self.pending_skip_poll = None;
        if !self.skip_mode {
            return out;
        }

        match self.phase {
            Phase::Presenting => {
                self.expected_tick = None;
                if let Some(deferred) = self.typewriter.skip_to_end(now_ms) {
                    out.push(Command::SetDialogueText {
                        text: self.typewriter.displayed().to_string(),
                    });
                    // For a linear node this schedules the next check; for
                    // choices or an ending the loop halts here.
                    self.on_reveal_complete(deferred, &mut out);
                }
            }
            Phase::AwaitingInput => {
                if let Some(target) = self.current_linear_target() {
                    self.pending_advance = None;
                    return self.enter_node(&target, now_ms);
                }
            }
            Phase::Loading | Phase::Ended => {}
        }

        out
    }

    // ---- settings -------------------------------------------------------------

    pub fn set_text_reveal_rate(&mut self, ms_per_char: f64) {
        self.settings.text_reveal_rate = ms_per_char;
        self.persistence.write_settings(&self.settings);
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.settings.music_volume = volume.clamp(0.0, 1.0);
        self.persistence.write_settings(&self.settings);
    }

    pub fn set_effects_volume(&mut self, volume: f32) {
        self.settings.effects_volume = volume.clamp(0.0, 1.0);
        self.persistence.write_settings(&self.settings);
    }

    // ---- accessors --------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn story(&self) -> &StoryStore {
        &self.story
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn displayed_text(&self) -> &str {
        self.typewriter.displayed()
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn skip_mode(&self) -> bool {
        self.skip_mode
    }

    /// The serialized save record as stored, for hosts that mirror storage
    /// elsewhere (the browser page syncing localStorage).
    pub fn save_blob(&self) -> Option<String> {
        self.persistence.raw(SAVE_KEY)
    }

    /// The serialized settings record as stored.
    pub fn settings_blob(&self) -> Option<String> {
        self.persistence.raw(SETTINGS_KEY)
    }

    // ---- internals ----------------------------------------------------------------

    fn resolve_field(&self, value: Option<&str>) -> Option<String> {
        value.map(|raw| evaluator::interpolate(&self.game_state, raw))
    }

    fn current_linear_target(&self) -> Option<String> {
        self.current_node
            .as_ref()
            .and_then(|id| self.story.get(id))
            .and_then(StoryNode::successor)
            .map(str::to_string)
    }

    fn pump_tick(&mut self, now_ms: u64, out: &mut Vec<Command>) {
        match self.typewriter.tick(now_ms) {
            TickOutcome::Revealed { delay_ms } => {
                out.push(Command::SetDialogueText {
                    text: self.typewriter.displayed().to_string(),
                });
                let token = self.next_token();
                self.expected_tick = Some(token);
                out.push(Command::ScheduleTick { delay_ms, token });
            }
            TickOutcome::Completed { deferred } => {
                out.push(Command::SetDialogueText {
                    text: self.typewriter.displayed().to_string(),
                });
                self.on_reveal_complete(deferred, out);
            }
            TickOutcome::Idle => {}
        }
    }

    /// Runs once per reveal, whether it finished naturally or was skipped.
    /// Deferred actions run strictly before the transition decision.
    fn on_reveal_complete(&mut self, deferred: Vec<DeferredAction>, out: &mut Vec<Command>) {
        let Some(node_id) = self.current_node.clone() else {
            return;
        };
        let Some(node) = self.story.get(&node_id).cloned() else {
            return;
        };

        for action in deferred {
            match action {
                DeferredAction::RenderChoices => out.push(Command::ShowChoices {
                    choices: self.visible_choices(&node),
                }),
            }
        }

        self.phase = Phase::AwaitingInput;
        let armed_mid_reveal = std::mem::take(&mut self.auto_armed_mid_reveal);

        if node.has_choices() {
            // Skip mode halts here, flag intact, until the player chooses.
            return;
        }

        if node.successor().is_some() {
            if self.skip_mode && self.pending_skip_poll.is_none() {
                self.schedule_skip_poll(out);
            }
            if self.auto_advance {
                let delay = if armed_mid_reveal {
                    timing::FALLBACK_ADVANCE_MS
                } else {
                    let read = timing::read_time_ms(self.typewriter.full_text());
                    timing::auto_delay_ms(read, self.typewriter.typing_duration_ms())
                };
                self.schedule_advance(delay, out);
            }
            return;
        }

        // Terminal node: the session ends here.
        self.phase = Phase::Ended;
        let text = if self.typewriter.full_text().is_empty() {
            DEFAULT_ENDING_TEXT.to_string()
        } else {
            self.typewriter.full_text().to_string()
        };
        let treatment = self
            .ending_treatments
            .get(&node_id)
            .cloned()
            .unwrap_or_else(|| self.default_treatment.clone());
        out.push(Command::ShowEnding {
            node_id,
            text,
            treatment,
        });
    }

    fn visible_choices(&self, node: &StoryNode) -> Vec<ChoiceView> {
        node.choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| {
                evaluator::evaluate_condition(&self.game_state, choice.condition.as_deref())
            })
            .map(|(index, choice)| ChoiceView {
                index,
                label: evaluator::interpolate(&self.game_state, &choice.label),
            })
            .collect()
    }

    fn schedule_advance(&mut self, delay_ms: u64, out: &mut Vec<Command>) {
        let token = self.next_token();
        self.pending_advance = Some(token);
        out.push(Command::ScheduleAdvance { delay_ms, token });
    }

    fn schedule_skip_poll(&mut self, out: &mut Vec<Command>) {
        let token = self.next_token();
        self.pending_skip_poll = Some(token);
        out.push(Command::ScheduleSkipPoll {
            delay_ms: timing::SKIP_POLL_INTERVAL_MS,
            token,
        });
    }

    fn next_token(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    /// At most one timer of each kind may be live; forgetting the expected
    /// tokens makes any stale callback a no-op.
    fn invalidate_timers(&mut self) {
        self.expected_tick = None;
        self.pending_advance = None;
        self.pending_skip_poll = None;
        self.auto_armed_mid_reveal = false;
    }
}

impl DialogueEngineBuilder {
    pub fn story(mut self, story: StoryStore) -> Self {
        self.story = story;
        self
    }

    pub fn storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn start_node(mut self, node_id: &str) -> Self {
        self.start_node = node_id.to_string();
        self
    }

    /// Override the state a new game begins with.
    pub fn initial_state(mut self, state: GameState) -> Self {
        self.initial_state = state;
        self
    }

    /// Visual treatment key shown when the story ends on `node_id`.
    pub fn ending_treatment(mut self, node_id: &str, treatment: &str) -> Self {
        self.ending_treatments
            .insert(node_id.to_string(), treatment.to_string());
        self
    }

    pub fn default_ending_treatment(mut self, treatment: &str) -> Self {
        self.default_treatment = treatment.to_string();
        self
    }

    pub fn build(self) -> DialogueEngine {
        let persistence = Persistence::new(
            self.storage
                .unwrap_or_else(|| Box::new(crate::core::persistence::MemoryStorage::new())),
        );
        let settings = persistence.load_settings().unwrap_or_default();

        DialogueEngine {
            story: self.story,
            persistence,
            settings,
            game_state: self.initial_state.clone(),
            initial_state: self.initial_state,
            history: Vec::new(),
            typewriter: Typewriter::new(),
            phase: Phase::Loading,
            current_node: None,
            auto_advance: false,
            skip_mode: false,
            auto_armed_mid_reveal: false,
            timer_seq: 0,
            expected_tick: None,
            pending_advance: None,
            pending_skip_poll: None,
            start_node: self.start_node,
            ending_treatments: self.ending_treatments,
            default_treatment: self.default_treatment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::Choice;

    fn tiny_story() -> StoryStore {
        let mut story = StoryStore::new();
        story.insert(
            "start",
            StoryNode {
                text: "Hi.".to_string(),
                goto: Some("end".to_string()),
                ..Default::default()
            },
        );
        story.insert(
            "fork",
            StoryNode {
                text: "Pick.".to_string(),
                choices: vec![
                    Choice {
                        label: "A".to_string(),
                        goto: "end".to_string(),
                        ..Default::default()
                    },
                    Choice {
                        label: "B".to_string(),
                        goto: "end".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        );
        story.insert(
            "end",
            StoryNode {
                text: "Bye.".to_string(),
                ..Default::default()
            },
        );
        story
    }

    fn engine() -> DialogueEngine {
        DialogueEngine::builder().story(tiny_story()).build()
    }

    #[test]
    fn unknown_node_is_a_logged_noop() {
        let mut engine = engine();
        let commands = engine.enter_node("nowhere", 0);
        assert!(commands.is_empty());
        assert_eq!(engine.current_node(), None);
    }

    #[test]
    fn enter_node_presents_and_schedules_tick() {
        let mut engine = engine();
        let commands = engine.enter_node("start", 0);
        assert_eq!(engine.phase(), Phase::Presenting);
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::ScheduleTick { .. })));
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::SetDialogueText { text } if text == "H")));
    }

    #[test]
    fn stale_tick_token_is_ignored() {
        let mut engine = engine();
        engine.enter_node("start", 0);
        // Re-entering invalidates the previous tick token.
        let commands = engine.enter_node("start", 10);
        let stale = commands
            .iter()
            .find_map(|c| match c {
                Command::ScheduleTick { token, .. } => Some(*token),
                _ => None,
            })
            .unwrap();
        engine.enter_node("start", 20);
        assert!(engine.reveal_tick(stale, 30).is_empty());
    }

    #[test]
    fn select_choice_guards() {
        let mut engine = engine();
        engine.enter_node("fork", 0);
        assert!(engine.select_choice("start", 0, 1).is_empty());
        assert!(engine.select_choice("fork", 9, 1).is_empty());
    }

    #[test]
    fn ending_treatment_falls_back_to_default() {
        let mut engine = DialogueEngine::builder()
            .story(tiny_story())
            .ending_treatment("other_end", "confetti")
            .build();
        engine.enter_node("end", 0);
        let commands = engine.advance(100); // finish the reveal
        let treatment = commands.iter().find_map(|c| match c {
            Command::ShowEnding { treatment, .. } => Some(treatment.clone()),
            _ => None,
        });
        assert_eq!(treatment.as_deref(), Some("fade"));
        assert_eq!(engine.phase(), Phase::Ended);
    }

    #[test]
    fn settings_changes_persist_immediately() {
        let mut engine = engine();
        engine.set_music_volume(0.4);
        let blob = engine.settings_blob().unwrap();
        assert!(blob.contains("0.4"));
    }
}
