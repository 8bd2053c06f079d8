/// Commands handed to the host for execution.
///
/// The engine never touches the DOM, audio output, or real timers; every
/// entry point returns a batch of these and the host carries them out. The
/// serde tagging keeps the stream JSON-friendly for the wasm bridge.

use serde::{Deserialize, Serialize};

/// A visible choice button. `index` is the choice's position in the node
/// definition — condition-hidden choices keep their original indices so
/// played-choice bookkeeping stays stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceView {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Swap the scene background; `None` clears it.
    SetBackground { image: Option<String> },
    /// Swap the character sprite; `None` clears it.
    SetCharacter { image: Option<String> },
    /// Update the name box (already interpolated).
    SetSpeaker { name: String },
    /// Progressive partial text of the in-flight reveal.
    SetDialogueText { text: String },
    /// Render the visible choice buttons.
    ShowChoices { choices: Vec<ChoiceView> },
    ClearChoices,
    /// Start a music track; `None` stops the current one.
    PlayMusic { track: Option<String>, volume: f32 },
    /// Fire-and-forget sound effect.
    PlaySound { effect: String, volume: f32 },
    /// The session reached a terminal node.
    ShowEnding {
        node_id: String,
        text: String,
        treatment: String,
    },
    /// Schedule the next reveal tick; deliver via `reveal_tick(token, now)`.
    ScheduleTick { delay_ms: u64, token: u64 },
    /// Schedule the single pending transition; deliver via
    /// `advance_fired(token, now)`.
    ScheduleAdvance { delay_ms: u64, token: u64 },
    /// Schedule a skip-mode check; deliver via `skip_poll_fired(token, now)`.
    ScheduleSkipPoll { delay_ms: u64, token: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_serialize_tagged() {
        let cmd = Command::ScheduleAdvance {
            delay_ms: 2000,
            token: 7,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"type":"schedule_advance","delay_ms":2000,"token":7}"#
        );
    }

    #[test]
    fn choice_view_round_trips() {
        let cmd = Command::ShowChoices {
            choices: vec![ChoiceView {
                index: 1,
                label: "Sit down".to_string(),
            }],
        };
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
