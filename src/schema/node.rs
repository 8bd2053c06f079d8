use serde::{Deserialize, Serialize};

/// Zero, one, or many action directive strings. Story files may write either
/// `"action": "set_flag(met_alex, true)"` or a list of directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Actions(pub Vec<String>);

impl Actions {
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Actions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
            None => Actions(Vec::new()),
            Some(OneOrMany::One(directive)) => Actions(vec![directive]),
            Some(OneOrMany::Many(directives)) => Actions(directives),
        })
    }
}

/// A unit of story content: template text, presentation fields, optional
/// choices, and an optional linear successor.
///
/// Node ids live as the keys of the story map, not inside the node. A node
/// has choices, a `goto`, or neither (a terminal/ending node); when a story
/// file carries both, choices win and the `goto` is ignored — see
/// [`StoryNode::successor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    /// Raw template text; `{name}` placeholders interpolate game state.
    #[serde(default)]
    pub text: String,
    /// Speaker name shown in the name box.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "bg")]
    pub background: Option<String>,
    #[serde(default, alias = "character")]
    pub character_image: Option<String>,
    /// Music track to start on entry; absent leaves the current track alone.
    #[serde(default)]
    pub music: Option<String>,
    /// Fire-and-forget sound effect played on entry.
    #[serde(default)]
    pub sound: Option<String>,
    /// Directive(s) executed on node entry.
    #[serde(default)]
    pub action: Actions,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub goto: Option<String>,
}

impl StoryNode {
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// The linear successor, if any. Choices take precedence: a node that
    /// carries both renders its choices and the `goto` is ignored.
    pub fn successor(&self) -> Option<&str> {
        if self.has_choices() {
            None
        } else {
            self.goto.as_deref()
        }
    }

    /// True when the node neither branches nor links onward — reaching it
    /// ends the session.
    pub fn is_terminal(&self) -> bool {
        !self.has_choices() && self.goto.is_none()
    }
}

/// One selectable branch out of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Button label (template text).
    pub label: String,
    /// Target node id.
    pub goto: String,
    /// Optional boolean expression gating visibility.
    #[serde(default)]
    pub condition: Option<String>,
    /// Directive(s) executed when this choice is picked.
    #[serde(default)]
    pub action: Actions,
}
