/// Story store — read-only lookup over the loaded story graph.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

use crate::schema::node::StoryNode;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// The loaded story graph: node id → node definition.
///
/// Loaded once at startup and never mutated afterward. Until a story is
/// loaded, every lookup returns `None`; callers treat that as "not ready",
/// not as an error.
#[derive(Debug, Clone, Default)]
pub struct StoryStore {
    nodes: FxHashMap<String, StoryNode>,
}

impl StoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = (String, StoryNode)>) -> Self {
        StoryStore {
            nodes: nodes.into_iter().collect(),
        }
    }

    /// Parse the browser story format: a JSON object of node id → node.
    pub fn parse_json(input: &str) -> Result<StoryStore, StoryError> {
        let nodes: FxHashMap<String, StoryNode> = serde_json::from_str(input)?;
        Ok(StoryStore { nodes })
    }

    pub fn load_from_json(path: &Path) -> Result<StoryStore, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_json(&contents)
    }

    /// Parse the native authoring format: a RON map of node id → node.
    pub fn parse_ron(input: &str) -> Result<StoryStore, StoryError> {
        let nodes: FxHashMap<String, StoryNode> = ron::from_str(input)?;
        Ok(StoryStore { nodes })
    }

    pub fn load_from_ron(path: &Path) -> Result<StoryStore, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn get(&self, node_id: &str) -> Option<&StoryNode> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Insert a node; handy for building stories in code.
    pub fn insert(&mut self, node_id: &str, node: StoryNode) {
        self.nodes.insert(node_id.to_string(), node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
