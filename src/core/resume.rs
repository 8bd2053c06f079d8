/// Resume policy — where a returning player lands.

use crate::core::store::StoryStore;
use crate::schema::save::SaveRecord;

/// Result of scanning a save for the next playable branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeTarget {
    /// Land on this node.
    Node(String),
    /// Every visited choice-bearing node is fully played; the caller must
    /// choose between resetting progress and cancelling.
    AllBranchesPlayed,
}

/// Scan `visited` in recorded order and return the first node that still has
/// an unplayed choice. With no save at all, a fresh session starts at
/// `start_node`. Pure and idempotent: calling it twice without intervening
/// choices returns the same target.
pub fn compute_resume_target(
    story: &StoryStore,
    save: Option<&SaveRecord>,
    start_node: &str,
) -> ResumeTarget {
    let Some(save) = save else {
        return ResumeTarget::Node(start_node.to_string());
    };

    for node_id in &save.visited {
        let Some(node) = story.get(node_id) else {
            continue;
        };
        if !node.has_choices() {
            continue;
        }
        if save.played_count(node_id) < node.choices.len() {
            return ResumeTarget::Node(node_id.clone());
        }
    }

    ResumeTarget::AllBranchesPlayed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::{Choice, StoryNode};

    fn fork_node(labels: &[&str]) -> StoryNode {
        StoryNode {
            text: "Pick.".to_string(),
            choices: labels
                .iter()
                .map(|label| Choice {
                    label: label.to_string(),
                    goto: "end".to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn test_story() -> StoryStore {
        let mut story = StoryStore::new();
        story.insert(
            "start",
            StoryNode {
                text: "Morning.".to_string(),
                goto: Some("fork".to_string()),
                ..Default::default()
            },
        );
        story.insert("fork", fork_node(&["Left", "Right"]));
        story.insert("late_fork", fork_node(&["Stay", "Go"]));
        story.insert("end", StoryNode::default());
        story
    }

    #[test]
    fn no_save_starts_at_start_node() {
        let story = test_story();
        assert_eq!(
            compute_resume_target(&story, None, "start"),
            ResumeTarget::Node("start".to_string())
        );
    }

    #[test]
    fn first_unexhausted_branch_wins() {
        let story = test_story();
        let mut save = SaveRecord::default();
        save.mark_visited("start");
        save.mark_visited("fork");
        save.mark_visited("late_fork");
        save.record_choice("fork", 0);
        // "fork" still has an unplayed choice and was visited first.
        assert_eq!(
            compute_resume_target(&story, Some(&save), "start"),
            ResumeTarget::Node("fork".to_string())
        );
    }

    #[test]
    fn exhausted_branch_skipped() {
        let story = test_story();
        let mut save = SaveRecord::default();
        save.mark_visited("fork");
        save.mark_visited("late_fork");
        save.record_choice("fork", 0);
        save.record_choice("fork", 1);
        assert_eq!(
            compute_resume_target(&story, Some(&save), "start"),
            ResumeTarget::Node("late_fork".to_string())
        );
    }

    #[test]
    fn all_branches_played_surfaces_decision() {
        let story = test_story();
        let mut save = SaveRecord::default();
        save.mark_visited("start");
        save.mark_visited("fork");
        save.record_choice("fork", 0);
        save.record_choice("fork", 1);
        assert_eq!(
            compute_resume_target(&story, Some(&save), "start"),
            ResumeTarget::AllBranchesPlayed
        );
    }

    #[test]
    fn unknown_visited_nodes_ignored() {
        let story = test_story();
        let mut save = SaveRecord::default();
        save.mark_visited("removed_in_rewrite");
        save.mark_visited("fork");
        assert_eq!(
            compute_resume_target(&story, Some(&save), "start"),
            ResumeTarget::Node("fork".to_string())
        );
    }

    #[test]
    fn idempotent_without_intervening_choices() {
        let story = test_story();
        let mut save = SaveRecord::default();
        save.mark_visited("fork");
        let first = compute_resume_target(&story, Some(&save), "start");
        let second = compute_resume_target(&story, Some(&save), "start");
        assert_eq!(first, second);
    }
}
