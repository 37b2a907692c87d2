use loom_story::{ChapterEndAction, Node};
use serde::{Deserialize, Serialize};

use crate::state::GameState;

/// Where the story goes once the current chapter ends.
///
/// The engine only reports this; the host decides whether to follow it
/// with [`GameEngine::start_chapter`](crate::GameEngine::start_chapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterTransition {
    /// Authored follow-up action.
    pub action: ChapterEndAction,
    /// Stage that just ended.
    pub from_stage_id: String,
    /// Chapter that just ended.
    pub from_chapter_id: String,
    /// Resolved target stage, if any.
    pub next_stage_id: Option<String>,
    /// Resolved target chapter, if any.
    pub next_chapter_id: Option<String>,
    /// Whether images should be cleared before the next chapter.
    pub clear_visuals: bool,
}

impl ChapterTransition {
    /// The target stage and chapter, when both are known.
    pub fn target(&self) -> Option<(&str, &str)> {
        Some((self.next_stage_id.as_deref()?, self.next_chapter_id.as_deref()?))
    }
}

/// Hooks for a rendering layer.
///
/// Every method has a no-op default. Notifications are sent once the whole
/// synchronous effect of a call or a fired timer has been applied, so an
/// observer never sees a half-updated state.
pub trait EngineObserver {
    /// The state changed.
    fn on_state_change(&mut self, _state: &GameState) {}

    /// The current node changed. `None` when the pointer names no node.
    fn on_node_change(&mut self, _node: Option<&Node>) {}

    /// The player advanced past a `chapter_end` node.
    fn on_chapter_end(&mut self, _transition: &ChapterTransition) {}

    /// The game ended. Fired once per run.
    fn on_game_end(&mut self) {}
}
