use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::images::ImageLayers;
use crate::variables::GameVariables;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Nothing started yet.
    #[default]
    Idle,
    /// A chapter is being played.
    Playing,
    /// The player advanced past a `chapter_end` node.
    Ended,
}

/// A complete snapshot of a run. This is also the save format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Node the run is suspended at; empty before start.
    #[serde(default)]
    pub current_node_id: String,
    /// Stage being played.
    #[serde(default)]
    pub current_stage_id: String,
    /// Chapter being played.
    #[serde(default)]
    pub current_chapter_id: String,
    /// Variable store.
    #[serde(default)]
    pub variables: GameVariables,
    /// Backlog of presented beats.
    #[serde(default)]
    pub history: History,
    /// Images on stage.
    #[serde(default)]
    pub active_images: ImageLayers,
    /// When this session began, in milliseconds.
    #[serde(default)]
    pub started_at: i64,
    /// Play time accumulated by earlier sessions, in milliseconds.
    #[serde(default)]
    pub play_time: i64,
    /// Index of the most recently picked choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_choice_index: Option<usize>,
    /// Text of the most recently picked choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_choice_text: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: EngineStatus,
}

impl GameState {
    /// A fresh playing state positioned at the start of a chapter.
    pub fn new(stage_id: &str, chapter_id: &str, variables: GameVariables, now_ms: i64) -> Self {
        Self {
            current_stage_id: stage_id.to_string(),
            current_chapter_id: chapter_id.to_string(),
            variables,
            started_at: now_ms,
            status: EngineStatus::Playing,
            ..Self::default()
        }
    }

    /// Total play time including the current session.
    pub fn total_play_time(&self, now_ms: i64) -> i64 {
        self.play_time + (now_ms - self.started_at).max(0)
    }
}
