//! Error types for the interpreter.

use loom_story::StoryError;
use thiserror::Error;

/// Result type for interpreter operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Calls the engine refused.
///
/// Every variant leaves the engine exactly as it was before the call.
/// Problems in the authored story itself are never reported here; they are
/// logged and resolved by falling back.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested stage or chapter does not exist.
    #[error(transparent)]
    Story(#[from] StoryError),

    /// No run has been started yet.
    #[error("no story is running; call start first")]
    NotStarted,

    /// `advance` was called while a choice is on screen.
    #[error("waiting for a choice at node \"{0}\"")]
    AwaitingChoice(String),

    /// `select_choice` was called away from a choice node.
    #[error("current node is not a choice")]
    NotAtChoice,

    /// The choice index is past the end of the list.
    #[error("choice {index} out of range ({count} available)")]
    ChoiceOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of choices at the node.
        count: usize,
    },

    /// The choice's condition does not hold.
    #[error("choice \"{0}\" is locked")]
    ChoiceLocked(String),

    /// An image effect is still playing; the story resumes on its own.
    #[error("a timed transition is pending")]
    TransitionPending,

    /// The chapter has already ended.
    #[error("the chapter has ended")]
    ChapterEnded,

    /// A save payload could not be read.
    #[error("malformed save data: {0}")]
    MalformedSave(#[source] serde_json::Error),

    /// The state could not be written out.
    #[error("failed to serialize game state: {0}")]
    Serialize(#[source] serde_json::Error),
}
