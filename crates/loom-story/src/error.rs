/// Alias for `Result<T, StoryError>`.
pub type StoryResult<T> = Result<T, StoryError>;

/// Errors raised while loading or addressing a story document.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    /// The document is not valid JSON, or does not match the model.
    #[error("invalid story document: {0}")]
    Json(#[from] serde_json::Error),

    /// No stage has the requested id.
    #[error("stage not found: \"{0}\"")]
    StageNotFound(String),

    /// The stage exists but holds no chapter with the requested id.
    #[error("chapter not found: \"{chapter}\" in stage \"{stage}\"")]
    ChapterNotFound {
        /// Stage that was searched.
        stage: String,
        /// Chapter id that was requested.
        chapter: String,
    },
}
