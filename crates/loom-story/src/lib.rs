//! Story document model for Storyloom.
//!
//! A [`StoryProject`] is the authored, serializable definition of a branching
//! narrative: stages hold chapters, chapters hold a graph of [`Node`]s, and
//! the project declares the variables the story reads and writes. The editor
//! produces this document as JSON; the interpreter in `loom-engine` walks it.
//! Nothing in this crate performs I/O beyond parsing a string.

/// Branching predicates evaluated against the variable store.
pub mod condition;
/// Error types used throughout the crate.
pub mod error;
/// Image node payloads and their effect vocabularies.
pub mod image;
/// Node types, choices, and choice effects.
pub mod node;
/// Variable mutations performed by variable nodes.
pub mod operation;
/// Projects, stages, chapters, and variable definitions.
pub mod project;
/// Structural checks over a whole project.
pub mod validate;
/// The dynamic value type stored in variables and flags.
pub mod value;

/// Re-export condition types.
pub use condition::{ComparisonOperator, Condition};
/// Re-export error types.
pub use error::{StoryError, StoryResult};
/// Re-export image types.
pub use image::{ExitEffect, ImageAlignment, ImageData, ImageEffect, TransitionTiming};
/// Re-export node types.
pub use node::{
    ChapterEndAction, ChapterEndData, Choice, ChoiceEffect, ConditionBranch, CustomData, Node,
    NodeKind, NodeType, StatDelta,
};
/// Re-export variable operation types.
pub use operation::{OperationAction, VariableOperation};
/// Re-export project types.
pub use project::{Chapter, GameSettings, Stage, StoryProject, VariableDefinition, VariableType};
/// Re-export validation types.
pub use validate::{ValidationIssue, validate_chapter_by_id, validate_project};
/// Re-export the value type.
pub use value::Value;
