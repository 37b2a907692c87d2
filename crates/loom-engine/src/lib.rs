//! Story interpreter for Storyloom.
//!
//! [`GameEngine`] walks a [`loom_story::StoryProject`] one chapter at a time.
//! It runs automatic nodes (start, variable, condition, image) on its own and
//! suspends wherever the player has to act: a line of dialogue waiting for
//! [`GameEngine::advance`], or a choice waiting for
//! [`GameEngine::select_choice`]. Everything the interpreter knows about a run
//! lives in a serializable [`GameState`], which is also the save format.
//!
//! The engine performs no I/O and never sleeps. Timed image effects are
//! queued against an injected [`Clock`] and fired by
//! [`GameEngine::poll_timers`], so hosts and tests decide how time passes.

/// Wall-clock and simulated time sources.
pub mod clock;
/// Condition evaluation against the variable store.
pub mod condition;
/// Engine tuning knobs.
pub mod config;
/// The public interpreter façade.
pub mod engine;
/// Error types for the interpreter.
pub mod error;
/// The bounded backlog of presented beats.
pub mod history;
/// Slot-addressed image state.
pub mod images;
/// `{{token}}` substitution in narrative text.
pub mod interpolate;
/// Notification hooks for rendering layers.
pub mod observer;
/// Variable operations and legacy effects.
pub mod operation;
/// The serializable run snapshot.
pub mod state;
/// Deferred actions fired by `poll_timers`.
mod timer;
/// The live variable store.
pub mod variables;

pub use clock::{Clock, ManualClock, SystemClock};
pub use condition::evaluate;
pub use config::EngineConfig;
pub use engine::{AvailableChoice, GameEngine, ProjectInfo};
pub use error::{EngineError, EngineResult};
pub use history::{History, HistoryEntry, HistoryImage};
pub use images::{ActiveImage, ImageLayers};
pub use interpolate::interpolate;
pub use observer::{ChapterTransition, EngineObserver};
pub use state::{EngineStatus, GameState};
pub use variables::GameVariables;
