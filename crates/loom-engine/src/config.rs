//! Configuration for a game engine.

/// Tuning knobs for a [`GameEngine`](crate::GameEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of history entries kept; the oldest are evicted.
    pub history_limit: usize,
    /// Exit animation length used when an image node gives none.
    pub default_exit_duration_ms: u64,
    /// Maximum number of automatic transitions in one synchronous run.
    /// A cycle of auto-advancing nodes halts here instead of spinning.
    pub max_auto_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            default_exit_duration_ms: 500,
            max_auto_steps: 10_000,
        }
    }
}

impl EngineConfig {
    /// Set the history cap (at least 1).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Set the fallback exit animation length.
    pub fn with_default_exit_duration(mut self, ms: u64) -> Self {
        self.default_exit_duration_ms = ms;
        self
    }

    /// Set the automatic transition guard (at least 1).
    pub fn with_max_auto_steps(mut self, steps: usize) -> Self {
        self.max_auto_steps = steps.max(1);
        self
    }
}
