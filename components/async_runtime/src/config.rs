//! Runtime configuration.

use crate::error::RuntimeResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which queue receives jobs deferred through the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Jobs run in the microtask checkpoint after the current task.
    #[default]
    Microtask,
    /// Jobs are queued as ordinary tasks, like a zero-delay timer.
    Macrotask,
}

/// Configuration for an [`EventLoop`](crate::EventLoop).
///
/// # Examples
///
/// ```
/// use async_runtime::{DispatchMode, RuntimeConfig};
///
/// let config = RuntimeConfig::from_json(r#"{ "dispatch": "macrotask" }"#).unwrap();
/// assert_eq!(config.dispatch, DispatchMode::Macrotask);
/// assert_eq!(config.max_turns, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Queue used for deferred promise reactions
    pub dispatch: DispatchMode,
    /// Maximum number of jobs a single drive call may run; `None` is unbounded
    pub max_turns: Option<usize>,
}

impl RuntimeConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(source: &str) -> RuntimeResult<Self> {
        let config: RuntimeConfig = serde_json::from_str(source)?;
        debug!(dispatch = ?config.dispatch, max_turns = ?config.max_turns, "loaded runtime config");
        Ok(config)
    }

    /// Returns the config with the given dispatch mode.
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Returns the config with the given turn limit.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }
}
