//! Policy configuration.
//!
//! A [`PolicyConfig`] is a plain value: every chainable call returns an updated copy,
//! and the final value is handed once to the scheduler constructor.

use std::env;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// Environment variable selecting the policy kind.
pub const ENV_POLICY: &str = "TASK_POLICY";
/// Environment variable setting the concurrency bound.
pub const ENV_MAX_CONCURRENCY: &str = "TASK_MAX_CONCURRENCY";

/// What happens to a new invocation when the scheduler is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Append to the queue tail.
    #[default]
    Enqueue,
    /// Cancel the new instance without starting it.
    Drop,
    /// Cancel running instances to make room and start the new one at once.
    Restart,
    /// Cancel whatever is queued and queue the new one.
    KeepLatest,
}

impl PolicyKind {
    /// Policy name as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::Drop => "drop",
            Self::Restart => "restart",
            Self::KeepLatest => "keep_latest",
        }
    }

    /// Parse a policy name. Accepts `keep_latest`, `keep-latest`, and `keepLatest`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for an unknown name.
    pub fn parse(input: &str) -> Result<Self, SchedulerError> {
        match input.trim() {
            "enqueue" => Ok(Self::Enqueue),
            "drop" => Ok(Self::Drop),
            "restart" => Ok(Self::Restart),
            "keep_latest" | "keep-latest" | "keepLatest" => Ok(Self::KeepLatest),
            other => Err(SchedulerError::InvalidConfig(format!(
                "unknown policy `{other}`"
            ))),
        }
    }
}

/// Immutable scheduling policy: kind plus concurrency bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy kind.
    #[serde(default)]
    pub kind: PolicyKind,
    /// Maximum number of instances running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

const fn default_max_concurrency() -> usize {
    1
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::Enqueue,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl PolicyConfig {
    /// Queue overlapping invocations, running up to `max_concurrency` at once.
    #[must_use]
    pub const fn enqueue(self, max_concurrency: usize) -> Self {
        Self {
            kind: PolicyKind::Enqueue,
            max_concurrency,
        }
    }

    /// Cancel invocations that arrive while at capacity.
    #[must_use]
    pub const fn drop(self) -> Self {
        Self {
            kind: PolicyKind::Drop,
            ..self
        }
    }

    /// Cancel the running invocation in favour of the new one.
    #[must_use]
    pub const fn restart(self) -> Self {
        Self {
            kind: PolicyKind::Restart,
            ..self
        }
    }

    /// Keep at most one pending invocation, the most recent.
    #[must_use]
    pub const fn keep_latest(self) -> Self {
        Self {
            kind: PolicyKind::KeepLatest,
            ..self
        }
    }

    /// Set the concurrency bound, keeping the policy kind.
    #[must_use]
    pub const fn max_concurrency(self, max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            ..self
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if `max_concurrency` is zero.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_concurrency == 0 {
            return Err(SchedulerError::InvalidConfig(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse policy configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read `TASK_POLICY` and `TASK_MAX_CONCURRENCY`, loading a `.env` file first if
    /// one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for unparsable or invalid values.
    pub fn from_env() -> Result<Self, SchedulerError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, using the same keys as [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for unparsable or invalid values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SchedulerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(kind) = lookup(ENV_POLICY) {
            cfg.kind = PolicyKind::parse(&kind)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            cfg.max_concurrency = raw.trim().parse().map_err(|e| {
                SchedulerError::InvalidConfig(format!("{ENV_MAX_CONCURRENCY}=`{raw}`: {e}"))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
