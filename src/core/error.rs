//! Error types for scheduler configuration and task outcomes.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced while configuring a scheduler.
///
/// These are reported synchronously, before any instance is scheduled.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Policy configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Runtime adapter failure with context.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Why a task instance was canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The owner called `abort()` and the scheduler was emptied.
    Aborted,
    /// The caller canceled this instance through its handle.
    Explicit,
    /// The scheduler replaced this instance with a newer one (`restart`, `keepLatest`).
    Superseded,
    /// The scheduler was at capacity under `drop`; the instance never started.
    CapacityRejected,
}

impl CancelReason {
    /// True when the cancellation came from outside the scheduler.
    #[must_use]
    pub const fn is_self_canceled(self) -> bool {
        matches!(self, Self::Aborted | Self::Explicit)
    }

    /// Short stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aborted => "aborted",
            Self::Explicit => "explicit",
            Self::Superseded => "superseded",
            Self::CapacityRejected => "capacity_rejected",
        }
    }
}

/// Failed outcome of a single task instance.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The wrapped operation returned an error or panicked.
    #[error("operation failed: {0}")]
    OperationFailure(Arc<anyhow::Error>),
    /// The instance was canceled by an abort or superseded by the scheduler.
    #[error("task canceled (self-canceled: {self_canceled})")]
    Canceled {
        /// True only for explicit external cancellation.
        self_canceled: bool,
    },
    /// Dropped under the `drop` policy before it ever started.
    #[error("task rejected: scheduler at capacity")]
    CapacityRejected,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::OperationFailure(_) => "task_operation_failure",
            Self::Canceled { .. } => "task_canceled",
            Self::CapacityRejected => "task_capacity_rejected",
        }
    }
}

/// Application-facing result using anyhow for operations and callbacks.
pub type AppResult<T> = Result<T, anyhow::Error>;
