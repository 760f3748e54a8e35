//! Serializable display snapshot of a task property.
//!
//! Field names follow the camelCase surface display layers consume
//! (`isActive`, `lastResolved`, ...).

use serde::{Deserialize, Serialize};

use crate::core::{CancelReason, TaskId, TaskInstance, TaskState};
use crate::runtime::{PropertyState, TaskProperty};

/// Summary of one instance for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    /// Instance identifier.
    pub id: TaskId,
    /// Current state.
    pub state: TaskState,
    /// Why it was canceled, if it was.
    pub cancel_reason: Option<CancelReason>,
    /// Failure message when rejected.
    pub error: Option<String>,
}

impl<T> From<&TaskInstance<T>> for InstanceSummary {
    fn from(ti: &TaskInstance<T>) -> Self {
        Self {
            id: ti.id(),
            state: ti.state(),
            cancel_reason: ti.cancel_reason(),
            error: ti.error().map(|e| format!("{e:#}")),
        }
    }
}

/// Observable state of a task property at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySnapshot {
    /// Property name.
    pub name: String,
    /// True iff an instance is running.
    pub is_active: bool,
    /// True iff nothing is running.
    pub is_idle: bool,
    /// `"active"` or `"idle"`.
    pub state: PropertyState,
    /// True after `abort()` until the next `run()`.
    pub self_canceled: bool,
    /// Instances currently running.
    pub running: usize,
    /// Instances waiting in the queue.
    pub queued: usize,
    /// Most recently scheduled instance.
    pub last_called: Option<InstanceSummary>,
    /// Most recently started instance.
    pub last_started: Option<InstanceSummary>,
    /// Most recently resolved instance.
    pub last_resolved: Option<InstanceSummary>,
    /// Most recently rejected instance.
    pub last_rejected: Option<InstanceSummary>,
    /// Most recently canceled instance.
    pub last_canceled: Option<InstanceSummary>,
}

impl<A, T, S> TaskProperty<A, T, S> {
    /// Capture the observable state for display.
    pub fn snapshot(&self) -> PropertySnapshot {
        let scheduler = self.scheduler();
        let last = scheduler.last();
        let summary = |ti: Option<TaskInstance<T>>| ti.as_ref().map(InstanceSummary::from);
        let is_active = self.is_active();
        PropertySnapshot {
            name: self.name().to_string(),
            is_active,
            is_idle: !is_active,
            state: if is_active {
                PropertyState::Active
            } else {
                PropertyState::Idle
            },
            self_canceled: self.self_canceled(),
            running: scheduler.running_len(),
            queued: scheduler.queued_len(),
            last_called: summary(last.called),
            last_started: summary(last.started),
            last_resolved: summary(last.resolved),
            last_rejected: summary(last.rejected),
            last_canceled: summary(last.canceled),
        }
    }
}
