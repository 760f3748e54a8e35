//! Task instances, the policy-driven scheduler, and lifecycle notification.

pub mod error;
pub mod instance;
pub mod scheduler;
pub mod subscriber;
pub mod audit;
pub mod executor;

pub use error::{AppResult, CancelReason, SchedulerError, TaskError};
pub use instance::{BoxTaskFuture, TaskId, TaskInstance, TaskState};
pub use scheduler::{LastInstances, Spawn, TaskScheduler};
pub use subscriber::{SubscriptionId, SubscriptionRegistry, TaskCallback, TaskEvent};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, build_audit_event};
pub use executor::TaskOperation;
