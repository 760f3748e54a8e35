//! Tests for error types

use std::sync::Arc;

use prometheus_task_policy::core::{CancelReason, SchedulerError, TaskError};

#[test]
fn test_scheduler_error_display() {
    let err = SchedulerError::InvalidConfig("max_concurrency must be greater than 0".into());
    assert_eq!(
        err.to_string(),
        "invalid configuration: max_concurrency must be greater than 0"
    );

    let err = SchedulerError::Runtime("no reactor running".into());
    assert_eq!(err.to_string(), "runtime error: no reactor running");
}

#[test]
fn test_task_error_labels() {
    let failure = TaskError::OperationFailure(Arc::new(anyhow::anyhow!("boom")));
    assert_eq!(failure.as_label(), "task_operation_failure");
    assert_eq!(failure.to_string(), "operation failed: boom");

    let canceled = TaskError::Canceled { self_canceled: true };
    assert_eq!(canceled.as_label(), "task_canceled");
    assert!(canceled.to_string().contains("self-canceled: true"));

    assert_eq!(TaskError::CapacityRejected.as_label(), "task_capacity_rejected");
}

#[test]
fn test_cancel_reason_self_canceled() {
    assert!(CancelReason::Aborted.is_self_canceled());
    assert!(CancelReason::Explicit.is_self_canceled());
    assert!(!CancelReason::Superseded.is_self_canceled());
    assert!(!CancelReason::CapacityRejected.is_self_canceled());
}

#[test]
fn test_cancel_reason_serializes_snake_case() {
    let json = serde_json::to_string(&CancelReason::CapacityRejected).unwrap();
    assert_eq!(json, "\"capacity_rejected\"");
    assert_eq!(CancelReason::CapacityRejected.as_str(), "capacity_rejected");
}
