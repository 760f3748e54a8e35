//! Tests for audit sink

use prometheus_task_policy::core::{build_audit_event, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event("evt1", "task1", "search", "started", None);
    sink.record(event);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, "evt1");
    assert_eq!(events[0].task_id, "task1");
    assert_eq!(events[0].action, "started");
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("evt1", "task1", "search", "started", None));
    sink.record(build_audit_event("evt2", "task1", "search", "succeeded", None));
    sink.record(build_audit_event("evt3", "task2", "search", "started", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, "evt2"); // oldest dropped
    assert_eq!(events[1].event_id, "evt3");
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("evt1", "task1", "search", "started", None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        "evt1",
        "task1",
        "search",
        "canceled",
        Some("superseded".to_string()),
    );

    assert_eq!(event.property, "search");
    assert_eq!(event.action, "canceled");
    assert_eq!(event.payload, Some("superseded".to_string()));
    assert!(event.created_at_ms > 0);
}
