//! Tests for utility functions

use prometheus_task_policy::util::{init_tracing, now_ms, panic_message};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_panic_message_variants() {
    let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
    assert_eq!(panic_message(payload.as_ref()), "static message");

    let code = 7;
    let payload = std::panic::catch_unwind(|| panic!("formatted {code}")).unwrap_err();
    assert_eq!(panic_message(payload.as_ref()), "formatted 7");

    let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u32)).unwrap_err();
    assert_eq!(panic_message(payload.as_ref()), "unknown panic");
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing("warn");
    init_tracing("debug");
    assert!(tracing::dispatcher::has_been_set());
}
