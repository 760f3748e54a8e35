//! Tests for policy configuration

use prometheus_task_policy::config::{PolicyConfig, PolicyKind, ENV_MAX_CONCURRENCY, ENV_POLICY};

#[test]
fn test_default_policy() {
    let cfg = PolicyConfig::default();
    assert_eq!(cfg.kind, PolicyKind::Enqueue);
    assert_eq!(cfg.max_concurrency, 1);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_zero_concurrency_invalid() {
    let cfg = PolicyConfig::default().max_concurrency(0);
    assert!(cfg.validate().is_err());
    assert!(PolicyConfig::default().enqueue(0).validate().is_err());
}

#[test]
fn test_policy_from_json() {
    let cfg = PolicyConfig::from_json_str(r#"{"kind":"keep_latest","max_concurrency":2}"#).unwrap();
    assert_eq!(cfg, PolicyConfig::default().keep_latest().max_concurrency(2));

    let defaults = PolicyConfig::from_json_str("{}").unwrap();
    assert_eq!(defaults, PolicyConfig::default());
}

#[test]
fn test_policy_from_json_rejects_bad_input() {
    assert!(PolicyConfig::from_json_str(r#"{"kind":"restart","max_concurrency":0}"#).is_err());
    assert!(PolicyConfig::from_json_str(r#"{"kind":"sometimes"}"#).is_err());
    assert!(PolicyConfig::from_json_str("not json").is_err());
}

#[test]
fn test_policy_from_lookup() {
    let cfg = PolicyConfig::from_lookup(|key| match key {
        k if k == ENV_POLICY => Some("restart".to_string()),
        k if k == ENV_MAX_CONCURRENCY => Some(" 3 ".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.kind, PolicyKind::Restart);
    assert_eq!(cfg.max_concurrency, 3);

    let err = PolicyConfig::from_lookup(|key| (key == ENV_MAX_CONCURRENCY).then(|| "many".to_string()));
    assert!(err.is_err());
}

#[test]
fn test_policy_kind_parse_spellings() {
    for spelling in ["keep_latest", "keep-latest", "keepLatest"] {
        assert_eq!(PolicyKind::parse(spelling).unwrap(), PolicyKind::KeepLatest);
    }
    assert_eq!(PolicyKind::parse("drop").unwrap(), PolicyKind::Drop);
    assert!(PolicyKind::parse("latest").is_err());
}
