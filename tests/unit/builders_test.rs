//! Tests for the task property builder

use prometheus_task_policy::builders::TaskPropertyBuilder;
use prometheus_task_policy::config::{PolicyConfig, PolicyKind};
use prometheus_task_policy::core::SchedulerError;
use prometheus_task_policy::runtime::TokioSpawner;

fn builder() -> TaskPropertyBuilder<u32, u32> {
    TaskPropertyBuilder::from_fn(|n: u32, _token| async move { Ok(n + 1) })
}

#[test]
fn test_builder_defaults() {
    let b = builder();
    assert_eq!(*b.current_policy(), PolicyConfig::default());
}

#[test]
fn test_builder_policy_chain() {
    let b = builder().restart().max_concurrency(4);
    assert_eq!(b.current_policy().kind, PolicyKind::Restart);
    assert_eq!(b.current_policy().max_concurrency, 4);

    let b = builder().policy(PolicyConfig::default().drop());
    assert_eq!(b.current_policy().kind, PolicyKind::Drop);
}

#[tokio::test]
async fn test_builder_rejects_invalid_policy() {
    let spawner = TokioSpawner::current().unwrap();
    let result = builder().enqueue(0).build(spawner);
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_builder_builds_named_property() {
    let task = builder()
        .name("increment")
        .keep_latest()
        .build(TokioSpawner::current().unwrap())
        .unwrap();

    assert_eq!(task.name(), "increment");
    assert_eq!(task.policy().kind, PolicyKind::KeepLatest);
    assert!(task.is_idle());
    assert_eq!(task.run(41).join().await.unwrap(), 42);
}
