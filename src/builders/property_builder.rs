//! Builder to construct a task property from an operation and a policy.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::PolicyConfig;
use crate::core::{
    build_audit_event, AppResult, AuditSink, SchedulerError, Spawn, SubscriptionRegistry,
    TaskEvent, TaskInstance, TaskOperation, TaskScheduler,
};
use crate::runtime::TaskProperty;
use crate::util::clock::now_ms;

const DEFAULT_NAME: &str = "task";

/// Chainable construction of a [`TaskProperty`].
///
/// Policy calls mirror [`PolicyConfig`]; subscriptions registered here are in place
/// before the first `run`.
///
/// ```rust,ignore
/// let task = TaskPropertyBuilder::from_fn(|id: u64, _token| async move { load(id).await })
///     .name("load-profile")
///     .keep_latest()
///     .on_error(|ti| {
///         tracing::error!("load failed: {:?}", ti.error());
///         Ok(())
///     })
///     .build(TokioSpawner::current()?)?;
/// ```
pub struct TaskPropertyBuilder<A, T> {
    name: String,
    operation: Arc<dyn TaskOperation<A, T>>,
    policy: PolicyConfig,
    registry: Arc<SubscriptionRegistry<T>>,
}

impl<A, T> TaskPropertyBuilder<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// Start from an operation, with the default policy (`enqueue`, one at a time).
    pub fn new<O>(operation: O) -> Self
    where
        O: TaskOperation<A, T>,
    {
        Self {
            name: DEFAULT_NAME.to_string(),
            operation: Arc::new(operation),
            policy: PolicyConfig::default(),
            registry: Arc::new(SubscriptionRegistry::new()),
        }
    }

    /// Start from an async closure taking the run arguments and a cancellation token.
    pub fn from_fn<F, Fut>(operation: F) -> Self
    where
        F: Fn(A, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        Self::new(operation)
    }

    /// Name used in logs and audit records.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the whole policy.
    #[must_use]
    pub fn policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// See [`PolicyConfig::enqueue`].
    #[must_use]
    pub fn enqueue(mut self, max_concurrency: usize) -> Self {
        self.policy = self.policy.enqueue(max_concurrency);
        self
    }

    /// See [`PolicyConfig::drop`].
    #[must_use]
    pub fn drop(mut self) -> Self {
        self.policy = self.policy.drop();
        self
    }

    /// See [`PolicyConfig::restart`].
    #[must_use]
    pub fn restart(mut self) -> Self {
        self.policy = self.policy.restart();
        self
    }

    /// See [`PolicyConfig::keep_latest`].
    #[must_use]
    pub fn keep_latest(mut self) -> Self {
        self.policy = self.policy.keep_latest();
        self
    }

    /// See [`PolicyConfig::max_concurrency`].
    #[must_use]
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.policy = self.policy.max_concurrency(max_concurrency);
        self
    }

    /// The policy as configured so far.
    pub fn current_policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Subscribe to a lifecycle event.
    #[must_use]
    pub fn on<F>(self, event: TaskEvent, callback: F) -> Self
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        self.registry.subscribe(event, callback);
        self
    }

    /// Shorthand for `on(TaskEvent::Started, ..)`.
    #[must_use]
    pub fn on_start<F>(self, callback: F) -> Self
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on(TaskEvent::Started, callback)
    }

    /// Shorthand for `on(TaskEvent::Succeeded, ..)`.
    #[must_use]
    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on(TaskEvent::Succeeded, callback)
    }

    /// Shorthand for `on(TaskEvent::Failed, ..)`.
    #[must_use]
    pub fn on_error<F>(self, callback: F) -> Self
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on(TaskEvent::Failed, callback)
    }

    /// Shorthand for `on(TaskEvent::Canceled, ..)`.
    #[must_use]
    pub fn on_cancel<F>(self, callback: F) -> Self
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on(TaskEvent::Canceled, callback)
    }

    /// Record every lifecycle transition into `sink`.
    #[must_use]
    pub fn with_audit<K>(self, sink: Arc<Mutex<K>>) -> Self
    where
        K: AuditSink + 'static,
    {
        for event in TaskEvent::ALL {
            let sink = Arc::clone(&sink);
            let property = self.name.clone();
            self.registry.subscribe(event, move |ti: &TaskInstance<T>| {
                let payload = match event {
                    TaskEvent::Failed => ti.error().map(|e| format!("{e:#}")),
                    TaskEvent::Canceled => ti.cancel_reason().map(|r| r.as_str().to_string()),
                    TaskEvent::Started | TaskEvent::Succeeded => None,
                };
                sink.lock().record(build_audit_event(
                    format!("{}-{}-{}", ti.id(), event.as_str(), now_ms()),
                    ti.id().to_string(),
                    property.clone(),
                    event.as_str(),
                    payload,
                ));
                Ok(())
            });
        }
        self
    }

    /// Validate the policy and build the property and its scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the policy fails validation.
    pub fn build<S>(self, spawner: S) -> Result<TaskProperty<A, T, S>, SchedulerError>
    where
        S: Spawn + Send + Sync + 'static,
    {
        let scheduler = TaskScheduler::new(self.policy, spawner).inspect_err(|e| {
            tracing::error!("task property `{}` rejected: {}", self.name, e);
        })?;
        tracing::debug!(
            "task property `{}` built with policy {}",
            self.name,
            self.policy.kind.as_str()
        );
        Ok(TaskProperty::from_parts(
            self.name,
            self.operation,
            self.registry,
            scheduler,
        ))
    }
}
