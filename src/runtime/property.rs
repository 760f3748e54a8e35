//! Caller-facing task surface.
//!
//! A [`TaskProperty`] binds one governed operation to one scheduler. Display layers read
//! its observable state (`is_active`, `state`, `last_*`, `self_canceled`) and subscribe to
//! lifecycle events to decide when to refresh; the property itself never renders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::core::{
    AppResult, Spawn, SubscriptionId, SubscriptionRegistry, TaskEvent, TaskInstance,
    TaskOperation, TaskScheduler,
};

/// Coarse activity state shown by display layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyState {
    /// Nothing is running.
    Idle,
    /// At least one instance is running.
    Active,
}

impl PropertyState {
    /// `"idle"` or `"active"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
        }
    }
}

struct PropertyInner<A, T, S> {
    name: String,
    operation: Arc<dyn TaskOperation<A, T>>,
    registry: Arc<SubscriptionRegistry<T>>,
    scheduler: TaskScheduler<T, S>,
    self_canceled: AtomicBool,
}

/// A governed operation plus the scheduler that decides how its invocations overlap.
///
/// Cloning is cheap; clones share the same scheduler and subscriptions.
pub struct TaskProperty<A, T, S> {
    inner: Arc<PropertyInner<A, T, S>>,
}

impl<A, T, S> Clone for TaskProperty<A, T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, T, S> TaskProperty<A, T, S>
where
    A: Send + 'static,
    T: Send + 'static,
    S: Spawn + Send + Sync + 'static,
{
    pub(crate) fn from_parts(
        name: String,
        operation: Arc<dyn TaskOperation<A, T>>,
        registry: Arc<SubscriptionRegistry<T>>,
        scheduler: TaskScheduler<T, S>,
    ) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                name,
                operation,
                registry,
                scheduler,
                self_canceled: AtomicBool::new(false),
            }),
        }
    }

    /// Create a new instance for `args` and hand it to the scheduler.
    ///
    /// Returns immediately. The handle is `running` if the policy started it, `idle` if
    /// it was queued, or already `canceled` if the `drop` policy rejected it.
    pub fn run(&self, args: A) -> TaskInstance<T> {
        let operation = Arc::clone(&self.inner.operation);
        let instance = TaskInstance::new(Arc::clone(&self.inner.registry), move |token| async move {
            operation.perform(args, token).await
        });
        tracing::debug!("{}: run -> task {}", self.inner.name, instance.id());
        self.inner.self_canceled.store(false, Ordering::Release);
        self.inner.scheduler.schedule(instance.clone());
        instance
    }

    /// Mark the property self-canceled and cancel everything queued or running.
    ///
    /// The flag is already set when the resulting `canceled` notifications fire.
    pub fn abort(&self) {
        tracing::info!("{}: abort requested", self.inner.name);
        self.inner.self_canceled.store(true, Ordering::Release);
        self.inner.scheduler.empty_out();
    }
}

impl<A, T, S> TaskProperty<A, T, S> {
    /// Property name used in logs and audit records.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The policy the scheduler was built from.
    pub fn policy(&self) -> &PolicyConfig {
        self.inner.scheduler.policy()
    }

    /// The underlying scheduler, for introspection.
    pub fn scheduler(&self) -> &TaskScheduler<T, S> {
        &self.inner.scheduler
    }

    /// True iff an instance is running.
    pub fn is_active(&self) -> bool {
        self.inner.scheduler.is_active()
    }

    /// True iff nothing is running.
    pub fn is_idle(&self) -> bool {
        !self.is_active()
    }

    /// `Active` or `Idle`.
    pub fn state(&self) -> PropertyState {
        if self.is_active() {
            PropertyState::Active
        } else {
            PropertyState::Idle
        }
    }

    /// True after `abort()` until the next `run()`.
    pub fn self_canceled(&self) -> bool {
        self.inner.self_canceled.load(Ordering::Acquire)
    }

    /// Most recently scheduled instance.
    pub fn last_called(&self) -> Option<TaskInstance<T>> {
        self.inner.scheduler.last().called
    }

    /// Most recently started instance.
    pub fn last_started(&self) -> Option<TaskInstance<T>> {
        self.inner.scheduler.last().started
    }

    /// Most recently resolved instance.
    pub fn last_resolved(&self) -> Option<TaskInstance<T>> {
        self.inner.scheduler.last().resolved
    }

    /// Most recently rejected instance.
    pub fn last_rejected(&self) -> Option<TaskInstance<T>> {
        self.inner.scheduler.last().rejected
    }

    /// Most recently canceled instance.
    pub fn last_canceled(&self) -> Option<TaskInstance<T>> {
        self.inner.scheduler.last().canceled
    }

    /// Lifecycle registry shared by every instance of this property.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry<T>> {
        &self.inner.registry
    }

    /// Subscribe to a lifecycle event.
    pub fn on<F>(&self, event: TaskEvent, callback: F) -> SubscriptionId
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(event, callback)
    }

    /// Remove a subscription.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.registry.unsubscribe(id)
    }
}

impl<A, T, S> std::fmt::Debug for TaskProperty<A, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProperty")
            .field("name", &self.inner.name)
            .field("scheduler", &self.inner.scheduler)
            .field("self_canceled", &self.self_canceled())
            .finish_non_exhaustive()
    }
}
