//! Lifecycle subscription registry.
//!
//! Callbacks are keyed by [`TaskEvent`] and invoked synchronously, in registration
//! order, on whichever execution context drives the transition.
//!
//! ## Rules
//! - A callback returning `Err` or panicking is logged and skipped; later callbacks still run
//! - The callback list is snapshotted before dispatch, so a callback may subscribe,
//!   unsubscribe, or run new tasks without deadlocking the registry

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{AppResult, TaskInstance};
use crate::util::panic::panic_message;

/// Lifecycle events emitted by a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    /// `idle -> running`.
    Started,
    /// `running -> resolved`.
    Succeeded,
    /// `running -> rejected`.
    Failed,
    /// `idle | running -> canceled`.
    Canceled,
}

impl TaskEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Started, Self::Succeeded, Self::Failed, Self::Canceled];

    /// Event name as exposed to subscribers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// Handle returned by [`SubscriptionRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked on a lifecycle transition.
pub type TaskCallback<T> = Arc<dyn Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync>;

struct Subscription<T> {
    id: SubscriptionId,
    event: TaskEvent,
    callback: TaskCallback<T>,
}

/// Ordered collection of lifecycle callbacks.
pub struct SubscriptionRegistry<T> {
    subscriptions: RwLock<Vec<Subscription<T>>>,
    next_id: AtomicU64,
}

impl<T> SubscriptionRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` for `event`. Callbacks for the same event run in the
    /// order they were registered.
    pub fn subscribe<F>(&self, event: TaskEvent, callback: F) -> SubscriptionId
    where
        F: Fn(&TaskInstance<T>) -> AppResult<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            event,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Number of callbacks registered for `event`.
    pub fn len(&self, event: TaskEvent) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.event == event)
            .count()
    }

    /// True when no callback is registered at all.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    /// Invoke every callback registered for `event`. Returns how many completed
    /// without error.
    pub fn notify(&self, event: TaskEvent, instance: &TaskInstance<T>) -> usize {
        let callbacks: Vec<TaskCallback<T>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.event == event)
            .map(|s| Arc::clone(&s.callback))
            .collect();

        let mut delivered = 0;
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(instance))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(
                        "subscriber for `{}` failed on task {}: {:#}",
                        event.as_str(),
                        instance.id(),
                        e
                    );
                }
                Err(payload) => {
                    tracing::warn!(
                        "subscriber for `{}` panicked on task {}: {}",
                        event.as_str(),
                        instance.id(),
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivered
    }
}

impl<T> Default for SubscriptionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SubscriptionRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.subscriptions.read().len())
            .finish()
    }
}
