//! Task instance state machine.
//!
//! A [`TaskInstance`] wraps one invocation of the governed operation. It is a cheap,
//! cloneable handle: the scheduler, the caller, and lifecycle subscribers all hold the
//! same underlying instance.
//!
//! ```text
//! idle ──start──► running ──ok──────► resolved
//!   │                │ ───err/panic──► rejected
//!   │                └──cancel + next suspension point──► canceled
//!   └──cancel──────────────────────────────────────────► canceled
//! ```
//!
//! Terminal states never change again.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{AppResult, CancelReason, Spawn, SubscriptionRegistry, TaskError, TaskEvent};
use crate::util::panic::panic_message;

/// Unique task instance identifier.
pub type TaskId = Uuid;

/// Boxed future produced by one invocation of the operation.
pub type BoxTaskFuture<T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send>>;

type BoxOperation<T> = Box<dyn FnOnce(CancellationToken) -> BoxTaskFuture<T> + Send>;

pub(crate) type SettleHook<T> = Arc<dyn Fn(&TaskInstance<T>) + Send + Sync>;

/// State of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, not started.
    Idle,
    /// Operation is being driven.
    Running,
    /// Operation completed with a value.
    Resolved,
    /// Operation failed.
    Rejected,
    /// Canceled before completing.
    Canceled,
}

impl TaskState {
    /// True for `resolved`, `rejected`, and `canceled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected | Self::Canceled)
    }

    /// State name as exposed to the display layer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
        }
    }
}

enum Outcome<T> {
    Resolved(T),
    Rejected(anyhow::Error),
    Canceled,
}

struct InstanceCell<T> {
    state: TaskState,
    value: Option<T>,
    error: Option<Arc<anyhow::Error>>,
    cancel_reason: Option<CancelReason>,
}

struct InstanceInner<T> {
    id: TaskId,
    token: CancellationToken,
    operation: Mutex<Option<BoxOperation<T>>>,
    cell: Mutex<InstanceCell<T>>,
    state_tx: watch::Sender<TaskState>,
    registry: Arc<SubscriptionRegistry<T>>,
    on_settled: Mutex<Option<SettleHook<T>>>,
}

/// Handle to one cancellable invocation of the governed operation.
pub struct TaskInstance<T> {
    inner: Arc<InstanceInner<T>>,
}

impl<T> Clone for TaskInstance<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> TaskInstance<T> {
    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.inner.cell.lock().state
    }

    /// True while the instance has not started.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state() == TaskState::Idle
    }

    /// True while the operation is being driven.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// True once the operation completed with a value.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state() == TaskState::Resolved
    }

    /// True once the operation failed.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state() == TaskState::Rejected
    }

    /// True once the instance was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.state() == TaskState::Canceled
    }

    /// True once any terminal state was reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// The operation's error, present only in `rejected`.
    #[must_use]
    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.inner.cell.lock().error.clone()
    }

    /// Why cancellation was requested, if it was.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.inner.cell.lock().cancel_reason
    }

    /// True only when cancellation came from an explicit external request
    /// rather than from the scheduler superseding this instance.
    #[must_use]
    pub fn is_self_canceled(&self) -> bool {
        self.cancel_reason()
            .is_some_and(CancelReason::is_self_canceled)
    }

    /// The operation's value, present only in `resolved`.
    #[must_use]
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.cell.lock().value.clone()
    }

    /// The terminal outcome, or `None` while the instance is idle or running.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, TaskError>>
    where
        T: Clone,
    {
        let cell = self.inner.cell.lock();
        match cell.state {
            TaskState::Idle | TaskState::Running => None,
            TaskState::Resolved => cell.value.clone().map(Ok),
            TaskState::Rejected => cell
                .error
                .clone()
                .map(|e| Err(TaskError::OperationFailure(e))),
            TaskState::Canceled => Some(Err(match cell.cancel_reason {
                Some(CancelReason::CapacityRejected) => TaskError::CapacityRejected,
                reason => TaskError::Canceled {
                    self_canceled: reason.is_some_and(CancelReason::is_self_canceled),
                },
            })),
        }
    }

    /// Wait until the instance reaches a terminal state and return it.
    ///
    /// By the time this returns, the owning scheduler has already processed the
    /// completion (running set, `last*` references, queue drain).
    pub async fn settled(&self) -> TaskState {
        let mut rx = self.inner.state_tx.subscribe();
        if let Ok(state) = rx.wait_for(|s| s.is_terminal()).await {
            return *state;
        }
        self.state()
    }

    /// Wait for the terminal state and return the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`TaskError`] matching how the instance ended if it did not resolve.
    pub async fn join(&self) -> Result<T, TaskError>
    where
        T: Clone,
    {
        self.settled().await;
        self.outcome()
            .unwrap_or(Err(TaskError::Canceled { self_canceled: false }))
    }

    /// Request cancellation.
    ///
    /// An idle instance becomes `canceled` immediately. A running instance is
    /// canceled cooperatively: the call returns at once and the state changes only
    /// when the operation reaches its next suspension point. Finished instances
    /// ignore the request.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Explicit);
    }

    pub(crate) fn cancel_with(&self, reason: CancelReason) {
        let was_idle = {
            let mut cell = self.inner.cell.lock();
            match cell.state {
                TaskState::Idle => {
                    cell.state = TaskState::Canceled;
                    cell.cancel_reason = Some(reason);
                    true
                }
                TaskState::Running => {
                    cell.cancel_reason.get_or_insert(reason);
                    false
                }
                TaskState::Resolved | TaskState::Rejected | TaskState::Canceled => return,
            }
        };

        if was_idle {
            self.inner.operation.lock().take();
            tracing::debug!("task {} canceled before start ({})", self.id(), reason.as_str());
            self.publish(TaskEvent::Canceled, TaskState::Canceled);
        } else {
            tracing::debug!("task {} cancel requested ({})", self.id(), reason.as_str());
            self.inner.token.cancel();
        }
    }

    pub(crate) fn set_on_settled(&self, hook: SettleHook<T>) {
        *self.inner.on_settled.lock() = Some(hook);
    }

    fn settle(&self, outcome: Outcome<T>) {
        let (event, state) = {
            let mut cell = self.inner.cell.lock();
            if cell.state.is_terminal() {
                return;
            }
            let transition = match outcome {
                Outcome::Resolved(value) => {
                    cell.value = Some(value);
                    (TaskEvent::Succeeded, TaskState::Resolved)
                }
                Outcome::Rejected(error) => {
                    cell.error = Some(Arc::new(error));
                    (TaskEvent::Failed, TaskState::Rejected)
                }
                Outcome::Canceled => {
                    cell.cancel_reason.get_or_insert(CancelReason::Explicit);
                    (TaskEvent::Canceled, TaskState::Canceled)
                }
            };
            cell.state = transition.1;
            transition
        };

        tracing::info!("task {} {}", self.id(), state.as_str());
        self.publish(event, state);
    }

    /// Terminal transitions run the settle hook first, so subscribers read the
    /// owner's updated running set and `last*` references.
    fn publish(&self, event: TaskEvent, state: TaskState) {
        if state.is_terminal() {
            let hook = self.inner.on_settled.lock().take();
            if let Some(hook) = hook {
                hook(self);
            }
        }
        self.inner.registry.notify(event, self);
        self.inner.state_tx.send_replace(state);
    }
}

impl<T: Send + 'static> TaskInstance<T> {
    /// Create an idle instance from a future factory. The factory is called with the
    /// instance's cancellation token when the instance starts.
    pub fn new<F, Fut>(registry: Arc<SubscriptionRegistry<T>>, operation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let boxed: BoxOperation<T> = Box::new(move |token| Box::pin(operation(token)));
        let (state_tx, _) = watch::channel(TaskState::Idle);
        Self {
            inner: Arc::new(InstanceInner {
                id: Uuid::new_v4(),
                token: CancellationToken::new(),
                operation: Mutex::new(Some(boxed)),
                cell: Mutex::new(InstanceCell {
                    state: TaskState::Idle,
                    value: None,
                    error: None,
                    cancel_reason: None,
                }),
                state_tx,
                registry,
                on_settled: Mutex::new(None),
            }),
        }
    }

    /// `idle -> running`: notify `started`, then drive the operation on `spawner`.
    /// Returns false, doing nothing, if the instance is not idle.
    pub(crate) fn start<S: Spawn>(&self, spawner: &S) -> bool {
        {
            let mut cell = self.inner.cell.lock();
            if cell.state != TaskState::Idle {
                return false;
            }
            cell.state = TaskState::Running;
        }
        self.publish(TaskEvent::Started, TaskState::Running);

        let Some(operation) = self.inner.operation.lock().take() else {
            self.settle(Outcome::Rejected(anyhow::anyhow!("operation already consumed")));
            return true;
        };
        let token = self.inner.token.clone();
        let future = operation(token.clone());
        let instance = self.clone();

        spawner.spawn(async move {
            tracing::debug!("driving task {}", instance.id());
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Outcome::Canceled,
                result = AssertUnwindSafe(future).catch_unwind() => match result {
                    _ if token.is_cancelled() => Outcome::Canceled,
                    Ok(Ok(value)) => Outcome::Resolved(value),
                    Ok(Err(error)) => Outcome::Rejected(error),
                    Err(payload) => Outcome::Rejected(anyhow::anyhow!(
                        "operation panicked: {}",
                        panic_message(payload.as_ref())
                    )),
                },
            };
            instance.settle(outcome);
        });
        true
    }
}

impl<T> PartialEq for TaskInstance<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for TaskInstance<T> {}

impl<T> std::fmt::Debug for TaskInstance<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInstance")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("cancel_reason", &self.cancel_reason())
            .finish()
    }
}
