//! Policy-driven task scheduler.
//!
//! The scheduler exclusively owns a FIFO queue of pending instances and a running set
//! bounded by `max_concurrency`. Membership changes happen inside
//! [`TaskScheduler::schedule`], [`TaskScheduler::empty_out`], and the completion hook a
//! running instance fires when it reaches a terminal state.
//!
//! The state lives behind a `parking_lot::Mutex` that is never held while an instance
//! transitions, so lifecycle subscribers may call back into the scheduler.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{CancelReason, SchedulerError, TaskInstance, TaskState};
use crate::config::{PolicyConfig, PolicyKind};

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Most recent instance to reach each milestone.
#[derive(Debug)]
pub struct LastInstances<T> {
    /// Most recently scheduled.
    pub called: Option<TaskInstance<T>>,
    /// Most recently started.
    pub started: Option<TaskInstance<T>>,
    /// Most recently resolved.
    pub resolved: Option<TaskInstance<T>>,
    /// Most recently rejected.
    pub rejected: Option<TaskInstance<T>>,
    /// Most recently canceled.
    pub canceled: Option<TaskInstance<T>>,
}

impl<T> Clone for LastInstances<T> {
    fn clone(&self) -> Self {
        Self {
            called: self.called.clone(),
            started: self.started.clone(),
            resolved: self.resolved.clone(),
            rejected: self.rejected.clone(),
            canceled: self.canceled.clone(),
        }
    }
}

impl<T> Default for LastInstances<T> {
    fn default() -> Self {
        Self {
            called: None,
            started: None,
            resolved: None,
            rejected: None,
            canceled: None,
        }
    }
}

struct SchedulerState<T> {
    queue: VecDeque<TaskInstance<T>>,
    running: Vec<TaskInstance<T>>,
    last: LastInstances<T>,
}

impl<T> SchedulerState<T> {
    fn contains(&self, instance: &TaskInstance<T>) -> bool {
        self.running.contains(instance) || self.queue.contains(instance)
    }

    fn remove(&mut self, instance: &TaskInstance<T>) {
        self.running.retain(|ti| ti != instance);
        self.queue.retain(|ti| ti != instance);
    }

    /// Move queue heads into the running set while capacity remains.
    fn drain(&mut self, max_concurrency: usize) -> Vec<TaskInstance<T>> {
        let mut started = Vec::new();
        while self.running.len() < max_concurrency {
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            if next.is_finished() {
                continue;
            }
            self.admit(next.clone());
            started.push(next);
        }
        started
    }

    fn admit(&mut self, instance: TaskInstance<T>) {
        self.last.started = Some(instance.clone());
        self.running.push(instance);
    }
}

/// Transitions decided under the lock and applied after it is released.
struct Actions<T> {
    cancel: Vec<(TaskInstance<T>, CancelReason)>,
    start: Vec<TaskInstance<T>>,
}

impl<T> Actions<T> {
    const fn new() -> Self {
        Self {
            cancel: Vec::new(),
            start: Vec::new(),
        }
    }
}

struct SchedulerInner<T, S> {
    policy: PolicyConfig,
    spawner: S,
    state: Mutex<SchedulerState<T>>,
}

/// Scheduler enforcing a [`PolicyConfig`] over queued and running instances.
pub struct TaskScheduler<T, S> {
    inner: Arc<SchedulerInner<T, S>>,
}

impl<T, S> Clone for TaskScheduler<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> TaskScheduler<T, S> {
    /// The policy this scheduler was built from.
    pub fn policy(&self) -> &PolicyConfig {
        &self.inner.policy
    }

    /// The spawner running instances are driven on.
    pub fn spawner(&self) -> &S {
        &self.inner.spawner
    }

    /// True iff at least one instance is running.
    pub fn is_active(&self) -> bool {
        !self.inner.state.lock().running.is_empty()
    }

    /// Number of running instances.
    pub fn running_len(&self) -> usize {
        self.inner.state.lock().running.len()
    }

    /// Number of queued instances.
    pub fn queued_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Snapshot of the running set, oldest first.
    pub fn running(&self) -> Vec<TaskInstance<T>> {
        self.inner.state.lock().running.clone()
    }

    /// Snapshot of the queue in start order.
    pub fn queued(&self) -> Vec<TaskInstance<T>> {
        self.inner.state.lock().queue.iter().cloned().collect()
    }

    /// Snapshot of the `last*` references.
    pub fn last(&self) -> LastInstances<T> {
        self.inner.state.lock().last.clone()
    }
}

impl<T, S> TaskScheduler<T, S>
where
    T: Send + 'static,
    S: Spawn + Send + Sync + 'static,
{
    /// Build a scheduler from a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the policy fails validation.
    pub fn new(policy: PolicyConfig, spawner: S) -> Result<Self, SchedulerError> {
        policy.validate()?;
        tracing::debug!(
            "scheduler created: policy={} max_concurrency={}",
            policy.kind.as_str(),
            policy.max_concurrency
        );
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                policy,
                spawner,
                state: Mutex::new(SchedulerState {
                    queue: VecDeque::new(),
                    running: Vec::new(),
                    last: LastInstances::default(),
                }),
            }),
        })
    }

    /// Apply the policy to a new instance: start it, queue it, or cancel something.
    pub fn schedule(&self, instance: TaskInstance<T>) {
        if !instance.is_idle() {
            tracing::warn!(
                "task {} not scheduled: already {}",
                instance.id(),
                instance.state().as_str()
            );
            return;
        }
        let max = self.inner.policy.max_concurrency;
        let mut actions = Actions::new();
        {
            let mut state = self.inner.state.lock();
            if state.contains(&instance) {
                tracing::warn!("task {} not scheduled: already held", instance.id());
                return;
            }
            let weak = Arc::downgrade(&self.inner);
            instance.set_on_settled(Arc::new(move |ti: &TaskInstance<T>| {
                if let Some(inner) = Weak::upgrade(&weak) {
                    Self::on_settled(&inner, ti);
                }
            }));
            state.last.called = Some(instance.clone());

            let has_capacity = state.running.len() < max && state.queue.is_empty();
            if has_capacity {
                tracing::info!("task {} started immediately", instance.id());
                state.admit(instance.clone());
                actions.start.push(instance);
            } else {
                match self.inner.policy.kind {
                    PolicyKind::Enqueue => {
                        tracing::debug!("task {} enqueued", instance.id());
                        state.queue.push_back(instance);
                    }
                    PolicyKind::Drop => {
                        tracing::warn!("task {} dropped: at capacity", instance.id());
                        actions
                            .cancel
                            .push((instance, CancelReason::CapacityRejected));
                    }
                    PolicyKind::Restart => {
                        while state.running.len() >= max {
                            let oldest = state.running.remove(0);
                            tracing::debug!("task {} superseded by {}", oldest.id(), instance.id());
                            actions.cancel.push((oldest, CancelReason::Superseded));
                        }
                        tracing::info!("task {} restarted in place", instance.id());
                        state.admit(instance.clone());
                        actions.start.push(instance);
                    }
                    PolicyKind::KeepLatest => {
                        for pending in state.queue.drain(..) {
                            tracing::debug!("queued task {} superseded", pending.id());
                            actions.cancel.push((pending, CancelReason::Superseded));
                        }
                        tracing::debug!("task {} kept as latest", instance.id());
                        state.queue.push_back(instance);
                    }
                }
            }
        }
        self.apply(actions);
    }

    /// Cancel every queued and running instance and leave the scheduler idle.
    ///
    /// Queued instances never start. Running instances leave the running set at once
    /// and reach `canceled` at their next suspension point.
    pub fn empty_out(&self) {
        let mut actions = Actions::new();
        {
            let mut state = self.inner.state.lock();
            for ti in state.queue.drain(..) {
                actions.cancel.push((ti, CancelReason::Aborted));
            }
            for ti in state.running.drain(..) {
                actions.cancel.push((ti, CancelReason::Aborted));
            }
        }
        tracing::info!("scheduler emptied out: {} instances canceled", actions.cancel.len());
        self.apply(actions);
    }

    fn apply(&self, actions: Actions<T>) {
        Self::apply_with(&self.inner, actions);
    }

    fn apply_with(inner: &SchedulerInner<T, S>, actions: Actions<T>) {
        for (ti, reason) in actions.cancel {
            ti.cancel_with(reason);
        }
        for ti in actions.start {
            ti.start(&inner.spawner);
        }
    }

    fn on_settled(inner: &Arc<SchedulerInner<T, S>>, instance: &TaskInstance<T>) {
        let mut actions = Actions::new();
        {
            let mut state = inner.state.lock();
            state.remove(instance);
            match instance.state() {
                TaskState::Resolved => state.last.resolved = Some(instance.clone()),
                TaskState::Rejected => state.last.rejected = Some(instance.clone()),
                TaskState::Canceled => state.last.canceled = Some(instance.clone()),
                TaskState::Idle | TaskState::Running => {}
            }
            actions.start = state.drain(inner.policy.max_concurrency);
        }
        for ti in &actions.start {
            tracing::info!("woke and started task {}", ti.id());
        }
        Self::apply_with(inner, actions);
    }
}

impl<T, S> std::fmt::Debug for TaskScheduler<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TaskScheduler")
            .field("policy", &self.inner.policy)
            .field("running", &state.running.len())
            .field("queued", &state.queue.len())
            .finish()
    }
}
