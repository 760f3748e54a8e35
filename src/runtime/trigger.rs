//! Auto-trigger bindings.
//!
//! A binding watches an external signal and calls [`TaskProperty::run`] on every change,
//! subject to the property's policy like any manual call. The scheduler knows nothing
//! about the signal.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::Spawn;
use crate::runtime::TaskProperty;

/// Keeps a binding attached. Dropping the handle detaches it.
#[derive(Debug)]
pub struct TriggerHandle {
    token: CancellationToken,
}

impl TriggerHandle {
    /// Detach the binding. Instances it already started are unaffected.
    pub fn stop(self) {
        self.token.cancel();
    }

    /// True once the binding stopped listening.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Run `property` with `map(&value)` every time `signal` changes.
///
/// The binding stops when the handle is dropped or when every sender of `signal`
/// is gone.
pub fn bind_watch<A, T, S, V, M>(
    property: &TaskProperty<A, T, S>,
    signal: watch::Receiver<V>,
    map: M,
) -> TriggerHandle
where
    A: Send + 'static,
    T: Send + 'static,
    S: Spawn + Send + Sync + 'static,
    V: Send + Sync + 'static,
    M: Fn(&V) -> A + Send + 'static,
{
    attach(property, signal, map)
}

/// Like [`bind_watch`], but also runs once right away with the current value.
pub fn bind_watch_immediate<A, T, S, V, M>(
    property: &TaskProperty<A, T, S>,
    mut signal: watch::Receiver<V>,
    map: M,
) -> TriggerHandle
where
    A: Send + 'static,
    T: Send + 'static,
    S: Spawn + Send + Sync + 'static,
    V: Send + Sync + 'static,
    M: Fn(&V) -> A + Send + 'static,
{
    let args = map(&signal.borrow_and_update());
    property.run(args);
    attach(property, signal, map)
}

fn attach<A, T, S, V, M>(
    property: &TaskProperty<A, T, S>,
    mut signal: watch::Receiver<V>,
    map: M,
) -> TriggerHandle
where
    A: Send + 'static,
    T: Send + 'static,
    S: Spawn + Send + Sync + 'static,
    V: Send + Sync + 'static,
    M: Fn(&V) -> A + Send + 'static,
{
    let token = CancellationToken::new();
    let stop = token.clone();
    let runner = property.clone();

    property.scheduler().spawner().spawn(async move {
        loop {
            let changed = tokio::select! {
                biased;
                () = stop.cancelled() => false,
                result = signal.changed() => result.is_ok(),
            };
            if !changed {
                break;
            }
            let args = map(&signal.borrow_and_update());
            let ti = runner.run(args);
            tracing::debug!("{}: signal changed, triggered task {}", runner.name(), ti.id());
        }
        tracing::debug!("{}: trigger detached", runner.name());
    });

    TriggerHandle { token }
}
