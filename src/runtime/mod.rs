//! Runtime adapters and the caller-facing task surface.

pub mod api;
pub mod property;
pub mod tokio_spawner;
pub mod trigger;

pub use api::{InstanceSummary, PropertySnapshot};
pub use property::{PropertyState, TaskProperty};
pub use tokio_spawner::TokioSpawner;
pub use trigger::{bind_watch, bind_watch_immediate, TriggerHandle};
