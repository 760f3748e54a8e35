//! Configuration models for scheduling policies.

pub mod policy;

pub use policy::{PolicyConfig, PolicyKind, ENV_MAX_CONCURRENCY, ENV_POLICY};
