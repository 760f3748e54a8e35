//! # Prometheus Task Policy
//!
//! A policy-driven scheduler for long-running, cancellable operations.
//!
//! A caller repeatedly invokes the same operation (an agent step, a search request, a
//! model warm-up). When invocations overlap, a concurrency policy decides what happens
//! to the newcomer: queue it, drop it, cancel the current one in favour of it, or keep
//! only the most recent pending one.
//!
//! ## Building Blocks
//!
//! - **Task Instance**: one invocation of the operation, with a small state machine
//!   (`idle`, `running`, `resolved`, `rejected`, `canceled`) and cooperative cancellation
//! - **Task Scheduler**: owns a FIFO queue and a bounded running set and applies the policy
//! - **Policy Configuration**: immutable `PolicyConfig` built with chainable calls
//! - **Subscription Registry**: ordered lifecycle callbacks with fault isolation
//! - **Task Property**: the caller-facing surface (`run`, `abort`, `last*` references)
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_task_policy::builders::TaskPropertyBuilder;
//! use prometheus_task_policy::runtime::TokioSpawner;
//! use tokio_util::sync::CancellationToken;
//!
//! let search = TaskPropertyBuilder::new(|query: String, _token: CancellationToken| async move {
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     Ok(format!("results for {query}"))
//! })
//! .restart()
//! .on_success(|ti| {
//!     tracing::info!("search {} finished", ti.id());
//!     Ok(())
//! })
//! .build(TokioSpawner::new(tokio::runtime::Handle::current()))?;
//!
//! search.run("rust".to_string());
//! let latest = search.run("rust scheduler".to_string());
//! assert_eq!(latest.join().await?, "results for rust scheduler");
//! ```
//!
//! For complete examples, see:
//! - `tests/policy_scheduling_test.rs` - one scenario per policy
//! - `tests/task_property_test.rs` - the caller-facing surface

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task instances, the scheduler, and lifecycle notification.
pub mod core;
/// Policy configuration models.
pub mod config;
/// Builders to construct task properties from configuration.
pub mod builders;
/// Runtime adapters and the caller-facing surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
