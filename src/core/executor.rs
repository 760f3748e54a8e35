//! The governed operation trait.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::AppResult;

/// The long-running operation a task property governs.
///
/// Each call to `run(args)` produces one invocation of [`perform`](Self::perform).
/// Every `.await` inside the operation is a suspension point: a cancel request takes
/// effect there and nowhere else. The token is handed over so the operation can also
/// check for cancellation between awaits or pass it to nested work.
///
/// Closures of the shape `Fn(A, CancellationToken) -> impl Future<Output = AppResult<T>>`
/// implement this trait directly.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_task_policy::core::{AppResult, TaskOperation};
/// use tokio_util::sync::CancellationToken;
///
/// struct Embed { model: String }
///
/// #[async_trait]
/// impl TaskOperation<String, Vec<f32>> for Embed {
///     async fn perform(&self, text: String, token: CancellationToken) -> AppResult<Vec<f32>> {
///         let chunks = split(&text);
///         let mut out = Vec::new();
///         for chunk in chunks {
///             if token.is_cancelled() {
///                 break;
///             }
///             out.extend(embed_chunk(&self.model, chunk).await?);
///         }
///         Ok(out)
///     }
/// }
/// ```
#[async_trait]
pub trait TaskOperation<A, T>: Send + Sync + 'static {
    /// Run one invocation with the captured arguments.
    async fn perform(&self, args: A, token: CancellationToken) -> AppResult<T>;
}

#[async_trait]
impl<A, T, F, Fut> TaskOperation<A, T> for F
where
    A: Send + 'static,
    T: Send + 'static,
    F: Fn(A, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    async fn perform(&self, args: A, token: CancellationToken) -> AppResult<T> {
        (self)(args, token).await
    }
}
