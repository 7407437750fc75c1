use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Wraps a future to catch panics and convert them to errors.
///
/// Gateway calls run in spawned tasks. Without this a panicking adapter
/// would make its task vanish, and the owner would wait forever for a
/// completion event that never comes.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic payload".to_string()
            }
        })
}
