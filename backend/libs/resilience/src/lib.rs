/// Resilience patterns for flaky external collaborators
///
/// Currently provides **Retry**: exponential backoff with jitter and a
/// fixed attempt budget, carrying the last error out on exhaustion.
///
/// # Example: HTTP lookup with retry
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::default();
///
///     let result = with_retry(&config, || async {
///         // Your HTTP call here
///         Ok::<_, String>(())
///     }).await;
/// }
/// ```
pub mod retry;

// Re-export main types for convenience
pub use retry::{with_retry, RetryConfig, RetryExhausted};
