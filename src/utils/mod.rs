pub mod retry;
pub mod shutdown;

pub use retry::{retry_with_classifier, RetryConfig, RetryError};
pub use shutdown::{serve_until_signal, wait_for_shutdown, Shutdown};
