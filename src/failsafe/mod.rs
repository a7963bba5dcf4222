//! Failsafe mechanisms for upstream calls

mod retry;

pub use retry::{RetryPolicy, with_retry};
