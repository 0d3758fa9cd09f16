pub mod client;
pub mod concurrency;
pub mod error;
mod macros;
pub mod retry;
pub mod sink;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

// Re-export the configuration crate so hosts only depend on `sqlpoll`.
pub use sqlpoll_config::shared as config;
