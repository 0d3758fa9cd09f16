//! Shared configuration types for sqlpoll clients.

mod base;
mod retry;
mod source;

pub use base::ValidationError;
pub use retry::RetryConfig;
pub use source::SourceConfig;
