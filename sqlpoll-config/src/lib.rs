//! Configuration types for sqlpoll clients.
//!
//! All configuration is validated once, at construction time, and is immutable
//! afterwards. Connection URI templates may embed `{NAME}` placeholders that
//! are resolved from the process environment during validation.

pub mod shared;
