//! Concurrency primitives for coordinating the poll loop with its host.
//!
//! The [`shutdown`] module implements the broadcast stop signal observed by
//! the poll loop at its suspension points, and [`signal`] provides the
//! lightweight notification channel used to report record emissions to
//! waiters such as liveness checks in tests.

pub mod shutdown;
pub mod signal;
