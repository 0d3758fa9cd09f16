//! Source extension points and concrete data sources.

pub mod base;
pub mod ringss;

pub use base::{MappedRow, TableSource};
pub use ringss::{RingssMeasurement, RingssSource};
