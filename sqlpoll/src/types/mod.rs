//! Common types used throughout the polling core.

mod row;
mod watermark;

pub use row::*;
pub use watermark::*;
