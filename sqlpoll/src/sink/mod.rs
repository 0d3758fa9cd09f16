//! Emission sinks for mapped records.

pub mod base;
pub mod memory;

pub use base::RecordSink;
pub use memory::MemorySink;
