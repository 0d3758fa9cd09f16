use std::future::Future;

use crate::error::PollResult;

/// Trait for systems that accept one structured record per call.
///
/// [`RecordSink`] implementations define where mapped records go: a telemetry
/// bus, an event stream, or an in-memory buffer for tests. The polling core
/// never constructs or owns the transport behind the sink, it only calls
/// `write` once per mapped row.
///
/// Ownership of the record transfers to the sink on write; the core keeps no
/// buffer of emitted records. Failures must be surfaced through the returned
/// result, since a dropped write would silently lose a source row.
pub trait RecordSink<R> {
    /// Writes a single record to the sink.
    fn write(&self, record: R) -> impl Future<Output = PollResult<()>> + Send;
}
