use chrono::{DateTime, Utc};

use crate::error::PollResult;
use crate::types::RawRow;

/// One mapped row: the output record plus the source timestamp that produced it.
///
/// The poll client advances its watermark to the maximum of its current value
/// and `source_timestamp` once the record has been accepted by the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow<R> {
    /// Timestamp of the source row, in the source's time reference.
    pub source_timestamp: DateTime<Utc>,
    /// The structured record to emit.
    pub record: R,
}

/// Trait for one polled SQL data source.
///
/// A [`TableSource`] describes everything schema-specific about a source: how
/// to ask for rows newer than the watermark, how to turn one raw row into an
/// output record, and what a representative synthetic row looks like. The
/// generic polling engine supplies the rest: connection lifecycle, retries,
/// watermark bookkeeping, and emission.
///
/// Implementations are plain small structs; they hold the table name and any
/// per-source constants, nothing more.
pub trait TableSource {
    /// The output record type emitted for this source.
    type Record: Send + 'static;

    /// Short name of this source, used in logs.
    fn name(&self) -> &'static str;

    /// Returns the parameterized query for "rows newer than the watermark".
    ///
    /// The statement must select all rows from the configured table whose
    /// watermark column is strictly greater than `$1`, ordered by that column
    /// ascending so rows are processed in source-timestamp order. Pure text
    /// construction; nothing is executed here.
    fn query(&self) -> String;

    /// Converts one raw row into an output record and its source timestamp.
    ///
    /// Source-specific unit and scale conversion lives here. Pure function:
    /// emission and watermark advancement are performed by the poll client
    /// after this returns. A malformed row must fail the conversion rather
    /// than silently disappear.
    fn map_row(&self, row: &RawRow) -> PollResult<MappedRow<Self::Record>>;

    /// Returns one fully-populated synthetic row with the current wall-clock
    /// time as its timestamp.
    ///
    /// Only used in simulation mode, to exercise the full mapping and
    /// emission path without a live database.
    fn simulated_row(&self) -> RawRow;
}
