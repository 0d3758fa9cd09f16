use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::PollResult;
use crate::sink::base::RecordSink;

/// In-memory sink for testing and development purposes.
///
/// [`MemorySink`] stores every written record in memory, making it ideal for
/// asserting on poll-loop behavior without a live telemetry transport. Clones
/// share the same storage, so a clone kept by a test observes everything the
/// client writes.
#[derive(Debug)]
pub struct MemorySink<R> {
    records: Arc<Mutex<Vec<R>>>,
}

impl<R> MemorySink<R> {
    /// Creates a new empty memory sink.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a copy of all records written to this sink so far.
    pub async fn records(&self) -> Vec<R>
    where
        R: Clone,
    {
        let records = self.records.lock().await;
        records.clone()
    }

    /// Returns the number of records written to this sink so far.
    pub async fn len(&self) -> usize {
        let records = self.records.lock().await;
        records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clears all stored records.
    pub async fn clear(&self) {
        let mut records = self.records.lock().await;
        records.clear();
    }
}

impl<R> Default for MemorySink<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for MemorySink<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R: std::fmt::Debug + Send> RecordSink<R> for MemorySink<R> {
    async fn write(&self, record: R) -> PollResult<()> {
        let mut records = self.records.lock().await;

        debug!(record = ?record, "storing record in memory sink");
        records.push(record);

        Ok(())
    }
}
