//! The polling client: connection lifecycle, retrying query execution, and
//! the poll loop driving row mapping and emission.
//!
//! One client owns one logical worker: a single repeating cycle that queries
//! the source for rows newer than the watermark (or synthesizes one in
//! simulation mode), maps and emits every row in source order, advances the
//! watermark, then sleeps for the poll interval. The loop suspends only at
//! the database round-trip and the inter-cycle sleep, and both points observe
//! the shutdown signal so a stop request takes effect within one interval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use sqlpoll_config::shared::{RetryConfig, SourceConfig};

use crate::bail;
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::concurrency::signal::{SignalRx, SignalTx, create_signal};
use crate::error::{ErrorKind, PollResult};
use crate::retry;
use crate::sink::RecordSink;
use crate::source::{MappedRow, TableSource};
use crate::types::{RawRow, Watermark, from_pg_row};

/// One-in-N chance per cycle that simulation mode synthesizes a row.
///
/// Produces an irregular, realistic event cadence without a live database.
const SIMULATION_EMIT_ONE_IN: u64 = 6;

/// A polling client for one SQL data source.
///
/// Generic over the source (schema-specific query/mapping/simulation) and the
/// sink (where mapped records go). All state is in-memory for the process
/// lifetime; in particular the watermark starts at "now" on every start, so
/// rows older than client construction are never emitted.
pub struct PollClient<S, K> {
    config: Arc<SourceConfig>,
    retry_config: RetryConfig,
    source: S,
    sink: K,
    simulation_mode: bool,
    resolved_uri: SecretString,
    pool: Option<PgPool>,
    watermark: Watermark,
    rng: StdRng,
    wrote_tx: SignalTx,
    shutdown_tx: ShutdownTx,
    shutdown_rx: ShutdownRx,
}

impl<S, K> PollClient<S, K>
where
    S: TableSource,
    K: RecordSink<S::Record>,
{
    /// Creates a new polling client.
    ///
    /// Both configurations are validated here and the connection URI template
    /// is resolved against the process environment exactly once, before any
    /// connection attempt. Fails with a config error on invalid input;
    /// configuration errors are fatal and never retried.
    pub fn new(
        config: SourceConfig,
        retry_config: RetryConfig,
        source: S,
        sink: K,
        simulation_mode: bool,
    ) -> PollResult<Self> {
        config.validate()?;
        retry_config.validate()?;

        let resolved_uri = config.resolved_uri();
        let (wrote_tx, _) = create_signal();
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

        Ok(Self {
            config: Arc::new(config),
            retry_config,
            source,
            sink,
            simulation_mode,
            resolved_uri,
            pool: None,
            watermark: Watermark::now(),
            rng: StdRng::from_entropy(),
            wrote_tx,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Replaces the simulation RNG with one seeded from `seed`.
    ///
    /// Simulation draws become deterministic, which is what test harnesses
    /// want when asserting on emission cadence.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// A descriptive string identifying the configured connection target.
    ///
    /// Returns the unresolved URI template: the resolved URI may embed
    /// credentials pulled from the environment and is never exposed.
    pub fn descr(&self) -> &str {
        &self.config.db_uri
    }

    /// The current watermark value.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark.get()
    }

    /// Returns a receiver signaled every time a record is emitted.
    pub fn subscribe_written(&self) -> SignalRx {
        self.wrote_tx.subscribe()
    }

    /// Returns a transmitter for requesting shutdown of this client's loop.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Establishes the database engine handle.
    ///
    /// A no-op in simulation mode. The pool is created lazily: no connection
    /// is opened until the first query acquires one, with the configured
    /// connect timeout applied at acquisition.
    pub async fn connect(&mut self) -> PollResult<()> {
        debug!(source = self.source.name(), "PollClient::connect()");

        if self.simulation_mode {
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .acquire_timeout(self.config.connect_timeout())
            .connect_lazy(self.resolved_uri.expose_secret())?;
        self.pool = Some(pool);

        Ok(())
    }

    /// Releases all pooled resources.
    ///
    /// Safe to call at any time, any number of times: without a handle this
    /// is a no-op, and closing tolerates connections already dropped by a
    /// cancelled in-flight query.
    pub async fn disconnect(&mut self) {
        debug!(source = self.source.name(), "PollClient::disconnect()");

        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }

    /// Runs one query attempt with bounded retry, returning all rows newer
    /// than the watermark, or `None` when shutdown interrupted the attempt.
    ///
    /// Transient failures (connection or pool level) are retried with
    /// exponential jittered backoff up to the configured attempt cap; other
    /// failures, and the last failure of an exhausted retry sequence,
    /// propagate unmodified. The in-flight query and the backoff sleeps
    /// observe the shutdown signal, so a stop request never waits for a hung
    /// query or a pending backoff.
    async fn execute_query(&mut self) -> PollResult<Option<Vec<RawRow>>> {
        let Some(pool) = self.pool.as_ref() else {
            bail!(
                ErrorKind::NotConnected,
                "not connected",
                format!(
                    "no database handle for source '{}', call connect() before polling",
                    self.source.name()
                )
            );
        };

        let sql = self.source.query();
        let newer_than = self.watermark.get();

        retry::with_backoff(
            &self.retry_config,
            &mut self.shutdown_rx,
            |err| err.kind().retryable(),
            || async {
                let rows = sqlx::query(&sql)
                    .bind(newer_than)
                    .fetch_all(pool)
                    .await?;

                rows.iter().map(from_pg_row).collect()
            },
        )
        .await
    }

    /// Maps one raw row, emits the record, and advances the watermark.
    ///
    /// The watermark only moves after the sink has accepted the record, so a
    /// failed emission leaves the row eligible for the next query. Mapping
    /// and emission failures propagate; a malformed row must not silently
    /// disappear.
    async fn process_row(&mut self, row: RawRow) -> PollResult<()> {
        let MappedRow {
            source_timestamp,
            record,
        } = self.source.map_row(&row)?;

        self.sink.write(record).await?;

        if self.watermark.advance(source_timestamp) {
            debug!(watermark = %source_timestamp, "watermark advanced");
        }

        // Wake up anyone waiting for evidence of liveness.
        let _ = self.wrote_tx.send(());

        Ok(())
    }

    /// One poll cycle: query (or synthesize), map and emit, then sleep.
    ///
    /// Rows are processed in the order the query returns them. Both
    /// suspension points are cancellable: a shutdown request during the
    /// database round-trip (including retry backoff) or during the
    /// inter-cycle sleep returns control immediately, and is not an error.
    pub async fn read_data(&mut self) -> PollResult<()> {
        if !self.simulation_mode {
            // An interrupted query means shutdown was requested; the loop
            // observes it before the next cycle.
            let Some(rows) = self.execute_query().await? else {
                return Ok(());
            };

            if !rows.is_empty() {
                debug!(
                    rows = rows.len(),
                    source = self.source.name(),
                    "query returned new rows"
                );
            }

            for row in rows {
                self.process_row(row).await?;
            }
        } else if self.rng.gen_range(1..=SIMULATION_EMIT_ONE_IN) == SIMULATION_EMIT_ONE_IN {
            let row = self.source.simulated_row();
            self.process_row(row).await?;
        }

        let interval = self.config.poll_interval();
        tokio::select! {
            _ = sleep(interval) => {}
            _ = self.shutdown_rx.wait_for_shutdown() => {
                debug!(source = self.source.name(), "sleep interrupted by shutdown");
            }
        }

        Ok(())
    }

    /// Connects, polls until shutdown or failure, then disconnects.
    ///
    /// The handle is released on every exit path, including cycle failures.
    /// Shutdown is observed between cycles and during the sleep, never
    /// reported as an error.
    pub async fn run(mut self) -> PollResult<()> {
        info!(
            source = self.source.name(),
            descr = %self.descr(),
            simulation_mode = self.simulation_mode,
            "starting poll client"
        );

        let result = match self.connect().await {
            Ok(()) => self.poll_loop().await,
            Err(err) => Err(err),
        };

        self.disconnect().await;

        match &result {
            Ok(()) => info!(source = self.source.name(), "poll client stopped"),
            Err(err) => error!(
                source = self.source.name(),
                error = %err,
                "poll client failed"
            ),
        }

        result
    }

    async fn poll_loop(&mut self) -> PollResult<()> {
        loop {
            if self.shutdown_rx.is_shutdown() {
                info!(source = self.source.name(), "poll client shutting down");
                return Ok(());
            }

            self.read_data().await?;
        }
    }

    /// Starts the client in a background task.
    ///
    /// Returns a handle that can stop the loop and wait for its completion.
    pub fn start(self) -> PollClientHandle
    where
        S: Send + Sync + 'static,
        K: Send + Sync + 'static,
    {
        let shutdown_tx = self.shutdown_tx.clone();
        let join_handle = tokio::spawn(self.run());

        PollClientHandle {
            join_handle,
            shutdown_tx,
        }
    }
}

/// Handle to a running poll client.
#[derive(Debug)]
pub struct PollClientHandle {
    join_handle: JoinHandle<PollResult<()>>,
    shutdown_tx: ShutdownTx,
}

impl PollClientHandle {
    /// Requests shutdown of the poll loop.
    ///
    /// The loop exits within one poll interval. Failing to send only happens
    /// when the loop has already terminated, which is not worth surfacing.
    pub fn shutdown(&self) {
        if self.shutdown_tx.shutdown().is_err() {
            debug!("poll client already terminated, nothing to shut down");
        }
    }

    /// Waits for the poll client to complete.
    ///
    /// Returns `Ok(())` on graceful shutdown, or the cycle failure that
    /// stopped the loop.
    pub async fn wait(self) -> PollResult<()> {
        match self.join_handle.await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "poll client task panicked");
                Err(crate::poll_error!(
                    ErrorKind::Unknown,
                    "poll client task panicked",
                    err
                ))
            }
        }
    }

    /// Requests shutdown and waits for the loop to finish.
    pub async fn shutdown_and_wait(self) -> PollResult<()> {
        self.shutdown();
        self.wait().await
    }
}
