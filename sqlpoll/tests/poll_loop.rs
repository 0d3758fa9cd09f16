//! End-to-end tests of the poll loop in simulation mode.
//!
//! Simulation mode exercises the whole client (lifecycle, poll cycles,
//! mapping, emission, watermark, and shutdown) without a live database.

use std::time::{Duration, Instant};

use sqlpoll::client::PollClient;
use sqlpoll::config::{RetryConfig, SourceConfig};
use sqlpoll::sink::MemorySink;
use sqlpoll::source::{RingssMeasurement, RingssSource};
use tokio::time::{sleep, timeout};

fn sim_config(poll_interval_secs: f64) -> SourceConfig {
    SourceConfig {
        db_uri: "postgres://{SQLPOLL_ITEST_USER}@localhost/soar".to_string(),
        table_name: "ringss".to_string(),
        poll_interval_secs,
        max_read_timeouts: SourceConfig::DEFAULT_MAX_READ_TIMEOUTS,
        connect_timeout_secs: SourceConfig::DEFAULT_CONNECT_TIMEOUT_SECS,
    }
}

fn sim_client(
    poll_interval_secs: f64,
    seed: u64,
    sink: MemorySink<RingssMeasurement>,
) -> PollClient<RingssSource, MemorySink<RingssMeasurement>> {
    let config = sim_config(poll_interval_secs);
    let source = RingssSource::new(&config);

    PollClient::new(config, RetryConfig::default(), source, sink, true)
        .expect("simulation client config is valid")
        .with_rng_seed(seed)
}

#[tokio::test]
async fn simulation_mode_emits_through_full_mapping_path() {
    let sink = MemorySink::new();
    let client = sim_client(0.005, 42, sink.clone());

    let mut written = client.subscribe_written();
    let handle = client.start();

    // Roughly one emission every six cycles of 5ms; ten seconds is plenty.
    timeout(Duration::from_secs(10), written.changed())
        .await
        .expect("expected at least one emission within ten seconds")
        .expect("written signal channel stays open while the client runs");

    handle.shutdown_and_wait().await.unwrap();

    let records = sink.records().await;
    assert!(!records.is_empty());

    // Synthetic rows go through the same mapping path as live rows, so the
    // emitted records carry the mapped and rescaled reference values.
    for record in &records {
        assert_eq!(record.hr_num, 1234);
        assert_eq!(record.zenith_distance, 10.0);
        assert_eq!(record.fwhm_scintillation, 0.8);
        assert!((record.turbulence_profiles[0] - 2.2e-13).abs() < 1e-20);
    }

    // Simulated timestamps are wall-clock, so emissions are time-ordered.
    let timestamps: Vec<_> = records.iter().map(|r| r.timestamp).collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn graceful_stop_within_one_poll_interval() {
    let sink = MemorySink::new();
    let client = sim_client(0.2, 7, sink.clone());
    let handle = client.start();

    // Let the loop settle into an inter-cycle sleep.
    sleep(Duration::from_millis(50)).await;

    let stopping = Instant::now();
    handle.shutdown_and_wait().await.unwrap();
    assert!(
        stopping.elapsed() < Duration::from_millis(400),
        "stop took {:?}, expected well under two poll intervals",
        stopping.elapsed()
    );

    // Nothing is emitted after the loop has exited.
    let emitted_at_stop = sink.len().await;
    sleep(Duration::from_millis(600)).await;
    assert_eq!(sink.len().await, emitted_at_stop);
}

#[tokio::test(start_paused = true)]
async fn emission_spacing_is_a_whole_number_of_poll_intervals() {
    let sink = MemorySink::new();
    let mut client = sim_client(1.0, 42, sink.clone());

    // Drive the cycles directly; under the paused clock each inter-cycle
    // sleep advances time by exactly one poll interval.
    let start = tokio::time::Instant::now();
    let mut emitted_at = Vec::new();
    let mut seen = 0;
    for _ in 0..120 {
        client.read_data().await.unwrap();

        let emitted = sink.len().await;
        if emitted > seen {
            seen = emitted;
            emitted_at.push(start.elapsed());
        }
    }

    // Roughly one emission every six one-second cycles.
    assert!(
        emitted_at.len() >= 10,
        "expected at least 10 emissions over 120 cycles, got {}",
        emitted_at.len()
    );

    // Emissions only happen at cycle boundaries, so consecutive emissions
    // are spaced by whole multiples of the poll interval.
    for pair in emitted_at.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_secs(1), "gap {gap:?} below one interval");
        assert_eq!(
            gap.as_millis() % 1_000,
            0,
            "gap {gap:?} is not a whole number of poll intervals"
        );
    }
}

#[tokio::test]
async fn shutdown_interrupts_retry_backoff() {
    // Connection refusal on an unreachable port classifies as transient, so
    // the loop lands in the retry backoff. With a one minute minimum backoff
    // the stop below only succeeds if the backoff sleep observes shutdown.
    let config = SourceConfig {
        db_uri: "postgres://localhost:1/unreachable".to_string(),
        table_name: "ringss".to_string(),
        poll_interval_secs: 1.0,
        max_read_timeouts: SourceConfig::DEFAULT_MAX_READ_TIMEOUTS,
        connect_timeout_secs: 1,
    };
    let retry_config = RetryConfig {
        max_attempts: 2,
        min_backoff_ms: 60_000,
        max_backoff_ms: 120_000,
        jitter_percent: 0,
    };
    let source = RingssSource::new(&config);
    let client: PollClient<_, MemorySink<RingssMeasurement>> =
        PollClient::new(config, retry_config, source, MemorySink::new(), false).unwrap();

    let handle = client.start();

    // Let the first attempt fail and the backoff sleep begin.
    sleep(Duration::from_millis(500)).await;

    timeout(Duration::from_secs(5), handle.shutdown_and_wait())
        .await
        .expect("shutdown should take effect during the retry backoff")
        .unwrap();
}

#[tokio::test]
async fn lazy_connect_and_idempotent_disconnect() {
    let config = SourceConfig {
        db_uri: "postgres://localhost:1/unreachable".to_string(),
        table_name: "ringss".to_string(),
        poll_interval_secs: 1.0,
        max_read_timeouts: SourceConfig::DEFAULT_MAX_READ_TIMEOUTS,
        connect_timeout_secs: 1,
    };
    let source = RingssSource::new(&config);
    let mut client: PollClient<_, MemorySink<RingssMeasurement>> =
        PollClient::new(config, RetryConfig::default(), source, MemorySink::new(), false)
            .unwrap();

    // The pool is created lazily; no connection is opened yet, so connecting
    // to an unreachable server still succeeds here.
    client.connect().await.unwrap();

    // Disconnect releases the handle and tolerates repeated teardown.
    client.disconnect().await;
    client.disconnect().await;
}
