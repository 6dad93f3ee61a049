//! Coordinator orchestration: split the input, seed the task queue,
//! accept worker connections while work remains, dispatch each one into a
//! bounded session pool, then aggregate and persist the final mapping.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::aggregate::ResultAggregator;
use crate::session::{self, Outcome};
use crate::splitter::{self, Segment};
use crate::task_queue::TaskQueue;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub input: PathBuf,
    pub output: PathBuf,
    pub chunk_size: usize,
    pub max_retries: u32,
    pub receive_timeout: Duration,
    pub max_sessions: usize,
}

/// What a finished run produced, plus the accounting for the summary.
#[derive(Debug)]
pub struct RunReport {
    pub totals: HashMap<String, u64>,
    pub total_segments: usize,
    pub succeeded: usize,
    pub failed: BTreeMap<u64, String>,
}

impl RunReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub async fn run(config: Config) -> Result<()> {
    let input = File::open(&config.input)
        .with_context(|| format!("failed to open input file {}", config.input.display()))?;
    let segments = splitter::split_lines(BufReader::new(input), config.chunk_size)
        .with_context(|| format!("failed to split {}", config.input.display()))?;
    ensure!(
        !segments.is_empty(),
        "input file {} holds no data to distribute",
        config.input.display()
    );
    info!(
        segments = segments.len(),
        chunk_size = config.chunk_size,
        "input split"
    );

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!("coordinator listening on {}", listener.local_addr()?);

    let report = execute(listener, segments, &config).await?;

    let output = File::create(&config.output)
        .with_context(|| format!("failed to create output file {}", config.output.display()))?;
    serde_json::to_writer_pretty(output, &report.totals)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    info!(
        succeeded = report.succeeded,
        failed = report.failed.len(),
        total = report.total_segments,
        output = %config.output.display(),
        "final result written"
    );
    if report.is_partial() {
        warn!(
            failed = ?report.failed,
            "output reflects a partial result"
        );
    }
    Ok(())
}

/// Drive the accept loop until the queue is exhausted, then join every
/// dispatched session and assemble the report.
pub async fn execute(
    listener: TcpListener,
    segments: Vec<Segment>,
    config: &Config,
) -> Result<RunReport> {
    let total_segments = segments.len();
    let queue = Arc::new(TaskQueue::new(segments, config.max_retries));
    let results = Arc::new(Mutex::new(ResultAggregator::default()));
    let limiter = Arc::new(Semaphore::new(config.max_sessions));
    let mut sessions: JoinSet<()> = JoinSet::new();

    // Exhaustion is re-evaluated on every iteration and the queue fires a
    // wakeup on every transition, so the loop neither exits while a
    // requeued segment is still pending nor spins while sessions run.
    while !queue.is_exhausted().await {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(%err, "failed to accept connection");
                        continue;
                    }
                };
                let permit = limiter
                    .clone()
                    .acquire_owned()
                    .await
                    .context("session limiter closed")?;
                sessions.spawn(handle_connection(
                    stream,
                    peer,
                    queue.clone(),
                    results.clone(),
                    config.receive_timeout,
                    permit,
                ));
            }
            _ = queue.changed() => {}
        }
    }
    drop(listener);

    // Sessions spawned for retries live in the same set, so this join
    // covers them as well as the initial dispatches.
    while let Some(joined) = sessions.join_next().await {
        if let Err(err) = joined {
            warn!(%err, "session task aborted");
        }
    }

    let stats = queue.stats().await;
    let totals = std::mem::take(&mut *results.lock().await).into_totals();

    if stats.completed == 0 || (totals.is_empty() && !stats.failed.is_empty()) {
        bail!(
            "no segment produced a result ({} of {} permanently failed); aborting without output",
            stats.failed.len(),
            stats.total
        );
    }

    Ok(RunReport {
        totals,
        total_segments,
        succeeded: stats.completed,
        failed: stats.failed,
    })
}

/// One accepted connection: claim a segment, run the exchange, conclude
/// the lease. Every per-session error ends in `fail`; nothing propagates.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    queue: Arc<TaskQueue>,
    results: Arc<Mutex<ResultAggregator>>,
    deadline: Duration,
    _permit: OwnedSemaphorePermit,
) {
    let Some(lease) = queue.try_claim().await else {
        // Idle-worker rejection: dropping the stream closes it and no
        // shared state was touched.
        debug!(%peer, "no pending work, closing connection");
        return;
    };

    info!(
        %peer,
        segment = lease.segment.id,
        attempt = lease.attempt,
        bytes = lease.segment.size(),
        "segment assigned"
    );

    match session::exchange(stream, &lease.segment.payload, deadline).await {
        Outcome::Success(partial) => {
            // Absorb and complete are one commit: nothing fallible runs
            // between them, so a counted segment can never be requeued.
            results.lock().await.absorb(partial);
            queue.complete(lease).await;
        }
        Outcome::Failure(reason) => queue.fail(lease, &reason).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use common::codec::{self, ResultMessage, SegmentMessage};
    use common::error::ExchangeError;
    use tokio::io::BufReader;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::time::sleep;

    fn test_config(receive_timeout: Duration) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            input: PathBuf::new(),
            output: PathBuf::new(),
            chunk_size: 6,
            max_retries: 3,
            receive_timeout,
            max_sessions: 4,
        }
    }

    /// Pull the next assignment, reconnecting through idle rejections.
    /// Returns `None` once the coordinator has stopped listening.
    async fn next_assignment(
        addr: SocketAddr,
    ) -> Option<(BufReader<OwnedReadHalf>, OwnedWriteHalf, String)> {
        loop {
            let stream = match TcpStream::connect(addr).await {
                Ok(stream) => stream,
                Err(_) => return None,
            };
            let (read_half, write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            match codec::read_message::<_, SegmentMessage>(&mut reader).await {
                Ok(message) => return Some((reader, write_half, message.segment)),
                Err(ExchangeError::Closed | ExchangeError::Connection(_)) => {
                    sleep(Duration::from_millis(10)).await;
                }
                Err(err) => panic!("unexpected wire error: {err}"),
            }
        }
    }

    async fn reply_word_counts(mut write_half: OwnedWriteHalf, payload: &str) {
        let result = workload::word_count::map(payload, "");
        codec::write_message(&mut write_half, &ResultMessage { result })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn retried_segment_counts_exactly_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = test_config(Duration::from_millis(200));
        let segments = splitter::split_lines("a a b\nb b c\n".as_bytes(), 6).unwrap();
        let run = tokio::spawn(async move { execute(listener, segments, &config).await });

        let mut stalled_once = false;
        while let Some((reader, write_half, payload)) = next_assignment(addr).await {
            if payload == "b b c\n" && !stalled_once {
                stalled_once = true;
                // Hold the connection past the deadline without replying,
                // then vanish; the coordinator must requeue the segment.
                tokio::spawn(async move {
                    sleep(Duration::from_millis(800)).await;
                    drop((reader, write_half));
                });
                continue;
            }
            reply_word_counts(write_half, &payload).await;
        }

        let report = run.await.unwrap().unwrap();
        assert!(stalled_once);
        assert_eq!(report.succeeded, 2);
        assert!(report.failed.is_empty());
        assert_eq!(report.totals["a"], 2);
        assert_eq!(report.totals["b"], 3);
        assert_eq!(report.totals["c"], 1);
        assert_eq!(report.totals.len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_exclude_segment_from_result() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Config {
            max_retries: 2,
            chunk_size: 4,
            ..test_config(Duration::from_millis(200))
        };
        let segments = splitter::split_lines("x x\ny y\n".as_bytes(), 4).unwrap();
        let run = tokio::spawn(async move { execute(listener, segments, &config).await });

        while let Some((reader, write_half, payload)) = next_assignment(addr).await {
            if payload == "y y\n" {
                // Crash on every attempt; the segment must end up failed.
                drop((reader, write_half));
                continue;
            }
            reply_word_counts(write_half, &payload).await;
        }

        let report = run.await.unwrap().unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed.contains_key(&1));
        assert_eq!(
            report.succeeded + report.failed.len(),
            report.total_segments
        );
        assert_eq!(report.totals["x"], 2);
        assert!(!report.totals.contains_key("y"));
        assert!(report.is_partial());
    }

    #[tokio::test]
    async fn total_loss_aborts_the_run() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Config {
            max_retries: 1,
            ..test_config(Duration::from_millis(200))
        };
        let segments = splitter::split_lines("only\n".as_bytes(), 16).unwrap();
        let run = tokio::spawn(async move { execute(listener, segments, &config).await });

        while let Some((reader, write_half, _payload)) = next_assignment(addr).await {
            drop((reader, write_half));
        }

        assert!(run.await.unwrap().is_err());
    }
}
