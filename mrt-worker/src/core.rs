//! The worker's pull loop: one connection per segment.
//!
//! Each connection carries exactly one exchange — read the assignment,
//! map it, reply — and the coordinator signals "no work left" by closing
//! the connection before sending a frame.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use common::codec::{self, ResultMessage, SegmentMessage};
use common::error::ExchangeError;
use common::Workload;
use tracing::{debug, info};

pub struct Config {
    pub address: String,
    pub aux: String,
    pub connect_timeout: Duration,
    pub delay: Duration,
}

pub async fn run(config: Config, workload: Workload) -> Result<()> {
    let mut processed = 0usize;

    loop {
        let connected = timeout(config.connect_timeout, TcpStream::connect(&config.address))
            .await
            .map_err(|_| anyhow!("connection attempt timed out"))
            .and_then(|stream| stream.map_err(Into::into));
        let stream = match connected {
            Ok(stream) => stream,
            Err(err) if processed > 0 => {
                info!(%err, "coordinator is gone, shutting down");
                break;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to reach coordinator at {}", config.address)
                })
            }
        };

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let assignment: SegmentMessage = match codec::read_message(&mut reader).await {
            Ok(message) => message,
            Err(ExchangeError::Closed) => {
                info!("no work left, shutting down");
                break;
            }
            Err(err) => return Err(err).context("failed to read assignment"),
        };
        debug!(bytes = assignment.segment.len(), "segment received");

        let result = (workload.map_fn)(&assignment.segment, &config.aux);
        if !config.delay.is_zero() {
            sleep(config.delay).await;
        }

        codec::write_message(&mut write_half, &ResultMessage { result })
            .await
            .context("failed to deliver result")?;
        processed += 1;
        info!(processed, "result delivered");
    }

    info!(processed, "worker done");
    Ok(())
}
