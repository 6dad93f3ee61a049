//! One live connection's exchange: send the leased segment, await the
//! result under a deadline.
//!
//! A session handles exactly one segment for exactly one attempt. It never
//! retries in place; a failed attempt is requeued and a later connection
//! picks it up.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::time::timeout;

use common::codec::{self, ResultMessage, SegmentMessage};
use common::error::ExchangeError;
use common::PartialResult;

/// How one attempt concluded. Consumed by the queue's `complete`/`fail`
/// operations rather than propagated upward.
#[derive(Debug)]
pub enum Outcome {
    Success(PartialResult),
    Failure(ExchangeError),
}

pub async fn exchange(stream: TcpStream, payload: &str, deadline: Duration) -> Outcome {
    match try_exchange(stream, payload, deadline).await {
        Ok(partial) => Outcome::Success(partial),
        Err(err) => Outcome::Failure(err),
    }
}

async fn try_exchange(
    stream: TcpStream,
    payload: &str,
    deadline: Duration,
) -> Result<PartialResult, ExchangeError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let assignment = SegmentMessage {
        segment: payload.to_string(),
    };
    codec::write_message(&mut write_half, &assignment).await?;

    let reply: ResultMessage = timeout(deadline, codec::read_message(&mut reader))
        .await
        .map_err(|_| ExchangeError::Timeout(deadline))??;
    Ok(reply.result)
}
