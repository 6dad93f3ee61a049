//! Length-prefixed message framing, symmetric in both directions.
//!
//! A frame is `<decimal ASCII length>\n<payload>` where the length is the
//! exact byte count of the UTF-8 JSON payload. There is no compression and
//! no checksum; integrity relies on length-exact reads.

use std::io;

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::ExchangeError;
use crate::PartialResult;

/// Coordinator to worker: the segment payload to map over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMessage {
    pub segment: String,
}

/// Worker to coordinator: the partial counts for the assigned segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    pub result: PartialResult,
}

/// Serialize `message` and write it as one frame, flushing the writer.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), ExchangeError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload =
        serde_json::to_vec(message).map_err(|err| ExchangeError::Protocol(err.to_string()))?;

    let mut frame = Vec::with_capacity(payload.len() + 24);
    frame.extend_from_slice(payload.len().to_string().as_bytes());
    frame.push(b'\n');
    frame.extend_from_slice(&payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one raw frame payload.
///
/// A clean close before the first header byte yields [`ExchangeError::Closed`];
/// running dry anywhere later is a connection failure.
pub async fn read_frame<R>(reader: &mut R) -> Result<BytesMut, ExchangeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Vec::new();
    let read = reader.read_until(b'\n', &mut header).await?;
    if read == 0 {
        return Err(ExchangeError::Closed);
    }
    if header.last() != Some(&b'\n') {
        return Err(ExchangeError::Connection(
            "peer closed before completing the frame header".to_string(),
        ));
    }
    header.pop();

    let length: usize = std::str::from_utf8(&header)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| {
            ExchangeError::Protocol(format!(
                "frame length is not a decimal number: {:?}",
                String::from_utf8_lossy(&header)
            ))
        })?;
    if length == 0 {
        return Err(ExchangeError::Protocol(
            "frame length must be positive".to_string(),
        ));
    }

    trace!(length, "frame header received");
    let mut payload = BytesMut::zeroed(length);
    if let Err(err) = reader.read_exact(&mut payload[..]).await {
        return Err(match err.kind() {
            io::ErrorKind::UnexpectedEof => ExchangeError::Connection(format!(
                "peer closed before sending all {length} payload bytes"
            )),
            _ => err.into(),
        });
    }
    Ok(payload)
}

/// Read one frame and deserialize its payload.
///
/// JSON that parses but does not match `T` (e.g. a missing `result` key)
/// is a protocol violation, not a connection failure.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, ExchangeError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_frame(reader).await?;
    serde_json::from_slice(&payload).map_err(|err| ExchangeError::Protocol(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, Value};
    use tokio::io::BufReader;

    async fn round_trip(message: &SegmentMessage) -> SegmentMessage {
        let mut buf = Vec::new();
        write_message(&mut buf, message).await.unwrap();
        let mut reader = BufReader::new(&buf[..]);
        read_message(&mut reader).await.unwrap()
    }

    #[tokio::test]
    async fn frames_multibyte_utf8_exactly() {
        let message = SegmentMessage {
            segment: "héllo wörld → 祝你好运\nsecond line\n".to_string(),
        };
        assert_eq!(round_trip(&message).await.segment, message.segment);
    }

    #[tokio::test]
    async fn frames_payloads_across_sizes() {
        // Tens of bytes up to megabytes.
        for size in [10usize, 4 * 1024, 2 * 1024 * 1024] {
            let message = SegmentMessage {
                segment: "wörd ".repeat(size / 5),
            };
            assert_eq!(round_trip(&message).await.segment, message.segment);
        }
    }

    #[tokio::test]
    async fn frames_nested_json_values() {
        let value = json!({
            "result": {"outer": {"inner": [1, 2, 3]}, "naïve": "café"},
        });
        let mut buf = Vec::new();
        write_message(&mut buf, &value).await.unwrap();
        let mut reader = BufReader::new(&buf[..]);
        let decoded: Value = read_message(&mut reader).await.unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn header_must_be_numeric() {
        let mut reader = BufReader::new(&b"abc\n{}"[..]);
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Protocol(_)), "{err}");
    }

    #[tokio::test]
    async fn header_must_be_positive() {
        for frame in [&b"0\n"[..], &b"-4\nxxxx"[..]] {
            let mut reader = BufReader::new(frame);
            let err = read_frame(&mut reader).await.unwrap_err();
            assert!(matches!(err, ExchangeError::Protocol(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn clean_close_is_distinguished_from_truncation() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(matches!(
            read_frame(&mut reader).await.unwrap_err(),
            ExchangeError::Closed
        ));

        // Header cut short.
        let mut reader = BufReader::new(&b"12"[..]);
        assert!(matches!(
            read_frame(&mut reader).await.unwrap_err(),
            ExchangeError::Connection(_)
        ));

        // Payload cut short.
        let mut reader = BufReader::new(&b"12\nhello"[..]);
        assert!(matches!(
            read_frame(&mut reader).await.unwrap_err(),
            ExchangeError::Connection(_)
        ));
    }

    #[tokio::test]
    async fn missing_expected_key_is_a_protocol_error() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({"unrelated": 1})).await.unwrap();
        let mut reader = BufReader::new(&buf[..]);
        let err = read_message::<_, ResultMessage>(&mut reader).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Protocol(_)), "{err}");
    }
}
