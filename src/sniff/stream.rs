//! Stream retry loop
//!
//! Drives the peek buffer against a stream source: read once, race every
//! detector over the full accumulated view, and repeat with a larger view
//! until a detector matches or the attempt's budget runs out. All rounds
//! share one absolute deadline computed at the start of the attempt; a
//! round never gets a fresh budget of its own.

use std::time::Duration;

use log::debug;
use tokio::io::{self, AsyncRead};
use tokio::time::{timeout_at, Instant};

use crate::common::{ConnectionMetadata, Result, SniffError};
use crate::config::defaults;
use super::buffer::PeekBuffer;
use super::race::race_stream;
use super::registry::StreamRegistry;

/// Sniff the protocol of a stream connection.
///
/// Grows `buffer` from `stream` one read at a time and races `registry`
/// over each accumulated view. On a match, sets `metadata.protocol` (and
/// `metadata.sniff_host` when the payload carried a server name) and
/// returns `Ok(())`. A zero `timeout` falls back to the default budget.
///
/// The bytes consumed from `stream` stay in `buffer`; hand them to a
/// [`ReplayStream`](super::ReplayStream) so the connection's real consumer
/// sees the stream from its first byte, whatever the sniff outcome was.
///
/// # Errors
///
/// `SniffError::ReadPayload` if the very first read fails, times out, or
/// hits end of stream before any payload arrived; `SniffError::Unmatched`
/// with every round's per-detector reasons once the deadline lapses or the
/// peer stops sending.
pub async fn peek_stream<S>(
    metadata: &mut ConnectionMetadata,
    stream: &mut S,
    buffer: &mut PeekBuffer,
    timeout: Duration,
    registry: &StreamRegistry,
) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let timeout = if timeout.is_zero() {
        Duration::from_millis(defaults::READ_PAYLOAD_TIMEOUT_MS)
    } else {
        timeout
    };
    let deadline = Instant::now() + timeout;

    let mut reasons = Vec::new();
    let mut rounds = 0usize;

    loop {
        // One read per round, bounded by the shared absolute deadline. The
        // deadline is scoped to this read future, so later non-sniffing
        // reads of the same connection are unaffected.
        let read_failure = match timeout_at(deadline, buffer.grow_from(stream)).await {
            Ok(Ok(n)) if n > 0 => None,
            Ok(Ok(_)) => Some(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "end of stream",
            )),
            Ok(Err(e)) => Some(e),
            Err(_) => Some(io::Error::new(
                io::ErrorKind::TimedOut,
                "read deadline elapsed",
            )),
        };

        if let Some(e) = read_failure {
            if rounds > 0 {
                // The peer sent a short probe and nothing more will arrive;
                // report what the detectors said instead of the read error.
                debug!("sniff rounds exhausted after {rounds} reads: {e}");
                break;
            }
            return Err(SniffError::ReadPayload(e));
        }
        rounds += 1;

        match race_stream(buffer.shared_view(), metadata, registry).await {
            Ok(matched) => {
                debug!(
                    "sniffed protocol {} for {} after {rounds} round(s)",
                    matched.protocol, metadata.destination
                );
                metadata.protocol = Some(matched.protocol);
                if matched.server_name.is_some() {
                    metadata.sniff_host = matched.server_name;
                }
                return Ok(());
            }
            Err(SniffError::Unmatched(round_reasons)) => {
                reasons.extend(round_reasons);
            }
            Err(e) => return Err(e),
        }
    }

    Err(SniffError::Unmatched(reasons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{DetectError, Destination};
    use crate::sniff::race::CancelToken;
    use crate::sniff::registry::{DetectOutcome, Match, Registry, StreamDetector};
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;

    fn metadata() -> ConnectionMetadata {
        ConnectionMetadata::new(Destination::new("example.com", 443))
    }

    /// Matches once the view has grown to at least `need` bytes.
    struct MinLen {
        name: &'static str,
        need: usize,
    }

    impl StreamDetector for MinLen {
        fn name(&self) -> &'static str {
            self.name
        }

        fn detect(
            &self,
            _cancel: &CancelToken,
            _metadata: &ConnectionMetadata,
            data: &[u8],
        ) -> DetectOutcome {
            if data.len() >= self.need {
                Ok(Match::new(self.name))
            } else {
                Err(DetectError::NeedMoreData {
                    detector: self.name,
                })
            }
        }
    }

    fn registry_needing(need: usize) -> StreamRegistry {
        [Arc::new(MinLen { name: "proto", need }) as Arc<dyn StreamDetector>]
            .into_iter()
            .collect::<Registry<_>>()
    }

    #[tokio::test]
    async fn test_match_on_first_round() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(b"abcdef").await.unwrap();

        let mut meta = metadata();
        let mut buffer = PeekBuffer::new();
        peek_stream(
            &mut meta,
            &mut server,
            &mut buffer,
            Duration::from_secs(1),
            &registry_needing(4),
        )
        .await
        .unwrap();

        assert_eq!(meta.protocol, Some("proto"));
        assert_eq!(buffer.view(), b"abcdef");
    }

    #[tokio::test]
    async fn test_retries_until_enough_data() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let writer = tokio::spawn(async move {
            for chunk in [&b"ab"[..], b"cd", b"ef"] {
                client.write_all(chunk).await.unwrap();
                client.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            client
        });

        let mut meta = metadata();
        let mut buffer = PeekBuffer::new();
        peek_stream(
            &mut meta,
            &mut server,
            &mut buffer,
            Duration::from_secs(2),
            &registry_needing(5),
        )
        .await
        .unwrap();

        assert_eq!(meta.protocol, Some("proto"));
        assert!(buffer.len() >= 5);
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_eof_after_probe_returns_unmatched() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(b"ab").await.unwrap();
        drop(client);

        let mut meta = metadata();
        let mut buffer = PeekBuffer::new();
        let err = peek_stream(
            &mut meta,
            &mut server,
            &mut buffer,
            Duration::from_secs(1),
            &registry_needing(100),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SniffError::Unmatched(_)));
        assert!(!err.reasons().is_empty());
        assert!(meta.protocol.is_none());
        // The probe bytes stay available for replay
        assert_eq!(buffer.view(), b"ab");
    }

    #[tokio::test]
    async fn test_first_read_eof_is_fatal() {
        let (client, mut server) = tokio::io::duplex(256);
        drop(client);

        let mut meta = metadata();
        let mut buffer = PeekBuffer::new();
        let err = peek_stream(
            &mut meta,
            &mut server,
            &mut buffer,
            Duration::from_secs(1),
            &registry_needing(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SniffError::ReadPayload(_)));
        assert!(meta.protocol.is_none());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_within_budget() {
        let (_client, mut server) = tokio::io::duplex(256);

        let mut meta = metadata();
        let mut buffer = PeekBuffer::new();
        let started = std::time::Instant::now();
        let err = peek_stream(
            &mut meta,
            &mut server,
            &mut buffer,
            Duration::from_millis(100),
            &registry_needing(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SniffError::ReadPayload(_)));
        // Bounded by the budget, give or take scheduling latency
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_zero_timeout_uses_default_budget() {
        let (_client, mut server) = tokio::io::duplex(256);

        let mut meta = metadata();
        let mut buffer = PeekBuffer::new();
        let started = std::time::Instant::now();
        let err = peek_stream(
            &mut meta,
            &mut server,
            &mut buffer,
            Duration::ZERO,
            &registry_needing(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SniffError::ReadPayload(_)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(defaults::READ_PAYLOAD_TIMEOUT_MS));
        assert!(elapsed < Duration::from_secs(5));
    }
}
