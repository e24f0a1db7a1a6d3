//! Fan-out/fan-in race coordinator
//!
//! Runs every registered detector concurrently against the same immutable
//! byte view, completes on the first match, and aggregates every detector's
//! reason when none match. One task is spawned per detector; each sends its
//! single result into a channel sized to the detector count, so a finishing
//! detector never blocks on a slow collector. The channel closes once every
//! task has reported, which is what lets the collector prove that no
//! detector invocation outlives the call.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use log::{debug, trace};
use tokio::sync::{mpsc, watch};

use crate::common::{ConnectionMetadata, DetectError, SniffError};
use super::registry::{DetectOutcome, Match, PacketRegistry, StreamRegistry};

/// Advisory cancellation signal shared by all detectors in one race round.
///
/// Cancellation is issued exactly once per race, as soon as a match arrives.
/// A detector that ignores it still runs to completion; its late result is
/// simply discarded. Nothing relies on cancellation for correctness.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Whether the race has already been decided
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    #[cfg(test)]
    pub(crate) fn pair() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }
}

/// Race every stream detector against the accumulated view.
///
/// Returns the first match, with ties between detectors that matched in the
/// same round broken by registration order, or `SniffError::Unmatched` with
/// one reason per detector.
pub(crate) async fn race_stream(
    view: Bytes,
    metadata: &ConnectionMetadata,
    registry: &StreamRegistry,
) -> Result<Match, SniffError> {
    let metadata = Arc::new(metadata.clone());
    let entries: Vec<_> = registry
        .iter()
        .enumerate()
        .map(|(index, detector)| {
            let detector = Arc::clone(detector);
            let name = detector.name();
            let view = view.clone();
            let metadata = Arc::clone(&metadata);
            let run = move |cancel: CancelToken| detector.detect(&cancel, &metadata, &view);
            (index, name, run)
        })
        .collect();

    run_race(entries).await
}

/// Race every packet detector against one datagram.
pub(crate) async fn race_packet(
    packet: Bytes,
    metadata: &ConnectionMetadata,
    registry: &PacketRegistry,
) -> Result<Match, SniffError> {
    let metadata = Arc::new(metadata.clone());
    let entries: Vec<_> = registry
        .iter()
        .enumerate()
        .map(|(index, detector)| {
            let detector = Arc::clone(detector);
            let name = detector.name();
            let packet = packet.clone();
            let metadata = Arc::clone(&metadata);
            let run = move |cancel: CancelToken| detector.detect_packet(&cancel, &metadata, &packet);
            (index, name, run)
        })
        .collect();

    run_race(entries).await
}

/// Fan out the prepared detector invocations and fan their results back in.
async fn run_race<F>(entries: Vec<(usize, &'static str, F)>) -> Result<Match, SniffError>
where
    F: FnOnce(CancelToken) -> DetectOutcome + Send + 'static,
{
    if entries.is_empty() {
        return Err(SniffError::Unmatched(Vec::new()));
    }

    let count = entries.len();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (result_tx, mut result_rx) = mpsc::channel::<(usize, DetectOutcome)>(count);

    for (index, name, run) in entries {
        let token = CancelToken {
            rx: cancel_rx.clone(),
        };
        let tx = result_tx.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async move { run(token) })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(DetectError::Faulted {
                        detector: name,
                        reason: panic_reason(panic),
                    })
                });
            // Capacity equals the detector count, so this never blocks; the
            // send only fails if the collector was dropped mid-race.
            let _ = tx.send((index, outcome)).await;
        });
    }
    drop(result_tx);

    let mut winner: Option<(usize, Match)> = None;
    let mut reasons: Vec<(usize, DetectError)> = Vec::with_capacity(count);

    // The channel yields results in completion order and closes once every
    // task has reported. Draining to close is what bounds the race: after
    // this loop no detector task is still running.
    while let Some((index, outcome)) = result_rx.recv().await {
        match outcome {
            Ok(matched) => {
                if winner.is_none() {
                    let _ = cancel_tx.send(true);
                }
                match winner {
                    Some((best, _)) if best <= index => {
                        trace!(
                            "discarding match from later-registered detector #{index} ({})",
                            matched.protocol
                        );
                    }
                    _ => winner = Some((index, matched)),
                }
            }
            Err(reason) => {
                trace!("detector declined: {reason}");
                reasons.push((index, reason));
            }
        }
    }

    if winner.is_none() {
        // Contract: exactly one cancellation signal per race. All detectors
        // have finished by now, so this is a no-op for them.
        let _ = cancel_tx.send(true);
    }

    match winner {
        Some((index, matched)) => {
            debug!("detector #{index} matched protocol {}", matched.protocol);
            Ok(matched)
        }
        None => {
            reasons.sort_by_key(|(index, _)| *index);
            Err(SniffError::Unmatched(
                reasons.into_iter().map(|(_, reason)| reason).collect(),
            ))
        }
    }
}

fn panic_reason(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Destination;
    use crate::sniff::registry::{Registry, StreamDetector};
    use std::time::Duration;

    fn metadata() -> ConnectionMetadata {
        ConnectionMetadata::new(Destination::new("example.com", 443))
    }

    struct Always(&'static str);

    impl StreamDetector for Always {
        fn name(&self) -> &'static str {
            self.0
        }

        fn detect(
            &self,
            _cancel: &CancelToken,
            _metadata: &ConnectionMetadata,
            _data: &[u8],
        ) -> DetectOutcome {
            Ok(Match::new(self.0))
        }
    }

    struct Never(&'static str);

    impl StreamDetector for Never {
        fn name(&self) -> &'static str {
            self.0
        }

        fn detect(
            &self,
            _cancel: &CancelToken,
            _metadata: &ConnectionMetadata,
            _data: &[u8],
        ) -> DetectOutcome {
            Err(DetectError::Declined {
                detector: self.0,
                reason: "not mine".to_string(),
            })
        }
    }

    struct Panics;

    impl StreamDetector for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn detect(
            &self,
            _cancel: &CancelToken,
            _metadata: &ConnectionMetadata,
            _data: &[u8],
        ) -> DetectOutcome {
            panic!("boom");
        }
    }

    /// Matches only after observing cancellation, so a decided race can be
    /// shown to discard late results.
    struct Slow(&'static str);

    impl StreamDetector for Slow {
        fn name(&self) -> &'static str {
            self.0
        }

        fn detect(
            &self,
            cancel: &CancelToken,
            _metadata: &ConnectionMetadata,
            _data: &[u8],
        ) -> DetectOutcome {
            let started = std::time::Instant::now();
            while !cancel.is_cancelled() {
                if started.elapsed() > Duration::from_secs(5) {
                    break;
                }
                std::thread::yield_now();
            }
            Ok(Match::new(self.0))
        }
    }

    fn registry(detectors: Vec<Arc<dyn StreamDetector>>) -> StreamRegistry {
        detectors.into_iter().collect::<Registry<_>>()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_match_wins() {
        let registry = registry(vec![
            Arc::new(Never("tls")),
            Arc::new(Always("http")),
            Arc::new(Never("ssh")),
        ]);

        let result = race_stream(Bytes::from_static(b"GET "), &metadata(), &registry).await;
        assert_eq!(result.unwrap().protocol, "http");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_matches_tie_break_by_registration() {
        // Repeat to shake out scheduling orders; the winner must never vary.
        for _ in 0..50 {
            let registry = registry(vec![
                Arc::new(Never("quic")),
                Arc::new(Always("tls")),
                Arc::new(Always("http")),
            ]);

            let result = race_stream(Bytes::from_static(b"\x16"), &metadata(), &registry).await;
            assert_eq!(result.unwrap().protocol, "tls");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_match_aggregates_every_reason() {
        let registry = registry(vec![
            Arc::new(Never("tls")),
            Arc::new(Never("http")),
            Arc::new(Never("ssh")),
        ]);

        let err = race_stream(Bytes::from_static(b"\x00"), &metadata(), &registry)
            .await
            .unwrap_err();
        let reasons = err.reasons();
        assert_eq!(reasons.len(), 3);
        let names: Vec<_> = reasons.iter().map(|reason| reason.detector()).collect();
        assert_eq!(names, vec!["tls", "http", "ssh"]);
    }

    #[tokio::test]
    async fn test_empty_registry_returns_immediately() {
        let registry = registry(Vec::new());
        let err = race_stream(Bytes::new(), &metadata(), &registry)
            .await
            .unwrap_err();
        assert!(err.reasons().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_detector_panic_is_contained() {
        let registry = registry(vec![Arc::new(Panics), Arc::new(Always("http"))]);

        let result = race_stream(Bytes::from_static(b"GET "), &metadata(), &registry).await;
        assert_eq!(result.unwrap().protocol, "http");

        let registry = registry_of_panics();
        let err = race_stream(Bytes::new(), &metadata(), &registry)
            .await
            .unwrap_err();
        assert!(matches!(
            err.reasons(),
            [DetectError::Faulted { detector: "panics", .. }]
        ));
    }

    fn registry_of_panics() -> StreamRegistry {
        registry(vec![Arc::new(Panics)])
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancellation_reaches_slow_detectors() {
        let registry = registry(vec![Arc::new(Always("tls")), Arc::new(Slow("http"))]);

        // The slow detector only returns once cancelled; the race still
        // completes promptly because the match triggers cancellation.
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            race_stream(Bytes::from_static(b"\x16"), &metadata(), &registry),
        )
        .await
        .expect("race must not hang");
        assert_eq!(result.unwrap().protocol, "tls");
    }
}
