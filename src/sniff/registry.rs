//! Detector registry
//!
//! An ordered, registration-time-built collection of detector capabilities.
//! Registration order matters: when two detectors match the same payload in
//! the same race round, the first-registered one wins.

use std::sync::Arc;

use crate::common::{ConnectionMetadata, DetectError};
use super::race::CancelToken;

/// Successful classification produced by a detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Application-layer protocol name, e.g. `"tls"` or `"http"`
    pub protocol: &'static str,
    /// Server name recovered from the payload, when the protocol carries one
    pub server_name: Option<String>,
}

impl Match {
    /// A match without a server name
    pub fn new(protocol: &'static str) -> Self {
        Self {
            protocol,
            server_name: None,
        }
    }

    /// A match carrying a server name (TLS SNI, HTTP Host)
    pub fn with_server_name(protocol: &'static str, server_name: impl Into<String>) -> Self {
        Self {
            protocol,
            server_name: Some(server_name.into()),
        }
    }
}

/// Outcome of a single detector invocation
pub type DetectOutcome = std::result::Result<Match, DetectError>;

/// Detector over the accumulated prefix of a stream
///
/// Implementations are stateless: each invocation sees the full accumulated
/// view so far and must not retain anything across calls. The cancellation
/// token is advisory; a detector doing expensive work may poll it and bail
/// out early with any reason, but ignoring it is also correct.
pub trait StreamDetector: Send + Sync {
    /// Name used in logs and aggregated failure reasons
    fn name(&self) -> &'static str;

    /// Judge whether `data` is this detector's protocol
    fn detect(
        &self,
        cancel: &CancelToken,
        metadata: &ConnectionMetadata,
        data: &[u8],
    ) -> DetectOutcome;
}

/// Detector over a single, self-delimited datagram
pub trait PacketDetector: Send + Sync {
    /// Name used in logs and aggregated failure reasons
    fn name(&self) -> &'static str;

    /// Judge whether `packet` is this detector's protocol
    fn detect_packet(
        &self,
        cancel: &CancelToken,
        metadata: &ConnectionMetadata,
        packet: &[u8],
    ) -> DetectOutcome;
}

/// Ordered collection of detectors, built once at startup
///
/// Exposes iteration only; nothing can be added or removed while a sniff
/// attempt is running against it.
pub struct Registry<D> {
    detectors: Vec<D>,
}

impl<D> Registry<D> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Append a detector; its position fixes its tie-break priority
    pub fn register(&mut self, detector: D) {
        self.detectors.push(detector);
    }

    /// Number of registered detectors
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Iterate detectors in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, D> {
        self.detectors.iter()
    }
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> FromIterator<D> for Registry<D> {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        Self {
            detectors: iter.into_iter().collect(),
        }
    }
}

/// Registry of shared stream detectors
pub type StreamRegistry = Registry<Arc<dyn StreamDetector>>;

/// Registry of shared packet detectors
pub type PacketRegistry = Registry<Arc<dyn PacketDetector>>;
