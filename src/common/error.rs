//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use thiserror::Error;
use std::io;

/// Reason a single detector declined to classify a payload.
///
/// A race round that produces no match aggregates one of these per detector,
/// so callers can tell "wrong protocol" apart from "not enough bytes yet".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The payload is definitely not this detector's protocol
    #[error("{detector}: {reason}")]
    Declined {
        /// Detector name
        detector: &'static str,
        /// Why the payload was rejected
        reason: String,
    },

    /// The payload is too short to decide either way
    #[error("{detector}: need more data")]
    NeedMoreData {
        /// Detector name
        detector: &'static str,
    },

    /// The detector panicked; the fault was contained by the race
    #[error("{detector}: detector panicked: {reason}")]
    Faulted {
        /// Detector name
        detector: &'static str,
        /// Captured panic message
        reason: String,
    },
}

impl DetectError {
    /// Name of the detector that produced this reason
    pub fn detector(&self) -> &'static str {
        match self {
            DetectError::Declined { detector, .. }
            | DetectError::NeedMoreData { detector }
            | DetectError::Faulted { detector, .. } => detector,
        }
    }
}

/// Protocol Sniffer error type
#[derive(Error, Debug)]
pub enum SniffError {
    /// The first read of a stream sniff attempt failed
    #[error("read payload: {0}")]
    ReadPayload(#[source] io::Error),

    /// Every detector declined, across every round attempted
    #[error("no protocol matched: [{}]", format_reasons(.0))]
    Unmatched(Vec<DetectError>),
}

impl SniffError {
    /// Individual detector reasons carried by an `Unmatched` result, if any
    pub fn reasons(&self) -> &[DetectError] {
        match self {
            SniffError::Unmatched(reasons) => reasons,
            _ => &[],
        }
    }
}

fn format_reasons(reasons: &[DetectError]) -> String {
    reasons
        .iter()
        .map(|reason| reason.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `SniffError`.
pub type Result<T> = std::result::Result<T, SniffError>;
