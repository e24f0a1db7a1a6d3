//! SSH banner detector

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, StreamDetector};

const BANNER: &[u8] = b"SSH-2.0-";

/// Detector for SSH streams, keyed on the protocol version banner
#[derive(Debug, Default, Clone, Copy)]
pub struct SshDetector;

impl StreamDetector for SshDetector {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn detect(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        data: &[u8],
    ) -> DetectOutcome {
        if data.len() < BANNER.len() {
            return if BANNER.starts_with(data) {
                Err(DetectError::NeedMoreData { detector: self.name() })
            } else {
                Err(DetectError::Declined {
                    detector: self.name(),
                    reason: "not an SSH banner".to_string(),
                })
            };
        }

        if data.starts_with(BANNER) {
            Ok(Match::new("ssh"))
        } else {
            Err(DetectError::Declined {
                detector: self.name(),
                reason: "not an SSH banner".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Destination;

    fn metadata() -> ConnectionMetadata {
        ConnectionMetadata::new(Destination::new("example.com", 22))
    }

    fn token() -> CancelToken {
        CancelToken::pair().1
    }

    #[test]
    fn test_banner_matches() {
        let result = SshDetector
            .detect(&token(), &metadata(), b"SSH-2.0-OpenSSH_9.6\r\n")
            .unwrap();
        assert_eq!(result.protocol, "ssh");
    }

    #[test]
    fn test_banner_prefix_needs_more_data() {
        let outcome = SshDetector.detect(&token(), &metadata(), b"SSH-");
        assert!(matches!(outcome, Err(DetectError::NeedMoreData { .. })));
    }

    #[test]
    fn test_other_traffic_declined() {
        let outcome = SshDetector.detect(&token(), &metadata(), b"GET / HTTP/1.1\r\n");
        assert!(matches!(outcome, Err(DetectError::Declined { .. })));
    }
}
