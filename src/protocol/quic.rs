//! QUIC long-header detector
//!
//! Best-effort classification of a datagram as a QUIC long-header packet.
//! No payload decryption is attempted; the header form, fixed bit, and a
//! non-zero version are enough of a routing hint.

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, PacketDetector};

/// Detector for QUIC datagrams
#[derive(Debug, Default, Clone, Copy)]
pub struct QuicDetector;

impl PacketDetector for QuicDetector {
    fn name(&self) -> &'static str {
        "quic"
    }

    fn detect_packet(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        packet: &[u8],
    ) -> DetectOutcome {
        if packet.len() < 7 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "datagram too short for a long header".to_string(),
            });
        }

        let flags = packet[0];
        if flags & 0x80 == 0 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "short header form".to_string(),
            });
        }
        if flags & 0x40 == 0 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "fixed bit not set".to_string(),
            });
        }

        let version = u32::from_be_bytes([packet[1], packet[2], packet[3], packet[4]]);
        if version == 0 {
            // Version negotiation is server-sent; clients never open with it
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "version negotiation packet".to_string(),
            });
        }

        Ok(Match::new("quic"))
    }
}
