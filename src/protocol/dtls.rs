//! DTLS record detector

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, PacketDetector};

/// Record content types: change_cipher_spec, alert, handshake,
/// application_data, ack
const CONTENT_TYPES: &[u8] = &[20, 21, 22, 23, 25];

/// Detector for DTLS datagrams
#[derive(Debug, Default, Clone, Copy)]
pub struct DtlsDetector;

impl PacketDetector for DtlsDetector {
    fn name(&self) -> &'static str {
        "dtls"
    }

    fn detect_packet(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        packet: &[u8],
    ) -> DetectOutcome {
        if packet.len() < 13 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "datagram shorter than a DTLS record header".to_string(),
            });
        }

        if !CONTENT_TYPES.contains(&packet[0]) {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: format!("unknown record content type {}", packet[0]),
            });
        }

        // DTLS 1.0 is 0xfeff, DTLS 1.2 is 0xfefd
        if packet[1] != 0xfe || !matches!(packet[2], 0xff | 0xfd) {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: format!("invalid record version {:#04x}.{:#04x}", packet[1], packet[2]),
            });
        }

        Ok(Match::new("dtls"))
    }
}
