//! DNS query detector
//!
//! Validates the fixed header of a datagram as a standard query and walks
//! the first question's name labels. Responses are not matched; sniffing
//! runs on client-sent traffic.

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, PacketDetector};

const HEADER_LEN: usize = 12;

/// Longest encoded domain name, per RFC 1035
const MAX_NAME_LEN: usize = 255;

/// Detector for plain DNS query datagrams
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsDetector;

impl PacketDetector for DnsDetector {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn detect_packet(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        packet: &[u8],
    ) -> DetectOutcome {
        if packet.len() < HEADER_LEN {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "datagram shorter than a DNS header".to_string(),
            });
        }

        let flags = u16::from_be_bytes([packet[2], packet[3]]);
        let is_query = flags & 0x8000 == 0;
        let opcode = (flags >> 11) & 0x0f;
        let z_bit = flags & 0x0040;
        if !is_query || opcode != 0 || z_bit != 0 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: format!("header flags {flags:#06x} are not a standard query"),
            });
        }

        let qdcount = u16::from_be_bytes([packet[4], packet[5]]);
        if qdcount == 0 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "query carries no question".to_string(),
            });
        }

        if !valid_question(&packet[HEADER_LEN..]) {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: "malformed question section".to_string(),
            });
        }

        Ok(Match::new("dns"))
    }
}

/// First question: label sequence terminated by a zero byte, then
/// qtype(2) + qclass(2).
fn valid_question(mut data: &[u8]) -> bool {
    let mut name_len = 0usize;
    loop {
        let Some((&len, rest)) = data.split_first() else {
            return false;
        };
        data = rest;
        if len == 0 {
            break;
        }
        // Compressed pointers never appear in the first question
        if len > 63 {
            return false;
        }
        name_len += len as usize + 1;
        if name_len > MAX_NAME_LEN || data.len() < len as usize {
            return false;
        }
        data = &data[len as usize..];
    }

    if data.len() < 4 {
        return false;
    }
    let qclass = u16::from_be_bytes([data[2], data[3]]);
    // IN, CH, HS, NONE, ANY
    matches!(qclass, 1 | 3 | 4 | 254 | 255)
}
