//! BitTorrent detectors
//!
//! One detector covering both transports: the TCP peer-wire handshake for
//! streams, and uTP or UDP tracker packets for datagrams.

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, PacketDetector, StreamDetector};

/// Peer-wire handshake: length-prefixed protocol string
const HANDSHAKE: &[u8] = b"\x13BitTorrent protocol";

/// UDP tracker protocol magic
const TRACKER_PROTOCOL_ID: u64 = 0x0000_0417_2710_1980;

/// Detector for BitTorrent peer-wire streams and uTP/tracker datagrams
#[derive(Debug, Default, Clone, Copy)]
pub struct BitTorrentDetector;

impl StreamDetector for BitTorrentDetector {
    fn name(&self) -> &'static str {
        "bittorrent"
    }

    fn detect(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        data: &[u8],
    ) -> DetectOutcome {
        if data.len() < HANDSHAKE.len() {
            return if HANDSHAKE.starts_with(data) {
                Err(DetectError::NeedMoreData { detector: "bittorrent" })
            } else {
                Err(DetectError::Declined {
                    detector: "bittorrent",
                    reason: "not a peer-wire handshake".to_string(),
                })
            };
        }

        if data.starts_with(HANDSHAKE) {
            Ok(Match::new("bittorrent"))
        } else {
            Err(DetectError::Declined {
                detector: "bittorrent",
                reason: "not a peer-wire handshake".to_string(),
            })
        }
    }
}

impl PacketDetector for BitTorrentDetector {
    fn name(&self) -> &'static str {
        "bittorrent"
    }

    fn detect_packet(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        packet: &[u8],
    ) -> DetectOutcome {
        if is_utp(packet) || is_udp_tracker_connect(packet) {
            Ok(Match::new("bittorrent"))
        } else {
            Err(DetectError::Declined {
                detector: "bittorrent",
                reason: "not a uTP or tracker packet".to_string(),
            })
        }
    }
}

/// uTP header: version 1, known packet type, well-formed extension chain
fn is_utp(packet: &[u8]) -> bool {
    if packet.len() < 20 {
        return false;
    }
    let version = packet[0] & 0x0f;
    let packet_type = packet[0] >> 4;
    if version != 1 || packet_type > 4 {
        return false;
    }

    // Extension chain: [next_type][len][payload...], terminated by type 0
    let mut ext_type = packet[1];
    let mut offset = 20usize;
    while ext_type != 0 {
        if ext_type > 0x04 {
            return false;
        }
        if offset + 2 > packet.len() {
            return false;
        }
        let next_type = packet[offset];
        let len = packet[offset + 1] as usize;
        offset += 2;
        if offset + len > packet.len() {
            return false;
        }
        offset += len;
        ext_type = next_type;
    }
    true
}

/// UDP tracker connect request: magic protocol id, action 0
fn is_udp_tracker_connect(packet: &[u8]) -> bool {
    if packet.len() < 16 {
        return false;
    }
    let protocol = u64::from_be_bytes([
        packet[0], packet[1], packet[2], packet[3], packet[4], packet[5], packet[6], packet[7],
    ]);
    if protocol != TRACKER_PROTOCOL_ID {
        return false;
    }
    let action = u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]);
    action == 0
}
