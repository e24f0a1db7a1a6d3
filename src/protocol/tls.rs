//! TLS ClientHello detector
//!
//! Judges a stream prefix by its TLS record header and, when the full
//! ClientHello has already been buffered, recovers the SNI server name as
//! a routing hint.

use log::trace;

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, StreamDetector};

/// TLS handshake record type
const HANDSHAKE: u8 = 0x16;

/// Largest record length a conforming implementation sends
const MAX_RECORD_LEN: usize = 16384;

/// Detector for TLS streams
#[derive(Debug, Default, Clone, Copy)]
pub struct TlsDetector;

impl StreamDetector for TlsDetector {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn detect(
        &self,
        cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        data: &[u8],
    ) -> DetectOutcome {
        if data.len() < 5 {
            return Err(DetectError::NeedMoreData { detector: self.name() });
        }

        if data[0] != HANDSHAKE {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: format!("first byte is {:#04x}, expected 0x16", data[0]),
            });
        }

        // Legacy record version: SSLv3 through TLS 1.3 all put 0x03 first
        let (major, minor) = (data[1], data[2]);
        if major != 0x03 || minor > 0x04 {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: format!("invalid record version {major}.{minor}"),
            });
        }

        let record_len = u16::from_be_bytes([data[3], data[4]]) as usize;
        if record_len < 4 || record_len > MAX_RECORD_LEN {
            return Err(DetectError::Declined {
                detector: self.name(),
                reason: format!("record length {record_len} out of range"),
            });
        }

        // The header alone decides the match; the SNI walk is only worth
        // doing if the race is still undecided.
        let server_name = if cancel.is_cancelled() {
            None
        } else {
            parse_sni(data)
        };

        match server_name {
            Some(name) => {
                trace!("tls: client hello with sni {name}");
                Ok(Match::with_server_name("tls", name))
            }
            None => Ok(Match::new("tls")),
        }
    }
}

/// Walk a buffered ClientHello and extract the first server_name entry.
///
/// Returns `None` whenever the hello is incomplete or malformed; the match
/// itself never depends on this succeeding.
fn parse_sni(data: &[u8]) -> Option<String> {
    let record_len = u16::from_be_bytes([data[3], data[4]]) as usize;
    if data.len() < 5 + record_len {
        return None;
    }

    // Handshake header: msg_type(1) must be ClientHello, length(3)
    let mut p = 5;
    if data[p] != 0x01 {
        return None;
    }
    let hello_len =
        ((data[p + 1] as usize) << 16) | ((data[p + 2] as usize) << 8) | data[p + 3] as usize;
    p += 4;
    if p + hello_len > data.len() {
        return None;
    }

    // client_version(2) + random(32)
    p = p.checked_add(34)?;
    // session_id
    if p >= data.len() {
        return None;
    }
    p += 1 + data[p] as usize;
    // cipher_suites
    if p + 2 > data.len() {
        return None;
    }
    p += 2 + u16::from_be_bytes([data[p], data[p + 1]]) as usize;
    // compression_methods
    if p >= data.len() {
        return None;
    }
    p += 1 + data[p] as usize;
    // extensions
    if p + 2 > data.len() {
        return None;
    }
    let ext_total = u16::from_be_bytes([data[p], data[p + 1]]) as usize;
    p += 2;
    let ext_end = p.checked_add(ext_total)?;
    if ext_end > data.len() {
        return None;
    }

    while p + 4 <= ext_end {
        let ext_type = u16::from_be_bytes([data[p], data[p + 1]]);
        let ext_len = u16::from_be_bytes([data[p + 2], data[p + 3]]) as usize;
        p += 4;
        if p + ext_len > ext_end {
            return None;
        }
        if ext_type == 0x0000 {
            return parse_server_name_list(&data[p..p + ext_len]);
        }
        p += ext_len;
    }

    None
}

/// server_name_list: u16 list length, then [name_type(1)][u16 len][name]
fn parse_server_name_list(ext: &[u8]) -> Option<String> {
    if ext.len() < 2 {
        return None;
    }
    let mut q = 2;
    while q + 3 <= ext.len() {
        let name_type = ext[q];
        let name_len = u16::from_be_bytes([ext[q + 1], ext[q + 2]]) as usize;
        q += 3;
        if q + name_len > ext.len() {
            return None;
        }
        if name_type == 0 {
            return std::str::from_utf8(&ext[q..q + name_len])
                .ok()
                .map(str::to_string);
        }
        q += name_len;
    }
    None
}
