//! HTTP/1.x request detector
//!
//! Judges a stream prefix by its request method and recovers the Host
//! header as a routing hint when the header section has been buffered.

use log::trace;

use crate::common::{ConnectionMetadata, DetectError};
use crate::sniff::{CancelToken, DetectOutcome, Match, StreamDetector};

const METHODS: &[&str] = &[
    "GET ", "POST ", "HEAD ", "PUT ", "DELETE ", "OPTIONS ", "PATCH ", "TRACE ", "CONNECT ",
];

/// Cap on header lines scanned for Host, against pathological inputs
const MAX_HEADER_LINES: usize = 64;

/// Detector for plaintext HTTP/1.x streams
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDetector;

impl StreamDetector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn detect(
        &self,
        _cancel: &CancelToken,
        _metadata: &ConnectionMetadata,
        data: &[u8],
    ) -> DetectOutcome {
        let mut prefix_of_method = false;
        for method in METHODS {
            let method = method.as_bytes();
            if data.len() >= method.len() {
                if data.starts_with(method) {
                    let host = parse_host(data);
                    if let Some(host) = &host {
                        trace!("http: request with host {host}");
                    }
                    return Ok(match host {
                        Some(host) => Match::with_server_name("http", host),
                        None => Match::new("http"),
                    });
                }
            } else if method.starts_with(data) {
                prefix_of_method = true;
            }
        }

        if prefix_of_method {
            return Err(DetectError::NeedMoreData { detector: self.name() });
        }

        Err(DetectError::Declined {
            detector: self.name(),
            reason: "does not start with an HTTP method".to_string(),
        })
    }
}

/// Scan buffered header lines for `Host:`, case-insensitively.
///
/// Returns `None` if the header is absent, empty, or not yet buffered; the
/// match itself never depends on this succeeding. A trailing `:port` is
/// stripped when it is purely numeric.
fn parse_host(data: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    let mut lines = text.split("\r\n");
    let _request_line = lines.next()?;

    for line in lines.take(MAX_HEADER_LINES) {
        if line.is_empty() {
            break;
        }
        if line.len() >= 5 && line.as_bytes()[..5].eq_ignore_ascii_case(b"host:") {
            let host = line[5..].trim().to_ascii_lowercase();
            if host.is_empty() {
                return None;
            }
            let host = match host.rsplit_once(':') {
                Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                    name.to_string()
                }
                _ => host,
            };
            return Some(host);
        }
    }
    None
}
