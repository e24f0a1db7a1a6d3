//! Built-in protocol detectors
//!
//! Each detector is a stateless judgment over a byte view (streams) or a
//! single datagram (packets). The sniffing core does not depend on this
//! set; callers can register any mix of these and their own detectors.

mod bittorrent;
mod dns;
mod dtls;
mod http;
mod quic;
mod ssh;
mod tls;

pub use bittorrent::BitTorrentDetector;
pub use dns::DnsDetector;
pub use dtls::DtlsDetector;
pub use http::HttpDetector;
pub use quic::QuicDetector;
pub use ssh::SshDetector;
pub use tls::TlsDetector;

use std::sync::Arc;

use crate::sniff::{PacketDetector, StreamDetector};

/// The built-in stream detectors, in their default registration order
pub fn stream_detectors() -> Vec<Arc<dyn StreamDetector>> {
    vec![
        Arc::new(TlsDetector),
        Arc::new(HttpDetector),
        Arc::new(SshDetector),
        Arc::new(BitTorrentDetector),
    ]
}

/// The built-in packet detectors, in their default registration order
pub fn packet_detectors() -> Vec<Arc<dyn PacketDetector>> {
    vec![
        Arc::new(QuicDetector),
        Arc::new(DtlsDetector),
        Arc::new(DnsDetector),
        Arc::new(BitTorrentDetector),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sets_are_nonempty() {
        assert!(!stream_detectors().is_empty());
        assert!(!packet_detectors().is_empty());
    }

    #[test]
    fn test_default_stream_order() {
        let names: Vec<_> = stream_detectors().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["tls", "http", "ssh", "bittorrent"]);
    }
}
