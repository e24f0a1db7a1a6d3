//! Protocol Sniffer: pre-routing application-layer protocol detection
//!
//! This library classifies the application-layer protocol of an inbound
//! connection or datagram (TLS, HTTP, QUIC, DNS, BitTorrent, ...) before any
//! routing decision is made. It is consumed in-process by a routing or
//! dispatch layer.
//!
//! # Main Features
//!
//! - Concurrent detector race: every registered detector inspects the same
//!   peeked bytes; the first match wins, ties go to the first-registered
//!   detector
//! - Non-consuming peeks: inspected bytes stay available and are replayed to
//!   the connection's real consumer after sniffing
//! - Bounded retries: a stream sniff keeps growing its view until a match or
//!   one shared absolute deadline
//! - Skip policy for server-speaks-first ports, so mail-family connections
//!   never burn the sniff budget
//!
//! # Example
//!
//! ```no_run
//! use protocol_sniffer::{
//!     peek_stream, skip, ConnectionMetadata, Destination, PeekBuffer, ReplayStream,
//!     StreamRegistry,
//! };
//! use protocol_sniffer::protocol;
//! use std::error::Error;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     let registry: StreamRegistry = protocol::stream_detectors().into_iter().collect();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8443").await?;
//!     let (mut stream, peer) = listener.accept().await?;
//!     let mut metadata = ConnectionMetadata::new(Destination::new("127.0.0.1", 8443));
//!
//!     if !skip(&metadata) {
//!         let mut buffer = PeekBuffer::new();
//!         let sniffed = peek_stream(
//!             &mut metadata,
//!             &mut stream,
//!             &mut buffer,
//!             Duration::from_millis(300),
//!             &registry,
//!         )
//!         .await;
//!         if let Err(e) = sniffed {
//!             // Routing proceeds without a protocol hint
//!             log::debug!("unidentified protocol from {peer}: {e}");
//!         }
//!
//!         // The consumer sees the stream from its first byte
//!         let _replay = ReplayStream::new(buffer.into_bytes(), stream);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod protocol;
pub mod sniff;

// Re-export commonly used structures and functions for convenience
pub use common::{ConnectionMetadata, Destination, DetectError, Result, SniffError};
pub use config::SnifferConfig;
pub use sniff::{
    peek_packet, peek_stream, skip, Match, PacketDetector, PacketRegistry, PeekBuffer,
    Registry, ReplayStream, StreamDetector, StreamRegistry,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
