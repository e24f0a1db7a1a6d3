//! Protocol sniffing core
//!
//! Classifies the application-layer protocol of an inbound connection or
//! datagram before any routing decision is made. All registered detectors
//! race concurrently against the same peeked bytes; the first match wins
//! and is recorded on the connection metadata. The peeked bytes are never
//! lost: they accumulate in a [`PeekBuffer`] and are replayed to the
//! connection's real consumer through a [`ReplayStream`].

mod buffer;
mod packet;
mod race;
mod registry;
mod replay;
mod skip;
mod stream;

pub use buffer::PeekBuffer;
pub use packet::peek_packet;
pub use race::CancelToken;
pub use registry::{
    DetectOutcome, Match, PacketDetector, PacketRegistry, Registry, StreamDetector,
    StreamRegistry,
};
pub use replay::ReplayStream;
pub use skip::skip;
pub use stream::peek_stream;
