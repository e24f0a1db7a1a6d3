//! Single-shot datagram sniff
//!
//! A datagram is a complete, self-delimited unit, so there is no retry
//! loop: one race over the packet bytes decides the outcome.

use bytes::Bytes;
use log::debug;

use crate::common::{ConnectionMetadata, Result};
use super::race::race_packet;
use super::registry::PacketRegistry;

/// Sniff the protocol of a single datagram.
///
/// Races `registry` over `packet` once. On a match, sets
/// `metadata.protocol` (and `metadata.sniff_host` when available) and
/// returns `Ok(())`; otherwise returns `SniffError::Unmatched` with one
/// reason per detector.
pub async fn peek_packet(
    metadata: &mut ConnectionMetadata,
    packet: &[u8],
    registry: &PacketRegistry,
) -> Result<()> {
    let matched = race_packet(Bytes::copy_from_slice(packet), metadata, registry).await?;

    debug!(
        "sniffed packet protocol {} for {}",
        matched.protocol, metadata.destination
    );
    metadata.protocol = Some(matched.protocol);
    if matched.server_name.is_some() {
        metadata.sniff_host = matched.server_name;
    }
    Ok(())
}
