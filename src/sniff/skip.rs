//! Skip policy
//!
//! Sniffing assumes the client speaks first. On ports owned by protocols
//! where the server sends the greeting, a sniff attempt would sit in a
//! read until the deadline expires, so those connections are exempted
//! up front.

use crate::common::ConnectionMetadata;

/// Well-known destination ports of server-speaks-first protocols
const SERVER_FIRST_PORTS: &[u16] = &[
    // SMTP
    25, 465, 587,
    // IMAP
    143, 993,
    // POP3
    110, 995,
];

/// Whether sniffing should be skipped for this connection.
///
/// Pure function of the destination port; no side effects.
pub fn skip(metadata: &ConnectionMetadata) -> bool {
    SERVER_FIRST_PORTS.contains(&metadata.destination.port)
}
