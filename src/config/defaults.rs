//! Default configuration values
//!
//! This module provides default values for configuration options.
//! It is designed to be a single source of truth for defaults,
//! making it easier to maintain consistent defaults across the application.

/// Default budget for a whole stream sniff attempt, in milliseconds.
///
/// Applied when the caller passes a zero timeout.
pub const READ_PAYLOAD_TIMEOUT_MS: u64 = 300;

/// Default initial capacity of the peek buffer in bytes.
///
/// Holds a typical TLS ClientHello or HTTP request head in one allocation;
/// the buffer still grows beyond this when a round reads more.
pub const BUFFER_CAPACITY: usize = 4 * 1024;

/// Default timeout in milliseconds
pub fn read_payload_timeout_ms() -> u64 {
    READ_PAYLOAD_TIMEOUT_MS
}

/// Default buffer capacity
pub fn buffer_capacity() -> usize {
    BUFFER_CAPACITY
}
