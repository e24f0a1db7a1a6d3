//! Peek buffer
//!
//! An append-only byte accumulator bound to one connection. Each
//! `grow_from` call performs exactly one read against the source and
//! appends whatever arrived; nothing already accumulated is ever dropped
//! or reordered, so repeated views return a stable, monotonically growing
//! prefix of the stream. Once sniffing concludes the contents are handed
//! back for replay ahead of the connection's normal reads.

use bytes::{Bytes, BytesMut};
use tokio::io::{self, AsyncRead, AsyncReadExt};

use crate::config::defaults;

/// Append-only, re-readable accumulator for peeked bytes
#[derive(Debug)]
pub struct PeekBuffer {
    buf: BytesMut,
}

impl PeekBuffer {
    /// Create a buffer with the default initial capacity
    pub fn new() -> Self {
        Self::with_capacity(defaults::BUFFER_CAPACITY)
    }

    /// Create a buffer with a custom initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Read once from `reader` and append the bytes that arrived.
    ///
    /// Returns the number of bytes appended; `Ok(0)` means the source
    /// reached end of stream. The read consumes from the source, which is
    /// why the accumulated contents must be replayed to the connection's
    /// real consumer afterwards (see [`ReplayStream`](super::ReplayStream)).
    pub async fn grow_from<R>(&mut self, reader: &mut R) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        reader.read_buf(&mut self.buf).await
    }

    /// The full accumulated contents, read-only
    pub fn view(&self) -> &[u8] {
        &self.buf
    }

    /// A cheaply cloneable snapshot safe to hand to concurrent readers
    pub fn shared_view(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    /// Number of bytes accumulated so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether anything has been accumulated yet
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the buffer, yielding the accumulated bytes for replay
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for PeekBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_grow_appends_without_discarding() {
        let mut buffer = PeekBuffer::new();

        let mut first = Cursor::new(&b"hello "[..]);
        let n = buffer.grow_from(&mut first).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(buffer.view(), b"hello ");

        let mut second = Cursor::new(&b"world"[..]);
        let n = buffer.grow_from(&mut second).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(buffer.view(), b"hello world");
    }

    #[tokio::test]
    async fn test_eof_reads_zero() {
        let mut buffer = PeekBuffer::new();
        let mut empty = Cursor::new(&b""[..]);
        assert_eq!(buffer.grow_from(&mut empty).await.unwrap(), 0);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_shared_view_is_stable_snapshot() {
        let mut buffer = PeekBuffer::with_capacity(4);
        let mut source = Cursor::new(&b"abcd"[..]);
        buffer.grow_from(&mut source).await.unwrap();

        let snapshot = buffer.shared_view();

        let mut more = Cursor::new(&b"efgh"[..]);
        buffer.grow_from(&mut more).await.unwrap();

        // Earlier snapshots are unaffected by later growth
        assert_eq!(&snapshot[..], b"abcd");
        assert_eq!(buffer.view(), b"abcdefgh");
    }

    #[tokio::test]
    async fn test_into_bytes_hands_back_everything() {
        let mut buffer = PeekBuffer::new();
        let mut source = Cursor::new(&b"\x16\x03\x01"[..]);
        buffer.grow_from(&mut source).await.unwrap();
        assert_eq!(&buffer.into_bytes()[..], b"\x16\x03\x01");
    }
}
