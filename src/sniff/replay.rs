//! Replay of peeked bytes
//!
//! Sniffing consumes bytes from the connection into the peek buffer. The
//! consumer that handles the connection after routing must see the stream
//! from its first byte, so the buffered prefix is replayed ahead of the
//! underlying stream by wrapping both in a [`ReplayStream`].

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{self, AsyncRead, ReadBuf};

/// An `AsyncRead` that serves buffered bytes before the inner stream.
///
/// Built from the output of
/// [`PeekBuffer::into_bytes`](super::PeekBuffer::into_bytes) and the
/// connection the buffer was grown from.
#[derive(Debug)]
pub struct ReplayStream<S> {
    replay: Bytes,
    inner: S,
}

impl<S> ReplayStream<S> {
    /// Wrap `inner`, replaying `replay` ahead of it
    pub fn new(replay: Bytes, inner: S) -> Self {
        Self { replay, inner }
    }

    /// Bytes still waiting to be replayed
    pub fn remaining(&self) -> &[u8] {
        &self.replay
    }

    /// Give back the unreplayed bytes and the inner stream
    pub fn into_parts(self) -> (Bytes, S) {
        (self.replay, self.inner)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ReplayStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.replay.is_empty() {
            let n = self.replay.len().min(out.remaining());
            out.put_slice(&self.replay[..n]);
            self.replay.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, out)
    }
}
