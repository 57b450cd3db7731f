//! Tracked connection wrapper and connection identifiers.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Delegate stream I/O to the underlying socket
//! - Release the listener's open-connection slot when dropped

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::net::listener::DrainState;

// Process-wide source of connection IDs. Nothing orders IDs across
// connections, so Relaxed is enough.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one accepted connection across all of its log lines.
/// Unique for the lifetime of the process, starting at `conn-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Draw the next ID from the process-wide counter.
    pub fn new() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric part of the ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A stream accepted through a [`super::GracefulListener`].
///
/// Delegates all I/O to the underlying socket. On drop it gives the
/// open-connection slot back to the listener's drain state, which may
/// fire the drained signal if a drain was requested.
#[derive(Debug)]
pub struct TrackedStream {
    inner: TcpStream,
    state: Arc<DrainState>,
    id: ConnectionId,
}

impl TrackedStream {
    pub(crate) fn new(inner: TcpStream, state: Arc<DrainState>) -> Self {
        state.track();
        Self {
            inner,
            state,
            id: ConnectionId::new(),
        }
    }

    /// This connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.state.release();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
