use std::time::Duration;

/// An append-only byte accumulator with peek/consume semantics.
///
/// Bytes arriving from the transport are appended here as they're read;
/// the handshake parsers peek or remove a prefix once enough bytes have
/// accumulated. Consumed bytes are reclaimed so the buffer doesn't grow
/// without bound across a long handshake.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    buf: Vec<u8>,
}

impl ReceiveBuffer {
    /// Creates an empty buffer.
    pub fn new() -> ReceiveBuffer {
        ReceiveBuffer { buf: Vec::new() }
    }

    /// Appends `bytes` to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Current number of buffered bytes.
    pub fn length(&self) -> usize {
        self.buf.len()
    }

    /// Returns a copy of the first `n` bytes without removing them.
    ///
    /// Panics if `n > self.length()`; callers must check the watermark
    /// first.
    pub fn peek(&self, n: usize) -> Vec<u8> {
        assert!(n <= self.buf.len(), "peek beyond buffered length");
        self.buf[..n].to_vec()
    }

    /// Returns a copy of the first `n` bytes and removes them from the
    /// buffer.
    ///
    /// Panics if `n > self.length()`.
    pub fn get(&mut self, n: usize) -> Vec<u8> {
        assert!(n <= self.buf.len(), "get beyond buffered length");
        self.buf.drain(..n).collect()
    }

    /// Drains and returns every remaining buffered byte. Used once the
    /// handshake reaches `Established` to hand residual bytes back to the
    /// caller alongside the stream.
    pub fn drain_all(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Connection-level configuration for a `SocksClient`.
///
/// Generalizes the teacher's per-stage `ConnectionTimeouts` (connect,
/// read, write) into the single overall handshake timeout the spec calls
/// for: the engine arms one coarse timer for the whole handshake rather
/// than one per I/O call.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Overall time budget for the handshake to reach a terminal state.
    pub timeout: Duration,
    /// Whether to apply `TCP_NODELAY` when this crate opens the
    /// transport itself (see [`crate::connect_tcp`]).
    pub set_tcp_nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> ConnectionConfig {
        ConnectionConfig {
            timeout: Duration::from_millis(30_000),
            set_tcp_nodelay: false,
        }
    }
}
