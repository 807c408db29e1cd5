//! Errors produced while negotiating a SOCKS handshake.
//!
//! Every variant keeps the raw protocol byte where one exists (per the
//! design note that a rewrite should never lose the raw REP/status code
//! to a name lookup that might come back empty for an out-of-range value).

use std::io;

/// The terminal error for a `SocksClient` handshake.
///
/// A `SocksClient` surfaces at most one of these; once constructed, the
/// client's state machine moves to the absorbing `Error` state and no
/// further transitions or events occur (see [`crate::client::SocksClientState`]).
#[derive(Debug, thiserror::Error)]
pub enum SocksError {
    /// The overall handshake did not reach a terminal success within the
    /// configured timeout.
    #[error("proxy connection timed out")]
    Timeout,

    /// The transport closed before the handshake reached `Established`.
    #[error("socket closed before the proxy handshake completed")]
    SocketClosed,

    /// An I/O error on the underlying transport.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// A response opened with an unexpected protocol version byte.
    #[error("protocol version mismatch: expected 0x05, got {0:#04x}")]
    ProtocolVersionMismatch(u8),

    /// SOCKS5 method selection returned 0xFF (no acceptable method).
    #[error("proxy did not accept any of the offered authentication methods")]
    NoAcceptedAuthMethod,

    /// SOCKS5 method selection returned a method we don't implement.
    #[error("proxy selected an unsupported authentication method: {0:#04x}")]
    UnknownAuthMethod(u8),

    /// RFC 1929 username/password sub-negotiation failed.
    #[error("username/password authentication failed")]
    AuthenticationFailed,

    /// The proxy rejected the CONNECT/BIND/ASSOCIATE request. `code` is
    /// the raw REP byte (SOCKS5) or the raw response byte (SOCKS4/4a).
    #[error("proxy rejected connection request (code {code:#04x})")]
    ConnectionRejected {
        /// Raw rejection code as returned by the proxy.
        code: u8,
    },

    /// The proxy rejected the inbound connection for a BIND's second
    /// response.
    #[error("proxy rejected incoming bound connection (code {code:#04x})")]
    BoundConnectionRejected {
        /// Raw rejection code as returned by the proxy.
        code: u8,
    },

    /// The state machine reached a dispatch branch that should be
    /// unreachable given a well-formed driver.
    #[error("internal error: {0}")]
    Internal(String),
}
