//! # socks-client
//!
//! The crate `socks-client` provides a fast and flexible,
//! asyncronous implementation of a SOCKS4/SOCKS4a/SOCKS5
//! proxy client protocol engine, plus proxy-related utilities.
//!
//! The engine is transport-generic: it drives the handshake over
//! anything that implements [`tokio::io::AsyncRead`] +
//! [`tokio::io::AsyncWrite`], and on success hands the caller back
//! a transparent tunnel over that same stream.

/// Module responsible for functionality
/// related to proxy clients interfaces
/// (eg. common definitions and data model)
pub mod proxy;

/// Module responsible for client implementations
/// of known and most-used proxification
/// protocols, such as Socks4/Socks4a/Socks5
pub mod clients;

/// General-purpose utilities shared across the
/// handshake framers/parsers and the state machine:
/// the receive buffer and connection configuration.
pub mod general;

/// The SOCKS5 UDP relay datagram codec.
pub mod udp;

/// Errors produced by this crate.
pub mod error;

/// The SocksClient state machine that drives a handshake
/// to completion over an owned stream.
pub mod client;

/// Composes multiple SocksClients end-to-end to tunnel
/// through a chain of proxies.
pub mod chain;

pub use client::{BoundConnection, EstablishedConnection, SocksClient, SocksConnectOutcome};
pub use error::SocksError;
pub use proxy::{
    AddressType, Command, SocksClientOptions, SocksProxy, SocksRemoteHost, SocksVersion,
};
pub use udp::{create_udp_frame, parse_udp_frame, UdpFrame};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Convenience wrapper that opens a connection through a single proxy
/// and drives a CONNECT handshake to completion.
///
/// This is the CONNECT-only entry point described for callers who don't
/// need BIND/ASSOCIATE or chaining; it owns opening the TCP stream to the
/// proxy itself, applying `set_tcp_nodelay` if requested.
pub async fn create_connection(
    options: SocksClientOptions<TcpStream>,
) -> Result<EstablishedConnection<TcpStream>, SocksError> {
    let options = connect_tcp(options).await?;
    let client = SocksClient::new(options);
    match client.connect().await? {
        SocksConnectOutcome::Established(established) => Ok(established),
        SocksConnectOutcome::Bound(_) => Err(SocksError::Internal(
            "create_connection only supports the CONNECT command".into(),
        )),
    }
}

/// Composes a chain of proxies end-to-end (spec §4.10): tunnels through
/// `proxies[0]` to reach `proxies[1]`, and so on, finally reaching
/// `destination` through the last hop. Always issues CONNECT.
pub async fn create_connection_chain(
    mut proxies: Vec<SocksProxy>,
    destination: SocksRemoteHost,
    randomize_chain: bool,
    timeout: std::time::Duration,
) -> Result<EstablishedConnection<TcpStream>, SocksError> {
    if randomize_chain {
        use rand::seq::SliceRandom;
        proxies.shuffle(&mut rand::thread_rng());
    }
    chain::run_chain(proxies, destination, timeout).await
}

/// Opens a `TcpStream` to `options.proxy` and, if requested, applies
/// `TCP_NODELAY` to it, returning the options with the stream attached.
///
/// This generalizes the teacher's original per-example
/// `TcpStream::connect(proxy_addr).await.expect(..)` pattern into a
/// reusable helper rather than leaving every caller to reinvent it.
async fn connect_tcp(
    mut options: SocksClientOptions<TcpStream>,
) -> Result<SocksClientOptions<TcpStream>, SocksError> {
    let addr = format!("{}:{}", options.proxy.host, options.proxy.port);
    let stream = tokio::time::timeout(options.timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| SocksError::Timeout)??;

    if options.set_tcp_nodelay {
        stream.set_nodelay(true)?;
    }

    options.stream = Some(stream);
    Ok(options)
}

/// Blanket trait alias for the byte-stream transports this engine can
/// drive a handshake over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}
