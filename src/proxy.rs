use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;

/// Which SOCKS protocol version a [`SocksProxy`] speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksVersion {
    V4,
    V5,
}

impl fmt::Display for SocksVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksVersion::V4 => f.write_str("4"),
            SocksVersion::V5 => f.write_str("5"),
        }
    }
}

impl FromStr for SocksVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<SocksVersion, ()> {
        match s {
            "4" => Ok(SocksVersion::V4),
            "5" => Ok(SocksVersion::V5),
            _ => Err(()),
        }
    }
}

/// A proxy server to negotiate a SOCKS handshake with.
#[derive(Debug, Clone)]
pub struct SocksProxy {
    /// Hostname or IP literal of the proxy.
    pub host: String,
    /// Port the proxy listens on.
    pub port: u16,
    /// Which SOCKS version this proxy speaks.
    pub version: SocksVersion,
    /// SOCKS4 `userId`, or the SOCKS5 RFC 1929 username. Absent means
    /// "no auth" for SOCKS5, or an empty `userId` for SOCKS4.
    pub user_id: Option<String>,
    /// SOCKS5 RFC 1929 password. Presence of either `user_id` or
    /// `password` causes the SOCKS5 method selection framer to offer
    /// Username/Password in addition to No-Auth.
    pub password: Option<String>,
    /// Literal substituted whenever the proxy reports a bound/remote
    /// address of `0.0.0.0` (some proxies report the wildcard address
    /// rather than a routable one). Defaults to `host` if `host` is
    /// itself an IP literal.
    pub proxy_address: Option<String>,
}

impl SocksProxy {
    /// Builds a SOCKS5 proxy with no authentication configured.
    pub fn socks5(host: impl Into<String>, port: u16) -> SocksProxy {
        SocksProxy {
            host: host.into(),
            port,
            version: SocksVersion::V5,
            user_id: None,
            password: None,
            proxy_address: None,
        }
    }

    /// Builds a SOCKS4/4a proxy.
    pub fn socks4(host: impl Into<String>, port: u16) -> SocksProxy {
        SocksProxy {
            host: host.into(),
            port,
            version: SocksVersion::V4,
            user_id: None,
            password: None,
            proxy_address: None,
        }
    }

    /// Attaches RFC 1929 username/password credentials, causing the
    /// SOCKS5 method selection framer to offer Username/Password.
    pub fn with_credentials(mut self, user_id: impl Into<String>, password: impl Into<String>) -> SocksProxy {
        self.user_id = Some(user_id.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the literal explicitly substituted for a reported `0.0.0.0`
    /// bind/remote address.
    pub fn with_proxy_address(mut self, proxy_address: impl Into<String>) -> SocksProxy {
        self.proxy_address = Some(proxy_address.into());
        self
    }

    /// The literal to substitute for a `0.0.0.0` bind/remote address:
    /// the explicit `proxy_address` if set, else `host` if it parses as
    /// an IP literal, else `None`.
    pub fn wildcard_substitute(&self) -> Option<&str> {
        if let Some(addr) = &self.proxy_address {
            return Some(addr.as_str());
        }
        if self.host.parse::<Ipv4Addr>().is_ok() || self.host.parse::<Ipv6Addr>().is_ok() {
            return Some(self.host.as_str());
        }
        None
    }
}

/// The remote endpoint a [`SocksClient`](crate::client::SocksClient) is
/// asked to reach, or one it reports back (e.g. the inbound peer of a
/// BIND, or the relay address of an ASSOCIATE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocksRemoteHost {
    /// Literal or hostname; names are passed through to the proxy
    /// verbatim (DNS resolution is an external collaborator).
    pub host: String,
    pub port: u16,
}

impl SocksRemoteHost {
    pub fn new(host: impl Into<String>, port: u16) -> SocksRemoteHost {
        SocksRemoteHost { host: host.into(), port }
    }
}

/// The SOCKS command a handshake requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect = 0x01,
    Bind = 0x02,
    Associate = 0x03,
}

impl Command {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The SOCKS5 address-type byte (ATYP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Ipv4 = 0x01,
    Hostname = 0x03,
    Ipv6 = 0x04,
}

impl AddressType {
    /// Classifies `host` by literal recognition: IPv4 literal, else IPv6
    /// literal, else hostname.
    pub fn classify(host: &str) -> AddressType {
        if host.parse::<Ipv4Addr>().is_ok() {
            AddressType::Ipv4
        } else if host.parse::<Ipv6Addr>().is_ok() {
            AddressType::Ipv6
        } else {
            AddressType::Hostname
        }
    }
}

/// Options configuring a single `SocksClient` handshake.
///
/// `S` is the transport type; for the CONNECT-only convenience wrappers
/// in `lib.rs` this is `TcpStream`, but `SocksClient<S>` itself is
/// generic over any `AsyncRead + AsyncWrite + Unpin + Send` transport, so
/// a caller can hand in an already-connected stream (e.g. the previous
/// hop of a proxy chain) via `stream`.
pub struct SocksClientOptions<S> {
    pub proxy: SocksProxy,
    pub destination: SocksRemoteHost,
    pub command: Command,
    /// Overall handshake timeout; default 30s per spec.
    pub timeout: Duration,
    /// An already-connected transport. When `None`, callers that go
    /// through `create_connection`/`create_connection_chain` have it
    /// filled in by `connect_tcp`; callers driving `SocksClient`
    /// directly must supply it themselves.
    pub stream: Option<S>,
    /// Hint honored by `connect_tcp` when it opens the transport itself.
    pub set_tcp_nodelay: bool,
}

impl<S> SocksClientOptions<S> {
    pub fn new(proxy: SocksProxy, destination: SocksRemoteHost, command: Command) -> SocksClientOptions<S> {
        SocksClientOptions {
            proxy,
            destination,
            command,
            timeout: Duration::from_millis(30_000),
            stream: None,
            set_tcp_nodelay: false,
        }
    }

    pub fn with_stream(mut self, stream: S) -> SocksClientOptions<S> {
        self.stream = Some(stream);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> SocksClientOptions<S> {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_substitute_prefers_explicit_proxy_address() {
        let mut proxy = SocksProxy::socks5("proxy.example.com", 1080);
        proxy.proxy_address = Some("203.0.113.9".into());
        assert_eq!(proxy.wildcard_substitute(), Some("203.0.113.9"));
    }

    #[test]
    fn wildcard_substitute_falls_back_to_ip_literal_host() {
        let proxy = SocksProxy::socks5("198.51.100.2", 1080);
        assert_eq!(proxy.wildcard_substitute(), Some("198.51.100.2"));
    }

    #[test]
    fn wildcard_substitute_is_none_for_hostname_host() {
        let proxy = SocksProxy::socks5("proxy.example.com", 1080);
        assert_eq!(proxy.wildcard_substitute(), None);
    }

    #[test]
    fn classify_recognizes_ipv4_ipv6_and_hostname() {
        assert_eq!(AddressType::classify("1.2.3.4"), AddressType::Ipv4);
        assert_eq!(AddressType::classify("::1"), AddressType::Ipv6);
        assert_eq!(AddressType::classify("example.com"), AddressType::Hostname);
    }
}
