/// Module contains the SOCKS4/SOCKS4a handshake framer and response
/// parser.
///
/// # Example
///
/// ```
/// use socks_client::clients::socks4;
/// use socks_client::proxy::{Command, SocksRemoteHost};
///
/// let request = socks4::frame_request(Command::Connect, &SocksRemoteHost::new("1.2.3.4", 80), "");
/// assert_eq!(request[0], 0x04);
/// ```
pub mod socks4;

/// Module contains the SOCKS5 handshake framers and parsers: method
/// selection, RFC 1929 username/password sub-negotiation, and the
/// command request/response.
///
/// # Example
///
/// ```
/// use socks_client::clients::socks5::method;
///
/// let request = method::frame_request(None, None);
/// assert_eq!(request, vec![0x05, 0x01, 0x00]);
/// ```
pub mod socks5;
