//! SOCKS4 / SOCKS4a request framer and response parser (spec §4.3/§4.4).
//!
//! Layout: `VN(1)=0x04 | CD(1) | DSTPORT(2, BE) | DSTIP(4) | USERID | 0x00`.
//! For SOCKS4a, `DSTIP` is the "invalid but nonzero" address
//! `0.0.0.0.1`, and the hostname is appended after the USERID's NUL
//! terminator, itself NUL-terminated.

use byteorder::{BigEndian, ByteOrder};

use crate::error::SocksError;
use crate::proxy::{Command, SocksProxy, SocksRemoteHost};

/// Fixed size of a SOCKS4 response: `VN | REP | DSTPORT(2) | DSTIP(4)`.
pub const RESPONSE_LEN: usize = 8;

/// Grant code for a SOCKS4 response (`REP` field).
const REP_GRANTED: u8 = 0x5A;

/// Frames a SOCKS4 (or, for a non-IPv4 destination, SOCKS4a) request.
pub fn frame_request(command: Command, destination: &SocksRemoteHost, user_id: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9 + user_id.len() + destination.host.len());

    buf.push(0x04);
    buf.push(command.as_u8());

    let mut port_buf = [0u8; 2];
    BigEndian::write_u16(&mut port_buf, destination.port);
    buf.extend_from_slice(&port_buf);

    match destination.host.parse::<std::net::Ipv4Addr>() {
        Ok(ip) => {
            buf.extend_from_slice(&ip.octets());
            buf.extend_from_slice(user_id.as_bytes());
            buf.push(0x00);
        }
        Err(_) => {
            // SOCKS4a: invalid-but-nonzero placeholder address, then the
            // hostname NUL-terminated after the userId's own terminator.
            buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
            buf.extend_from_slice(user_id.as_bytes());
            buf.push(0x00);
            buf.extend_from_slice(destination.host.as_bytes());
            buf.push(0x00);
        }
    }

    buf
}

/// A decoded SOCKS4 response.
#[derive(Debug, Clone)]
pub struct Socks4Response {
    pub remote_host: SocksRemoteHost,
}

/// Parses exactly [`RESPONSE_LEN`] bytes of a SOCKS4 response.
///
/// `proxy` supplies the wildcard-substitution literal for a reported
/// `0.0.0.0` address. `rejected` controls which error variant is raised
/// on a non-grant REP code: the first response of a BIND and a plain
/// CONNECT/BIND-setup response use `ConnectionRejected`; a BIND's second
/// (inbound-peer) response uses `BoundConnectionRejected`.
pub fn parse_response(bytes: &[u8], proxy: &SocksProxy, rejected_is_bound: bool) -> Result<Socks4Response, SocksError> {
    debug_assert_eq!(bytes.len(), RESPONSE_LEN);

    let rep = bytes[1];
    if rep != REP_GRANTED {
        return Err(if rejected_is_bound {
            SocksError::BoundConnectionRejected { code: rep }
        } else {
            SocksError::ConnectionRejected { code: rep }
        });
    }

    let port = BigEndian::read_u16(&bytes[2..4]);
    let ip = std::net::Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);
    let mut host = ip.to_string();

    if ip.is_unspecified() {
        if let Some(substitute) = proxy.wildcard_substitute() {
            host = substitute.to_string();
        }
    }

    Ok(Socks4Response {
        remote_host: SocksRemoteHost::new(host, port),
    })
}
