//! SOCKS5 UDP relay datagram codec (RFC 1928 §7).
//!
//! These are pure functions: no I/O, no state. Routing the decoded
//! datagrams through an actual UDP relay is outside this crate's scope;
//! only framing and parsing the header + payload is provided.

use byteorder::{BigEndian, ByteOrder};

use crate::error::SocksError;
use crate::proxy::{AddressType, SocksRemoteHost};

/// A single SOCKS5 UDP relay datagram: fragment number, destination
/// (or source, on the receive path), and opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpFrame {
    /// Fragment number. 0 means "standalone datagram" (fragmentation is
    /// rarely implemented by proxies in practice, but the wire format
    /// always carries the byte).
    pub frame_number: u8,
    pub remote_host: SocksRemoteHost,
    pub data: Vec<u8>,
}

impl Default for UdpFrame {
    fn default() -> UdpFrame {
        UdpFrame {
            frame_number: 0,
            remote_host: SocksRemoteHost::new(String::new(), 0),
            data: Vec::new(),
        }
    }
}

/// Encodes a [`UdpFrame`] into wire bytes:
/// `RSV(2) | FRAG(1) | ATYP(1) | ADDR | PORT(2) | DATA`.
pub fn create_udp_frame(frame: &UdpFrame) -> Result<Vec<u8>, SocksError> {
    let atyp = AddressType::classify(&frame.remote_host.host);

    let addr_len = match atyp {
        AddressType::Ipv4 => 4,
        AddressType::Ipv6 => 16,
        AddressType::Hostname => 1 + frame.remote_host.host.len(),
    };

    let mut buf = Vec::with_capacity(2 + 1 + 1 + addr_len + 2 + frame.data.len());

    // RSV: always 0x0000.
    buf.push(0);
    buf.push(0);
    buf.push(frame.frame_number);
    buf.push(atyp as u8);

    match atyp {
        AddressType::Ipv4 => {
            let ip: std::net::Ipv4Addr = frame.remote_host.host.parse().map_err(|_| {
                SocksError::Internal("UDP frame host failed to parse as IPv4 after classification".into())
            })?;
            buf.extend_from_slice(&ip.octets());
        }
        AddressType::Ipv6 => {
            let ip: std::net::Ipv6Addr = frame.remote_host.host.parse().map_err(|_| {
                SocksError::Internal("UDP frame host failed to parse as IPv6 after classification".into())
            })?;
            buf.extend_from_slice(&ip.octets());
        }
        AddressType::Hostname => {
            if frame.remote_host.host.len() > 255 {
                return Err(SocksError::Internal("hostname exceeds 255 bytes".into()));
            }
            buf.push(frame.remote_host.host.len() as u8);
            buf.extend_from_slice(frame.remote_host.host.as_bytes());
        }
    }

    let mut port_buf = [0u8; 2];
    BigEndian::write_u16(&mut port_buf, frame.remote_host.port);
    buf.extend_from_slice(&port_buf);

    buf.extend_from_slice(&frame.data);

    Ok(buf)
}

/// Decodes wire bytes produced by [`create_udp_frame`] back into a
/// [`UdpFrame`]. Skips the 2 reserved bytes, reads the fragment number,
/// then the address (length determined by the ATYP byte; for hostnames,
/// the 1-byte length prefix is read first), then the port, treating the
/// remainder as payload.
pub fn parse_udp_frame(bytes: &[u8]) -> Result<UdpFrame, SocksError> {
    if bytes.len() < 4 {
        return Err(SocksError::Internal("UDP frame shorter than the fixed header".into()));
    }

    // bytes[0..2] reserved, ignored.
    let frame_number = bytes[2];
    let atyp = bytes[3];

    let mut pos = 4usize;
    let host = match atyp {
        0x01 => {
            if bytes.len() < pos + 4 {
                return Err(SocksError::Internal("UDP frame truncated IPv4 address".into()));
            }
            let ip = std::net::Ipv4Addr::new(bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]);
            pos += 4;
            ip.to_string()
        }
        0x04 => {
            if bytes.len() < pos + 16 {
                return Err(SocksError::Internal("UDP frame truncated IPv6 address".into()));
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&bytes[pos..pos + 16]);
            pos += 16;
            std::net::Ipv6Addr::from(octets).to_string()
        }
        0x03 => {
            if bytes.len() < pos + 1 {
                return Err(SocksError::Internal("UDP frame missing hostname length".into()));
            }
            let len = bytes[pos] as usize;
            pos += 1;
            if bytes.len() < pos + len {
                return Err(SocksError::Internal("UDP frame truncated hostname".into()));
            }
            let name = String::from_utf8_lossy(&bytes[pos..pos + len]).into_owned();
            pos += len;
            name
        }
        other => return Err(SocksError::Internal(format!("unknown UDP frame ATYP {other:#04x}"))),
    };

    if bytes.len() < pos + 2 {
        return Err(SocksError::Internal("UDP frame missing port".into()));
    }
    let port = BigEndian::read_u16(&bytes[pos..pos + 2]);
    pos += 2;

    let data = bytes[pos..].to_vec();

    Ok(UdpFrame {
        frame_number,
        remote_host: SocksRemoteHost::new(host, port),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ipv4_frame() {
        let frame = UdpFrame {
            frame_number: 3,
            remote_host: SocksRemoteHost::new("1.2.3.4", 53),
            data: vec![0xDE, 0xAD],
        };
        let encoded = create_udp_frame(&frame).unwrap();
        assert_eq!(encoded, vec![0x00, 0x00, 0x03, 0x01, 1, 2, 3, 4, 0x00, 0x35, 0xDE, 0xAD]);
        assert_eq!(parse_udp_frame(&encoded).unwrap(), frame);
    }

    #[test]
    fn round_trips_hostname_frame() {
        let frame = UdpFrame {
            frame_number: 0,
            remote_host: SocksRemoteHost::new("example.com", 80),
            data: vec![1, 2, 3, 4, 5],
        };
        let encoded = create_udp_frame(&frame).unwrap();
        assert_eq!(parse_udp_frame(&encoded).unwrap(), frame);
    }

    #[test]
    fn round_trips_ipv6_frame() {
        let frame = UdpFrame {
            frame_number: 7,
            remote_host: SocksRemoteHost::new("::1", 443),
            data: vec![],
        };
        let encoded = create_udp_frame(&frame).unwrap();
        assert_eq!(parse_udp_frame(&encoded).unwrap(), frame);
    }

    #[test]
    fn rejects_truncated_frame() {
        assert!(parse_udp_frame(&[0x00, 0x00, 0x00]).is_err());
    }
}
