//! SOCKS5 command request framer (spec §4.7).
//!
//! Layout: `VER(1)=0x05 | CMD(1) | RSV(1)=0x00 | ATYP(1) | ADDR | PORT(2, BE)`.

use byteorder::{BigEndian, ByteOrder};

use crate::error::SocksError;
use crate::proxy::{AddressType, Command, SocksRemoteHost};

/// Minimum bytes required to peek VER, REP, RSV, ATYP, and the first
/// address byte of the matching response (spec §4.7's watermark of 5).
pub const RESPONSE_MIN_WATERMARK: usize = 5;

/// Frames a SOCKS5 command request for `command` against `destination`.
pub fn frame_request(command: Command, destination: &SocksRemoteHost) -> Result<Vec<u8>, SocksError> {
    let atyp = AddressType::classify(&destination.host);

    let mut buf = Vec::with_capacity(4 + 16 + 2);
    buf.push(0x05);
    buf.push(command.as_u8());
    buf.push(0x00);
    buf.push(atyp as u8);

    match atyp {
        AddressType::Ipv4 => {
            let ip: std::net::Ipv4Addr = destination
                .host
                .parse()
                .map_err(|_| SocksError::Internal("destination host failed to parse as IPv4 after classification".into()))?;
            buf.extend_from_slice(&ip.octets());
        }
        AddressType::Ipv6 => {
            let ip: std::net::Ipv6Addr = destination
                .host
                .parse()
                .map_err(|_| SocksError::Internal("destination host failed to parse as IPv6 after classification".into()))?;
            buf.extend_from_slice(&ip.octets());
        }
        AddressType::Hostname => {
            buf.push(destination.host.len() as u8);
            buf.extend_from_slice(destination.host.as_bytes());
        }
    }

    let mut port_buf = [0u8; 2];
    BigEndian::write_u16(&mut port_buf, destination.port);
    buf.extend_from_slice(&port_buf);

    Ok(buf)
}
