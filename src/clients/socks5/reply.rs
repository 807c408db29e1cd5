//! SOCKS5 command response parser (spec §4.8).
//!
//! The trickiest parser in the crate: the total response length isn't
//! known until `ATYP` (and, for a hostname, the length byte that follows
//! it) has been inspected. The driving state machine must therefore
//! peek a fixed prefix, decide whether it has enough bytes yet, and only
//! then decide to consume.

use byteorder::{BigEndian, ByteOrder};

use super::request::RESPONSE_MIN_WATERMARK;
use crate::error::SocksError;
use crate::proxy::{SocksProxy, SocksRemoteHost};

/// Outcome of attempting to parse a response out of a buffered prefix.
#[derive(Debug)]
pub enum ParseStep {
    /// Not enough bytes buffered yet; try again once at least this many
    /// bytes are available. Never consumes anything from the buffer.
    NeedMoreBytes(usize),
    /// A complete response was found. Exactly `consumed` bytes should be
    /// removed from the front of the buffer.
    Parsed { response: Socks5Response, consumed: usize },
}

/// A decoded SOCKS5 command response.
#[derive(Debug, Clone)]
pub struct Socks5Response {
    pub remote_host: SocksRemoteHost,
}

/// Attempts to parse a response out of `buffered`, which holds at least
/// [`RESPONSE_MIN_WATERMARK`] bytes (the caller must not invoke this
/// before that many bytes have accumulated).
///
/// `rejected_is_bound` selects which rejection variant is raised for a
/// non-zero `REP`: `false` for the first response to any command,
/// `true` for a BIND's second (inbound-peer) response.
pub fn try_parse(buffered: &[u8], proxy: &SocksProxy, rejected_is_bound: bool) -> Result<ParseStep, SocksError> {
    debug_assert!(buffered.len() >= RESPONSE_MIN_WATERMARK);

    let version = buffered[0];
    if version != 0x05 {
        return Err(SocksError::ProtocolVersionMismatch(version));
    }

    let rep = buffered[1];
    if rep != 0x00 {
        return Err(if rejected_is_bound {
            SocksError::BoundConnectionRejected { code: rep }
        } else {
            SocksError::ConnectionRejected { code: rep }
        });
    }

    let atyp = buffered[3];
    let required = match atyp {
        0x01 => 4 + 4 + 2,
        0x04 => 4 + 16 + 2,
        0x03 => {
            let hostname_len = buffered[4] as usize;
            4 + 1 + hostname_len + 2
        }
        other => return Err(SocksError::Internal(format!("unsupported SOCKS5 ATYP {other:#04x}"))),
    };

    if buffered.len() < required {
        return Ok(ParseStep::NeedMoreBytes(required));
    }

    let (host, port) = match atyp {
        0x01 => {
            let ip = std::net::Ipv4Addr::new(buffered[4], buffered[5], buffered[6], buffered[7]);
            let mut host = ip.to_string();
            if ip.is_unspecified() {
                if let Some(substitute) = proxy.wildcard_substitute() {
                    host = substitute.to_string();
                }
            }
            let port = BigEndian::read_u16(&buffered[8..10]);
            (host, port)
        }
        0x04 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buffered[4..20]);
            let ip = std::net::Ipv6Addr::from(octets);
            let mut host = ip.to_string();
            if ip.is_unspecified() {
                if let Some(substitute) = proxy.wildcard_substitute() {
                    host = substitute.to_string();
                }
            }
            let port = BigEndian::read_u16(&buffered[20..22]);
            (host, port)
        }
        0x03 => {
            let hostname_len = buffered[4] as usize;
            let host = String::from_utf8_lossy(&buffered[5..5 + hostname_len]).into_owned();
            let port = BigEndian::read_u16(&buffered[5 + hostname_len..5 + hostname_len + 2]);
            (host, port)
        }
        other => return Err(SocksError::Internal(format!("unsupported SOCKS5 ATYP {other:#04x}"))),
    };

    Ok(ParseStep::Parsed {
        response: Socks5Response {
            remote_host: SocksRemoteHost::new(host, port),
        },
        consumed: required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> SocksProxy {
        SocksProxy::socks5("proxy.example.com", 1080).with_proxy_address("127.0.0.1")
    }

    #[test]
    fn requests_more_bytes_for_hostname_reply_until_length_known() {
        // VER REP RSV ATYP LEN ...
        let partial = [0x05, 0x00, 0x00, 0x03, 11];
        match try_parse(&partial, &proxy(), false).unwrap() {
            ParseStep::NeedMoreBytes(required) => assert_eq!(required, 4 + 1 + 11 + 2),
            other => panic!("expected NeedMoreBytes, got {other:?}"),
        }
    }

    #[test]
    fn parses_ipv4_reply_with_wildcard_substitution() {
        let bytes = [0x05, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x1F, 0x90];
        let step = try_parse(&bytes, &proxy(), false).unwrap();
        match step {
            ParseStep::Parsed { response, consumed } => {
                assert_eq!(consumed, 10);
                assert_eq!(response.remote_host.host, "127.0.0.1");
                assert_eq!(response.remote_host.port, 0x1F90);
            }
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn parses_bind_second_response() {
        let bytes = [0x05, 0x00, 0x00, 0x01, 192, 168, 1, 5, 0x30, 0x39];
        let step = try_parse(&bytes, &proxy(), true).unwrap();
        match step {
            ParseStep::Parsed { response, .. } => {
                assert_eq!(response.remote_host.host, "192.168.1.5");
                assert_eq!(response.remote_host.port, 12345);
            }
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nonzero_rep() {
        let bytes = [0x05, 0x02, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        let err = try_parse(&bytes, &proxy(), false).unwrap_err();
        assert!(matches!(err, SocksError::ConnectionRejected { code: 0x02 }));
    }

    #[test]
    fn rejects_bound_second_response_as_bound_error() {
        let bytes = [0x05, 0x02, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        let err = try_parse(&bytes, &proxy(), true).unwrap_err();
        assert!(matches!(err, SocksError::BoundConnectionRejected { code: 0x02 }));
    }

    #[test]
    fn rejects_wrong_version() {
        let bytes = [0x04, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        assert!(matches!(try_parse(&bytes, &proxy(), false), Err(SocksError::ProtocolVersionMismatch(0x04))));
    }
}
