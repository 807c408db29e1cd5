//! RFC 1929 username/password sub-negotiation (spec §4.6).

use crate::error::SocksError;

/// Frames the username/password sub-negotiation request:
/// `VER(1)=0x01 | ULEN(1) | UNAME | PLEN(1) | PASSWD`.
pub fn frame_request(user_id: &str, password: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3 + user_id.len() + password.len());
    buf.push(0x01);
    buf.push(user_id.len() as u8);
    buf.extend_from_slice(user_id.as_bytes());
    buf.push(password.len() as u8);
    buf.extend_from_slice(password.as_bytes());
    buf
}

/// Fixed size of the sub-negotiation response.
pub const RESPONSE_LEN: usize = 2;

/// Parses the 2-byte `VER | STATUS` response. `VER` is traditionally
/// 0x01 but, per RFC 1929, is not checked here; only `STATUS` matters.
pub fn parse_response(bytes: &[u8]) -> Result<(), SocksError> {
    debug_assert_eq!(bytes.len(), RESPONSE_LEN);

    if bytes[1] != 0x00 {
        return Err(SocksError::AuthenticationFailed);
    }
    Ok(())
}
