//! SOCKS5 method selection (spec §4.5).

use super::{METHOD_NO_AUTH, METHOD_USER_PASS, NO_ACCEPTABLE_METHOD};
use crate::error::SocksError;

/// The method the proxy selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedMethod {
    NoAuth,
    UserPass,
}

/// Frames the method selection request. Offers Username/Password
/// alongside No-Auth whenever the caller has credentials configured;
/// otherwise offers No-Auth only.
pub fn frame_request(user_id: Option<&str>, password: Option<&str>) -> Vec<u8> {
    let has_credentials = user_id.map_or(false, |s| !s.is_empty()) || password.map_or(false, |s| !s.is_empty());

    if has_credentials {
        vec![0x05, 0x02, METHOD_NO_AUTH, METHOD_USER_PASS]
    } else {
        vec![0x05, 0x01, METHOD_NO_AUTH]
    }
}

/// Fixed size of the method selection response.
pub const RESPONSE_LEN: usize = 2;

/// Parses the 2-byte method selection response.
pub fn parse_response(bytes: &[u8]) -> Result<SelectedMethod, SocksError> {
    debug_assert_eq!(bytes.len(), RESPONSE_LEN);

    let version = bytes[0];
    if version != 0x05 {
        return Err(SocksError::ProtocolVersionMismatch(version));
    }

    match bytes[1] {
        METHOD_NO_AUTH => Ok(SelectedMethod::NoAuth),
        METHOD_USER_PASS => Ok(SelectedMethod::UserPass),
        NO_ACCEPTABLE_METHOD => Err(SocksError::NoAcceptedAuthMethod),
        other => Err(SocksError::UnknownAuthMethod(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offers_no_auth_only_without_credentials() {
        assert_eq!(frame_request(None, None), vec![0x05, 0x01, 0x00]);
    }

    #[test]
    fn offers_user_pass_when_credentials_present() {
        assert_eq!(frame_request(Some("u"), Some("p")), vec![0x05, 0x02, 0x00, 0x02]);
    }

    #[test]
    fn offers_user_pass_with_only_username_set() {
        assert_eq!(frame_request(Some("u"), None), vec![0x05, 0x02, 0x00, 0x02]);
    }

    #[test]
    fn parses_no_auth_selection() {
        assert_eq!(parse_response(&[0x05, 0x00]).unwrap(), SelectedMethod::NoAuth);
    }

    #[test]
    fn parses_user_pass_selection() {
        assert_eq!(parse_response(&[0x05, 0x02]).unwrap(), SelectedMethod::UserPass);
    }

    #[test]
    fn rejects_no_acceptable_methods() {
        assert!(matches!(parse_response(&[0x05, 0xFF]), Err(SocksError::NoAcceptedAuthMethod)));
    }

    #[test]
    fn rejects_unknown_method() {
        assert!(matches!(parse_response(&[0x05, 0x01]), Err(SocksError::UnknownAuthMethod(0x01))));
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(matches!(parse_response(&[0x04, 0x00]), Err(SocksError::ProtocolVersionMismatch(0x04))));
    }
}
