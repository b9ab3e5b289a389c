//! Token text encoding and verification
//!
//! ```text
//! "007" ‖ base64url( signature[32] ‖ crc32(app_id) ‖ crc32(primary) ‖ message )
//! ```
//!
//! The CRC fields let a verifier reject a token for the wrong app or channel
//! before doing any HMAC work. They are not a security boundary; the
//! signature is.

use crate::config::Certificate;
use crate::token::message::{AccessToken, MessageError};
use crate::token::packer::{PackError, Packer, Unpacker};
use crate::token::signer::{self, SIGNATURE_LEN};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use thiserror::Error;
use tracing::debug;

/// Format version marker prefixed to every token
pub const VERSION: &str = "007";

/// Fixed bytes ahead of the message: signature and two checksums
const HEADER_LEN: usize = SIGNATURE_LEN + 4 + 4;

/// URL-safe alphabet, unpadded on output, padding optional on input
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unsupported token version '{0}'")]
    UnsupportedVersion(String),

    #[error("invalid token: {0}")]
    Invalid(&'static str),

    #[error("truncated token: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("malformed token message: {0}")]
    Malformed(#[from] MessageError),

    #[error("token encoding failed: {0}")]
    Encoding(PackError),
}

impl From<PackError> for TokenError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Truncated { needed, remaining } => TokenError::Truncated { needed, remaining },
            other => TokenError::Malformed(MessageError::Pack(other)),
        }
    }
}

/// The four fields of a decoded token body
struct SignedParts<'a> {
    signature: &'a [u8],
    crc_app_id: u32,
    crc_primary: u32,
    message: &'a [u8],
}

impl<'a> SignedParts<'a> {
    fn split(bytes: &'a [u8]) -> Result<Self, TokenError> {
        if bytes.len() < HEADER_LEN {
            return Err(TokenError::Truncated {
                needed: HEADER_LEN,
                remaining: bytes.len(),
            });
        }
        let (signature, rest) = bytes.split_at(SIGNATURE_LEN);
        let mut unpacker = Unpacker::new(rest);
        let crc_app_id = unpacker.get_u32()?;
        let crc_primary = unpacker.get_u32()?;
        Ok(Self {
            signature,
            crc_app_id,
            crc_primary,
            message: &rest[unpacker.position()..],
        })
    }
}

/// Sign `token` with `certificate` and encode it as text
pub fn encode(token: &AccessToken, certificate: &Certificate) -> Result<String, TokenError> {
    let message = token.pack_message().map_err(TokenError::Encoding)?;
    let signature = signer::sign(certificate.expose(), token.issued_at, token.salt, &message);

    let mut body = Vec::with_capacity(HEADER_LEN + message.len());
    body.extend_from_slice(&signature);
    body.extend_from_slice(&crc32fast::hash(token.app_id.as_bytes()).to_le_bytes());
    body.extend_from_slice(&crc32fast::hash(token.primary_identifier().as_bytes()).to_le_bytes());
    body.extend_from_slice(&message);

    Ok(format!("{}{}", VERSION, TOKEN_ENGINE.encode(body)))
}

fn decode_body(token: &str) -> Result<Vec<u8>, TokenError> {
    let body = token.strip_prefix(VERSION).ok_or_else(|| {
        TokenError::UnsupportedVersion(token.chars().take(VERSION.len()).collect())
    })?;
    TOKEN_ENGINE
        .decode(body)
        .map_err(|_| TokenError::Invalid("body is not url-safe base64"))
}

/// Verify `token` for the asserted app id and primary identifier (channel
/// name for RTC tokens, user id for RTM tokens) and return its contents.
pub fn decode(
    token: &str,
    app_id: &str,
    certificate: &Certificate,
    primary: &str,
) -> Result<AccessToken, TokenError> {
    let bytes = decode_body(token)?;
    let parts = SignedParts::split(&bytes)?;

    if parts.crc_app_id != crc32fast::hash(app_id.as_bytes()) {
        debug!("Token rejected by app id checksum");
        return Err(TokenError::Invalid("app id checksum mismatch"));
    }
    if parts.crc_primary != crc32fast::hash(primary.as_bytes()) {
        debug!("Token rejected by channel checksum");
        return Err(TokenError::Invalid("channel checksum mismatch"));
    }

    // The signing key depends on issued_at and salt, which sit right after
    // the app id at the start of the message
    let mut expected_prefix = Packer::new();
    expected_prefix
        .put_str(app_id)
        .map_err(|_| TokenError::Invalid("app id mismatch"))?;
    let expected_prefix = expected_prefix.into_bytes();
    let header = parts
        .message
        .strip_prefix(expected_prefix.as_slice())
        .ok_or(TokenError::Invalid("app id mismatch"))?;
    let mut unpacker = Unpacker::new(header);
    let issued_at = unpacker.get_u32()?;
    let salt = unpacker.get_u32()?;

    if !signer::verify(certificate.expose(), issued_at, salt, parts.message, parts.signature) {
        debug!("Token rejected by signature");
        return Err(TokenError::Invalid("signature mismatch"));
    }

    let access_token = AccessToken::unpack_message(parts.message)?;
    if access_token.primary_identifier() != primary {
        return Err(TokenError::Invalid("channel mismatch"));
    }
    Ok(access_token)
}

/// Decode a token's contents without checking checksums or signature.
///
/// For diagnostics only: nothing returned here is trustworthy.
pub fn decode_unverified(token: &str) -> Result<AccessToken, TokenError> {
    let bytes = decode_body(token)?;
    let parts = SignedParts::split(&bytes)?;
    Ok(AccessToken::unpack_message(parts.message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::message::{RtcService, RtmService};
    use crate::token::privileges::{RtcPrivilege, RtmPrivilege, ServiceType};

    const RTC_GOLDEN: &str = "007n-Nvz4BNCYImaip68h3ULibLCsKQ6II8kdxnSwmWFsSBbGX5Kjpz5AIAQTEA8VNlKgAAAA\
        EAAQAFAHJvb20xBQAxMjM0NQQAAQAQ_1NlAgAQ_1NlAwAQ_1NlBAAQ_1Nl";
    const RTM_GOLDEN: &str = "007vnsJuk22deoNpz2FZ1hH2svbtiaBmDB3kPVG26pIv0-BbGX5c7gGfQIAQTEA8VNlKgAAAA\
        EAAgAHAHVzZXItNDIBAAEAWPNTZQ";

    fn cert() -> Certificate {
        Certificate::new("S1").unwrap()
    }

    fn rtc_token() -> AccessToken {
        let mut token = AccessToken::new("A1", 1_700_000_000, 42);
        token.add_service(RtcService::with_uid("room1", 12345));
        for kind in RtcPrivilege::ALL {
            token.set_privilege(kind, 1_700_003_600).unwrap();
        }
        token
    }

    fn rtm_token() -> AccessToken {
        let mut token = AccessToken::new("A1", 1_700_000_000, 42);
        token.add_service(RtmService::new("user-42"));
        token.set_privilege(RtmPrivilege::Login, 1_700_000_600).unwrap();
        token
    }

    fn reencode(bytes: &[u8]) -> String {
        format!("{}{}", VERSION, TOKEN_ENGINE.encode(bytes))
    }

    #[test]
    fn test_encode_rtc_golden() {
        assert_eq!(encode(&rtc_token(), &cert()).unwrap(), RTC_GOLDEN);
    }

    #[test]
    fn test_encode_rtm_golden() {
        assert_eq!(encode(&rtm_token(), &cert()).unwrap(), RTM_GOLDEN);
    }

    #[test]
    fn test_checksum_layout() {
        let bytes = decode_body(RTC_GOLDEN).unwrap();
        // crc32("A1") and crc32("room1"), little-endian
        assert_eq!(&bytes[32..36], &0xf965_6c81u32.to_le_bytes());
        assert_eq!(&bytes[36..40], &0xe473_3a2au32.to_le_bytes());
    }

    #[test]
    fn test_output_is_url_safe_and_unpadded() {
        for token in [RTC_GOLDEN, RTM_GOLDEN] {
            assert!(!token.contains('+'));
            assert!(!token.contains('/'));
            assert!(!token.contains('='));
        }
    }

    #[test]
    fn test_decode_golden() {
        let decoded = decode(RTC_GOLDEN, "A1", &cert(), "room1").unwrap();
        assert_eq!(decoded, rtc_token());

        let decoded = decode(RTM_GOLDEN, "A1", &cert(), "user-42").unwrap();
        assert_eq!(decoded.rtm().unwrap().user_id, "user-42");
        assert_eq!(
            decoded.privileges_for(ServiceType::Rtm),
            vec![(RtmPrivilege::Login.into(), 1_700_000_600)]
        );
    }

    #[test]
    fn test_decode_accepts_restored_padding() {
        let padded = format!("{}=", RTM_GOLDEN);
        assert!(decode(&padded, "A1", &cert(), "user-42").is_ok());
    }

    #[test]
    fn test_unsupported_version() {
        let token = RTC_GOLDEN.replacen("007", "006", 1);
        assert_eq!(
            decode(&token, "A1", &cert(), "room1"),
            Err(TokenError::UnsupportedVersion("006".to_string()))
        );
        assert_eq!(
            decode("", "A1", &cert(), "room1"),
            Err(TokenError::UnsupportedVersion(String::new()))
        );
    }

    #[test]
    fn test_wrong_app_id_or_channel() {
        assert_eq!(
            decode(RTC_GOLDEN, "A2", &cert(), "room1"),
            Err(TokenError::Invalid("app id checksum mismatch"))
        );
        assert_eq!(
            decode(RTC_GOLDEN, "A1", &cert(), "room2"),
            Err(TokenError::Invalid("channel checksum mismatch"))
        );
    }

    #[test]
    fn test_wrong_certificate() {
        let other = Certificate::new("S2").unwrap();
        assert_eq!(
            decode(RTC_GOLDEN, "A1", &other, "room1"),
            Err(TokenError::Invalid("signature mismatch"))
        );
    }

    #[test]
    fn test_every_single_byte_flip_is_rejected() {
        let bytes = decode_body(RTC_GOLDEN).unwrap();
        for i in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[i] ^= 0x01;
            let result = decode(&reencode(&tampered), "A1", &cert(), "room1");
            assert!(
                matches!(result, Err(TokenError::Invalid(_))),
                "flip at byte {} gave {:?}",
                i,
                result
            );
        }
    }

    #[test]
    fn test_non_base64_body() {
        assert_eq!(
            decode("007not*base64", "A1", &cert(), "room1"),
            Err(TokenError::Invalid("body is not url-safe base64"))
        );
    }

    #[test]
    fn test_truncated_body() {
        let bytes = decode_body(RTC_GOLDEN).unwrap();
        let result = decode(&reencode(&bytes[..20]), "A1", &cert(), "room1");
        assert_eq!(
            result,
            Err(TokenError::Truncated { needed: HEADER_LEN, remaining: 20 })
        );
    }

    #[test]
    fn test_decode_unverified() {
        let decoded = decode_unverified(RTC_GOLDEN).unwrap();
        assert_eq!(decoded.rtc().unwrap().uid(), Some(12345));
        assert_eq!(decoded.issued_at, 1_700_000_000);
        assert_eq!(decoded.salt, 42);
    }

    #[test]
    fn test_empty_service_set_is_well_formed() {
        let token = AccessToken::new("A1", 1, 2);
        let encoded = encode(&token, &cert()).unwrap();
        let decoded = decode(&encoded, "A1", &cert(), "").unwrap();
        assert_eq!(decoded.services().count(), 0);
    }
}
