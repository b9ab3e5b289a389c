//! Request parameters
//!
//! Turns the raw strings a caller hands over (path segments, query values,
//! CLI arguments) into typed builder calls. Roles are parsed leniently;
//! everything else is strict.

use crate::builder::{BuildError, Role, TokenBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// TTL used when the caller gives no expiry
pub const DEFAULT_TTL_SECONDS: u32 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unsupported token mode '{0}': must be uid or userAccount")]
    UnsupportedTokenMode(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Parse an optional relative expiry in decimal seconds.
///
/// The value is a TTL added to the current time, never an absolute
/// timestamp.
pub fn parse_ttl(expiry: Option<&str>) -> Result<u32, RequestError> {
    match expiry {
        None => Ok(DEFAULT_TTL_SECONDS),
        Some(s) => parse_decimal(s)
            .ok_or_else(|| RequestError::MalformedInput(format!("failed to parse expiry '{}'", s))),
    }
}

/// Unsigned decimal with no sign, whitespace or radix prefix
fn parse_decimal(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// TTL overflow reaches the caller as malformed input
fn reject_overflow(err: BuildError) -> RequestError {
    match err {
        BuildError::TtlOverflow { ttl_seconds, .. } => RequestError::MalformedInput(format!(
            "expiry {} seconds runs past the token clock",
            ttl_seconds
        )),
        other => RequestError::Build(other),
    }
}

/// How the RTC user is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenMode {
    #[serde(rename = "uid")]
    Uid,
    #[serde(rename = "userAccount")]
    UserAccount,
}

impl FromStr for TokenMode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uid" => Ok(TokenMode::Uid),
            "userAccount" => Ok(TokenMode::UserAccount),
            other => Err(RequestError::UnsupportedTokenMode(other.to_string())),
        }
    }
}

impl fmt::Display for TokenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenMode::Uid => write!(f, "uid"),
            TokenMode::UserAccount => write!(f, "userAccount"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcIdentity {
    Uid(u32),
    Account(String),
}

impl RtcIdentity {
    pub fn parse(mode: TokenMode, value: &str) -> Result<Self, RequestError> {
        match mode {
            TokenMode::Uid => parse_decimal(value).map(RtcIdentity::Uid).ok_or_else(|| {
                RequestError::MalformedInput(format!(
                    "uid '{}' is not an unsigned 32-bit integer",
                    value
                ))
            }),
            TokenMode::UserAccount if value.is_empty() => Err(RequestError::MalformedInput(
                "account must not be empty".to_string(),
            )),
            TokenMode::UserAccount => Ok(RtcIdentity::Account(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcTokenRequest {
    pub channel_name: String,
    pub role: Role,
    pub identity: RtcIdentity,
    /// The identity exactly as supplied; the RTM user id of a combined issue
    pub identity_param: String,
    pub ttl_seconds: u32,
}

impl RtcTokenRequest {
    pub fn parse(
        channel_name: &str,
        role: &str,
        mode: &str,
        identity_param: &str,
        expiry: Option<&str>,
    ) -> Result<Self, RequestError> {
        let ttl_seconds = parse_ttl(expiry)?;
        if channel_name.is_empty() {
            return Err(RequestError::MalformedInput(
                "channel name must not be empty".to_string(),
            ));
        }
        let mode: TokenMode = mode.parse()?;
        let identity = RtcIdentity::parse(mode, identity_param)?;

        Ok(Self {
            channel_name: channel_name.to_string(),
            role: Role::from_param(role),
            identity,
            identity_param: identity_param.to_string(),
            ttl_seconds,
        })
    }

    pub fn issue(&self, builder: &TokenBuilder) -> Result<String, RequestError> {
        match &self.identity {
            RtcIdentity::Uid(uid) => {
                builder.build_with_uid(&self.channel_name, *uid, self.role, self.ttl_seconds)
            }
            RtcIdentity::Account(account) => {
                builder.build_with_account(&self.channel_name, account, self.role, self.ttl_seconds)
            }
        }
        .map_err(reject_overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmTokenRequest {
    pub user_id: String,
    pub ttl_seconds: u32,
}

impl RtmTokenRequest {
    pub fn parse(user_id: &str, expiry: Option<&str>) -> Result<Self, RequestError> {
        let ttl_seconds = parse_ttl(expiry)?;
        if user_id.is_empty() {
            return Err(RequestError::MalformedInput(
                "user id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            user_id: user_id.to_string(),
            ttl_seconds,
        })
    }

    pub fn issue(&self, builder: &TokenBuilder) -> Result<String, RequestError> {
        builder
            .build_rtm_token(&self.user_id, self.ttl_seconds)
            .map_err(reject_overflow)
    }
}

/// RTC and RTM tokens issued together for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub rtc_token: String,
    pub rtm_token: String,
}

/// Issue both tokens, or neither.
///
/// The RTM user id is the RTC identity string as supplied, so a uid of
/// `007` logs in to RTM as `007`, not `7`.
pub fn issue_both(builder: &TokenBuilder, request: &RtcTokenRequest) -> Result<TokenPair, RequestError> {
    let rtc_token = request.issue(builder)?;
    let rtm_token = builder
        .build_rtm_token(&request.identity_param, request.ttl_seconds)
        .map_err(reject_overflow)?;
    Ok(TokenPair {
        rtc_token,
        rtm_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::token;

    fn builder() -> TokenBuilder {
        TokenBuilder::new(Credentials::new("A1", "S1").unwrap())
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl(None), Ok(3600));
        assert_eq!(parse_ttl(Some("600")), Ok(600));
        assert!(matches!(
            parse_ttl(Some("abc")),
            Err(RequestError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_ttl(Some("-5")),
            Err(RequestError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_ttl(Some("4294967296")),
            Err(RequestError::MalformedInput(_))
        ));
        for signed in ["+600", " 600", "600 "] {
            assert!(matches!(
                parse_ttl(Some(signed)),
                Err(RequestError::MalformedInput(_))
            ));
        }
        assert_eq!(parse_ttl(Some("0600")), Ok(600));
    }

    #[test]
    fn test_token_mode() {
        assert_eq!("uid".parse::<TokenMode>(), Ok(TokenMode::Uid));
        assert_eq!("userAccount".parse::<TokenMode>(), Ok(TokenMode::UserAccount));
        assert_eq!(
            "account".parse::<TokenMode>(),
            Err(RequestError::UnsupportedTokenMode("account".to_string()))
        );
        assert_eq!(TokenMode::UserAccount.to_string(), "userAccount");
    }

    #[test]
    fn test_rtc_request_uid_mode() {
        let request = RtcTokenRequest::parse("room1", "publisher", "uid", "12345", None).unwrap();
        assert_eq!(request.identity, RtcIdentity::Uid(12345));
        assert_eq!(request.role, Role::Publisher);
        assert_eq!(request.ttl_seconds, DEFAULT_TTL_SECONDS);
    }

    #[test]
    fn test_rtc_request_unknown_role_subscribes() {
        let request = RtcTokenRequest::parse("room1", "host", "uid", "1", Some("60")).unwrap();
        assert_eq!(request.role, Role::Subscriber);
    }

    #[test]
    fn test_rtc_request_rejects_bad_uid() {
        for uid in ["abc", "", "4294967296", "-1", "+1", "+12345"] {
            assert!(matches!(
                RtcTokenRequest::parse("room1", "publisher", "uid", uid, None),
                Err(RequestError::MalformedInput(_))
            ));
        }
    }

    #[test]
    fn test_rtc_request_rejects_empty_account() {
        assert_eq!(
            RtcTokenRequest::parse("room1", "publisher", "userAccount", "", None),
            Err(RequestError::MalformedInput("account must not be empty".to_string()))
        );
    }

    #[test]
    fn test_rtc_request_rejects_unknown_mode() {
        assert_eq!(
            RtcTokenRequest::parse("room1", "publisher", "email", "a@b", None),
            Err(RequestError::UnsupportedTokenMode("email".to_string()))
        );
    }

    #[test]
    fn test_rtc_request_rejects_empty_channel() {
        assert!(matches!(
            RtcTokenRequest::parse("", "publisher", "uid", "1", None),
            Err(RequestError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_rtm_request() {
        let request = RtmTokenRequest::parse("user-42", Some("600")).unwrap();
        assert_eq!(request.ttl_seconds, 600);
        assert!(matches!(
            RtmTokenRequest::parse("", None),
            Err(RequestError::MalformedInput(_))
        ));
        assert!(matches!(
            RtmTokenRequest::parse("user-42", Some("+600")),
            Err(RequestError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_ttl_past_clock_is_malformed_input() {
        let b = builder();
        let rtm = RtmTokenRequest::parse("user-42", Some("4294967295")).unwrap();
        assert!(matches!(rtm.issue(&b), Err(RequestError::MalformedInput(_))));

        let rtc = RtcTokenRequest::parse("room1", "publisher", "uid", "1", Some("4294967295")).unwrap();
        assert!(matches!(rtc.issue(&b), Err(RequestError::MalformedInput(_))));
        assert!(matches!(issue_both(&b, &rtc), Err(RequestError::MalformedInput(_))));
    }

    #[test]
    fn test_issue_both_keeps_uid_as_supplied() {
        let b = builder();
        let request = RtcTokenRequest::parse("room1", "publisher", "uid", "007", None).unwrap();
        assert_eq!(request.identity, RtcIdentity::Uid(7));
        assert_eq!(request.identity_param, "007");

        let pair = issue_both(&b, &request).unwrap();
        let cert = &b.credentials().certificate;
        let rtc = token::decode(&pair.rtc_token, "A1", cert, "room1").unwrap();
        let rtm = token::decode(&pair.rtm_token, "A1", cert, "007").unwrap();
        assert_eq!(rtc.rtc().unwrap().uid(), Some(7));
        assert_eq!(rtm.rtm().unwrap().user_id, "007");
    }

    #[test]
    fn test_issue_both() {
        let b = builder();
        let request =
            RtcTokenRequest::parse("room1", "subscriber", "userAccount", "alice", Some("120")).unwrap();
        let pair = issue_both(&b, &request).unwrap();

        let cert = &b.credentials().certificate;
        let rtc = token::decode(&pair.rtc_token, "A1", cert, "room1").unwrap();
        let rtm = token::decode(&pair.rtm_token, "A1", cert, "alice").unwrap();
        assert_eq!(rtc.rtc().unwrap().account, "alice");
        assert_eq!(rtm.rtm().unwrap().user_id, "alice");

        let json = serde_json::to_value(&pair).unwrap();
        assert!(json.get("rtcToken").is_some());
        assert!(json.get("rtmToken").is_some());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RequestError::UnsupportedTokenMode("x".to_string()).to_string(),
            "unsupported token mode 'x': must be uid or userAccount"
        );
        let err: RequestError = BuildError::InvalidIdentifier("user id").into();
        assert_eq!(err.to_string(), "invalid identifier: user id");
    }
}
