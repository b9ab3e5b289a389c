//! Token builder façade
//!
//! Every build computes `expire_at = issued_at + ttl_seconds`, attaches one
//! service with the privileges for the role, then signs and encodes.

use crate::config::Credentials;
use crate::token::{self, AccessToken, RtcPrivilege, RtcService, RtmPrivilege, RtmService, TokenError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid role '{0}': must be publisher or subscriber")]
    InvalidRole(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(&'static str),

    #[error("ttl of {ttl_seconds}s from {issued_at} does not fit a u32 timestamp")]
    TtlOverflow { issued_at: u32, ttl_seconds: u32 },

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Channel role, deciding which privileges an RTC token grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Join plus audio, video and data publishing
    Publisher,
    /// Join only
    Subscriber,
}

impl Role {
    /// Lenient parse for request parameters: anything but "publisher" subscribes
    pub fn from_param(s: &str) -> Self {
        if s == "publisher" {
            Role::Publisher
        } else {
            Role::Subscriber
        }
    }

    pub fn privileges(self) -> &'static [RtcPrivilege] {
        match self {
            Role::Publisher => &RtcPrivilege::ALL,
            Role::Subscriber => &[RtcPrivilege::JoinChannel],
        }
    }
}

impl FromStr for Role {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publisher" => Ok(Role::Publisher),
            "subscriber" => Ok(Role::Subscriber),
            other => Err(BuildError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Publisher => write!(f, "publisher"),
            Role::Subscriber => write!(f, "subscriber"),
        }
    }
}

/// Issue time and salt of one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueStamp {
    pub issued_at: u32,
    pub salt: u32,
}

impl IssueStamp {
    /// Current wall-clock second and a fresh random salt
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            issued_at: u32::try_from(secs).unwrap_or(u32::MAX),
            salt: rand::rng().random(),
        }
    }

    pub fn expire_at(self, ttl_seconds: u32) -> Result<u32, BuildError> {
        self.issued_at
            .checked_add(ttl_seconds)
            .ok_or(BuildError::TtlOverflow {
                issued_at: self.issued_at,
                ttl_seconds,
            })
    }
}

/// Builds signed tokens for one set of credentials
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    credentials: Credentials,
}

impl TokenBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// RTC token for a numeric uid (0 means any uid)
    pub fn build_with_uid(
        &self,
        channel_name: &str,
        uid: u32,
        role: Role,
        ttl_seconds: u32,
    ) -> Result<String, BuildError> {
        self.build_with_uid_at(IssueStamp::now(), channel_name, uid, role, ttl_seconds)
    }

    pub fn build_with_uid_at(
        &self,
        stamp: IssueStamp,
        channel_name: &str,
        uid: u32,
        role: Role,
        ttl_seconds: u32,
    ) -> Result<String, BuildError> {
        require("channel name", channel_name)?;
        let service = RtcService::with_uid(channel_name, uid);
        self.build_rtc(stamp, service, role, ttl_seconds)
    }

    /// RTC token for a string user account
    pub fn build_with_account(
        &self,
        channel_name: &str,
        account: &str,
        role: Role,
        ttl_seconds: u32,
    ) -> Result<String, BuildError> {
        self.build_with_account_at(IssueStamp::now(), channel_name, account, role, ttl_seconds)
    }

    pub fn build_with_account_at(
        &self,
        stamp: IssueStamp,
        channel_name: &str,
        account: &str,
        role: Role,
        ttl_seconds: u32,
    ) -> Result<String, BuildError> {
        require("channel name", channel_name)?;
        require("account", account)?;
        let service = RtcService::with_account(channel_name, account);
        self.build_rtc(stamp, service, role, ttl_seconds)
    }

    /// RTM login token
    pub fn build_rtm_token(&self, user_id: &str, ttl_seconds: u32) -> Result<String, BuildError> {
        self.build_rtm_token_at(IssueStamp::now(), user_id, ttl_seconds)
    }

    pub fn build_rtm_token_at(
        &self,
        stamp: IssueStamp,
        user_id: &str,
        ttl_seconds: u32,
    ) -> Result<String, BuildError> {
        require("user id", user_id)?;
        let expire_at = stamp.expire_at(ttl_seconds)?;

        let mut service = RtmService::new(user_id);
        service.privileges.set(RtmPrivilege::Login, expire_at);

        debug!(service = "rtm", ttl_seconds, expire_at, "Building token");
        self.sign(stamp, service)
    }

    fn build_rtc(
        &self,
        stamp: IssueStamp,
        mut service: RtcService,
        role: Role,
        ttl_seconds: u32,
    ) -> Result<String, BuildError> {
        let expire_at = stamp.expire_at(ttl_seconds)?;
        for kind in role.privileges() {
            service.privileges.set(*kind, expire_at);
        }

        debug!(
            service = "rtc",
            channel = %service.channel_name,
            role = %role,
            ttl_seconds,
            expire_at,
            "Building token"
        );
        self.sign(stamp, service)
    }

    fn sign(&self, stamp: IssueStamp, service: impl Into<token::Service>) -> Result<String, BuildError> {
        let mut access_token =
            AccessToken::new(self.credentials.app_id.as_str(), stamp.issued_at, stamp.salt);
        access_token.add_service(service);
        Ok(token::encode(&access_token, &self.credentials.certificate)?)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), BuildError> {
    if value.is_empty() {
        return Err(BuildError::InvalidIdentifier(field));
    }
    Ok(())
}
