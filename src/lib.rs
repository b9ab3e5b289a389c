//! rtctoken - signed access tokens for real-time channels and messaging
//!
//! Issues short-lived tokens that grant a client bounded privileges (join a
//! channel, publish audio/video/data, log in to messaging) and verifies them
//! again. Tokens are stateless: everything a verifier needs is inside the
//! token, authenticated with an HMAC-SHA256 signature keyed by the app
//! certificate.

pub mod builder;
pub mod config;
pub mod request;
pub mod token;

pub use builder::{BuildError, IssueStamp, Role, TokenBuilder};
pub use config::{AppId, Certificate, ConfigError, Credentials};
pub use request::{RequestError, RtcTokenRequest, RtmTokenRequest, TokenMode, TokenPair};
pub use token::{AccessToken, RtcPrivilege, RtmPrivilege, Service, ServiceType, TokenError};
