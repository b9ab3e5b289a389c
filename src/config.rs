//! Application credentials
//!
//! The app id and certificate are read once at startup and passed explicitly
//! to every builder. The certificate never leaves this process: it is not
//! logged, not printed by `Debug`, and not embedded in tokens.

use std::fmt;
use thiserror::Error;

pub const APP_ID_ENV: &str = "APP_ID";
pub const APP_CERTIFICATE_ENV: &str = "APP_CERTIFICATE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Platform-issued application identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppId(String);

impl AppId {
    pub fn new(app_id: impl Into<String>) -> Result<Self, ConfigError> {
        let app_id = app_id.into();
        if app_id.is_empty() {
            return Err(ConfigError::Empty(APP_ID_ENV));
        }
        Ok(Self(app_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signing secret paired with an [`AppId`]
#[derive(Clone)]
pub struct Certificate(String);

impl Certificate {
    pub fn new(certificate: impl Into<String>) -> Result<Self, ConfigError> {
        let certificate = certificate.into();
        if certificate.is_empty() {
            return Err(ConfigError::Empty(APP_CERTIFICATE_ENV));
        }
        Ok(Self(certificate))
    }

    /// Key material for the signer
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Certificate([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_id: AppId,
    pub certificate: Certificate,
}

impl Credentials {
    pub fn new(app_id: impl Into<String>, certificate: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            app_id: AppId::new(app_id)?,
            certificate: Certificate::new(certificate)?,
        })
    }
}
