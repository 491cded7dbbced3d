//! Clients for the two AWS services this crate talks to.
//!
//! The resolver and the rotation protocol only see the traits defined here,
//! so both can run against in-memory fakes in tests. The real implementations
//! wrap the AWS SDK clients:
//!
//! - [`StsClient`] implements [`RoleAssumer`] (`AssumeRole`)
//! - [`IamClient`] implements [`KeyManager`] (`GetUser`, `ListAccessKeys`,
//!   `CreateAccessKey`, `UpdateAccessKey`, `DeleteAccessKey`)

mod iam;
mod sdk;
mod sts;

pub use iam::{IamClient, IamClientFactory};
pub use sts::{random_session_name, StsClient};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::profile::RoleConfig;

/// Error code returned by AWS when the calling access key does not exist.
pub const INVALID_CLIENT_TOKEN_ID: &str = "InvalidClientTokenId";

/// Where requests for one service go.
///
/// Without a URL the SDK picks the service's endpoint for `region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Option<String>,
    region: String,
    timeout: Option<Duration>,
}

impl Endpoint {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            url: None,
            region: region.into(),
            timeout: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Give up on a single request after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Access key id + secret, optionally with a session token.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

impl StaticCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: SecretString) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key,
            session_token: None,
        }
    }
}

/// Short-lived credentials returned by AssumeRole.
#[derive(Debug, Clone)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: SecretString,
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKeyStatus {
    Active,
    Inactive,
}

impl AccessKeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKeyStatus::Active => "Active",
            AccessKeyStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for AccessKeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessKeyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(AccessKeyStatus::Active),
            "Inactive" => Ok(AccessKeyStatus::Inactive),
            other => Err(format!("unknown access key status: {other}")),
        }
    }
}

/// Metadata for one access key of an IAM user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub id: String,
    pub status: AccessKeyStatus,
    pub user_name: String,
}

/// A freshly created access key. The secret is only ever returned once.
#[derive(Debug, Clone)]
pub struct NewAccessKey {
    pub id: String,
    pub secret: SecretString,
    pub user_name: String,
}

impl NewAccessKey {
    pub fn credentials(&self) -> StaticCredentials {
        StaticCredentials::new(self.id.clone(), self.secret.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The service answered with an error document.
    #[error("An error occurred ({code}) when calling the {operation} operation: {message}")]
    Service {
        operation: String,
        code: String,
        message: String,
        status: u16,
    },

    /// The request never got an answer. `transient` is set for timeouts and
    /// connection failures.
    #[error("{operation} request failed")]
    Transport {
        operation: String,
        transient: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode {operation} response: {message}")]
    Decode { operation: String, message: String },
}

impl ProviderError {
    pub fn operation(&self) -> &str {
        match self {
            ProviderError::Service { operation, .. }
            | ProviderError::Transport { operation, .. }
            | ProviderError::Decode { operation, .. } => operation,
        }
    }

    /// Upstream error code, for errors the service itself reported.
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the service (not the network or our decoder) rejected the call.
    pub fn is_service_error(&self) -> bool {
        matches!(self, ProviderError::Service { .. })
    }

    /// Whether the same call may succeed later: any service rejection, or a
    /// request that timed out or could not connect.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Service { .. } => true,
            ProviderError::Transport { transient, .. } => *transient,
            ProviderError::Decode { .. } => false,
        }
    }
}

/// Exchanges static credentials for a role's temporary credentials.
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(
        &self,
        credentials: &StaticCredentials,
        role: &RoleConfig,
    ) -> Result<TemporaryCredentials, ProviderError>;
}

/// The IAM operations used to rotate one user's access keys.
///
/// An implementation is bound to one set of caller credentials.
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// User name of the caller.
    async fn get_current_user(&self) -> Result<String, ProviderError>;

    async fn list_access_keys(&self, user_name: &str) -> Result<Vec<AccessKey>, ProviderError>;

    async fn create_access_key(&self, user_name: &str) -> Result<NewAccessKey, ProviderError>;

    async fn update_access_key_status(
        &self,
        key_id: &str,
        status: AccessKeyStatus,
        user_name: &str,
    ) -> Result<(), ProviderError>;

    async fn delete_access_key(&self, key_id: &str) -> Result<(), ProviderError>;
}

/// Builds a [`KeyManager`] authenticated with the given credentials.
pub trait KeyManagerFactory: Send + Sync {
    fn connect(&self, credentials: &StaticCredentials) -> Result<Box<dyn KeyManager>, ProviderError>;
}
