//! Profile store backed by the AWS shared credentials and config files.
//!
//! Profiles are read from two INI files:
//!
//! ```ini
//! # ~/.aws/credentials
//! [default]
//! aws_access_key_id = AKIA...
//! aws_secret_access_key = ...
//!
//! # ~/.aws/config
//! [profile admin]
//! role_arn = arn:aws:iam::123456789012:role/admin
//! source_profile = default
//! region = us-west-2
//! ```
//!
//! The credentials file wins when both files set the same key.

mod credentials_file;
mod ini;
mod store;

pub use credentials_file::CredentialsFile;
pub use ini::IniDocument;
pub use store::ProfileStore;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::aws::StaticCredentials;

/// Name of the distinguished default profile.
pub const DEFAULT_PROFILE: &str = "default";

pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const SESSION_TOKEN: &str = "aws_session_token";
pub const ROLE_ARN: &str = "role_arn";
pub const SOURCE_PROFILE: &str = "source_profile";
pub const REGION: &str = "region";
pub const EXTERNAL_ID: &str = "external_id";
pub const ROLE_SESSION_NAME: &str = "role_session_name";
pub const DURATION_SECONDS: &str = "duration_seconds";

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("The config profile ({0}) could not be found")]
    NotFound(String),

    #[error("could not find section [{section}] in {path:?}")]
    SectionNotFound { section: String, path: PathBuf },

    #[error("profile {profile:?} has no {key} setting")]
    MissingKey { profile: String, key: &'static str },

    #[error("profile {profile:?} has an invalid {key} value: {value:?}")]
    InvalidValue {
        profile: String,
        key: &'static str,
        value: String,
    },

    #[error("Failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Map `None` and the literal `"default"` to the default profile.
pub fn normalize_profile_name(name: Option<&str>) -> &str {
    match name {
        None => DEFAULT_PROFILE,
        Some(name) if name.is_empty() => DEFAULT_PROFILE,
        Some(name) => name,
    }
}

/// One entry in the profile store.
#[derive(Debug, Clone, Default)]
pub struct ProfileRecord {
    pub name: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    pub role_arn: Option<String>,
    pub source_profile: Option<String>,
    pub region: Option<String>,
    pub external_id: Option<String>,
    pub role_session_name: Option<String>,
    pub duration_seconds: Option<u32>,
}

impl ProfileRecord {
    /// Static credentials stored directly in this profile, if both halves are present.
    pub fn static_credentials(&self) -> Option<StaticCredentials> {
        let access_key_id = self.access_key_id.clone()?;
        let secret_access_key = self.secret_access_key.clone()?;
        Some(StaticCredentials {
            access_key_id,
            secret_access_key,
            session_token: self.session_token.clone(),
        })
    }

    /// Role configuration, if this profile assumes a role.
    ///
    /// The source profile falls back to `"default"` when unset.
    pub fn role(&self) -> Option<RoleConfig> {
        let role_arn = self.role_arn.clone()?;
        Some(RoleConfig {
            role_arn,
            source_profile: self
                .source_profile
                .clone()
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            external_id: self.external_id.clone(),
            session_name: self.role_session_name.clone(),
            duration_seconds: self.duration_seconds,
        })
    }
}

/// Everything needed to call AssumeRole on behalf of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleConfig {
    pub role_arn: String,
    pub source_profile: String,
    pub external_id: Option<String>,
    /// Explicit session name; a random one is generated when unset.
    pub session_name: Option<String>,
    pub duration_seconds: Option<u32>,
}

impl RoleConfig {
    pub fn new(role_arn: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            source_profile: DEFAULT_PROFILE.to_string(),
            external_id: None,
            session_name: None,
            duration_seconds: None,
        }
    }
}
