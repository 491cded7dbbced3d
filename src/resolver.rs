//! Turns a profile name into the environment a child process should see.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::aws::{ProviderError, RoleAssumer, StaticCredentials};
use crate::profile::{normalize_profile_name, ProfileError, ProfileStore};

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
/// Older SDKs (boto 2 and friends) read the token from here.
pub const ENV_SECURITY_TOKEN: &str = "AWS_SECURITY_TOKEN";
pub const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("profile {profile:?} has no aws_access_key_id/aws_secret_access_key")]
    MissingCredentials { profile: String },

    #[error("Could not assume role {role_arn}")]
    AssumeRole {
        role_arn: String,
        #[source]
        source: ProviderError,
    },
}

impl ResolveError {
    /// The upstream error, when the failure came from AssumeRole.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            ResolveError::AssumeRole { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Effective environment settings for one profile.
///
/// Keys with no value are never present.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    vars: BTreeMap<String, String>,
}

impl ResolvedEnvironment {
    fn set(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) if !value.is_empty() => {
                self.vars.insert(key.to_string(), value.to_string());
            }
            _ => {}
        }
    }

    fn set_credentials(
        &mut self,
        access_key_id: &str,
        secret_access_key: &SecretString,
        session_token: Option<&SecretString>,
    ) {
        self.set(ENV_ACCESS_KEY_ID, Some(access_key_id));
        self.set(ENV_SECRET_ACCESS_KEY, Some(secret_access_key.expose_secret()));
        let token = session_token.map(|token| token.expose_secret());
        self.set(ENV_SESSION_TOKEN, token);
        self.set(ENV_SECURITY_TOKEN, token);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for ResolvedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.vars.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

/// Resolves profiles from a [`ProfileStore`], assuming roles through `R`.
pub struct CredentialResolver<R> {
    store: ProfileStore,
    assumer: R,
}

impl<R: RoleAssumer> CredentialResolver<R> {
    pub fn new(store: ProfileStore, assumer: R) -> Self {
        Self { store, assumer }
    }

    /// Resolve `profile` (the default profile when `None`).
    ///
    /// A profile with `role_arn` assumes that role using the static keys of its
    /// source profile. The source profile's own role is not followed, and its
    /// region is not inherited.
    pub async fn resolve(&self, profile: Option<&str>) -> Result<ResolvedEnvironment, ResolveError> {
        let name = normalize_profile_name(profile);
        let record = self.store.get(name)?;
        let mut env = ResolvedEnvironment::default();

        match record.role() {
            None => {
                debug!(profile = %name, "Using static credentials");
                let creds = self.static_credentials(name)?;
                env.set_credentials(
                    &creds.access_key_id,
                    &creds.secret_access_key,
                    creds.session_token.as_ref(),
                );
            }
            Some(role) => {
                debug!(
                    profile = %name,
                    source_profile = %role.source_profile,
                    role_arn = %role.role_arn,
                    "Assuming role"
                );
                let source = self.static_credentials(&role.source_profile)?;
                let temporary = self
                    .assumer
                    .assume_role(&source, &role)
                    .await
                    .map_err(|source| ResolveError::AssumeRole {
                        role_arn: role.role_arn.clone(),
                        source,
                    })?;
                info!(profile = %name, role_arn = %role.role_arn, "Resolved role credentials");
                env.set_credentials(
                    &temporary.access_key_id,
                    &temporary.secret_access_key,
                    Some(&temporary.session_token),
                );
            }
        }

        env.set(ENV_DEFAULT_REGION, record.region.as_deref());
        Ok(env)
    }

    fn static_credentials(&self, profile: &str) -> Result<StaticCredentials, ResolveError> {
        self.store
            .get(profile)?
            .static_credentials()
            .ok_or_else(|| ResolveError::MissingCredentials {
                profile: profile.to_string(),
            })
    }
}
