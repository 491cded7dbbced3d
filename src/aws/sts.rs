use async_trait::async_trait;
use aws_sdk_sts::config::retry::RetryConfig;
use aws_sdk_sts::config::timeout::TimeoutConfig;
use aws_sdk_sts::config::{BehaviorVersion, Region};
use chrono::{DateTime, Utc};
use rand::Rng;
use secrecy::SecretString;
use tracing::info;

use super::sdk::{self, missing};
use super::{Endpoint, ProviderError, RoleAssumer, StaticCredentials, TemporaryCredentials};
use crate::profile::RoleConfig;

const ASSUME_ROLE: &str = "AssumeRole";

/// Session name for an AssumeRole call: `awsudo-` plus 32 random bits in hex.
///
/// The name only tells calls apart in CloudTrail.
pub fn random_session_name() -> String {
    format!("awsudo-{:08x}", rand::thread_rng().gen::<u32>())
}

/// STS client. Each call is signed with the credentials passed to it.
#[derive(Debug, Clone)]
pub struct StsClient {
    endpoint: Endpoint,
}

impl StsClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn client_for(&self, credentials: &StaticCredentials) -> aws_sdk_sts::Client {
        // Retries are left to callers.
        let mut config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.endpoint.region().to_string()))
            .credentials_provider(sdk::credentials(credentials))
            .retry_config(RetryConfig::disabled());
        if let Some(url) = self.endpoint.url() {
            config = config.endpoint_url(url);
        }
        if let Some(timeout) = self.endpoint.timeout() {
            config = config.timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(timeout)
                    .build(),
            );
        }
        aws_sdk_sts::Client::from_conf(config.build())
    }
}

#[async_trait]
impl RoleAssumer for StsClient {
    async fn assume_role(
        &self,
        credentials: &StaticCredentials,
        role: &RoleConfig,
    ) -> Result<TemporaryCredentials, ProviderError> {
        let session_name = role
            .session_name
            .clone()
            .unwrap_or_else(random_session_name);
        // STS rejects anything above twelve hours, so saturating is harmless.
        let duration = role
            .duration_seconds
            .map(|secs| i32::try_from(secs).unwrap_or(i32::MAX));

        let output = self
            .client_for(credentials)
            .assume_role()
            .role_arn(&role.role_arn)
            .role_session_name(&session_name)
            .set_external_id(role.external_id.clone())
            .set_duration_seconds(duration)
            .send()
            .await
            .map_err(|err| sdk::provider_error(ASSUME_ROLE, err))?;

        let creds = output
            .credentials()
            .ok_or_else(|| missing(ASSUME_ROLE, "Credentials"))?;
        let expires = creds.expiration();
        let expiration = DateTime::<Utc>::from_timestamp(expires.secs(), expires.subsec_nanos());

        info!(
            role_arn = %role.role_arn,
            session_name = %session_name,
            "Assumed role"
        );

        Ok(TemporaryCredentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: SecretString::from(creds.secret_access_key().to_string()),
            session_token: SecretString::from(creds.session_token().to_string()),
            expiration,
        })
    }
}
