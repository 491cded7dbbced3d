use async_trait::async_trait;
use aws_sdk_iam::config::retry::RetryConfig;
use aws_sdk_iam::config::timeout::TimeoutConfig;
use aws_sdk_iam::config::{BehaviorVersion, Region};
use aws_sdk_iam::types::{AccessKeyMetadata, StatusType};
use secrecy::SecretString;
use tracing::debug;

use super::sdk::{self, missing};
use super::{
    AccessKey, AccessKeyStatus, Endpoint, KeyManager, KeyManagerFactory, NewAccessKey,
    ProviderError, StaticCredentials,
};

const GET_USER: &str = "GetUser";
const LIST_ACCESS_KEYS: &str = "ListAccessKeys";
const CREATE_ACCESS_KEY: &str = "CreateAccessKey";
const UPDATE_ACCESS_KEY: &str = "UpdateAccessKey";
const DELETE_ACCESS_KEY: &str = "DeleteAccessKey";

fn parse_status(raw: &str) -> Result<AccessKeyStatus, ProviderError> {
    raw.parse().map_err(|message| ProviderError::Decode {
        operation: LIST_ACCESS_KEYS.to_string(),
        message,
    })
}

fn access_key(metadata: &AccessKeyMetadata) -> Result<AccessKey, ProviderError> {
    let id = metadata
        .access_key_id()
        .ok_or_else(|| missing(LIST_ACCESS_KEYS, "AccessKeyId"))?;
    let status = metadata
        .status()
        .ok_or_else(|| missing(LIST_ACCESS_KEYS, "Status"))?;

    Ok(AccessKey {
        id: id.to_string(),
        status: parse_status(status.as_str())?,
        user_name: metadata.user_name().unwrap_or_default().to_string(),
    })
}

/// IAM client bound to one set of caller credentials.
#[derive(Debug, Clone)]
pub struct IamClient {
    client: aws_sdk_iam::Client,
}

impl IamClient {
    pub fn new(endpoint: &Endpoint, credentials: &StaticCredentials) -> Self {
        // Retries are left to callers.
        let mut config = aws_sdk_iam::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(endpoint.region().to_string()))
            .credentials_provider(sdk::credentials(credentials))
            .retry_config(RetryConfig::disabled());
        if let Some(url) = endpoint.url() {
            config = config.endpoint_url(url);
        }
        if let Some(timeout) = endpoint.timeout() {
            config = config.timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(timeout)
                    .build(),
            );
        }

        Self {
            client: aws_sdk_iam::Client::from_conf(config.build()),
        }
    }
}

#[async_trait]
impl KeyManager for IamClient {
    async fn get_current_user(&self) -> Result<String, ProviderError> {
        let output = self
            .client
            .get_user()
            .send()
            .await
            .map_err(|err| sdk::provider_error(GET_USER, err))?;

        let user = output.user().ok_or_else(|| missing(GET_USER, "User"))?;
        Ok(user.user_name().to_string())
    }

    async fn list_access_keys(&self, user_name: &str) -> Result<Vec<AccessKey>, ProviderError> {
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_access_keys()
                .user_name(user_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|err| sdk::provider_error(LIST_ACCESS_KEYS, err))?;

            for metadata in output.access_key_metadata() {
                keys.push(access_key(metadata)?);
            }

            // IAM only sends a marker when the listing is truncated.
            match output.marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        debug!(user_name = %user_name, count = keys.len(), "Listed access keys");
        Ok(keys)
    }

    async fn create_access_key(&self, user_name: &str) -> Result<NewAccessKey, ProviderError> {
        let output = self
            .client
            .create_access_key()
            .user_name(user_name)
            .send()
            .await
            .map_err(|err| sdk::provider_error(CREATE_ACCESS_KEY, err))?;

        let key = output
            .access_key()
            .ok_or_else(|| missing(CREATE_ACCESS_KEY, "AccessKey"))?;

        Ok(NewAccessKey {
            id: key.access_key_id().to_string(),
            secret: SecretString::from(key.secret_access_key().to_string()),
            user_name: key.user_name().to_string(),
        })
    }

    async fn update_access_key_status(
        &self,
        key_id: &str,
        status: AccessKeyStatus,
        user_name: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .update_access_key()
            .access_key_id(key_id)
            .status(StatusType::from(status.as_str()))
            .user_name(user_name)
            .send()
            .await
            .map_err(|err| sdk::provider_error(UPDATE_ACCESS_KEY, err))?;
        Ok(())
    }

    async fn delete_access_key(&self, key_id: &str) -> Result<(), ProviderError> {
        self.client
            .delete_access_key()
            .access_key_id(key_id)
            .send()
            .await
            .map_err(|err| sdk::provider_error(DELETE_ACCESS_KEY, err))?;
        Ok(())
    }
}

/// Connects [`IamClient`]s to one IAM endpoint.
#[derive(Debug, Clone)]
pub struct IamClientFactory {
    endpoint: Endpoint,
}

impl IamClientFactory {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl KeyManagerFactory for IamClientFactory {
    fn connect(&self, credentials: &StaticCredentials) -> Result<Box<dyn KeyManager>, ProviderError> {
        Ok(Box::new(IamClient::new(&self.endpoint, credentials)))
    }
}
