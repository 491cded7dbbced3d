//! Access key rotation.
//!
//! One run rotates the key stored in one section of the credentials file:
//!
//! 1. find the IAM user that owns the stored key
//! 2. delete the user's other keys, refusing if any of them is still active
//! 3. create a new key
//! 4. use the new key to deactivate the old one, retrying while the new key
//!    propagates
//! 5. write the new key to the credentials file
//!
//! Nothing is rolled back. The ordering guarantees that a failure before step
//! 5 leaves the stored key working. The credentials file is checked for
//! writability before anything changes remotely.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::aws::{AccessKey, AccessKeyStatus, KeyManager, KeyManagerFactory, ProviderError};
use crate::duration::format_duration;
use crate::profile::{CredentialsFile, ProfileError};
use crate::retry::{retry, RetryFailure, RetryPolicy};

pub const ACCESS_KEY_DOCS: &str =
    "http://docs.aws.amazon.com/IAM/latest/UserGuide/id_credentials_access-keys.html";

#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    #[error(transparent)]
    Store(#[from] ProfileError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Very odd: current key {key_id} is not listed\nAborted")]
    CurrentKeyNotListed { key_id: String },

    #[error(
        "{key_id} is still active: will not automatically delete it.\n\
         Please delete it manually if it is safe to do so.\n\
         {docs}\n\
         Aborted",
        docs = ACCESS_KEY_DOCS
    )]
    OtherKeyActive { key_id: String },

    #[error(
        "Failed to deactivate the old key ({old_key_id}) after {attempts} attempt(s) over {waited}.\n\
         The new key ({new_key_id}) was created but has not been saved, and the old key is still active.\n\
         Manual remediation will be required.\n\
         {docs}",
        docs = ACCESS_KEY_DOCS
    )]
    DeactivationFailed {
        old_key_id: String,
        new_key_id: String,
        attempts: u32,
        waited: String,
        #[source]
        source: ProviderError,
    },

    #[error(
        "The old key ({old_key_id}) was deactivated, but the new key ({new_key_id}) could not be saved to {}.\n\
         The old key is still in that file and can be reactivated; the new key should then be deleted.\n\
         Manual remediation will be required.\n\
         {docs}",
        .path.display(),
        docs = ACCESS_KEY_DOCS
    )]
    PersistFailed {
        old_key_id: String,
        new_key_id: String,
        path: PathBuf,
        #[source]
        source: ProfileError,
    },
}

impl RotateError {
    /// Whether the run stopped on a safety check, before anything was changed.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            RotateError::CurrentKeyNotListed { .. } | RotateError::OtherKeyActive { .. }
        )
    }

    /// Whether the run stopped after creating a key, leaving cleanup to the user.
    pub fn needs_remediation(&self) -> bool {
        matches!(
            self,
            RotateError::DeactivationFailed { .. } | RotateError::PersistFailed { .. }
        )
    }
}

/// What a successful rotation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub user_name: String,
    pub old_key_id: String,
    pub new_key_id: String,
    pub deleted_key_ids: Vec<String>,
}

/// Drives a rotation against whatever [`KeyManager`]s `factory` connects.
pub struct KeyRotation<'a> {
    factory: &'a dyn KeyManagerFactory,
    policy: RetryPolicy,
}

impl<'a> KeyRotation<'a> {
    pub fn new(factory: &'a dyn KeyManagerFactory, policy: RetryPolicy) -> Self {
        Self { factory, policy }
    }

    pub async fn rotate(&self, file: &mut CredentialsFile) -> Result<RotationOutcome, RotateError> {
        let current = file.credentials()?;
        file.check_writable()?;
        let old_key_id = current.access_key_id.clone();
        let iam = self.factory.connect(&current)?;

        let user_name = iam.get_current_user().await?;
        info!(user_name = %user_name, key_id = %old_key_id, "Rotating access key");

        let keys = iam.list_access_keys(&user_name).await?;
        let stale = stale_keys(&old_key_id, &keys)?;
        let mut deleted_key_ids = Vec::with_capacity(stale.len());
        for key in stale {
            iam.delete_access_key(&key.id).await?;
            info!(key_id = %key.id, "Deleted inactive access key");
            deleted_key_ids.push(key.id.clone());
        }

        let new_key = iam.create_access_key(&user_name).await?;
        info!(key_id = %new_key.id, "Created access key");

        let verified = self.factory.connect(&new_key.credentials())?;
        self.deactivate(verified.as_ref(), &old_key_id, &user_name)
            .await
            .map_err(|failure| {
                warn!(
                    old_key_id = %old_key_id,
                    new_key_id = %new_key.id,
                    attempts = failure.attempts,
                    "Could not deactivate old key with the new key"
                );
                RotateError::DeactivationFailed {
                    old_key_id: old_key_id.clone(),
                    new_key_id: new_key.id.clone(),
                    attempts: failure.attempts,
                    waited: format_duration(whole_units(failure.elapsed)),
                    source: failure.error,
                }
            })?;
        info!(key_id = %old_key_id, "Deactivated old access key");

        file.update_credentials(&new_key.id, &new_key.secret)
            .map_err(|source| {
                error!(
                    old_key_id = %old_key_id,
                    new_key_id = %new_key.id,
                    "Old key deactivated but the new key was not saved"
                );
                RotateError::PersistFailed {
                    old_key_id: old_key_id.clone(),
                    new_key_id: new_key.id.clone(),
                    path: file.path().to_path_buf(),
                    source,
                }
            })?;

        Ok(RotationOutcome {
            user_name,
            old_key_id,
            new_key_id: new_key.id,
            deleted_key_ids,
        })
    }

    async fn deactivate(
        &self,
        iam: &dyn KeyManager,
        key_id: &str,
        user_name: &str,
    ) -> Result<(), RetryFailure<ProviderError>> {
        retry(&self.policy, ProviderError::is_retryable, move || {
            iam.update_access_key_status(key_id, AccessKeyStatus::Inactive, user_name)
        })
        .await
    }
}

/// Whole seconds once past a second, whole milliseconds below that.
fn whole_units(elapsed: Duration) -> Duration {
    if elapsed.as_secs() > 0 {
        Duration::from_secs(elapsed.as_secs())
    } else {
        Duration::from_millis(elapsed.subsec_millis().into())
    }
}

/// Keys other than `current_key_id`, provided it is listed and none of the
/// others is active.
fn stale_keys<'k>(current_key_id: &str, keys: &'k [AccessKey]) -> Result<Vec<&'k AccessKey>, RotateError> {
    if !keys.iter().any(|key| key.id == current_key_id) {
        return Err(RotateError::CurrentKeyNotListed {
            key_id: current_key_id.to_string(),
        });
    }

    let others: Vec<&AccessKey> = keys.iter().filter(|key| key.id != current_key_id).collect();
    if let Some(active) = others.iter().find(|key| key.status == AccessKeyStatus::Active) {
        return Err(RotateError::OtherKeyActive {
            key_id: active.id.clone(),
        });
    }

    Ok(others)
}
