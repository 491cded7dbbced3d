use anyhow::Result;
use tracing::info;

use super::iam_endpoint;
use crate::aws::IamClientFactory;
use crate::config::ResolvedConfig;
use crate::profile::CredentialsFile;
use crate::rotate::{KeyRotation, RotationOutcome};

pub const LONG_ABOUT: &str = "\
Rotates AWS API keys.

The key to rotate will be found in the specified SECTION of the shared
credentials file (~/.aws/credentials unless AWS_SHARED_CREDENTIALS_FILE or the
config file says otherwise). If no SECTION is specified, then use \"default\".

AWS limits the number of API keys per user to a maximum of 2. So first, any
inactive keys are deleted. If there are active keys other than the one being
rotated, awsrotate will abort. This prevents accidental deletion of keys that
may still be in use.

A new key is then created.

Then, the new key is used to deactivate the old key. This demonstrates that
the new key works. The old key is deactivated, not deleted, so it's possible to
reactivate the old key should it be discovered that it was still in use.

Finally, the new key is written to the credentials file. The previous file is
kept next to it with a trailing ~.";

/// Rotate the key stored in `[section]` of the configured credentials file.
pub async fn run(config: &ResolvedConfig, section: &str) -> Result<RotationOutcome> {
    let mut file = CredentialsFile::load(&config.credentials_file, section)?;
    let factory = IamClientFactory::new(iam_endpoint(config));

    let outcome = KeyRotation::new(&factory, config.rotation.clone())
        .rotate(&mut file)
        .await?;

    info!(
        section = %section,
        old_key_id = %outcome.old_key_id,
        new_key_id = %outcome.new_key_id,
        "Rotation complete"
    );
    Ok(outcome)
}
