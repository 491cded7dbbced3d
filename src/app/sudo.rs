use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};

use super::sts_endpoint;
use crate::aws::{StsClient, INVALID_CLIENT_TOKEN_ID};
use crate::config::ResolvedConfig;
use crate::exec::{self, child_environment};
use crate::profile::ProfileStore;
use crate::resolver::{CredentialResolver, ResolveError, ResolvedEnvironment};

/// Resolve `profile` against the configured files and STS endpoint.
pub async fn resolve_environment(
    config: &ResolvedConfig,
    profile: Option<&str>,
) -> Result<ResolvedEnvironment> {
    let store = ProfileStore::load(&config.credentials_file, &config.config_file)?;
    let sts = StsClient::new(sts_endpoint(config));

    CredentialResolver::new(store, sts)
        .resolve(profile)
        .await
        .map_err(|err| diagnose(err, &config.credentials_file))
}

/// Point the user at their credentials file when AssumeRole rejects the
/// source profile's key.
pub fn diagnose(err: ResolveError, credentials_file: &Path) -> anyhow::Error {
    if let Some(upstream) = err.provider_error() {
        if upstream.operation() == "AssumeRole" && upstream.code() == Some(INVALID_CLIENT_TOKEN_ID) {
            return anyhow::anyhow!(
                "{upstream}\n\nAre the credentials in {} valid?",
                credentials_file.display()
            );
        }
    }
    err.into()
}

/// Resolve `profile` and run `command` under it.
///
/// Returns the child's exit code where the platform cannot replace the
/// current process.
pub async fn run(config: &ResolvedConfig, profile: Option<&str>, command: &[OsString]) -> Result<i32> {
    let (program, args) = command.split_first().context("No command given")?;

    let resolved = resolve_environment(config, profile).await?;
    let env = child_environment(std::env::vars_os(), &resolved);

    Ok(exec::run(program, args, env)?)
}
