//! Running a command under a resolved profile.

use std::ffi::{OsStr, OsString};
use std::io;
use std::process::Command;

use tracing::debug;

use crate::resolver::ResolvedEnvironment;

/// Prefixes of variables dropped from the inherited environment.
const MANAGED_PREFIXES: [&str; 2] = ["AWS_", "BOTO_"];

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("{program}: command not found")]
    NotFound { program: String },

    #[error("Failed to run {program}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Whether `name` is AWS or boto configuration.
pub fn is_managed_var(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    MANAGED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Environment for the child: `inherited` minus AWS/boto settings, plus `resolved`.
pub fn child_environment<I>(inherited: I, resolved: &ResolvedEnvironment) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env: Vec<(OsString, OsString)> = inherited
        .into_iter()
        .filter(|(name, _)| !is_managed_var(name))
        .collect();
    env.extend(
        resolved
            .iter()
            .map(|(name, value)| (OsString::from(name), OsString::from(value))),
    );
    env
}

/// Run `program` with exactly `env` as its environment.
///
/// On Unix the current process is replaced and this only returns on error.
/// Elsewhere the child is waited on and its exit code returned.
pub fn run(program: &OsStr, args: &[OsString], env: Vec<(OsString, OsString)>) -> Result<i32, ExecError> {
    let mut command = Command::new(program);
    command.args(args).env_clear().envs(env);

    debug!(program = %program.to_string_lossy(), args = args.len(), "Executing command");

    launch(command).map_err(|source| {
        let program = program.to_string_lossy().into_owned();
        if source.kind() == io::ErrorKind::NotFound {
            ExecError::NotFound { program }
        } else {
            ExecError::Io { program, source }
        }
    })
}

#[cfg(unix)]
fn launch(mut command: Command) -> io::Result<i32> {
    use std::os::unix::process::CommandExt;

    Err(command.exec())
}

#[cfg(not(unix))]
fn launch(mut command: Command) -> io::Result<i32> {
    let status = command.status()?;
    Ok(status.code().unwrap_or(1))
}
