//! A single section of the shared credentials file, as rotated by `awsrotate`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::ini::IniDocument;
use super::{ProfileError, ACCESS_KEY_ID, SECRET_ACCESS_KEY};
use crate::aws::StaticCredentials;

/// The long-lived key stored in one section of the credentials file.
#[derive(Debug)]
pub struct CredentialsFile {
    path: PathBuf,
    section: String,
    document: IniDocument,
}

impl CredentialsFile {
    /// Read `path` and check that `[section]` exists.
    pub fn load(path: impl AsRef<Path>, section: impl Into<String>) -> Result<Self, ProfileError> {
        let path = path.as_ref().to_path_buf();
        let section = section.into();

        let content = std::fs::read_to_string(&path).map_err(|source| ProfileError::Read {
            path: path.clone(),
            source,
        })?;
        let document = IniDocument::parse(&content);

        if !document.has_section(&section) {
            return Err(ProfileError::SectionNotFound { section, path });
        }

        Ok(Self {
            path,
            section,
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Where the pre-rotation file is kept: the same name with a trailing `~`.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push("~");
        PathBuf::from(name)
    }

    pub fn key_id(&self) -> Result<&str, ProfileError> {
        self.required(ACCESS_KEY_ID)
    }

    pub fn secret_key(&self) -> Result<SecretString, ProfileError> {
        self.required(SECRET_ACCESS_KEY).map(SecretString::from)
    }

    pub fn credentials(&self) -> Result<StaticCredentials, ProfileError> {
        Ok(StaticCredentials::new(self.key_id()?, self.secret_key()?))
    }

    /// Replace the stored key and rewrite the file.
    ///
    /// The new content goes to an owner-only temporary file next to the
    /// original. The original is then renamed to [`Self::backup_path`] and the
    /// temporary file renamed into its place. Every other line of the file is
    /// preserved.
    pub fn update_credentials(
        &mut self,
        key_id: &str,
        secret_key: &SecretString,
    ) -> Result<(), ProfileError> {
        let mut document = self.document.clone();
        document.set(&self.section, ACCESS_KEY_ID, key_id);
        document.set(&self.section, SECRET_ACCESS_KEY, secret_key.expose_secret());

        self.write_atomically(&document.to_string())?;
        self.document = document;

        info!(
            path = %self.path.display(),
            section = %self.section,
            key_id = %key_id,
            "Credentials file updated"
        );
        Ok(())
    }

    /// Check that [`Self::update_credentials`] would get its file written:
    /// an owner-only temporary file can be created next to it, and nothing
    /// blocks the backup path.
    pub fn check_writable(&self) -> Result<(), ProfileError> {
        drop(self.owner_only_tempfile()?);

        let backup = self.backup_path();
        if backup.is_dir() {
            return Err(ProfileError::Write {
                source: std::io::Error::other(format!(
                    "{} is a directory",
                    backup.display()
                )),
                path: backup,
            });
        }
        Ok(())
    }

    fn required(&self, key: &'static str) -> Result<&str, ProfileError> {
        self.document
            .get(&self.section, key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ProfileError::MissingKey {
                profile: self.section.clone(),
                key,
            })
    }

    fn write_error(&self, source: std::io::Error) -> ProfileError {
        ProfileError::Write {
            path: self.path.clone(),
            source,
        }
    }

    /// Empty temporary file in the same directory, readable by the owner only.
    fn owner_only_tempfile(&self) -> Result<NamedTempFile, ProfileError> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp = tempfile::Builder::new()
            .prefix(".credentials")
            .tempfile_in(dir)
            .map_err(|e| self.write_error(e))?;
        restrict_to_owner(temp.as_file()).map_err(|e| self.write_error(e))?;
        Ok(temp)
    }

    fn write_atomically(&self, content: &str) -> Result<(), ProfileError> {
        let write_err = |source: std::io::Error| self.write_error(source);

        let mut temp = self.owner_only_tempfile()?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        let backup = self.backup_path();
        std::fs::rename(&self.path, &backup).map_err(write_err)?;
        debug!(backup = %backup.display(), "Previous credentials file moved to backup");

        temp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &File) -> std::io::Result<()> {
    Ok(())
}
