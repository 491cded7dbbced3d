use std::collections::BTreeMap;
use std::path::Path;

use secrecy::SecretString;
use tracing::debug;

use super::ini::IniDocument;
use super::{
    ProfileError, ProfileRecord, ACCESS_KEY_ID, DEFAULT_PROFILE, DURATION_SECONDS, EXTERNAL_ID,
    REGION, ROLE_ARN, ROLE_SESSION_NAME, SECRET_ACCESS_KEY, SESSION_TOKEN, SOURCE_PROFILE,
};

/// Read-only view over the shared credentials and config files.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    credentials: IniDocument,
    config: IniDocument,
}

impl ProfileStore {
    /// Load both files. A missing file is treated as empty.
    pub fn load(credentials_path: &Path, config_path: &Path) -> Result<Self, ProfileError> {
        let credentials = read_optional(credentials_path)?;
        let config = read_optional(config_path)?;

        Ok(Self {
            credentials,
            config,
        })
    }

    /// Build a store from already-parsed documents.
    pub fn from_documents(credentials: IniDocument, config: IniDocument) -> Self {
        Self {
            credentials,
            config,
        }
    }

    /// Look up a profile, merging its config and credentials file sections.
    pub fn get(&self, name: &str) -> Result<ProfileRecord, ProfileError> {
        let config_section = self.config_section(name);
        if !self.credentials.has_section(name) && config_section.is_none() {
            return Err(ProfileError::NotFound(name.to_string()));
        }

        let mut settings: BTreeMap<&str, &str> = BTreeMap::new();
        if let Some(section) = config_section {
            settings.extend(self.config.entries(&section));
        }
        settings.extend(self.credentials.entries(name));

        debug!(profile = %name, keys = settings.len(), "Loaded profile");

        let text = |key: &str| {
            settings
                .get(key)
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
        };

        let duration_seconds = match text(DURATION_SECONDS) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| ProfileError::InvalidValue {
                profile: name.to_string(),
                key: DURATION_SECONDS,
                value: raw.clone(),
            })?),
            None => None,
        };

        Ok(ProfileRecord {
            name: name.to_string(),
            access_key_id: text(ACCESS_KEY_ID),
            secret_access_key: text(SECRET_ACCESS_KEY).map(SecretString::from),
            session_token: text(SESSION_TOKEN).map(SecretString::from),
            role_arn: text(ROLE_ARN),
            source_profile: text(SOURCE_PROFILE),
            region: text(REGION),
            external_id: text(EXTERNAL_ID),
            role_session_name: text(ROLE_SESSION_NAME),
            duration_seconds,
        })
    }

    /// Section name used for `name` in the config file, if present.
    ///
    /// The config file prefixes named profiles with `profile `; the default
    /// profile may appear either bare or prefixed.
    fn config_section(&self, name: &str) -> Option<String> {
        let prefixed = format!("profile {name}");
        if self.config.has_section(&prefixed) {
            return Some(prefixed);
        }
        if name == DEFAULT_PROFILE && self.config.has_section(DEFAULT_PROFILE) {
            return Some(DEFAULT_PROFILE.to_string());
        }
        None
    }
}

fn read_optional(path: &Path) -> Result<IniDocument, ProfileError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(IniDocument::parse(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Profile file not found, treating as empty");
            Ok(IniDocument::default())
        }
        Err(source) => Err(ProfileError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
