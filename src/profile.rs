use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AuthError, Result};

/// Destination for the session token obtained by the flow
///
/// The flow only needs to find the default profile, overwrite its token and
/// write the store back. Everything else about profiles is owned by the
/// caller.
pub trait ProfileStore {
    /// Name of the profile marked as default, if any
    fn default_profile(&self) -> Option<String>;

    /// Overwrite a profile's token; returns `false` if the profile is unknown
    fn set_token(&mut self, profile: &str, token: &str) -> bool;

    /// Write the whole store back to its backing storage
    fn persist(&self) -> Result<()>;
}

/// A named set of API credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default)]
    pub token: String,
}

/// TOML configuration file holding `[profile.<name>]` tables
///
/// Top-level keys other than `profile` are kept as-is and written back on
/// [`ProfileStore::persist`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, rename = "profile")]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(flatten)]
    pub extra: toml::Table,
    #[serde(skip)]
    path: PathBuf,
}

impl ConfigFile {
    /// Load a config file, starting empty if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigLoad`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: ConfigFile = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| AuthError::ConfigLoad(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
            Err(e) => return Err(AuthError::ConfigLoad(format!("{}: {}", path.display(), e))),
        };
        config.path = path.to_path_buf();
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for ConfigFile {
    fn default_profile(&self) -> Option<String> {
        self.profiles
            .iter()
            .find(|(_, profile)| profile.default)
            .map(|(name, _)| name.clone())
    }

    fn set_token(&mut self, profile: &str, token: &str) -> bool {
        match self.profiles.get_mut(profile) {
            Some(p) => {
                p.token = token.to_string();
                true
            }
            None => false,
        }
    }

    fn persist(&self) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| AuthError::ConfigPersist(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AuthError::ConfigPersist(e.to_string()))?;
        }
        fs::write(&self.path, contents)
            .map_err(|e| AuthError::ConfigPersist(format!("{}: {}", self.path.display(), e)))?;

        debug!(path = %self.path.display(), "config file written");
        Ok(())
    }
}
