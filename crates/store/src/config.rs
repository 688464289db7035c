use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::{fmt, fs};

use common::prelude::{Cipher, DecodePolicy, Identity, Secret, SecretCipher, TextEncoding};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::transport::github::DEFAULT_API_URL;

pub const APP_NAME: &str = "ges";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_REPOSITORY_NAME: &str = "GES_database";
pub const DEFAULT_DB_NAME: &str = "default";

static DEFAULT_API: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_API_URL).expect("default API URL is valid"));

/// Options a store handle is opened with
#[derive(Clone)]
pub struct StoreOptions {
    /// Repository holding the database, created if missing
    pub repository_name: String,
    /// Logical database, one milestone per name
    pub db_name: String,
    /// Ciphertext text encoding for the built-in cipher: base64, or hex if unset
    pub base64: bool,
    pub cipher: Arc<dyn Cipher>,
    // set while `cipher` is the built-in one, so the encoding can follow `base64`
    secret: Option<Secret>,
    /// What `find` does with issues whose body won't decode
    pub decode_policy: DecodePolicy,
    /// Visibility of a repository the store has to create
    pub private_repository: bool,
    pub api_url: Url,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            repository_name: DEFAULT_REPOSITORY_NAME.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            base64: true,
            cipher: Arc::new(Identity),
            secret: None,
            decode_policy: DecodePolicy::default(),
            private_repository: false,
            api_url: DEFAULT_API.clone(),
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("repository_name", &self.repository_name)
            .field("db_name", &self.db_name)
            .field("base64", &self.base64)
            .field("cipher", &self.cipher)
            .field("decode_policy", &self.decode_policy)
            .field("private_repository", &self.private_repository)
            .field("api_url", &self.api_url.as_str())
            .finish_non_exhaustive()
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository_name(mut self, name: impl Into<String>) -> Self {
        self.repository_name = name.into();
        self
    }

    pub fn with_db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = name.into();
        self
    }

    /// Text encoding of the built-in cipher, in either order with
    /// [`StoreOptions::with_secret`]
    pub fn with_base64(mut self, base64: bool) -> Self {
        self.base64 = base64;
        self.rebuild_secret_cipher();
        self
    }

    /// Replaces any cipher set before, the built-in one included
    pub fn with_cipher(mut self, cipher: impl Cipher + 'static) -> Self {
        self.cipher = Arc::new(cipher);
        self.secret = None;
        self
    }

    /// Use the built-in cipher keyed by `secret`
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self.rebuild_secret_cipher();
        self
    }

    fn rebuild_secret_cipher(&mut self) {
        if let Some(secret) = &self.secret {
            let encoding = TextEncoding::from_base64_flag(self.base64);
            self.cipher = Arc::new(SecretCipher::new(secret.clone(), encoding));
        }
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_private_repository(mut self, private: bool) -> Self {
        self.private_repository = private;
        self
    }

    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }
}

/// On-disk form of [`StoreOptions`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_repository_name")]
    pub repository_name: String,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_base64")]
    pub base64: bool,
    #[serde(default)]
    pub decode_policy: DecodePolicy,
    #[serde(default)]
    pub private_repository: bool,
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    /// Hex encoded 256-bit key for the built-in cipher; plaintext storage if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

fn default_repository_name() -> String {
    DEFAULT_REPOSITORY_NAME.to_string()
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

fn default_base64() -> bool {
    true
}

fn default_api_url() -> Url {
    DEFAULT_API.clone()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            repository_name: default_repository_name(),
            db_name: default_db_name(),
            base64: default_base64(),
            decode_policy: DecodePolicy::default(),
            private_repository: false,
            api_url: default_api_url(),
            secret_key: None,
        }
    }
}

impl StoreConfig {
    /// `<config dir>/ges/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDirectory)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_toml = fs::read_to_string(path)?;
        Self::from_toml(&config_toml)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn into_options(self) -> Result<StoreOptions, ConfigError> {
        let options = StoreOptions::new()
            .with_repository_name(self.repository_name)
            .with_db_name(self.db_name)
            .with_base64(self.base64)
            .with_decode_policy(self.decode_policy)
            .with_private_repository(self.private_repository)
            .with_api_url(self.api_url);

        match self.secret_key {
            Some(hex_key) => {
                let secret = Secret::from_hex(&hex_key)
                    .map_err(|e| ConfigError::InvalidSecret(e.to_string()))?;
                Ok(options.with_secret(secret))
            }
            None => Ok(options),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config directory found")]
    NoConfigDirectory,

    #[error("invalid secret key: {0}")]
    InvalidSecret(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
