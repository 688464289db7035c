use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::secret::Secret;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// A string-to-string encrypt/decrypt pair
///
/// Implementations must be deterministic in `encrypt`: the store filters
/// issues by encrypted label and finds its milestone by encrypted title, both
/// of which rely on equal plaintexts encrypting to equal strings.
pub trait Cipher: Send + Sync + fmt::Debug {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;

    /// The issue label standing for `plaintext`
    ///
    /// Must be deterministic. Defaults to [`Cipher::encrypt`].
    fn label(&self, plaintext: &str) -> Result<String, CipherError> {
        self.encrypt(plaintext)
    }

    /// Whether [`Cipher::decrypt`] recovers the plaintext of a [`Cipher::label`]
    fn reversible_labels(&self) -> bool {
        true
    }
}

/// Stores plaintext as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Cipher for Identity {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        Ok(ciphertext.to_string())
    }
}

type CipherFn = Arc<dyn Fn(&str) -> Result<String, CipherError> + Send + Sync>;

/// A cipher built from caller-supplied functions
#[derive(Clone)]
pub struct FnCipher {
    encrypt: CipherFn,
    decrypt: CipherFn,
}

impl FnCipher {
    /// Wrap an infallible pair of functions
    pub fn new<E, D>(encrypt: E, decrypt: D) -> Self
    where
        E: Fn(&str) -> String + Send + Sync + 'static,
        D: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            encrypt: Arc::new(move |plaintext| Ok(encrypt(plaintext))),
            decrypt: Arc::new(move |ciphertext| Ok(decrypt(ciphertext))),
        }
    }

    /// Wrap a pair of functions that may fail, e.g. on a wrong key
    pub fn fallible<E, D>(encrypt: E, decrypt: D) -> Self
    where
        E: Fn(&str) -> Result<String, CipherError> + Send + Sync + 'static,
        D: Fn(&str) -> Result<String, CipherError> + Send + Sync + 'static,
    {
        Self {
            encrypt: Arc::new(encrypt),
            decrypt: Arc::new(decrypt),
        }
    }
}

impl fmt::Debug for FnCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCipher").finish_non_exhaustive()
    }
}

impl Cipher for FnCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        (self.encrypt)(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        (self.decrypt)(ciphertext)
    }
}

/// Text encoding for ciphertext bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    #[default]
    Base64,
    Hex,
}

impl TextEncoding {
    /// `true` selects base64, `false` hex
    pub fn from_base64_flag(base64: bool) -> Self {
        if base64 {
            TextEncoding::Base64
        } else {
            TextEncoding::Hex
        }
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Base64 => STANDARD.encode(bytes),
            TextEncoding::Hex => hex::encode(bytes),
        }
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, CipherError> {
        match self {
            TextEncoding::Base64 => STANDARD
                .decode(text)
                .map_err(|e| CipherError::Decrypt(format!("invalid base64: {}", e))),
            TextEncoding::Hex => {
                hex::decode(text).map_err(|e| CipherError::Decrypt(format!("invalid hex: {}", e)))
            }
        }
    }
}

/// The built-in cipher: a [`Secret`] plus a text encoding for the ciphertext
#[derive(Clone)]
pub struct SecretCipher {
    secret: Secret,
    encoding: TextEncoding,
}

impl SecretCipher {
    pub fn new(secret: Secret, encoding: TextEncoding) -> Self {
        Self { secret, encoding }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

// never print key material
impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Cipher for SecretCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let bytes = self
            .secret
            .encrypt(plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;
        Ok(self.encoding.encode(&bytes))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let bytes = self.encoding.decode(ciphertext)?;
        let plaintext = self
            .secret
            .decrypt(&bytes)
            .map_err(|e| CipherError::Decrypt(e.to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| CipherError::Decrypt(format!("plaintext is not utf-8: {}", e)))
    }

    fn label(&self, plaintext: &str) -> Result<String, CipherError> {
        let digest = self.secret.label_digest(plaintext.as_bytes());
        Ok(self.encoding.encode(&digest))
    }

    fn reversible_labels(&self) -> bool {
        false
    }
}
