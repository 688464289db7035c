//! Deterministic content encryption using ChaCha20-Poly1305
//!
//! Labels and milestone titles are used as lookup keys by the tracker, so the
//! same plaintext has to encrypt to the same bytes every time. The nonce is
//! therefore derived from the plaintext (keyed BLAKE3, synthetic-IV style)
//! instead of drawn at random, and re-derived on decrypt as an integrity check.

use std::ops::Deref;

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;

/// Size of a keyed label digest in bytes
pub const LABEL_DIGEST_SIZE: usize = 24;

/// BLAKE3 derive_key context for the nonce key
const NONCE_KEY_CONTEXT: &str = "ges 2024 synthetic nonce v1";
/// BLAKE3 derive_key context for the label key
const LABEL_KEY_CONTEXT: &str = "ges 2024 label digest v1";

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit symmetric key for deterministic content encryption
///
/// The encrypted format is: `nonce (12 bytes) || encrypted(plaintext) || tag (16 bytes)`,
/// where `nonce = keyed_blake3(nonce_key, plaintext)[..12]` and `nonce_key` is
/// derived from the secret.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
///
/// let ciphertext = secret.encrypt(b"sensitive data")?;
/// assert_eq!(ciphertext, secret.encrypt(b"sensitive data")?);
///
/// let recovered = secret.decrypt(&ciphertext)?;
/// assert_eq!(b"sensitive data", &recovered[..]);
/// ```
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Secret([u8; SECRET_SIZE]);

impl Default for Secret {
    fn default() -> Self {
        Secret([0; SECRET_SIZE])
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Parse a secret from its hex representation, as stored in config files
    pub fn from_hex(hex_str: &str) -> Result<Self, SecretError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| anyhow::anyhow!("invalid secret hex: {}", e))?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn synthetic_nonce(&self, data: &[u8]) -> [u8; NONCE_SIZE] {
        let nonce_key = blake3::derive_key(NONCE_KEY_CONTEXT, self.bytes());
        let hash = blake3::keyed_hash(&nonce_key, data);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&hash.as_bytes()[..NONCE_SIZE]);
        nonce
    }

    /// Keyed BLAKE3 digest of `data`, truncated to [`LABEL_DIGEST_SIZE`] bytes
    ///
    /// One-way. Used where the tracker needs a short lookup key rather than
    /// a ciphertext.
    pub fn label_digest(&self, data: &[u8]) -> [u8; LABEL_DIGEST_SIZE] {
        let label_key = blake3::derive_key(LABEL_KEY_CONTEXT, self.bytes());
        let hash = blake3::keyed_hash(&label_key, data);
        let mut digest = [0u8; LABEL_DIGEST_SIZE];
        digest.copy_from_slice(&hash.as_bytes()[..LABEL_DIGEST_SIZE]);
        digest
    }

    /// Encrypt data using ChaCha20-Poly1305 AEAD with a synthetic nonce
    ///
    /// The same plaintext always yields the same output under the same secret.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);

        let nonce_bytes = self.synthetic_nonce(data);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Decrypt data produced by [`Secret::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is too short to contain a nonce
    /// - Authentication tag verification fails (data was tampered with or wrong key)
    /// - The nonce does not match the one derived from the recovered plaintext
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("data too short for nonce").into());
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        let plaintext = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| anyhow::anyhow!("decrypt error"))?;

        if self.synthetic_nonce(&plaintext) != data[..NONCE_SIZE] {
            return Err(anyhow::anyhow!("nonce verification failed").into());
        }

        Ok(plaintext)
    }
}
