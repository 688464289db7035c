//! Client-side cryptography for the encrypted store
//!
//! Everything the store sends to the issue tracker that carries meaning
//! (issue bodies, partition-tag labels, milestone titles) passes through a
//! [`Cipher`] first. The tracker only ever sees ciphertext strings.
//!
//! # Pluggable ciphers
//!
//! Callers may bring their own encrypt/decrypt pair through [`FnCipher`], or
//! implement [`Cipher`] directly. The default is [`Identity`], which stores
//! plaintext and exists for tests and for callers who only want the mapping.
//!
//! # Built-in cipher
//!
//! [`SecretCipher`] wraps a 256-bit [`Secret`] and encrypts with
//! ChaCha20-Poly1305. Encryption is deterministic: the nonce is a keyed
//! BLAKE3 hash of the plaintext. Equal plaintexts must produce equal
//! ciphertexts, otherwise the tracker could not filter issues by an encrypted
//! label or match a milestone title. The cost is that equal documents are
//! recognisable as equal by the tracker.
//!
//! Issue labels are capped at 50 characters, which no ciphertext of a
//! partition tag fits in. [`Cipher::label`] therefore has its own form:
//! ciphers default to their ciphertext, while [`SecretCipher`] emits a keyed
//! BLAKE3 digest. Digest labels can't be decrypted, see
//! [`Cipher::reversible_labels`].

mod cipher;
mod secret;

pub use cipher::{Cipher, CipherError, FnCipher, Identity, SecretCipher, TextEncoding};
pub use secret::{Secret, SecretError, LABEL_DIGEST_SIZE, NONCE_SIZE, SECRET_SIZE};
