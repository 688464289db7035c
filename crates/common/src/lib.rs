/**
 * Client-side cryptography.
 *  - The `Cipher` seam callers plug their own
 *    encrypt/decrypt pair into
 *  - A deterministic ChaCha20-Poly1305 cipher
 *    for callers that don't bring one
 */
pub mod crypto;
/**
 * Translation between caller documents and the
 *  encrypted title/body/labels of a remote issue.
 */
pub mod codec;
/**
 * The caller-facing JSON document and its
 *  reserved `$id` address field.
 */
pub mod document;
/**
 * Partition tags: the encrypted label that marks
 *  a document's collection membership.
 */
pub mod tag;

pub mod prelude {
    pub use crate::codec::{CodecError, DecodePolicy, DocumentCodec, EncodedIssue};
    pub use crate::crypto::{
        Cipher, CipherError, FnCipher, Identity, Secret, SecretCipher, TextEncoding,
    };
    pub use crate::document::{Document, NotAnObject, ID_FIELD};
    pub use crate::tag::{PartitionTag, TagFilter};
}
