/**
 * Multi-document writes: one request per document,
 *  per-document results, no rollback.
 */
pub mod batch;
/**
 * CRUD over the documents of one collection.
 */
pub mod collection;
/**
 * Store options and their on-disk TOML form.
 */
pub mod config;
pub mod error;
/**
 * Memoized repository connection and database
 *  namespace (milestone) resolution.
 */
mod namespace;
/**
 * Walking `Link: rel="next"` pages of a listing.
 */
pub mod pagination;
/**
 * The store handle.
 */
pub mod store;
/**
 * The issue tracker seam, its GitHub client and an
 *  in-memory stand-in for tests.
 */
pub mod transport;

pub use common;

pub mod prelude {
    pub use crate::batch::{Batch, BatchOutcome};
    pub use crate::collection::Collection;
    pub use crate::config::{ConfigError, StoreConfig, StoreOptions};
    pub use crate::error::StoreError;
    pub use crate::store::Store;
    pub use crate::transport::{GithubClient, MemoryTransport, Transport, TransportError};
    pub use common::prelude::*;
}
