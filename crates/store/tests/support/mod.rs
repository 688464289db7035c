//! Shared setup for store integration tests
#![allow(dead_code)]

use std::sync::Once;

use serde_json::Value;
use store::prelude::*;
use tracing_subscriber::EnvFilter;

pub const REPO: &str = "testrepo";
pub const DB: &str = "testdb";

static TRACING: Once = Once::new();

/// Log to the test writer, filtered by `RUST_LOG` (warnings by default)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn options() -> StoreOptions {
    StoreOptions::new()
        .with_repository_name(REPO)
        .with_db_name(DB)
}

/// A store over an in-memory tracker that already has the repository
pub fn setup() -> Store<MemoryTransport> {
    setup_with(options())
}

pub fn setup_with(options: StoreOptions) -> Store<MemoryTransport> {
    init_tracing();
    let transport = MemoryTransport::new().with_repository(&options.repository_name);
    Store::with_transport(transport, options)
}

/// A second handle on the same tracker
pub fn reopen(store: &Store<MemoryTransport>, options: StoreOptions) -> Store<MemoryTransport> {
    Store::with_transport(store.transport().clone(), options)
}

pub fn doc(value: Value) -> Document {
    Document::try_from(value).unwrap()
}
