//! The shared store behaviour, run against a fresh database file per test.

use std::sync::Arc;

use stratus_ports::Store;
use stratus_store_sqlite::{SqliteOptions, SqliteStore};
use tempfile::TempDir;

async fn fresh_store() -> (Arc<dyn Store>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&SqliteOptions::at(dir.path().join("stratus.db")))
        .await
        .unwrap();
    (Arc::new(store), dir)
}

stratus_store_contract::store_contract!(fresh_store());
