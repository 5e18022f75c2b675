//! Document store and object storage for PG Delivery.
//!
//! The storefront and admin binaries never talk to a database directly. They
//! go through two seams:
//!
//! - [`DocumentStore`] - collections of schema-less JSON documents with
//!   atomic multi-document writes and live snapshots ([`DocumentStore::watch`])
//! - [`ObjectStorage`] - binary uploads that come back as a public URL
//!
//! # Backends
//!
//! - [`PgDocumentStore`] - `PostgreSQL` `jsonb` table, `LISTEN/NOTIFY` for live updates
//! - [`MemoryStore`] - in-process store used by tests and local experiments
//! - [`FsObjectStorage`], [`HttpObjectStorage`], [`MemoryObjectStorage`]
//!
//! # Migrations
//!
//! Migrations are stored in `crates/docstore/migrations/` and run via:
//! ```bash
//! cargo run -p pg-delivery-cli -- migrate
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod document;
pub mod error;
pub mod memory;
pub mod objects;
pub mod postgres;
pub mod subscription;
pub mod write;

use async_trait::async_trait;

pub use document::{Document, Fields, fields_of};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use objects::{
    FsObjectStorage, HttpObjectStorage, MemoryObjectStorage, ObjectStorage, ObjectStorageError,
    product_image_key,
};
pub use postgres::{PgDocumentStore, create_pool};
pub use subscription::{Snapshot, Subscription};
pub use write::Write;

/// A remote store of JSON documents grouped into named collections.
///
/// Every call may fail with [`StoreError`]; callers treat the store as an
/// opaque network service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, oldest first.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// One document, or `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a document under a store-assigned identifier.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Apply every write or none of them.
    async fn apply_all(&self, writes: Vec<Write>) -> Result<(), StoreError>;

    /// Live snapshots of a collection: the current contents immediately, then
    /// a fresh full snapshot after every change until the handle is dropped.
    async fn watch(&self, collection: &str) -> Result<Subscription, StoreError>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
