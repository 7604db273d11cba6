//! toolbelt-store: document store access and the node id migration.
//!
//! [`FirestoreClient`] talks to the Firestore REST API; [`MemoryStore`] keeps
//! documents in process. Both implement [`DocumentStore`], which is all
//! [`run_migration`] needs.

pub mod auth;
pub mod document;
pub mod firestore;
pub mod memory;
pub mod migrate;
pub mod value;

pub use auth::{ServiceAccount, ServiceAccountKey, StaticToken, TokenSource};
pub use document::{Document, DocumentStore, FieldUpdate, StoreError};
pub use firestore::FirestoreClient;
pub use memory::MemoryStore;
pub use migrate::{run_migration, MigrationOutcome, MigrationReport};
