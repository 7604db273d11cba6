//! toolbelt: small workspace chores behind one binary.
//!
//! ```text
//! slug          display name ──► identifier
//! archive       folder ──► <folder>_<timestamp>.zip
//! combine       source folders ──► one text dump (+ tree header)
//! migrate-ids   Firestore nodes ──► recomputed `id` field, batched
//! ```
//!
//! The library crates do the work; this crate only parses arguments, layers
//! flags over the configuration and sets up logging.

pub mod cli;

pub use toolbelt_core::{normalize, normalize_with, try_normalize, Identifier};
