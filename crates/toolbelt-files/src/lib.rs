//! toolbelt-files: filesystem utilities.
//!
//! - [`archive`] compresses a folder into a timestamped `.zip`.
//! - [`combine`] concatenates selected source files into one text dump,
//!   optionally headed by a [`tree`] of the scanned folders.

pub mod archive;
pub mod combine;
pub mod prefix;
pub mod tree;

pub use archive::{create_archive, ArchiveError, ArchiveOptions, ArchiveReport};
pub use combine::{combine, CombineError, CombineReport};
