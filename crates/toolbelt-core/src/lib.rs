//! toolbelt-core: shared pieces for the toolbelt utilities.
//!
//! - [`ident`] turns display names into key-safe [`Identifier`]s.
//! - [`clock`] supplies the fallback seeds used when a name normalizes to
//!   nothing.
//! - [`config`] loads the layered TOML configuration every subcommand reads.

pub mod clock;
pub mod config;
pub mod ident;

pub use clock::{FallbackSeed, FixedSeed, MonotonicSeeds, SeedSource, SystemClock};
pub use ident::{normalize, normalize_with, try_normalize, Identifier, IdentifierError};
