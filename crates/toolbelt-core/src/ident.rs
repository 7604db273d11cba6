//! Identifier normalizer: display name → key-safe [`Identifier`].
//!
//! Output is restricted to `[a-z0-9_]`, never starts or ends with `_`, and
//! never contains `__`. A name that normalizes to nothing gets the fallback
//! `node_<seed>`, where the seed is a millisecond timestamp.
//!
//! Letters and digits are recognised by ASCII range only: non-ASCII letters
//! are dropped, not transliterated, so identifiers produced by earlier tooling
//! keep matching byte for byte.
//!
//! ```
//! use toolbelt_core::ident::normalize;
//!
//! assert_eq!(normalize("New York - Branch  Office", 0), "new_york_branch_office");
//! assert_eq!(normalize("!!!", 1_700_000_000_000), "node_1700000000000");
//! ```

use crate::clock::{FallbackSeed, SeedSource};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref, str::FromStr, sync::LazyLock};

/// Prefix of every fallback identifier.
pub const FALLBACK_PREFIX: &str = "node_";

static IDENTIFIER_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:_[a-z0-9]+)*$").expect("identifier pattern is a valid regex")
});

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// A canonical identifier: lowercase ASCII letters, digits, and single
/// separating underscores.
///
/// Only obtainable through the normalizer or the validating
/// [`Identifier::parse`], so holding one is proof the invariants hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

/// Why a string is not a valid [`Identifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier {0:?} contains characters outside [a-z0-9_]")]
    InvalidCharacter(String),
    #[error("identifier {0:?} has a leading, trailing, or doubled underscore")]
    MisplacedSeparator(String),
}

impl Identifier {
    /// Validate `s` as-is. Nothing is lowercased or stripped; use
    /// [`normalize`] for that.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if !s.bytes().all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_')) {
            return Err(IdentifierError::InvalidCharacter(s.to_string()));
        }
        if !IDENTIFIER_SHAPE.is_match(s) {
            return Err(IdentifierError::MisplacedSeparator(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The fallback identifier for `seed`.
    pub fn fallback(seed: FallbackSeed) -> Self {
        Self(format!("{FALLBACK_PREFIX}{seed}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for Identifier {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize `raw`, falling back to `node_<seed>` when nothing survives.
///
/// Total and side-effect free: every input produces a valid identifier.
pub fn normalize(raw: &str, seed: FallbackSeed) -> Identifier {
    try_normalize(raw).unwrap_or_else(|| Identifier::fallback(seed))
}

/// Like [`normalize`], but the seed is drawn from `seeds` and only when the
/// fallback is actually needed.
pub fn normalize_with<S: SeedSource + ?Sized>(raw: &str, seeds: &S) -> Identifier {
    try_normalize(raw).unwrap_or_else(|| Identifier::fallback(seeds.next_seed()))
}

/// Normalize `raw`, returning `None` when the result would be empty.
pub fn try_normalize(raw: &str) -> Option<Identifier> {
    let slug = slugify(raw);
    if slug.is_empty() {
        None
    } else {
        Some(Identifier(slug))
    }
}

/// Lowercase, keep `[a-z0-9]`, map space/`-`/`_` to `_`, drop everything
/// else, collapse underscore runs, then strip one underscore from each end.
///
/// Dropped characters never reach the buffer, so collapsing while building is
/// the same as collapsing afterwards.
fn slugify(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut out = String::with_capacity(lower.len());

    for ch in lower.chars() {
        match ch {
            'a'..='z' | '0'..='9' => out.push(ch),
            ' ' | '-' | '_' => {
                if !out.ends_with('_') {
                    out.push('_');
                }
            }
            _ => {}
        }
    }

    let trimmed = out.strip_prefix('_').unwrap_or(&out);
    let trimmed = trimmed.strip_suffix('_').unwrap_or(trimmed);
    trimmed.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedSeed;
    use rstest::rstest;

    #[rstest]
    #[case::mixed_case_and_double_space("New York - Branch  Office", "new_york_branch_office")]
    #[case::edge_symbols("  -Admin-  ", "admin")]
    #[case::already_clean("branch_1", "branch_1")]
    #[case::uppercase("HQ", "hq")]
    #[case::punctuation_dropped("R&D (West)", "rd_west")]
    #[case::dropped_char_between_separators("a_!_b", "a_b")]
    #[case::tab_is_dropped_not_mapped("a\tb", "ab")]
    #[case::non_ascii_letters_dropped("Café Zürich", "caf_zrich")]
    #[case::digits_kept("Floor 12", "floor_12")]
    #[case::long_separator_run("a - _ - b", "a_b")]
    fn normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw, 0), expected);
    }

    #[rstest]
    #[case::punctuation_only("!!!")]
    #[case::cjk("中文")]
    #[case::empty("")]
    #[case::separators_only(" - _ ")]
    fn empty_result_uses_fallback(#[case] raw: &str) {
        assert_eq!(normalize(raw, 1_700_000_000_000), "node_1700000000000");
        assert!(try_normalize(raw).is_none());
    }

    #[test]
    fn normalize_with_only_draws_seed_on_fallback() {
        struct Panics;
        impl SeedSource for Panics {
            fn next_seed(&self) -> u64 {
                panic!("seed should not be requested")
            }
        }
        assert_eq!(normalize_with("Main Hall", &Panics), "main_hall");
        assert_eq!(normalize_with("???", &FixedSeed(7)), "node_7");
    }

    #[test]
    fn kelvin_sign_lowercases_to_ascii_k() {
        // U+212A lowercases to ASCII 'k', so it survives the ASCII filter.
        assert_eq!(normalize("\u{212A}iosk", 0), "kiosk");
    }

    #[rstest]
    #[case("branch_1")]
    #[case("node_1700000000000")]
    #[case("a")]
    fn parse_accepts_valid(#[case] s: &str) {
        assert_eq!(Identifier::parse(s).unwrap(), s);
    }

    #[rstest]
    #[case("", IdentifierError::Empty)]
    #[case("Branch", IdentifierError::InvalidCharacter("Branch".into()))]
    #[case("a-b", IdentifierError::InvalidCharacter("a-b".into()))]
    #[case("_a", IdentifierError::MisplacedSeparator("_a".into()))]
    #[case("a_", IdentifierError::MisplacedSeparator("a_".into()))]
    #[case("a__b", IdentifierError::MisplacedSeparator("a__b".into()))]
    fn parse_rejects_invalid(#[case] s: &str, #[case] err: IdentifierError) {
        assert_eq!(Identifier::parse(s), Err(err));
    }

    #[test]
    fn serde_round_trip_validates() {
        let id: Identifier = serde_json::from_str(r#""main_hall""#).unwrap();
        assert_eq!(id, "main_hall");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""main_hall""#);
        assert!(serde_json::from_str::<Identifier>(r#""Main Hall""#).is_err());
    }
}
