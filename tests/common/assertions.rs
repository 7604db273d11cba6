//! Custom assertion helpers with descriptive failure messages.

use regex::Regex;
use std::sync::LazyLock;

static SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").unwrap());

/// Assert `id` has the canonical identifier shape.
pub fn assert_identifier_shape(id: &str) {
    assert!(
        SHAPE.is_match(id),
        "identifier {id:?} does not match ^[a-z0-9]+(_[a-z0-9]+)*$"
    );
}

/// Assert `haystack` contains every needle, in order.
pub fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(at) => from += at + needle.len(),
            None => panic!("expected {needle:?} after byte {from} in:\n{haystack}"),
        }
    }
}
