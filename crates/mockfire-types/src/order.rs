//! Child ordering.
//!
//! Children are ordered by priority first (see [`Priority::compare`]) and then
//! by key. Keys that parse as 32-bit integers sort numerically ahead of all
//! other keys; the remaining keys sort lexicographically.
//!
//! [`Priority::compare`]: crate::Priority::compare

use std::cmp::Ordering;

/// Parse a key that is a canonical 32-bit integer (`"0"`, `"-7"`, `"42"`).
fn integer_key(key: &str) -> Option<i32> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // No leading zeros, and no "-0".
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    if key == "-0" {
        return None;
    }
    key.parse().ok()
}

/// Compare two keys in child order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.len().cmp(&b.len())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
