//! Database path algebra.
//!
//! A [`DbPath`] names a node in the data tree as a sequence of keys. Parsing
//! normalizes separators, so `"users//42/"` and `"/users/42"` name the same
//! node. Navigating between paths is pure addressing and never touches data.
//!
//! Valid keys:
//! - Must be non-empty and at most [`MAX_KEY_BYTES`] bytes
//! - Must not contain `.`, `#`, `$`, `[`, `]`, or `/`
//! - Must not contain ASCII control characters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{TypeError, TypeResult};

/// Characters that are forbidden anywhere in a key.
const FORBIDDEN_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Maximum length of a single key, in bytes.
pub const MAX_KEY_BYTES: usize = 768;

/// Validate a single key, returning `Ok(())` if it may appear in a path.
///
/// # Examples
///
/// ```
/// use mockfire_types::validate_key;
///
/// assert!(validate_key("users").is_ok());
/// assert!(validate_key("-Nabc_123").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("a.b").is_err());
/// ```
pub fn validate_key(key: &str) -> TypeResult<()> {
    if key.is_empty() {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty".into(),
        });
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: format!("key exceeds {MAX_KEY_BYTES} bytes"),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if key.contains(*ch) {
            return Err(TypeError::InvalidKey {
                key: key.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    if key.chars().any(|c| c.is_ascii_control()) {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "contains a control character".into(),
        });
    }

    Ok(())
}

/// A normalized location in the data tree. The root is the empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-delimited path, dropping empty segments.
    pub fn parse(raw: &str) -> TypeResult<Self> {
        Self::from_segments(raw.split('/').filter(|s| !s.is_empty()))
    }

    /// Build a path from already-split keys. Every key is validated.
    pub fn from_segments<I, S>(segments: I) -> TypeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(Into::into)
            .map(|s: String| validate_key(&s).map(|_| s))
            .collect::<TypeResult<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The keys making up this path, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of keys below the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The last key, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<DbPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Resolve a relative, slash-delimited path below this one.
    pub fn child(&self, relative: &str) -> TypeResult<DbPath> {
        Ok(self.join(&DbPath::parse(relative)?))
    }

    /// Concatenate two paths.
    pub fn join(&self, other: &DbPath) -> DbPath {
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend(self.segments.iter().cloned());
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Append a single, already validated key.
    pub fn push_key(&self, key: &str) -> TypeResult<DbPath> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    /// Returns `true` if `prefix` equals this path or is one of its ancestors.
    pub fn starts_with(&self, prefix: &DbPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The remainder of this path below `prefix`.
    pub fn strip_prefix(&self, prefix: &DbPath) -> Option<DbPath> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }

    /// Every path from the root down to and including this one.
    pub fn lineage(&self) -> impl Iterator<Item = DbPath> + '_ {
        (0..=self.segments.len()).map(move |n| Self {
            segments: self.segments[..n].to_vec(),
        })
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for DbPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DbPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DbPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_is_empty() {
        let root = DbPath::parse("").unwrap();
        assert!(root.is_root());
        assert_eq!(root, DbPath::root());
        assert_eq!(root.key(), None);
        assert_eq!(root.parent(), None);
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn parse_drops_empty_segments() {
        let a = DbPath::parse("/users//42/").unwrap();
        let b = DbPath::parse("users/42").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.segments(), &["users".to_string(), "42".to_string()]);
        assert_eq!(a.to_string(), "/users/42");
    }

    #[test]
    fn key_and_parent() {
        let p = DbPath::parse("users/42/name").unwrap();
        assert_eq!(p.key(), Some("name"));
        assert_eq!(p.parent().unwrap().to_string(), "/users/42");
        assert_eq!(p.depth(), 3);
    }

    #[test]
    fn child_concatenates() {
        let users = DbPath::parse("users").unwrap();
        let ann = users.child("42/name").unwrap();
        assert_eq!(ann.to_string(), "/users/42/name");
        assert_eq!(users.child("").unwrap(), users);
    }

    #[test]
    fn reject_forbidden_chars() {
        for bad in ["a.b", "a#b", "a$b", "a[b", "a]b", "tab\there"] {
            assert!(DbPath::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn reject_parent_traversal() {
        assert!(DbPath::parse("users/../admin").is_err());
    }

    #[test]
    fn reject_oversized_key() {
        let long = "k".repeat(MAX_KEY_BYTES + 1);
        assert!(validate_key(&long).is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_BYTES)).is_ok());
    }

    #[test]
    fn push_key_validates() {
        let root = DbPath::root();
        assert!(root.push_key("a/b").is_err());
        assert_eq!(root.push_key("a").unwrap().to_string(), "/a");
    }

    #[test]
    fn prefix_operations() {
        let p = DbPath::parse("a/b/c").unwrap();
        let prefix = DbPath::parse("a").unwrap();
        assert!(p.starts_with(&prefix));
        assert!(p.starts_with(&DbPath::root()));
        assert!(!prefix.starts_with(&p));
        assert_eq!(p.strip_prefix(&prefix).unwrap().to_string(), "/b/c");
        assert!(prefix.strip_prefix(&p).is_none());
    }

    #[test]
    fn lineage_runs_root_to_self() {
        let p = DbPath::parse("a/b").unwrap();
        let lineage: Vec<String> = p.lineage().map(|l| l.to_string()).collect();
        assert_eq!(lineage, vec!["/", "/a", "/a/b"]);
    }

    #[test]
    fn serde_as_string() {
        let p = DbPath::parse("users/42").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"/users/42\"");
        let back: DbPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    proptest! {
        #[test]
        fn parse_is_idempotent(segments in proptest::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..6)) {
            let raw = segments.join("//");
            let once = DbPath::parse(&raw).unwrap();
            let twice = DbPath::parse(&once.to_string()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn child_composes(a in "[a-z]{1,6}", b in "[a-z]{1,6}") {
            let root = DbPath::root();
            let stepwise = root.child(&a).unwrap().child(&b).unwrap();
            let direct = root.child(&format!("{a}/{b}")).unwrap();
            prop_assert_eq!(stepwise, direct);
        }
    }
}
