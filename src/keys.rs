//! The set of API keys that may call the gateway.
//!
//! Keys are collected at startup and never change while serving.

use crate::error::{GatewayError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashSet<String>,
}

#[derive(Debug, Deserialize)]
struct KeysFile {
    #[serde(default)]
    keys: Vec<String>,
}

impl KeySet {
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Self {
        let mut set = Self::default();
        for key in keys {
            set.insert(key.as_ref());
        }
        set
    }

    /// Read a `{"keys": [...]}` JSON file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("Failed to read keys file {}: {}", path.display(), e))
        })?;
        let parsed: KeysFile = serde_json::from_str(&content)?;
        Ok(Self::from_keys(&parsed.keys))
    }

    /// Sanitize and add a key. Returns false (and logs) if the key is blank or invalid.
    pub fn insert(&mut self, raw: &str) -> bool {
        let key = sanitize_key(raw);
        if key.is_empty() {
            return false;
        }
        if !is_valid_key(&key) {
            tracing::warn!("Ignoring gateway key with invalid characters");
            return false;
        }
        self.keys.insert(key)
    }

    pub fn extend(&mut self, other: KeySet) {
        self.keys.extend(other.keys);
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Strip zero-width characters and surrounding whitespace.
#[must_use]
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Token from an `Authorization: Bearer <token>` header value; scheme is case-insensitive.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim_start().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("  abc\u{200B}def\u{FEFF} \n"), "abcdef");
        assert_eq!(sanitize_key("\u{200C}\u{200D}"), "");
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("sk-live_1.2"));
        assert!(!is_valid_key("has space"));
        assert!(!is_valid_key("slash/"));
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_insert_filters_bad_keys() {
        let mut keys = KeySet::default();
        assert!(keys.insert(" good-key "));
        assert!(!keys.insert("bad key"));
        assert!(!keys.insert("   "));
        assert!(!keys.insert("good-key"));
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("good-key"));
    }

    #[test]
    fn test_load_file() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"keys": ["a1", "b2", "not valid"]}}"#).unwrap();

        let keys = KeySet::load_file(f.path()).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a1"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc  "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }
}
