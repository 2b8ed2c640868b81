use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A CIM element name: compared and hashed case-insensitively, displayed with
/// the case it was created with.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CimName {
    display: String,
    key: String,
}

impl CimName {
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let key = display.to_lowercase();
        Self { display, key }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lower-cased lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive comparison against a plain string.
    pub fn matches(&self, other: &str) -> bool {
        self.key == other.to_lowercase()
    }
}

impl PartialEq for CimName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CimName {}

impl Hash for CimName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for CimName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CimName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialEq<str> for CimName {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for CimName {
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

impl fmt::Debug for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.display)
    }
}

impl fmt::Display for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<String> for CimName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CimName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&CimName> for CimName {
    fn from(value: &CimName) -> Self {
        value.clone()
    }
}

impl From<CimName> for String {
    fn from(value: CimName) -> Self {
        value.display
    }
}

impl Borrow<str> for CimName {
    /// Borrowing yields the lookup key, so maps keyed by `CimName` can be
    /// probed with an already lower-cased `&str`.
    fn borrow(&self) -> &str {
        &self.key
    }
}

/// Normalize a namespace name: surrounding slashes are not significant.
pub fn normalize_namespace(namespace: &str) -> CimName {
    CimName::new(namespace.trim().trim_matches('/'))
}

/// Generate an opaque identifier (used for enumeration context handles).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
