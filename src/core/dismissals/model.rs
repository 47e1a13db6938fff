//! Dismissal set and the key scheme used to store acknowledged alerts.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which local list an acknowledgement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Low-stock item, identified by item name
    Stock,
    /// Expiring batch, identified by resolved batch id
    Expiry,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Expiry => "expiry",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock" => Ok(Self::Stock),
            "expiry" => Ok(Self::Expiry),
            other => Err(format!("unknown alert kind '{other}'")),
        }
    }
}

/// How identifiers from the two alert kinds share the dismissal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalScope {
    /// Item names and batch ids live in one pool, so a batch id equal to an
    /// item name suppresses both.
    #[default]
    Shared,
    /// Keys are prefixed with their kind (`stock:Gauze`, `expiry:B1`).
    PerKind,
}

impl DismissalScope {
    /// The key under which `id` of `kind` is recorded.
    pub fn key(&self, kind: AlertKind, id: &str) -> String {
        match self {
            Self::Shared => id.to_owned(),
            Self::PerKind => format!("{kind}:{id}"),
        }
    }
}

/// Insertion-ordered set of acknowledged identifiers.
///
/// Serializes as a plain JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DismissalSet {
    entries: Vec<String>,
    index: HashSet<String>,
}

impl DismissalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns false if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.index.contains(&key) {
            return false;
        }
        self.index.insert(key.clone());
        self.entries.push(key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for DismissalSet {
    fn from(keys: Vec<String>) -> Self {
        let mut set = Self::new();
        for key in keys {
            set.insert(key);
        }
        set
    }
}

impl From<DismissalSet> for Vec<String> {
    fn from(set: DismissalSet) -> Self {
        set.entries
    }
}
