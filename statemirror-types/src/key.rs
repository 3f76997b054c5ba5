//! Object identity keys.
//!
//! Two objects with the same key are the same logical entity across time.
//! The derivation rule is explicit and total: `"scope/name"` when the object
//! lives in a scope, plain `"name"` otherwise. Neither part may be empty or
//! contain `/`, so every key splits back unambiguously.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The canonical identity of a watched object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derives a key from an object's scope and name.
    pub fn from_parts(scope: Option<&str>, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidKey("empty name".to_string()));
        }
        if name.contains('/') {
            return Err(Error::InvalidKey(format!("name {name:?} contains '/'")));
        }
        match scope {
            Some("") => Err(Error::InvalidKey("empty scope".to_string())),
            Some(s) if s.contains('/') => {
                Err(Error::InvalidKey(format!("scope {s:?} contains '/'")))
            }
            Some(s) => Ok(Self(format!("{s}/{name}"))),
            None => Ok(Self(name.to_string())),
        }
    }

    /// Parses a key from its string form, validating the derivation rule.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((scope, name)) => Self::from_parts(Some(scope), name),
            None => Self::from_parts(None, s),
        }
    }

    /// Returns the key's string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the key back into its scope and name parts.
    #[must_use]
    pub fn split(&self) -> (Option<&str>, &str) {
        match self.0.split_once('/') {
            Some((scope, name)) => (Some(scope), name),
            None => (None, self.0.as_str()),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Encodes a label map as a canonical index key: `k1=v1,k2=v2,...` in
/// sorted key order. Deterministic for any two equal maps, so it is safe
/// to use as a secondary-index key function.
#[must_use]
pub fn labels_key(labels: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (i, (k, v)) in labels.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}
