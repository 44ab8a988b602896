//! Access levels
//!
//! A caller's access level decides which fields of a document it may see.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::RestError;
use crate::core::RestRequest;

/// Caller visibility level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccessLevel {
    /// Sees neither protected nor private fields
    Public,
    /// Sees protected fields, not private ones
    Protected,
    /// Sees everything
    Private,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Protected => "protected",
            AccessLevel::Private => "private",
        }
    }

    /// Whether fields declared private are hidden at this level
    pub fn hides_private(self) -> bool {
        self != AccessLevel::Private
    }

    /// Whether fields declared protected are hidden at this level
    pub fn hides_protected(self) -> bool {
        self == AccessLevel::Public
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(AccessLevel::Public),
            "protected" => Ok(AccessLevel::Protected),
            "private" => Ok(AccessLevel::Private),
            _ => Err(RestError::configuration(format!(
                "Unsupported access '{}', must be \"private\", \"protected\" or \"public\"",
                s
            ))),
        }
    }
}

impl TryFrom<String> for AccessLevel {
    type Error = RestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccessLevel> for String {
    fn from(level: AccessLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Resolves the access level of a request
pub type AccessResolver = Arc<dyn Fn(&RestRequest) -> AccessLevel + Send + Sync>;

/// How a resource decides a caller's access level
#[derive(Clone)]
pub enum Access {
    /// Every request gets the same level
    Fixed(AccessLevel),
    /// Level computed per request
    Dynamic(AccessResolver),
}

impl Access {
    /// Build a per-request resolver
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&RestRequest) -> AccessLevel + Send + Sync + 'static,
    {
        Access::Dynamic(Arc::new(f))
    }

    /// Resolve the level for a request
    pub fn resolve(&self, req: &RestRequest) -> AccessLevel {
        match self {
            Access::Fixed(level) => *level,
            Access::Dynamic(resolver) => resolver(req),
        }
    }
}

impl Default for Access {
    fn default() -> Self {
        Access::Fixed(AccessLevel::Public)
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Fixed(level) => f.debug_tuple("Fixed").field(level).finish(),
            Access::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<AccessLevel> for Access {
    fn from(level: AccessLevel) -> Self {
        Access::Fixed(level)
    }
}
