use std::collections::BTreeSet;
use std::fmt;

use crate::config::EmptyScope;
use crate::db::Client;
use crate::error::{Error, Result};

/// A normalized set of granted scope tokens. Always a subset of the client's
/// allowed scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope(BTreeSet<String>);

impl Scope {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeValidator {
    empty_scope: EmptyScope,
}

impl ScopeValidator {
    pub fn new(empty_scope: EmptyScope) -> Self {
        Self { empty_scope }
    }

    /// Check a raw `scope` parameter against what the client may be granted.
    ///
    /// Every requested token must be allowed; one unknown token fails the
    /// whole request rather than narrowing the grant.
    pub fn validate(&self, client: &Client, requested: Option<&str>) -> Result<Scope> {
        let allowed = client.allowed_scope_set();
        let requested: BTreeSet<&str> = requested
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default();

        if requested.is_empty() {
            return Ok(match self.empty_scope {
                EmptyScope::Allowed => {
                    Scope(allowed.into_iter().map(String::from).collect())
                }
                EmptyScope::Nothing => Scope::default(),
            });
        }

        let unknown: Vec<&str> = requested
            .iter()
            .copied()
            .filter(|s| !allowed.contains(s))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::InvalidScope { scope: unknown.join(" ") });
        }

        Ok(Scope(requested.into_iter().map(String::from).collect()))
    }
}
