//! Path matching.
//!
//! # Design Decisions
//! - Matching is case-sensitive
//! - Prefix matching respects segment boundaries: `/admin` matches
//!   `/admin` and `/admin/clases`, never `/administrador`
//! - No regex, so a lookup is a linear scan of string comparisons

use serde::{Deserialize, Serialize};

/// How a route entry compares against a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Prefix,
}

/// A compiled path condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatcher {
    kind: MatchKind,
    path: String,
}

impl PathMatcher {
    pub fn new(kind: MatchKind, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind,
            path: normalize_path(&path).to_string(),
        }
    }

    pub fn exact(path: impl Into<String>) -> Self {
        Self::new(MatchKind::Exact, path)
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        Self::new(MatchKind::Prefix, path)
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if the (already normalised) path satisfies this condition.
    pub fn matches(&self, path: &str) -> bool {
        match self.kind {
            MatchKind::Exact => path == self.path,
            MatchKind::Prefix => {
                if self.path == "/" {
                    return true;
                }
                match path.strip_prefix(self.path.as_str()) {
                    Some(rest) => rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }
}

/// Drop one trailing slash so `/clases/` and `/clases` classify alike.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}
