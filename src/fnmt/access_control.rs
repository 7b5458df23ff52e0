//! Allow-list authorization of FNMT identities.
//!
//! Three independent lists are checked in a fixed order and the first hit
//! wins:
//!
//! 1. **full names** against `"<given name> <surname>"` → [`MatchKind::FullName`]
//! 2. **DNIs** against the serial number without `IDCES-` → [`MatchKind::NationalId`]
//! 3. **combined tokens** against the common name → [`MatchKind::CombinedToken`]
//!
//! Comparison is exact and case-sensitive. No trimming, Unicode
//! normalization or locale folding is applied, so operators must configure
//! values exactly as they appear in the certificate.

use std::fmt;

use tracing::{Span, info};

use crate::fnmt::config::AllowConfig;
use crate::fnmt::identity::ParsedIdentity;
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Match result
// ─────────────────────────────────────────────────────────────────────────────

/// Which allow-list accepted the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Given name and surname matched an entry in `names`.
    FullName,
    /// The DNI matched an entry in `dnis`.
    NationalId,
    /// The common name matched an entry in `namednis`.
    CombinedToken,
}

impl MatchKind {
    /// Label used in log records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "full-name",
            Self::NationalId => "national-id",
            Self::CombinedToken => "combined-token",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful authorization: the list that matched and the value it
/// matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedIdentity {
    /// Which list matched.
    pub kind: MatchKind,
    /// The identity value that was found in that list.
    pub value: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Allow-lists
// ─────────────────────────────────────────────────────────────────────────────

/// The administrator-configured allow-lists.
///
/// Immutable once built; share it freely across concurrent handshakes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    full_names: Vec<String>,
    national_ids: Vec<String>,
    combined_tokens: Vec<String>,
}

impl AllowList {
    /// Build the allow-lists from their three entry sequences.
    pub fn new<N, I, T>(full_names: N, national_ids: I, combined_tokens: T) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            full_names: full_names.into_iter().map(Into::into).collect(),
            national_ids: national_ids.into_iter().map(Into::into).collect(),
            combined_tokens: combined_tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the allow-lists from a validated configuration block.
    ///
    /// Absent sub-keys become empty lists.
    #[must_use]
    pub fn from_config(config: &AllowConfig) -> Self {
        let list = |entries: &Option<Vec<String>>| entries.clone().unwrap_or_default();
        Self {
            full_names: list(&config.names),
            national_ids: list(&config.dnis),
            combined_tokens: list(&config.namednis),
        }
    }

    /// Returns `true` when no list has any entry, so nothing can match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_names.is_empty() && self.national_ids.is_empty() && self.combined_tokens.is_empty()
    }

    /// Full-name entries.
    #[must_use]
    pub fn full_names(&self) -> &[String] {
        &self.full_names
    }

    /// DNI entries.
    #[must_use]
    pub fn national_ids(&self) -> &[String] {
        &self.national_ids
    }

    /// Combined name and DNI entries.
    #[must_use]
    pub fn combined_tokens(&self) -> &[String] {
        &self.combined_tokens
    }

    /// Find the first list that accepts `identity`.
    ///
    /// On success a single INFO event naming the match kind and value is
    /// emitted as a child of `span`. Nothing is logged on failure; reporting
    /// the rejection is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when no list contains the identity.
    pub fn authorize(&self, identity: &ParsedIdentity, span: &Span) -> Result<MatchedIdentity> {
        let matched = self.find_match(identity).ok_or(Error::Unauthorized)?;

        info!(
            parent: span,
            kind = %matched.kind,
            value = %matched.value,
            "client fnmt certificate authorized"
        );

        Ok(matched)
    }

    fn find_match(&self, identity: &ParsedIdentity) -> Option<MatchedIdentity> {
        let full_name = identity.full_name();
        if contains(&self.full_names, &full_name) {
            return Some(MatchedIdentity {
                kind: MatchKind::FullName,
                value: full_name,
            });
        }

        if let Some(dni) = identity.national_id()
            && contains(&self.national_ids, dni)
        {
            return Some(MatchedIdentity {
                kind: MatchKind::NationalId,
                value: dni.to_owned(),
            });
        }

        if contains(&self.combined_tokens, &identity.common_name) {
            return Some(MatchedIdentity {
                kind: MatchKind::CombinedToken,
                value: identity.common_name.clone(),
            });
        }

        None
    }
}

fn contains(entries: &[String], value: &str) -> bool {
    entries.iter().any(|entry| entry == value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
