//! End-to-end verification of a presented client certificate chain.
//!
//! ```text
//! raw certs ─► parse leaf ─► validate profile ─► extract identity ─► allow-lists
//!   (empty?)    (x509-parser)   (C, serialNumber)    (ParsedIdentity)   (first match)
//! ```
//!
//! Chain trust, signatures and revocation are assumed to have been checked
//! by the TLS stack already; only the leaf is looked at here.

use tracing::Span;

use crate::config::Config;
use crate::fnmt::access_control::{AllowList, MatchedIdentity};
use crate::fnmt::identity::{ParsedIdentity, parse_certificate};
use crate::fnmt::profile::{ProfileViolation, validate_profile};
use crate::{Error, Result};

/// Identity-based authorization for FNMT client certificates.
///
/// Holds no mutable state, so one instance can serve any number of
/// concurrent handshakes.
#[derive(Debug, Clone)]
pub struct FnmtVerifier {
    allow: AllowList,
    strict_common_name: bool,
    span: Span,
}

impl FnmtVerifier {
    /// Create a verifier over `allow`, logging under a `fnmt_client_auth`
    /// span.
    #[must_use]
    pub fn new(allow: AllowList) -> Self {
        Self {
            allow,
            strict_common_name: false,
            span: tracing::info_span!("fnmt_client_auth"),
        }
    }

    /// Create a verifier from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(AllowList::from_config(&config.allow))
            .with_strict_common_name(config.strict_common_name)
    }

    /// Emit authorization records as children of `span` instead.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Require the common name to read `"<given name> <surname> - <DNI>"`.
    #[must_use]
    pub fn with_strict_common_name(mut self, strict: bool) -> Self {
        self.strict_common_name = strict;
        self
    }

    /// The allow-lists this verifier checks against.
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// Verify a presented chain. Only the first (leaf) certificate is used.
    ///
    /// # Errors
    ///
    /// - [`Error::NoCertificate`] if `raw_certs` is empty
    /// - [`Error::MalformedCertificate`] if the leaf cannot be decoded or is
    ///   followed by trailing bytes
    /// - [`Error::ProfileMismatch`] if the subject is not FNMT-shaped
    /// - [`Error::Unauthorized`] if no allow-list contains the identity
    pub fn verify<C: AsRef<[u8]>>(&self, raw_certs: &[C]) -> Result<MatchedIdentity> {
        let leaf = raw_certs.first().ok_or(Error::NoCertificate)?;

        let cert = parse_certificate(leaf.as_ref())?;

        validate_profile(&cert)?;

        let identity = ParsedIdentity::from_certificate(&cert);

        if self.strict_common_name
            && identity.conventional_common_name().as_deref() != Some(identity.common_name.as_str())
        {
            return Err(ProfileViolation::CommonName.into());
        }

        self.allow.authorize(&identity, &self.span)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
