//! `rustls` integration.
//!
//! [`FnmtClientCertVerifier`] plugs [`FnmtVerifier`] into a rustls server.
//! Trust decisions (chain building, validity period, CRLs, handshake
//! signatures) stay with the wrapped WebPKI verifier; the allow-lists are
//! only consulted once the chain has been accepted.

use std::sync::Arc;

use rustls::client::danger::HandshakeSignatureValid;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{DigitallySignedStruct, DistinguishedName, SignatureScheme};
use tracing::debug;

use crate::fnmt::verifier::FnmtVerifier;

/// Client certificate verifier that layers FNMT identity authorization on
/// top of an inner (chain-validating) verifier.
#[derive(Debug)]
pub struct FnmtClientCertVerifier {
    inner: Arc<dyn ClientCertVerifier>,
    fnmt: FnmtVerifier,
}

impl FnmtClientCertVerifier {
    /// Wrap `inner`, which must already enforce chain trust.
    #[must_use]
    pub fn new(inner: Arc<dyn ClientCertVerifier>, fnmt: FnmtVerifier) -> Self {
        Self { inner, fnmt }
    }
}

impl ClientCertVerifier for FnmtClientCertVerifier {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> std::result::Result<ClientCertVerified, rustls::Error> {
        let verified = self
            .inner
            .verify_client_cert(end_entity, intermediates, now)?;

        self.fnmt
            .verify(std::slice::from_ref(end_entity))
            .map_err(|e| {
                debug!(reason = e.kind(), error = %e, "client fnmt certificate rejected");
                e.to_rustls_error()
            })?;

        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
