//! Error types for FNMT client authorization

use std::io;

use thiserror::Error;

use crate::fnmt::profile::ProfileViolation;

/// Result type alias for FNMT client authorization
pub type Result<T> = std::result::Result<T, Error>;

/// FNMT client authorization errors
#[derive(Error, Debug)]
pub enum Error {
    /// The peer presented no certificate at all
    #[error("no client certificate provided")]
    NoCertificate,

    /// The leaf certificate could not be decoded
    #[error("error parsing the given certificate: {0}")]
    MalformedCertificate(String),

    /// The certificate subject does not follow the FNMT issuance profile
    #[error("client fnmt certificate failed profile validation: {0}")]
    ProfileMismatch(#[from] ProfileViolation),

    /// The identity is well-formed but not present in any allow-list
    #[error("client fnmt certificate is not authorized")]
    Unauthorized,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The TLS handshake with a client failed or timed out
    #[error("TLS handshake failed: {0}")]
    Handshake(io::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

impl Error {
    /// Short, stable label for structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCertificate => "no-certificate",
            Self::MalformedCertificate(_) => "malformed-certificate",
            Self::ProfileMismatch(_) => "profile-mismatch",
            Self::Unauthorized => "unauthorized",
            Self::Config(_) => "configuration",
            Self::Handshake(_) => "handshake",
            Self::Io(_) => "io",
            Self::Tls(_) => "tls",
        }
    }

    /// Map a verification failure onto the rustls error that aborts the
    /// handshake.
    #[must_use]
    pub fn to_rustls_error(&self) -> rustls::Error {
        use rustls::CertificateError;

        match self {
            Self::NoCertificate => rustls::Error::NoCertificatesPresented,
            Self::MalformedCertificate(_) => {
                rustls::Error::InvalidCertificate(CertificateError::BadEncoding)
            }
            Self::ProfileMismatch(_) | Self::Unauthorized => {
                rustls::Error::InvalidCertificate(CertificateError::ApplicationVerificationFailure)
            }
            Self::Tls(e) => e.clone(),
            Self::Config(_) | Self::Handshake(_) | Self::Io(_) => {
                rustls::Error::General(self.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_distinct_for_verification_failures() {
        let kinds = [
            Error::NoCertificate.kind(),
            Error::MalformedCertificate("x".into()).kind(),
            Error::ProfileMismatch(ProfileViolation::SerialNumber { length: 3 }).kind(),
            Error::Unauthorized.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn no_certificate_maps_to_no_certificates_presented() {
        assert_eq!(
            Error::NoCertificate.to_rustls_error(),
            rustls::Error::NoCertificatesPresented
        );
    }

    #[test]
    fn unauthorized_maps_to_application_verification_failure() {
        assert_eq!(
            Error::Unauthorized.to_rustls_error(),
            rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure
            )
        );
    }

    #[test]
    fn malformed_maps_to_bad_encoding() {
        assert_eq!(
            Error::MalformedCertificate("truncated".into()).to_rustls_error(),
            rustls::Error::InvalidCertificate(rustls::CertificateError::BadEncoding)
        );
    }

    #[test]
    fn handshake_failures_are_labelled_apart_from_io() {
        let handshake = Error::Handshake(io::Error::new(io::ErrorKind::TimedOut, "stalled"));
        let io = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(handshake.kind(), "handshake");
        assert_eq!(io.kind(), "io");
    }

    #[test]
    fn display_carries_decoder_diagnostic() {
        let err = Error::MalformedCertificate("unexpected end of input".into());
        assert!(err.to_string().contains("unexpected end of input"));
    }
}
