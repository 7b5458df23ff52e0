//! FNMT client-certificate authorization.
//!
//! Decides whether the holder of an FNMT natural-person certificate may
//! connect, based on administrator-maintained allow-lists of full names,
//! DNIs, or combined `"<name> - <DNI>"` tokens.
//!
//! # Architecture
//!
//! ```text
//! TCP connection
//!   → TLS handshake      (rustls/WebPKI verifies the chain against the CA)
//!   → FnmtClientCertVerifier
//!       → parse leaf     (x509-parser)
//!       → validate_profile   C=ES, serialNumber=IDCES-<9 chars>
//!       → ParsedIdentity     given name, surname, CN, DNI
//!       → AllowList::authorize   names → dnis → namednis, first match wins
//! ```
//!
//! # Modules
//!
//! - [`config`]: YAML configuration types (`AllowConfig`, `TlsConfig`)
//! - [`identity`]: X.509 subject extraction (`ParsedIdentity`)
//! - [`profile`]: FNMT issuance profile checks (`validate_profile`)
//! - [`access_control`]: allow-list matching (`AllowList`, `MatchedIdentity`)
//! - [`verifier`]: the end-to-end check (`FnmtVerifier`)
//! - [`client_verifier`]: rustls `ClientCertVerifier` adapter
//! - [`cert_manager`]: rustls config building and certificate generation
//!
//! # Quick start
//!
//! ```yaml
//! allow:
//!   names: ["Juan Pérez García"]
//!   dnis: ["123456789"]
//! ```

pub mod access_control;
pub mod cert_manager;
pub mod client_verifier;
pub mod config;
pub mod identity;
pub mod profile;
pub mod verifier;

pub use access_control::{AllowList, MatchKind, MatchedIdentity};
pub use cert_manager::{
    CaParams, CertGenerator, ClientCertParams, GeneratedCert, ServerCertParams, build_tls_config,
    load_certs, load_certs_any, load_private_key,
};
pub use client_verifier::FnmtClientCertVerifier;
pub use config::{AllowConfig, TlsConfig};
pub use identity::ParsedIdentity;
pub use profile::{ProfileViolation, validate_profile};
pub use verifier::FnmtVerifier;
