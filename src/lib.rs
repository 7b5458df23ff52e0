//! FNMT client-certificate authorization
//!
//! Authorizes TLS clients that present a Spanish FNMT natural-person
//! certificate by matching the identity in the certificate subject against
//! configured allow-lists.
//!
//! # Features
//!
//! - **Profile checks**: `C=ES` and `serialNumber=IDCES-<DNI>` before any
//!   subject field is trusted
//! - **Three allow-lists**: full names, DNIs, and combined `"<name> - <DNI>"`
//!   tokens, checked in that order
//! - **rustls integration**: a `ClientCertVerifier` that layers the
//!   allow-lists on top of WebPKI chain and CRL validation
//! - **Tooling**: `check` a certificate offline, `serve` a TLS listener, and
//!   generate FNMT-shaped test certificates
//!
//! # Example
//!
//! ```no_run
//! use fnmt_client_auth::fnmt::{AllowList, FnmtVerifier};
//!
//! # fn main() -> fnmt_client_auth::Result<()> {
//! # let leaf_der: Vec<u8> = Vec::new();
//! let verifier = FnmtVerifier::new(AllowList::new(
//!     ["Juan Pérez García"],
//!     ["123456789"],
//!     ["Juan Pérez García - 123456789"],
//! ));
//! let matched = verifier.verify(&[leaf_der])?;
//! println!("authorized by {}: {}", matched.kind, matched.value);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod fnmt;
pub mod server;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG`, when set, takes precedence over `level`.
///
/// # Errors
///
/// Returns [`Error::Config`] if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
