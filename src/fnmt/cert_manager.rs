//! Certificate management: loading, rustls config building, and generation.
//!
//! Provides:
//! - [`build_tls_config`]: build a `rustls::ServerConfig` whose client
//!   verifier enforces the FNMT allow-lists
//! - [`load_certs`] / [`load_private_key`] / [`load_crls`]: PEM file loading
//! - [`CertGenerator`]: `rcgen`-backed generation of a local CA, server
//!   certificates and FNMT-shaped client certificates for testing
//!
//! # File format
//!
//! Configured certificate and key files are expected in **PEM format**.
//! [`load_certs_any`] additionally accepts a single DER certificate for the
//! `check` command.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, Issuer, KeyPair, KeyUsagePurpose, date_time_ymd,
};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, CertificateRevocationListDer, PrivateKeyDer};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tracing::debug;

use crate::fnmt::client_verifier::FnmtClientCertVerifier;
use crate::fnmt::config::TlsConfig;
use crate::fnmt::profile::{EXPECTED_COUNTRY, SERIAL_PREFIX};
use crate::fnmt::verifier::FnmtVerifier;
use crate::{Error, Result};

/// OID arcs for subject attributes rcgen has no named [`DnType`] for.
const OID_SURNAME: [u64; 4] = [2, 5, 4, 4];
const OID_SERIAL_NUMBER: [u64; 4] = [2, 5, 4, 5];
const OID_GIVEN_NAME: [u64; 4] = [2, 5, 4, 42];

// ─────────────────────────────────────────────────────────────────────────────
// Public: build TLS server config
// ─────────────────────────────────────────────────────────────────────────────

/// Build a `rustls::ServerConfig` that requires FNMT client certificates.
///
/// Client chains must validate against `tls.ca_cert` (and `tls.crl_path`
/// when set) before `verifier` checks the identity against its allow-lists.
///
/// # Errors
///
/// Returns an error if a required path is missing, any certificate or key
/// file cannot be read or parsed, or the rustls config cannot be built
/// (e.g. mismatched cert/key pair).
pub fn build_tls_config(tls: &TlsConfig, verifier: FnmtVerifier) -> Result<ServerConfig> {
    tls.validate()?;

    let server_certs = load_certs(&tls.server_cert)?;
    let server_key = load_private_key(&tls.server_key)?;
    let ca_certs = load_certs(&tls.ca_cert)?;

    let mut root_store = RootCertStore::empty();
    for cert in ca_certs {
        root_store
            .add(cert)
            .map_err(|e| Error::Config(format!("Failed to add CA cert to trust store: {e}")))?;
    }

    let inner = build_webpki_verifier(tls, root_store)?;
    let client_verifier = Arc::new(FnmtClientCertVerifier::new(inner, verifier));

    let tls_cfg = ServerConfig::builder()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(server_certs, server_key)
        .map_err(|e| Error::Config(format!("TLS config error (cert/key mismatch?): {e}")))?;

    debug!(
        server_cert = %tls.server_cert,
        ca_cert = %tls.ca_cert,
        crl = tls.crl_path.is_some(),
        "fnmt TLS config built"
    );

    Ok(tls_cfg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: PEM loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load all certificates from a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains no valid PEM
/// certificate blocks.
pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let pem_data = read_file(path)?;
    let certs = parse_pem_certs(&pem_data, path)?;

    if certs.is_empty() {
        return Err(Error::Config(format!("No certificates found in '{path}'")));
    }

    Ok(certs)
}

/// Load certificates from a file holding either PEM blocks or one raw DER
/// certificate.
///
/// An empty file yields an empty chain. DER content is not validated here;
/// decoding errors surface when the chain is verified.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds broken PEM.
pub fn load_certs_any(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let data = read_file(path)?;
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let certs = parse_pem_certs(&data, path)?;
    if certs.is_empty() {
        return Ok(vec![CertificateDer::from(data)]);
    }
    Ok(certs)
}

/// Load the first private key from a PEM file.
///
/// Supports PKCS#1 (`RSA PRIVATE KEY`), PKCS#8 (`PRIVATE KEY`), and SEC1
/// (`EC PRIVATE KEY`) keys.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains no private key.
pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let pem_data = read_file(path)?;
    PrivateKeyDer::from_pem_slice(&pem_data)
        .map_err(|e| Error::Config(format!("Failed to parse private key from '{path}': {e}")))
}

/// Load CRL entries from a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds broken PEM.
pub fn load_crls(path: &str) -> Result<Vec<CertificateRevocationListDer<'static>>> {
    let pem_data = read_file(path)?;
    CertificateRevocationListDer::pem_slice_iter(&pem_data)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("Failed to parse CRL from '{path}': {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: certificate generation
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for generating a CA certificate.
#[derive(Debug, Clone)]
pub struct CaParams {
    /// Common Name for the root CA (e.g. `"Test FNMT CA"`).
    pub cn: String,
    /// Validity period in days.
    pub validity_days: u32,
}

/// Parameters for generating a TLS server certificate.
#[derive(Debug, Clone)]
pub struct ServerCertParams {
    /// Common Name.
    pub cn: String,
    /// Subject Alternative Names (DNS names or IP addresses).
    pub sans: Vec<String>,
    /// Validity period in days.
    pub validity_days: u32,
}

/// Subject of a generated client certificate.
///
/// Every attribute is optional so tests can produce certificates that break
/// the FNMT profile in specific ways. Use [`ClientCertParams::fnmt`] for a
/// conforming subject.
#[derive(Debug, Clone)]
pub struct ClientCertParams {
    /// Country (`C`).
    pub country: Option<String>,
    /// Subject serial number (`IDCES-<DNI>` for FNMT).
    pub serial_number: Option<String>,
    /// Given name.
    pub given_name: Option<String>,
    /// Surname.
    pub surname: Option<String>,
    /// Common name.
    pub common_name: Option<String>,
    /// Validity period in days.
    pub validity_days: u32,
}

impl ClientCertParams {
    /// A subject laid out the way FNMT issues natural-person certificates.
    #[must_use]
    pub fn fnmt(given_name: &str, surname: &str, dni: &str) -> Self {
        Self {
            country: Some(EXPECTED_COUNTRY.to_string()),
            serial_number: Some(format!("{SERIAL_PREFIX}{dni}")),
            given_name: Some(given_name.to_string()),
            surname: Some(surname.to_string()),
            common_name: Some(format!("{given_name} {surname} - {dni}")),
            validity_days: 365,
        }
    }

    fn distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        if let Some(ref c) = self.country {
            dn.push(DnType::CountryName, c.as_str());
        }
        if let Some(ref serial) = self.serial_number {
            dn.push(DnType::CustomDnType(OID_SERIAL_NUMBER.to_vec()), serial.as_str());
        }
        if let Some(ref surname) = self.surname {
            dn.push(DnType::CustomDnType(OID_SURNAME.to_vec()), surname.as_str());
        }
        if let Some(ref given) = self.given_name {
            dn.push(DnType::CustomDnType(OID_GIVEN_NAME.to_vec()), given.as_str());
        }
        if let Some(ref cn) = self.common_name {
            dn.push(DnType::CommonName, cn.as_str());
        }
        dn
    }

    fn certificate_params(&self) -> Result<CertificateParams> {
        let mut params = CertificateParams::default();
        params.distinguished_name = self.distinguished_name();
        params.not_after = validity_to_date(self.validity_days)?;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        Ok(params)
    }
}

/// Generated certificate and key pair.
#[derive(Debug, Clone)]
pub struct GeneratedCert {
    /// PEM-encoded certificate.
    pub cert_pem: String,
    /// DER-encoded certificate.
    pub cert_der: Vec<u8>,
    /// PEM-encoded private key.
    pub key_pem: String,
}

/// Certificate generator backed by `rcgen`.
///
/// Lets operators rehearse a deployment without real FNMT certificates.
pub struct CertGenerator;

impl CertGenerator {
    /// Generate a self-signed CA certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or certificate serialisation fails.
    pub fn init_ca(params: &CaParams) -> Result<GeneratedCert> {
        let key_pair = generate_key("CA")?;

        let mut ca_params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, params.cn.as_str());
        ca_params.distinguished_name = dn;
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        ca_params.not_after = validity_to_date(params.validity_days)?;

        let ca_cert = ca_params
            .self_signed(&key_pair)
            .map_err(|e| Error::Config(format!("CA cert generation failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: ca_cert.pem(),
            cert_der: ca_cert.der().to_vec(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    /// Issue a server certificate signed by the given CA.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA cert/key cannot be parsed, a SAN is
    /// invalid, or signing fails.
    pub fn issue_server(
        params: &ServerCertParams,
        ca_cert_pem: &str,
        ca_key_pem: &str,
    ) -> Result<GeneratedCert> {
        let issuer = load_issuer(ca_cert_pem, ca_key_pem)?;
        let key = generate_key("server")?;

        let mut server_params = CertificateParams::new(params.sans.clone())
            .map_err(|e| Error::Config(format!("Invalid server SAN: {e}")))?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, params.cn.as_str());
        server_params.distinguished_name = dn;
        server_params.not_after = validity_to_date(params.validity_days)?;
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

        let cert = server_params
            .signed_by(&key, &issuer)
            .map_err(|e| Error::Config(format!("Server cert signing failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
            key_pem: key.serialize_pem(),
        })
    }

    /// Issue a client certificate with the given subject, signed by the CA.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA cert/key cannot be parsed or signing fails.
    pub fn issue_client(
        params: &ClientCertParams,
        ca_cert_pem: &str,
        ca_key_pem: &str,
    ) -> Result<GeneratedCert> {
        let issuer = load_issuer(ca_cert_pem, ca_key_pem)?;
        let key = generate_key("client")?;

        let cert = params
            .certificate_params()?
            .signed_by(&key, &issuer)
            .map_err(|e| Error::Config(format!("Client cert signing failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
            key_pem: key.serialize_pem(),
        })
    }

    /// Generate a self-signed client certificate with the given subject.
    ///
    /// Enough for exercising the identity checks, which never look at the
    /// issuer.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or certificate serialisation fails.
    pub fn self_signed_client(params: &ClientCertParams) -> Result<GeneratedCert> {
        let key = generate_key("client")?;

        let cert = params
            .certificate_params()?
            .self_signed(&key)
            .map_err(|e| Error::Config(format!("Client cert generation failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
            key_pem: key.serialize_pem(),
        })
    }

    /// Write a [`GeneratedCert`] to disk as `<stem>.crt` and `<stem>.key`
    /// under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the files
    /// cannot be written.
    pub fn write_to_dir(cert: &GeneratedCert, dir: &Path, stem: &str) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::Config(format!("Cannot create dir '{}': {e}", dir.display())))?;

        fs::write(dir.join(format!("{stem}.crt")), &cert.cert_pem)
            .map_err(|e| Error::Config(format!("Cannot write cert: {e}")))?;

        fs::write(dir.join(format!("{stem}.key")), &cert.key_pem)
            .map_err(|e| Error::Config(format!("Cannot write key: {e}")))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Private helpers
// ─────────────────────────────────────────────────────────────────────────────

fn read_file(path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Config(format!("Cannot read '{path}': {e}")))
}

fn parse_pem_certs(data: &[u8], path: &str) -> Result<Vec<CertificateDer<'static>>> {
    CertificateDer::pem_slice_iter(data)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("Failed to parse certs from '{path}': {e}")))
}

/// Build the chain-validating verifier, with CRLs when configured.
fn build_webpki_verifier(
    tls: &TlsConfig,
    root_store: RootCertStore,
) -> Result<Arc<dyn ClientCertVerifier>> {
    let builder = WebPkiClientVerifier::builder(Arc::new(root_store));

    let builder = if let Some(ref crl_path) = tls.crl_path {
        builder.with_crls(load_crls(crl_path)?)
    } else {
        builder
    };

    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to build client verifier: {e}")))
}

fn generate_key(role: &str) -> Result<KeyPair> {
    KeyPair::generate().map_err(|e| Error::Config(format!("Failed to generate {role} key: {e}")))
}

fn load_issuer(ca_cert_pem: &str, ca_key_pem: &str) -> Result<Issuer<'static, KeyPair>> {
    let ca_key = KeyPair::from_pem(ca_key_pem)
        .map_err(|e| Error::Config(format!("Failed to parse CA key: {e}")))?;
    Issuer::from_ca_cert_pem(ca_cert_pem, ca_key)
        .map_err(|e| Error::Config(format!("Failed to parse CA cert: {e}")))
}

/// Convert a validity period (days) into a future date for `rcgen`.
fn validity_to_date(days: u32) -> Result<time::OffsetDateTime> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Config(format!("System time error: {e}")))?
        .as_secs();

    let future_secs = now_secs.saturating_add(u64::from(days) * 86_400);

    let dt = time::OffsetDateTime::from_unix_timestamp(
        i64::try_from(future_secs).unwrap_or(i64::MAX),
    )
    .map_err(|e| Error::Config(format!("Date calculation error: {e}")))?;

    Ok(date_time_ymd(dt.year(), u8::from(dt.month()), dt.day()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fnmt::access_control::AllowList;
    use crate::fnmt::identity::ParsedIdentity;

    fn test_ca() -> GeneratedCert {
        CertGenerator::init_ca(&CaParams {
            cn: "Test FNMT CA".into(),
            validity_days: 365,
        })
        .unwrap()
    }

    fn server_params() -> ServerCertParams {
        ServerCertParams {
            cn: "localhost".into(),
            sans: vec!["localhost".into()],
            validity_days: 30,
        }
    }

    // ─── generation ──────────────────────────────────────────────────────────

    #[test]
    fn init_ca_produces_valid_pem_cert_and_key() {
        let ca = test_ca();
        assert!(ca.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(ca.key_pem.contains("PRIVATE KEY"));
        assert!(!ca.cert_der.is_empty());
    }

    #[test]
    fn init_ca_generates_unique_keys_on_each_call() {
        assert_ne!(test_ca().key_pem, test_ca().key_pem);
    }

    #[test]
    fn issued_client_carries_fnmt_subject() {
        let ca = test_ca();
        let params = ClientCertParams::fnmt("Ana", "López Ruiz", "000000001");
        let cert = CertGenerator::issue_client(&params, &ca.cert_pem, &ca.key_pem).unwrap();

        let id = ParsedIdentity::from_der(&cert.cert_der).unwrap();
        assert_eq!(id.serial_number, "IDCES-000000001");
        assert_eq!(id.common_name, "Ana López Ruiz - 000000001");
    }

    #[test]
    fn issue_client_fails_with_invalid_ca_key() {
        let ca = test_ca();
        let params = ClientCertParams::fnmt("Ana", "López", "000000001");
        let result = CertGenerator::issue_client(&params, &ca.cert_pem, "not a pem key");
        assert!(result.is_err());
    }

    #[test]
    fn issue_server_produces_pem() {
        let ca = test_ca();
        let server = CertGenerator::issue_server(&server_params(), &ca.cert_pem, &ca.key_pem)
            .unwrap();
        assert!(server.cert_pem.contains("BEGIN CERTIFICATE"));
    }

    // ─── write_to_dir / loading ──────────────────────────────────────────────

    #[test]
    fn write_to_dir_creates_crt_and_key_files() {
        let dir = tempfile::tempdir().unwrap();
        CertGenerator::write_to_dir(&test_ca(), dir.path(), "ca").unwrap();

        assert!(dir.path().join("ca.crt").exists());
        assert!(dir.path().join("ca.key").exists());
    }

    #[test]
    fn load_certs_and_key_from_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        CertGenerator::write_to_dir(&test_ca(), dir.path(), "ca").unwrap();

        let certs = load_certs(dir.path().join("ca.crt").to_str().unwrap()).unwrap();
        assert_eq!(certs.len(), 1);

        let key = load_private_key(dir.path().join("ca.key").to_str().unwrap()).unwrap();
        assert!(!key.secret_der().is_empty());
    }

    #[test]
    fn load_certs_returns_error_for_missing_file() {
        let msg = load_certs("/nonexistent/path/ca.crt").unwrap_err().to_string();
        assert!(msg.contains("Cannot read"));
    }

    #[test]
    fn load_certs_returns_error_for_empty_pem_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.crt");
        fs::write(&path, b"").unwrap();
        assert!(load_certs(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn load_private_key_returns_error_when_no_key_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert_only.pem");
        fs::write(&path, test_ca().cert_pem).unwrap();
        assert!(load_private_key(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn load_certs_any_accepts_der() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.der");
        let cert =
            CertGenerator::self_signed_client(&ClientCertParams::fnmt("Ana", "López", "000000001"))
                .unwrap();
        fs::write(&path, &cert.cert_der).unwrap();

        let certs = load_certs_any(path.to_str().unwrap()).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].as_ref(), cert.cert_der.as_slice());
    }

    #[test]
    fn load_certs_any_empty_file_is_empty_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();
        assert!(load_certs_any(path.to_str().unwrap()).unwrap().is_empty());
    }

    // ─── build_tls_config ────────────────────────────────────────────────────

    #[test]
    fn build_tls_config_from_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca();
        let server =
            CertGenerator::issue_server(&server_params(), &ca.cert_pem, &ca.key_pem).unwrap();
        CertGenerator::write_to_dir(&ca, dir.path(), "ca").unwrap();
        CertGenerator::write_to_dir(&server, dir.path(), "server").unwrap();

        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
        let tls = TlsConfig {
            server_cert: path("server.crt"),
            server_key: path("server.key"),
            ca_cert: path("ca.crt"),
            ..TlsConfig::default()
        };

        let verifier = FnmtVerifier::new(AllowList::default());
        assert!(build_tls_config(&tls, verifier).is_ok());
    }

    #[test]
    fn build_tls_config_requires_paths() {
        let verifier = FnmtVerifier::new(AllowList::default());
        let err = build_tls_config(&TlsConfig::default(), verifier).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
