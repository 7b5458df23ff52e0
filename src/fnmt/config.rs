//! FNMT authorization configuration types.
//!
//! # Example YAML
//!
//! ```yaml
//! allow:
//!   names: ["Juan Pérez García"]
//!   dnis: ["123456789"]
//!   namednis: ["Juan Pérez García - 123456789"]
//! tls:
//!   listen: "0.0.0.0:8443"
//!   server_cert: "/etc/fnmt-auth/server.crt"
//!   server_key:  "/etc/fnmt-auth/server.key"
//!   ca_cert:     "/etc/fnmt-auth/fnmt-ca.pem"
//!   handshake_timeout_secs: 10
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Allow-list block
// ─────────────────────────────────────────────────────────────────────────────

/// The `allow` block: three optional lists of exact-match values.
///
/// A sub-key that is present must carry at least one entry, and unknown
/// sub-keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AllowConfig {
    /// Full names, `"<given name> <surname>"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,

    /// DNIs, without the `IDCES-` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnis: Option<Vec<String>>,

    /// Combined tokens, `"<given name> <surname> - <DNI>"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namednis: Option<Vec<String>>,
}

impl AllowConfig {
    /// Reject sub-keys that are present with no entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first empty sub-key.
    pub fn validate(&self) -> Result<()> {
        for (key, entries) in [
            ("names", &self.names),
            ("dnis", &self.dnis),
            ("namednis", &self.namednis),
        ] {
            if entries.as_ref().is_some_and(Vec::is_empty) {
                return Err(Error::Config(format!(
                    "allow.{key} requires at least one entry"
                )));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TLS listener
// ─────────────────────────────────────────────────────────────────────────────

/// TLS listener settings used by `fnmt-auth serve`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TlsConfig {
    /// Socket address to listen on.
    pub listen: String,

    /// Path to the PEM-encoded server certificate chain.
    pub server_cert: String,

    /// Path to the PEM-encoded server private key.
    pub server_key: String,

    /// Path to the PEM-encoded CA certificates that issue client certificates.
    ///
    /// Chain validation against these roots happens before the allow-lists
    /// are consulted.
    pub ca_cert: String,

    /// Optional path to a PEM-encoded Certificate Revocation List.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_path: Option<String>,

    /// Seconds a client gets to complete the TLS handshake.
    pub handshake_timeout_secs: u64,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8443".to_string(),
            server_cert: String::new(),
            server_key: String::new(),
            ca_cert: String::new(),
            crl_path: None,
            handshake_timeout_secs: 10,
        }
    }
}

impl TlsConfig {
    /// Check that every required path is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing setting.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("server_cert", &self.server_cert),
            ("server_key", &self.server_key),
            ("ca_cert", &self.ca_cert),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!("tls.{key} is required")));
            }
        }
        if self.handshake_timeout_secs == 0 {
            return Err(Error::Config(
                "tls.handshake_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_allow_keys_are_optional() {
        let cfg: AllowConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, AllowConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn allow_block_deserialises_from_yaml() {
        let yaml = r#"
names: ["Juan Pérez García", "Ana López"]
dnis: ["123456789"]
namednis: ["Juan Pérez García - 123456789"]
"#;
        let cfg: AllowConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.names.as_ref().map(Vec::len), Some(2));
        assert_eq!(cfg.dnis.as_deref(), Some(&["123456789".to_string()][..]));
        assert_eq!(cfg.namednis.as_ref().map(Vec::len), Some(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_names_is_rejected() {
        let cfg: AllowConfig = serde_yaml::from_str("names: []").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("allow.names"));
    }

    #[test]
    fn empty_dnis_is_rejected() {
        let cfg: AllowConfig = serde_yaml::from_str("dnis: []").unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_namednis_is_rejected() {
        let cfg: AllowConfig = serde_yaml::from_str("namednis: []").unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_allow_key_is_rejected() {
        let result: std::result::Result<AllowConfig, _> = serde_yaml::from_str("emails: [a]");
        assert!(result.is_err());
    }

    #[test]
    fn tls_listen_has_default() {
        let cfg: TlsConfig = serde_yaml::from_str("server_cert: a\nserver_key: b\nca_cert: c").unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:8443");
        assert!(cfg.crl_path.is_none());
        assert_eq!(cfg.handshake_timeout_secs, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn tls_zero_handshake_timeout_is_rejected() {
        let cfg: TlsConfig = serde_yaml::from_str(
            "server_cert: a\nserver_key: b\nca_cert: c\nhandshake_timeout_secs: 0",
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("handshake_timeout_secs"));
    }

    #[test]
    fn tls_missing_ca_is_rejected() {
        let cfg: TlsConfig = serde_yaml::from_str("server_cert: a\nserver_key: b").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("tls.ca_cert"));
    }
}
