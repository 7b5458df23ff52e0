//! Configuration management

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::fnmt::config::{AllowConfig, TlsConfig};
use crate::{Error, Result};

/// Environment variable prefix; nested keys are separated by `__`
/// (e.g. `FNMT_AUTH_TLS__LISTEN`).
///
/// Values are parsed as figment literals, so all-digit DNIs must be quoted:
/// `FNMT_AUTH_ALLOW__DNIS='["012345678"]'`. Unquoted, `[012345678]` is read
/// as a number and the config fails to load.
pub const ENV_PREFIX: &str = "FNMT_AUTH_";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Allow-lists consulted for every client certificate
    pub allow: AllowConfig,

    /// Reject certificates whose common name is not exactly
    /// `"<given name> <surname> - <DNI>"` (default: off)
    pub strict_common_name: bool,

    /// TLS listener, required by `serve` only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or an allow-list sub-key is empty or unknown.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(&figment)
    }

    /// Extract and validate configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on extraction or validation failure.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.allow.validate()?;
        if let Some(ref tls) = self.tls {
            tls.validate()?;
        }
        Ok(())
    }
}
