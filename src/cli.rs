//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// FNMT client-certificate authorization
#[derive(Parser, Debug)]
#[command(name = "fnmt-auth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "FNMT_AUTH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FNMT_AUTH_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "FNMT_AUTH_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the TLS listener (default)
    Serve,

    /// Check a client certificate against the configured allow-lists
    Check {
        /// Certificate file, PEM or DER. With PEM, the first block is the leaf.
        #[arg(required = true)]
        cert: PathBuf,
    },

    /// Certificate generation for local testing
    #[command(subcommand)]
    Tls(TlsCommand),
}

/// Certificate generation subcommands
#[derive(Subcommand, Debug)]
pub enum TlsCommand {
    /// Create a self-signed CA
    InitCa {
        /// CA common name
        #[arg(long, default_value = "FNMT Test CA")]
        cn: String,

        /// Validity in days
        #[arg(long, default_value_t = 3650)]
        validity_days: u32,

        /// Output directory (writes ca.crt and ca.key)
        #[arg(short, long, default_value = "tls")]
        out_dir: PathBuf,
    },

    /// Issue a server certificate signed by the CA
    IssueServer {
        /// Server common name
        #[arg(long, default_value = "localhost")]
        cn: String,

        /// Subject Alternative Names (DNS names or IPs); defaults to the CN
        #[arg(long = "san")]
        sans: Vec<String>,

        /// Validity in days
        #[arg(long, default_value_t = 365)]
        validity_days: u32,

        /// CA certificate
        #[arg(long, default_value = "tls/ca.crt")]
        ca_cert: PathBuf,

        /// CA private key
        #[arg(long, default_value = "tls/ca.key")]
        ca_key: PathBuf,

        /// Output directory (writes server.crt and server.key)
        #[arg(short, long, default_value = "tls")]
        out_dir: PathBuf,
    },

    /// Issue an FNMT-shaped client certificate signed by the CA
    IssueClient {
        /// Given name
        #[arg(long)]
        given_name: String,

        /// Surname(s)
        #[arg(long)]
        surname: String,

        /// DNI (9 characters)
        #[arg(long)]
        dni: String,

        /// Validity in days
        #[arg(long, default_value_t = 365)]
        validity_days: u32,

        /// CA certificate
        #[arg(long, default_value = "tls/ca.crt")]
        ca_cert: PathBuf,

        /// CA private key
        #[arg(long, default_value = "tls/ca.key")]
        ca_key: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "tls")]
        out_dir: PathBuf,

        /// File stem for the written files (defaults to the DNI)
        #[arg(long)]
        name: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_none() {
        let cli = Cli::parse_from(["fnmt-auth"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn check_takes_certificate_path() {
        let cli = Cli::parse_from(["fnmt-auth", "-c", "fnmt.yaml", "check", "client.pem"]);
        assert_eq!(cli.config, Some(PathBuf::from("fnmt.yaml")));
        match cli.command {
            Some(Command::Check { cert }) => assert_eq!(cert, PathBuf::from("client.pem")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn issue_client_parses_identity() {
        let cli = Cli::parse_from([
            "fnmt-auth",
            "tls",
            "issue-client",
            "--given-name",
            "Juan",
            "--surname",
            "Pérez García",
            "--dni",
            "123456789",
        ]);
        match cli.command {
            Some(Command::Tls(TlsCommand::IssueClient {
                given_name,
                surname,
                dni,
                name,
                ..
            })) => {
                assert_eq!(given_name, "Juan");
                assert_eq!(surname, "Pérez García");
                assert_eq!(dni, "123456789");
                assert!(name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
