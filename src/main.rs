//! fnmt-auth - FNMT client-certificate authorization
//!
//! Serves a TLS listener that only admits allow-listed FNMT certificate
//! holders, checks certificates offline, and generates test certificates.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use fnmt_client_auth::{
    cli::{Cli, Command, TlsCommand},
    config::Config,
    fnmt::{
        CaParams, CertGenerator, ClientCertParams, FnmtVerifier, GeneratedCert, ServerCertParams,
        load_certs_any,
    },
    server, setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Check { ref cert }) => run_check(cli.config.as_deref(), cert),
        Some(Command::Tls(cmd)) => run_tls_command(cmd),
        Some(Command::Serve) | None => run_server(cli.config.as_deref()).await,
    }
}

/// Run the TLS listener
async fn run_server(config_path: Option<&Path>) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Starting fnmt-auth v{}", env!("CARGO_PKG_VERSION"));

    match server::run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Verify one certificate file against the configured allow-lists
fn run_check(config_path: Option<&Path>, cert_path: &Path) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let chain = match load_certs_any(&cert_path.to_string_lossy()) {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    match FnmtVerifier::from_config(&config).verify(&chain) {
        Ok(matched) => {
            println!("✅ authorized ({}): {}", matched.kind, matched.value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("❌ rejected ({}): {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

/// Run certificate generation commands
fn run_tls_command(cmd: TlsCommand) -> ExitCode {
    let result = match cmd {
        TlsCommand::InitCa {
            cn,
            validity_days,
            out_dir,
        } => CertGenerator::init_ca(&CaParams { cn, validity_days })
            .and_then(|ca| write_pair(&ca, &out_dir, "ca")),

        TlsCommand::IssueServer {
            cn,
            sans,
            validity_days,
            ca_cert,
            ca_key,
            out_dir,
        } => {
            let sans = if sans.is_empty() { vec![cn.clone()] } else { sans };
            let params = ServerCertParams {
                cn,
                sans,
                validity_days,
            };
            read_ca(&ca_cert, &ca_key)
                .and_then(|(cert, key)| CertGenerator::issue_server(&params, &cert, &key))
                .and_then(|server| write_pair(&server, &out_dir, "server"))
        }

        TlsCommand::IssueClient {
            given_name,
            surname,
            dni,
            validity_days,
            ca_cert,
            ca_key,
            out_dir,
            name,
        } => {
            let params = ClientCertParams {
                validity_days,
                ..ClientCertParams::fnmt(&given_name, &surname, &dni)
            };
            let stem = name.unwrap_or_else(|| dni.clone());
            read_ca(&ca_cert, &ca_key)
                .and_then(|(cert, key)| CertGenerator::issue_client(&params, &cert, &key))
                .and_then(|client| write_pair(&client, &out_dir, &stem))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_ca(cert: &Path, key: &Path) -> fnmt_client_auth::Result<(String, String)> {
    Ok((std::fs::read_to_string(cert)?, std::fs::read_to_string(key)?))
}

fn write_pair(cert: &GeneratedCert, dir: &Path, stem: &str) -> fnmt_client_auth::Result<()> {
    CertGenerator::write_to_dir(cert, dir, stem)?;
    println!(
        "✅ wrote {} and {}",
        dir.join(format!("{stem}.crt")).display(),
        dir.join(format!("{stem}.key")).display()
    );
    Ok(())
}
