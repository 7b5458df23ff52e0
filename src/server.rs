//! TLS listener that admits FNMT-authorized clients.
//!
//! Each accepted TCP connection gets its own task. Authorization happens
//! inside the rustls handshake; a rejected client simply fails the
//! handshake and is logged here, since the verifier itself stays silent on
//! failure. A client that does not finish the handshake within
//! `tls.handshake_timeout_secs` is dropped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fnmt::cert_manager::build_tls_config;
use crate::fnmt::identity::ParsedIdentity;
use crate::fnmt::verifier::FnmtVerifier;
use crate::{Error, Result};

/// Run the TLS listener until Ctrl+C / SIGTERM.
///
/// # Errors
///
/// Returns an error if the `tls` section is missing, the TLS configuration
/// cannot be built, or the listen address cannot be bound.
pub async fn run(config: &Config) -> Result<()> {
    let tls = config
        .tls
        .as_ref()
        .ok_or_else(|| Error::Config("the `tls` section is required to serve".into()))?;

    let verifier = FnmtVerifier::from_config(config)
        .with_span(tracing::info_span!("fnmt_client_auth", listen = %tls.listen));
    if verifier.allow_list().is_empty() {
        warn!("No allow-list entries configured; every client will be rejected");
    }

    let acceptor = TlsAcceptor::from(Arc::new(build_tls_config(tls, verifier)?));
    let handshake_timeout = Duration::from_secs(tls.handshake_timeout_secs);
    let listener = TcpListener::bind(&tls.listen).await?;
    info!(listen = %tls.listen, "FNMT TLS listener started");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    match handle_connection(&acceptor, stream, peer, handshake_timeout).await {
                        Ok(()) => {}
                        Err(e @ Error::Handshake(_)) => {
                            warn!(%peer, error = %e, "TLS handshake rejected");
                        }
                        Err(e) => {
                            warn!(
                                %peer,
                                kind = e.kind(),
                                error = %e,
                                "Connection failed after handshake"
                            );
                        }
                    }
                });
            }
            () = &mut shutdown => {
                info!("Shutdown signal received");
                return Ok(());
            }
        }
    }
}

/// Complete the handshake on `stream` and greet the authorized client.
///
/// # Errors
///
/// Returns [`Error::Handshake`] if the handshake fails (including when the
/// client certificate is rejected) or does not finish within
/// `handshake_timeout`, and [`Error::Io`] if the greeting cannot be written.
pub async fn handle_connection<S>(
    acceptor: &TlsAcceptor,
    stream: S,
    peer: SocketAddr,
    handshake_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut tls = match tokio::time::timeout(handshake_timeout, acceptor.accept(stream)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(e)) => return Err(Error::Handshake(e)),
        Err(elapsed) => {
            return Err(Error::Handshake(io::Error::new(io::ErrorKind::TimedOut, elapsed)));
        }
    };

    let holder = tls
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|chain| chain.first())
        .map(|leaf| ParsedIdentity::from_der(leaf.as_ref()))
        .transpose()?
        .map(|identity| identity.display_name())
        .ok_or(Error::NoCertificate)?;

    debug!(%peer, holder = %holder, "Client admitted");

    tls.write_all(format!("welcome, {holder}\n").as_bytes())
        .await?;
    tls.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
