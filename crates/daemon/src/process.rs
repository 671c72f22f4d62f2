//! Process lifecycle: logging setup, startup of the HTTP server and the
//! scheduler, and coordinated shutdown.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::service_config::Config;
use crate::service_state::{State, StateSetupError};
use crate::{http_server, scheduler};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Setup(#[from] StateSetupError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter `{directive}`: {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. `RUST_LOG` overrides the configured
/// level. Keep the returned guard alive for the life of the process or
/// buffered log lines are lost.
pub fn init_tracing(config: &Config) -> Result<WorkerGuard, TracingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|source| TracingError::Filter {
            directive: config.log_level.clone(),
            source,
        })?,
    };

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "ephemeral.log"))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(config.log_dir.is_none()),
        )
        .try_init()?;
    Ok(guard)
}

/// A running service. Dropping it leaves the service running; call
/// [`shutdown`](Self::shutdown) to stop it.
#[derive(Debug)]
pub struct ShutdownHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<()>,
    server: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

impl ShutdownHandle {
    /// The address the HTTP server actually bound, useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, let in-flight requests and the current
    /// scheduled job finish, then return.
    pub async fn shutdown(self) {
        tracing::info!("shutting down");
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.server.await {
            tracing::error!(error = %e, "http server task failed");
        }
        if let Err(e) = self.scheduler.await {
            tracing::error!(error = %e, "scheduler task failed");
        }
    }
}

pub async fn start_service(config: &Config) -> Result<ShutdownHandle, ServiceError> {
    let state = State::from_config(config)?;
    start_with_state(state).await
}

/// Bind the listener and start the HTTP server and the scheduler on
/// already-built state.
pub async fn start_with_state(state: State) -> Result<ShutdownHandle, ServiceError> {
    let addr = state.config().listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let app = http_server::router(state.clone());
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "http server error");
        }
    });
    tracing::info!(%local_addr, "http server listening");

    let scheduler = scheduler::spawn(state, shutdown_rx);

    Ok(ShutdownHandle {
        local_addr,
        shutdown_tx,
        server,
        scheduler,
    })
}

/// Run the service until SIGINT or SIGTERM.
pub async fn spawn_service(config: &Config) -> Result<(), ServiceError> {
    let handle = start_service(config).await?;
    shutdown_signal().await;
    handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
