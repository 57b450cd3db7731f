//! Load balancer dispatch loop.
//!
//! # Responsibilities
//! - Own the graceful listener and the backend registry
//! - Run the accept loop, one independent task per connection
//! - Dial the selected backend and hand both streams to a transfer
//! - Stop accepting on shutdown and wait for in-flight transfers
//!
//! # Design Decisions
//! - Startup failures (no backends, bad port, bind) propagate to the
//!   caller; everything after accept is contained per connection
//! - stop() only raises the shutdown trigger; the accept loop itself
//!   drops the socket and requests the drain, so no connection can be
//!   accepted after the drain state says DrainRequested

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::config::BalancerConfig;
use crate::lifecycle::Shutdown;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::registry::BackendRegistry;
use crate::net::connection::TrackedStream;
use crate::net::listener::{DrainState, DrainTimeoutError, GracefulListener};
use crate::proxy::transfer::ProxyTransfer;

/// Errors surfaced by the balancer itself. Per-connection failures are
/// logged inside their task and never reach this type.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("a port != 0 must be specified")]
    InvalidPort,

    #[error("must specify at least one backend address")]
    NoBackends,

    #[error("couldn't listen on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    DrainTimeout(#[from] DrainTimeoutError),
}

/// Round-robin TCP load balancer with draining shutdown.
///
/// Usage: `new` → `load` → share behind an `Arc` → `listen` in one task
/// while `stop` may be called from another.
#[derive(Debug)]
pub struct LoadBalancer {
    port: u16,
    max_drain_wait: Duration,
    idle_timeout: Option<Duration>,
    registry: Option<Arc<BackendRegistry>>,
    shutdown: Shutdown,
    drain: Arc<DrainState>,
}

impl LoadBalancer {
    /// Build a balancer from validated configuration.
    pub fn new(config: &BalancerConfig) -> Result<Self, BalancerError> {
        if config.listener.port == 0 {
            return Err(BalancerError::InvalidPort);
        }

        Ok(Self {
            port: config.listener.port,
            max_drain_wait: config.max_drain_wait(),
            idle_timeout: config.idle_timeout(),
            registry: None,
            shutdown: Shutdown::new(),
            drain: DrainState::new(),
        })
    }

    /// Replace the backend registry with one fresh backend per address,
    /// cursor reset to zero. Must succeed before [`listen`].
    ///
    /// [`listen`]: LoadBalancer::listen
    pub fn load<I, S>(&mut self, addresses: I) -> Result<(), BalancerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = BackendRegistry::load(addresses).map_err(|_| BalancerError::NoBackends)?;
        tracing::info!(n_backends = registry.len(), "loading configuration");
        self.registry = Some(Arc::new(registry));
        Ok(())
    }

    /// All loaded backends, in configuration order (for reporting).
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.registry
            .as_ref()
            .map(|r| r.backends().to_vec())
            .unwrap_or_default()
    }

    /// Bind and run the accept loop until [`stop`] is called.
    ///
    /// Accept errors and per-connection failures are logged and never
    /// terminate the loop. On shutdown the listening socket is dropped
    /// before the drain is requested, and `listen` returns; in-flight
    /// transfers keep running on their own tasks.
    ///
    /// [`stop`]: LoadBalancer::stop
    pub async fn listen(&self) -> Result<(), BalancerError> {
        let registry = self
            .registry
            .as_ref()
            .cloned()
            .ok_or(BalancerError::NoBackends)?;

        tracing::info!(port = self.port, "listening");

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
        let inner = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| BalancerError::Bind {
                port: self.port,
                source,
            })?;
        let listener = GracefulListener::new(inner, Arc::clone(&self.drain), self.max_drain_wait);

        loop {
            tokio::select! {
                _ = self.shutdown.triggered() => break,
                accepted = listener.accept() => {
                    let conn = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::error!(error = %e, "errored accepting connection");
                            continue;
                        }
                    };

                    let backend = registry.next();
                    let idle_timeout = self.idle_timeout;
                    tokio::spawn(handle(conn, backend, idle_timeout));
                }
            }
        }

        // Stop accepting before the drain is requested: after this no
        // new connection can enter the tracked set.
        drop(listener);
        self.drain.request_drain();
        tracing::info!(
            open_connections = self.drain.open_connections(),
            "stopped accepting, draining"
        );
        Ok(())
    }

    /// Stop accepting new connections and wait for in-flight transfers
    /// to finish naturally, bounded by the configured drain wait.
    ///
    /// Idempotent: the trigger is a level and repeat calls just observe
    /// the drain state again.
    pub async fn stop(&self) -> Result<(), BalancerError> {
        self.shutdown.trigger();
        self.drain.wait_drained(self.max_drain_wait).await?;
        Ok(())
    }
}

/// One connection's whole lifetime: dial, transfer, bookkeeping.
async fn handle(conn: TrackedStream, backend: Arc<Backend>, idle_timeout: Option<Duration>) {
    let peer = conn
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let local = conn
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let span = tracing::info_span!(
        "connection",
        id = %conn.id(),
        peer = %peer,
        local = %local,
        upstream = %backend.address(),
    );

    async move {
        tracing::info!("dialing");
        let upstream = match TcpStream::connect(backend.address()).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "couldn't dial backend");
                return;
            }
        };

        let guard = backend.begin_transfer();
        let transfer = ProxyTransfer::new(conn, upstream, idle_timeout);
        let stats = transfer.stats();

        tracing::info!("proxying");
        match transfer.run().await {
            Ok(()) => tracing::info!(
                rx = stats.client_to_backend.rx(),
                tx = stats.backend_to_client.tx(),
                "finished"
            ),
            Err(e) => tracing::error!(error = %e, "errored transferring between connections"),
        }

        backend.record_throughput(stats.client_to_backend.rx(), stats.backend_to_client.tx());
        drop(guard);
    }
    .instrument(span)
    .await
}
