//! TCP balancer binary.
//!
//! Startup order: parse flags → load file config → merge overrides →
//! init logging → load backends → listen. Configuration and bind
//! errors are fatal; per-connection errors are only ever logged.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use tcp_balancer::config::loader::load_config;
use tcp_balancer::config::schema::BackendConfig;
use tcp_balancer::config::validation::validate_config;
use tcp_balancer::config::BalancerConfig;
use tcp_balancer::lifecycle::signals;
use tcp_balancer::observability::logging;
use tcp_balancer::LoadBalancer;

#[derive(Parser, Debug)]
#[command(name = "tcp-balancer", version, about = "Layer-4 TCP load balancer with graceful drain")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend address (host:port); repeatable. Overrides the config file.
    #[arg(short, long = "backend", value_name = "HOST:PORT")]
    backends: Vec<String>,

    /// Seconds to wait for open connections to drain on shutdown.
    #[arg(long)]
    drain_wait_secs: Option<u64>,

    /// Human-oriented log output at debug verbosity.
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// File config with flag overrides folded in.
    fn merged_config(&self) -> Result<BalancerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BalancerConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(secs) = self.drain_wait_secs {
            config.listener.max_drain_wait_secs = secs;
        }
        if !self.backends.is_empty() {
            config.backends = self
                .backends
                .iter()
                .map(|address| BackendConfig {
                    address: address.clone(),
                })
                .collect();
        }
        if self.debug {
            config.observability.debug = true;
        }

        if let Err(errors) = validate_config(&config) {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(joined.into());
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.merged_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tcp-balancer: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);

    let mut lb = match LoadBalancer::new(&config) {
        Ok(lb) => lb,
        Err(e) => {
            tracing::error!(error = %e, "couldn't create load balancer");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = lb.load(config.backend_addresses()) {
        tracing::error!(error = %e, "couldn't load backends");
        return ExitCode::FAILURE;
    }

    let lb = Arc::new(lb);
    let mut listener = {
        let lb = Arc::clone(&lb);
        tokio::spawn(async move { lb.listen().await })
    };

    // The accept loop only returns on its own for startup errors.
    let early_exit = tokio::select! {
        result = &mut listener => Some(result),
        _ = signals::shutdown_signal() => None,
    };

    match early_exit {
        Some(Ok(Ok(()))) => ExitCode::SUCCESS,
        Some(Ok(Err(e))) => {
            tracing::error!(error = %e, "balancer failed");
            ExitCode::FAILURE
        }
        Some(Err(e)) => {
            tracing::error!(error = %e, "accept loop panicked");
            ExitCode::FAILURE
        }
        None => {
            tracing::info!("shutdown signal received, draining");
            let code = match lb.stop().await {
                Ok(()) => {
                    tracing::info!("drained all connections");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    // Remaining connections are left to finish on their
                    // own; we only report that the bound was exceeded.
                    tracing::error!(error = %e, "graceful shutdown incomplete");
                    ExitCode::FAILURE
                }
            };
            let _ = listener.await;
            code
        }
    }
}
