//! Prometheus metrics for the scanner runtime.
//!
//! Metrics are recorded with the `metrics` facade everywhere in the
//! workspace. Nothing is exported until [`MetricsServer::start`] installs
//! the Prometheus recorder with its HTTP listener.
//!
//! # Example
//!
//! ```rust,no_run
//! use gatecheck_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
#[derive(Debug, Clone, Copy)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Address the exporter listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the exporter.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or a recorder is
    /// already installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        tracing::info!(addr = %self.addr, "Metrics exporter listening");
        Ok(())
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Store runtime
    describe_counter!("store.commands.total", "Actions sent to a scanner store");
    describe_counter!("store.effects.executed", "Effects executed, labelled by type");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_counter!("store.shutdown.rejected_actions", "Actions rejected during shutdown");

    // Retries
    describe_counter!("store.retry.attempt", "Retries scheduled after a transient fault");
    describe_counter!("store.retry.success", "Operations that succeeded after retrying");
    describe_counter!("store.retry.exhausted", "Operations that failed after all retries");

    // Scanner domain
    describe_counter!(
        "scanner.verifications.total",
        "Ticket verifications, labelled by result (valid, used, invalid, transient_fault)"
    );
    describe_counter!(
        "scanner.check_ins.total",
        "Check-in commits, labelled by outcome (committed, already_used, not_found, transient_fault)"
    );
    describe_histogram!(
        "scanner.ticket_store.duration_seconds",
        "Latency of ticket store calls, labelled by operation"
    );
    describe_counter!("scanner.gate.admissions", "Staff gate decisions, labelled by result");
}
