//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped by Prometheus at
//! `/metrics` on the configured metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the
//! `hodl` prefix so they do not collide with the default global registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use hodl_protocol::runtime::InstructionKind;
use hodl_protocol::LedgerError;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Transactions applied to the ledger.
    pub transactions_committed_total: IntCounter,
    /// Transactions refused for any reason.
    pub transactions_rejected_total: IntCounter,
    /// Refusals broken down by stable error code.
    pub transactions_rejected_by_code: IntCounterVec,
    /// Lockups currently holding funds.
    pub outstanding_lockups: IntGauge,
    /// Time spent verifying and applying one transaction, in seconds.
    pub transaction_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("hodl".into()), None)?;

        let transactions_committed_total = IntCounter::new(
            "transactions_committed_total",
            "Total number of transactions applied to the ledger",
        )?;
        registry.register(Box::new(transactions_committed_total.clone()))?;

        let transactions_rejected_total = IntCounter::new(
            "transactions_rejected_total",
            "Total number of transactions rejected",
        )?;
        registry.register(Box::new(transactions_rejected_total.clone()))?;

        let transactions_rejected_by_code = IntCounterVec::new(
            Opts::new(
                "transactions_rejected_by_code_total",
                "Rejected transactions by error code and kind",
            ),
            &["code", "kind"],
        )?;
        registry.register(Box::new(transactions_rejected_by_code.clone()))?;

        let outstanding_lockups =
            IntGauge::new("outstanding_lockups", "Number of lockups currently holding funds")?;
        registry.register(Box::new(outstanding_lockups.clone()))?;

        let transaction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "transaction_latency_seconds",
                "Transaction verification and commit latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(transaction_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            transactions_committed_total,
            transactions_rejected_total,
            transactions_rejected_by_code,
            outstanding_lockups,
            transaction_latency_seconds,
        })
    }

    /// Record a committed transaction of `kind`.
    pub fn observe_commit(&self, kind: InstructionKind, elapsed: Duration) {
        self.transactions_committed_total.inc();
        self.transaction_latency_seconds.observe(elapsed.as_secs_f64());
        match kind {
            InstructionKind::Lock | InstructionKind::LockNative => self.outstanding_lockups.inc(),
            InstructionKind::Unlock | InstructionKind::UnlockNative => {
                self.outstanding_lockups.dec()
            }
            InstructionKind::InitializeVault | InstructionKind::InitializeNativeVault => {}
        }
    }

    /// Record a rejected transaction.
    pub fn observe_rejection(&self, err: &LedgerError, elapsed: Duration) {
        self.transactions_rejected_total.inc();
        let code = err.code().to_string();
        self.transactions_rejected_by_code
            .with_label_values(&[code.as_str(), err.kind()])
            .inc();
        self.transaction_latency_seconds.observe(elapsed.as_secs_f64());
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
