//! # Prometheus Metrics
//!
//! Operational counters for the badge server, scraped from `/metrics` on
//! the dedicated metrics port. Registered in a custom registry with the
//! `badgery` namespace so nothing collides with default-registry users.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{core::Collector, Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// All metric handles for the server. Handles are internally refcounted,
/// so the struct clones cheaply into request handlers.
#[derive(Clone)]
pub struct ServerMetrics {
    registry: Registry,
    /// Assertion documents served with 200.
    pub assertions_served_total: IntCounter,
    /// Assertion lookups answered with 410 Gone (revoked).
    pub assertions_gone_total: IntCounter,
    /// BadgeClass, issuer, and revocation-list documents served.
    pub documents_served_total: IntCounter,
    /// Badge image responses served (both the gated and ungated routes).
    pub images_served_total: IntCounter,
    /// Number of awards in the store, set at startup.
    pub awards_stored: IntGauge,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric registration");
    collector
}

impl ServerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("badgery".into()), None)
            .expect("failed to create prometheus registry");

        let assertions_served_total = register(
            &registry,
            IntCounter::new(
                "assertions_served_total",
                "Assertion documents served successfully",
            )
            .expect("metric creation"),
        );
        let assertions_gone_total = register(
            &registry,
            IntCounter::new(
                "assertions_gone_total",
                "Assertion lookups answered with 410 Gone",
            )
            .expect("metric creation"),
        );
        let documents_served_total = register(
            &registry,
            IntCounter::new(
                "documents_served_total",
                "BadgeClass, issuer, and revocation-list documents served",
            )
            .expect("metric creation"),
        );
        let images_served_total = register(
            &registry,
            IntCounter::new("images_served_total", "Badge image responses served")
                .expect("metric creation"),
        );
        let awards_stored = register(
            &registry,
            IntGauge::new("awards_stored", "Number of awards in the store")
                .expect("metric creation"),
        );

        Self {
            registry,
            assertions_served_total,
            assertions_gone_total,
            documents_served_total,
            images_served_total,
            awards_stored,
        }
    }

    /// Encode all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<ServerMetrics>;

/// Axum handler rendering `/metrics`.
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
