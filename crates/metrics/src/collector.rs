use std::time::Duration;

use mol_bhav_types::{SessionState, Tactic};
use prometheus::{Encoder, TextEncoder};
use thiserror::Error;

use crate::metrics::*;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics encoding error: {0}")]
    Encode(String),
}

/// Metrics collector for the Mol-Bhav negotiation service
#[derive(Debug, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SESSION METRICS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn record_session_started(&self) {
        SESSIONS_STARTED.inc();
        SESSIONS_ACTIVE.inc();
    }

    /// Record a session reaching a terminal state
    pub fn record_outcome(&self, state: SessionState) {
        if !state.is_terminal() {
            return;
        }
        OUTCOME_COUNT.with_label_values(&[state.as_str()]).inc();
        SESSIONS_ACTIVE.dec();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OFFER METRICS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn record_offer(&self, tactic: Tactic, round_trip: Duration) {
        OFFERS_PROCESSED.inc();
        TACTIC_COUNT.with_label_values(&[tactic.as_str()]).inc();
        ROUND_LATENCY.observe(round_trip.as_millis() as f64);

        if tactic == Tactic::BotBlock {
            BOT_BLOCKS.inc();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GUARDRAIL METRICS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn record_validator_override(&self) {
        VALIDATOR_OVERRIDES.inc();
    }

    pub fn record_dialogue_fallback(&self) {
        DIALOGUE_FALLBACKS.inc();
    }

    pub fn record_llm_latency(&self, latency: Duration) {
        LLM_LATENCY.observe(latency.as_millis() as f64);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PERSISTENCE METRICS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn record_degraded_persist(&self) {
        DEGRADED_PERSISTS.inc();
    }

    pub fn record_error(&self, kind: &str) {
        ERROR_COUNT.with_label_values(&[kind]).inc();
    }

    /// Export all registered metrics in the Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
    }
}
