//! Mol-Bhav: a bazaar-style price negotiation core.
//!
//! Facade over the workspace crates. The HTTP shell binds its handlers to
//! [`service::NegotiationService`]; everything underneath is deterministic
//! apart from the stores and the dialogue boundary.

pub use mol_bhav_config as config;
pub use mol_bhav_dialogue as dialogue;
pub use mol_bhav_engine as engine;
pub use mol_bhav_metrics as metrics;
pub use mol_bhav_service as service;
pub use mol_bhav_store as store;
pub use mol_bhav_types as types;

use std::sync::Arc;

/// Wire tracing and the metrics collector together at boot
pub fn init_telemetry() -> Result<Arc<metrics::MetricsCollector>, metrics::tracing::TracingError> {
    let collector = Arc::new(metrics::MetricsCollector::new());
    metrics::init_tracing_with_metrics(collector.clone())?;
    Ok(collector)
}
