use std::sync::Arc;
use tracing::{field::Visit, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::collector::MetricsCollector;

/// Initialize JSON tracing with the default filter
pub fn init_tracing() -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mol_bhav=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true).json())
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))
}

/// Initialize tracing with metrics integration: error events feed the error
/// counters
pub fn init_tracing_with_metrics(collector: Arc<MetricsCollector>) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mol_bhav=debug"));

    let fmt_layer = fmt::layer().with_target(true).with_level(true).json();
    let metrics_layer = MetricsLayer::new(collector);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(metrics_layer)
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))
}

/// Tracing layer that records error events as metrics
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = KindVisitor::default();
        event.record(&mut visitor);
        let kind = visitor.kind.unwrap_or_else(|| "internal".to_string());
        self.collector.record_error(&kind);
    }
}

/// Visitor pulling the `kind` field out of error events
#[derive(Default)]
struct KindVisitor {
    kind: Option<String>,
}

impl Visit for KindVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "kind" {
            self.kind = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "kind" {
            self.kind = Some(value.to_string());
        }
    }
}

/// Correlation ID attached to every request; opaque details in fatal
/// responses point back to log lines tagged with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(uuid::Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one negotiation round
#[derive(Debug, Clone)]
pub struct NegotiationSpan {
    pub request_id: RequestId,
    pub session_id: String,
    pub operation: &'static str,
}

impl NegotiationSpan {
    pub fn new(session_id: String, operation: &'static str) -> Self {
        Self {
            request_id: RequestId::new(),
            session_id,
            operation,
        }
    }

    pub fn enter(&self) -> tracing::span::EnteredSpan {
        tracing::info_span!(
            "negotiation",
            request_id = %self.request_id,
            session_id = %self.session_id,
            operation = self.operation,
        )
        .entered()
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}
