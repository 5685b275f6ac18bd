pub mod collector;
pub mod http;
pub mod metrics;
pub mod tracing;

pub use collector::MetricsCollector;
pub use http::MetricsServer;
pub use tracing::{init_tracing, init_tracing_with_metrics, NegotiationSpan, RequestId};
