pub mod backoff;
pub mod window;

pub use backoff::PersistBackoff;
pub use window::{FixedWindow, RateLimitError};
