pub mod durable;
pub mod error;
pub mod hot;
pub mod sqlite;

pub use durable::{DurableStore, InMemoryDurableStore, OfferEvent, SessionSummary};
pub use error::StoreError;
pub use hot::{HotStore, InMemoryHotStore, LockToken};
pub use sqlite::SqliteDurableStore;
