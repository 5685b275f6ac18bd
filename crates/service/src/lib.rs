pub mod auth;
pub mod catalog;
pub mod error;
pub mod quote;
pub mod service;


pub use auth::{constant_time_eq, verify_admin_key};
pub use catalog::{InMemoryCatalog, ProductCatalog};
pub use error::ServiceError;
pub use quote::QuoteBuilder;
pub use service::{
    NegotiationService, NegotiationServiceBuilder, OfferRequest, StartRequest,
};
