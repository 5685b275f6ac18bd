pub mod clock;
pub mod ident;
pub mod offer;
pub mod product;
pub mod quote;
pub mod response;
pub mod session;
pub mod state;

pub use clock::*;
pub use ident::*;
pub use offer::*;
pub use product::*;
pub use quote::*;
pub use response::*;
pub use session::*;
pub use state::*;

/// ISO 4217 code for all prices in the system
pub const CURRENCY: &str = "INR";
