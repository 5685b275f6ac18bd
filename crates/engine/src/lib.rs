pub mod botdetect;
pub mod coupon;
pub mod error;
pub mod machine;
pub mod pricing;
pub mod reciprocity;
pub mod validator;

pub use botdetect::{assess, BotAssessment, BOT_BLOCK_THRESHOLD, BOT_HARSH_THRESHOLD};
pub use coupon::{Coupon, CouponApplication, CouponService};
pub use error::EngineError;
pub use machine::{decide, Decision, MachineConfig};
pub use pricing::{
    adaptive_alpha, candidate_counter, floor_price, reservation_price, within_zopa, zopa_epsilon,
};
pub use reciprocity::{track, Reciprocity};
pub use validator::{parse_buyer_price, validate_counter, Validated};
