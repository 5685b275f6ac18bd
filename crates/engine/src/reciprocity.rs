//! Tit-for-tat tracking as a function of the recorded buyer prices. No
//! long-lived actor: the offer list is the state.

use crate::pricing::adaptive_alpha;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reciprocity {
    /// Buyer's latest upward concession in rupees; zero when the buyer held
    /// or lowered their bid.
    pub buyer_delta: u64,

    /// Deadline-adjusted damping factor
    pub alpha_eff: f64,
}

/// Derive the reciprocity inputs for the current round. `buyer_prices` must
/// include the offer being processed as its last element.
pub fn track(buyer_prices: &[u64], alpha: f64, round: u32, max_rounds: u32) -> Reciprocity {
    let buyer_delta = match buyer_prices {
        [.., prev, last] => last.saturating_sub(*prev),
        _ => 0,
    };
    Reciprocity {
        buyer_delta,
        alpha_eff: adaptive_alpha(alpha, round, max_rounds),
    }
}
