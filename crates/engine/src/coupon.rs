//! Invisible promos folded into a concession. The buyer sees a better price,
//! never a code.

use serde::{Deserialize, Serialize};

use mol_bhav_types::{NegotiationSession, Tactic};

/// One catalog entry. Catalog order is precedence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,

    /// Redemption code, internal only. Never serialised into offers or
    /// responses.
    pub code: String,

    /// Extra concession as a fraction of the counter
    pub discount_pct: f64,

    /// Counter must be at least this much for the coupon to apply
    #[serde(default)]
    pub min_cart_value: u64,

    /// Restrict to a product category, None for any
    #[serde(default)]
    pub category: Option<String>,

    /// Only from this round on
    #[serde(default)]
    pub min_round: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CouponApplication {
    pub coupon_id: String,
    pub discounted: u64,
}

/// Applies at most one coupon per session, only inside concession-class
/// tactics, and never below the floor.
#[derive(Debug, Clone, Default)]
pub struct CouponService {
    catalog: Vec<Coupon>,
}

impl CouponService {
    pub fn new(catalog: Vec<Coupon>) -> Self {
        Self { catalog }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn apply(
        &self,
        session: &NegotiationSession,
        category: &str,
        tactic: Tactic,
        counter: u64,
    ) -> Option<CouponApplication> {
        if !matches!(tactic, Tactic::Concession | Tactic::WalkAwaySave) {
            return None;
        }
        if !session.coupons_applied.is_empty() {
            return None;
        }
        let round = session.round + 1;

        for coupon in &self.catalog {
            if counter < coupon.min_cart_value {
                continue;
            }
            if round < coupon.min_round {
                continue;
            }
            if let Some(wanted) = &coupon.category {
                if wanted != category {
                    continue;
                }
            }
            let discount = (counter as f64 * coupon.discount_pct).round() as u64;
            let discounted = counter.saturating_sub(discount);
            if discounted < session.floor_price {
                continue;
            }
            return Some(CouponApplication {
                coupon_id: coupon.id.clone(),
                discounted,
            });
        }
        None
    }
}
