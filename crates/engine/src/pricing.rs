//! Pure pricing functions. No I/O, no clocks: time enters as a round index.

use rust_decimal::Decimal;

use mol_bhav_types::ceil_to_rupee;

/// Minimum acceptable seller price: cost * (1 + min_margin), rounded up to a
/// whole rupee.
pub fn floor_price(cost_price: u64, min_margin: Decimal) -> u64 {
    ceil_to_rupee(Decimal::from(cost_price) * (Decimal::ONE + min_margin))
}

/// Time-dependent reservation price
///
/// P(t) = anchor + (floor - anchor) * (t/T)^beta. Beta above 1 holds firm and
/// concedes near the deadline (Boulware); below 1 concedes early. Monotone
/// non-increasing in t.
pub fn reservation_price(anchor: u64, floor: u64, round: u32, max_rounds: u32, beta: f64) -> u64 {
    if anchor <= floor {
        return anchor;
    }
    if max_rounds == 0 {
        return floor;
    }
    let t = (round.min(max_rounds)) as f64 / max_rounds as f64;
    let fraction = t.powf(beta).clamp(0.0, 1.0);
    let span = (anchor - floor) as f64;
    let conceded = (span * fraction).round() as u64;
    anchor.saturating_sub(conceded).clamp(floor, anchor)
}

/// Reciprocity damping strengthens as the deadline approaches:
/// alpha_eff = clamp(alpha * (1 + 0.5 * t/T), 0, 1)
pub fn adaptive_alpha(alpha: f64, round: u32, max_rounds: u32) -> f64 {
    if max_rounds == 0 {
        return alpha.clamp(0.0, 1.0);
    }
    let t = round.min(max_rounds) as f64 / max_rounds as f64;
    (alpha * (1.0 + 0.5 * t)).clamp(0.0, 1.0)
}

/// Candidate counter-offer, the lower of the two concession pressures:
/// tit-for-tat (mirror the buyer's concession, damped) and the time curve.
/// Never below the floor, never above the standing counter.
pub fn candidate_counter(
    current: u64,
    buyer_delta: u64,
    alpha_eff: f64,
    reservation: u64,
    floor: u64,
) -> u64 {
    let mirrored = (buyer_delta as f64 * alpha_eff).round() as u64;
    let tit_for_tat = current.saturating_sub(mirrored);
    tit_for_tat.min(reservation).max(floor).min(current)
}

/// Acceptance slack, a small currency unit derived from the anchor
pub fn zopa_epsilon(anchor: u64, epsilon_pct: f64) -> u64 {
    (anchor as f64 * epsilon_pct).round() as u64
}

/// Zone-of-possible-agreement acceptance predicate. Also accepts any
/// floor-clearing bid once the deadline is one round away.
pub fn within_zopa(
    buyer_price: u64,
    floor: u64,
    candidate: u64,
    epsilon: u64,
    round: u32,
    max_rounds: u32,
) -> bool {
    if buyer_price < floor {
        return false;
    }
    if buyer_price.saturating_add(epsilon) >= candidate {
        return true;
    }
    round + 1 >= max_rounds
}
