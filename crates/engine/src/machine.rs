//! Stacked-alternating-offers transition function. Pure: reads a session
//! snapshot plus the incoming buyer offer, returns the next state, tactic and
//! candidate counter. Rows are evaluated in table order; the first match wins.

use mol_bhav_types::{NegotiationSession, SessionState, Tactic};

use crate::botdetect::BotAssessment;
use crate::pricing::{candidate_counter, reservation_price, within_zopa, zopa_epsilon};
use crate::reciprocity::track;

#[derive(Debug, Clone, PartialEq)]
pub struct MachineConfig {
    /// ZOPA slack as a fraction of the anchor
    pub zopa_epsilon_pct: f64,

    /// A buyer move at or under this fraction of the anchor counts towards a
    /// stall
    pub stall_delta_pct: f64,

    /// One-shot save-the-deal concession, fraction of the current counter
    pub walk_away_pct: f64,

    pub bot_block_threshold: f64,
    pub bot_harsh_threshold: f64,

    /// Curve hardening applied for the round when the bot score is elevated
    pub beta_harsh_multiplier: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            zopa_epsilon_pct: 0.01,
            stall_delta_pct: 0.005,
            walk_away_pct: 0.05,
            bot_block_threshold: crate::botdetect::BOT_BLOCK_THRESHOLD,
            bot_harsh_threshold: crate::botdetect::BOT_HARSH_THRESHOLD,
            beta_harsh_multiplier: 1.5,
        }
    }
}

/// Outcome of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub state: SessionState,
    pub tactic: Tactic,

    /// Candidate counter before the validator gate
    pub counter: u64,

    pub agreed_price: Option<u64>,
    pub consume_flounce: bool,
}

/// Decide the transition for a buyer offer. The session snapshot is the state
/// *before* this offer; `buyer_price` belongs to round `session.round + 1`.
pub fn decide(
    session: &NegotiationSession,
    buyer_price: u64,
    exit_intent: bool,
    bot: &BotAssessment,
    config: &MachineConfig,
) -> Decision {
    let round = session.round + 1;
    let current = session.current_price;
    let floor = session.floor_price;
    let anchor = session.anchor_price;

    let mut buyer_prices = session.buyer_prices();
    buyer_prices.push(buyer_price);

    let beta = if bot.score >= config.bot_harsh_threshold {
        session.beta * config.beta_harsh_multiplier
    } else {
        session.beta
    };

    let reciprocity = track(&buyer_prices, session.alpha, round, session.max_rounds);
    let reservation = reservation_price(anchor, floor, round, session.max_rounds, beta);
    let candidate = candidate_counter(
        current,
        reciprocity.buyer_delta,
        reciprocity.alpha_eff,
        reservation,
        floor,
    );
    let epsilon = zopa_epsilon(anchor, config.zopa_epsilon_pct);

    // Row 1: agreement
    if within_zopa(buyer_price, floor, candidate, epsilon, round, session.max_rounds) {
        let agreed = buyer_price.min(current);
        return Decision {
            state: SessionState::Agreed,
            tactic: Tactic::Accept,
            counter: agreed,
            agreed_price: Some(agreed),
            consume_flounce: false,
        };
    }

    // Row 2: scripted buyer
    if bot.score >= config.bot_block_threshold {
        return Decision {
            state: SessionState::Broken,
            tactic: Tactic::BotBlock,
            counter: current,
            agreed_price: None,
            consume_flounce: false,
        };
    }

    // Row 3: round budget exhausted outside the zone
    if round >= session.max_rounds {
        return Decision {
            state: SessionState::Broken,
            tactic: Tactic::Deadline,
            counter: current,
            agreed_price: None,
            consume_flounce: false,
        };
    }

    // Row 4: buyer heading for the door, one save allowed
    if exit_intent && !session.flounce_used {
        let concession = (current as f64 * config.walk_away_pct).round() as u64;
        let counter = current.saturating_sub(concession).max(floor);
        return Decision {
            state: SessionState::Responding,
            tactic: Tactic::WalkAwaySave,
            counter,
            agreed_price: None,
            consume_flounce: true,
        };
    }

    // Row 5: lowball below the floor, hold the line
    if buyer_price < floor && round < session.max_rounds - 1 {
        return Decision {
            state: SessionState::Responding,
            tactic: Tactic::AnchorDefense,
            counter: current,
            agreed_price: None,
            consume_flounce: false,
        };
    }

    // Row 6: stalling buyer, pivot to quantity instead of price
    if is_stalling(&buyer_prices, anchor, config.stall_delta_pct) {
        return Decision {
            state: SessionState::Responding,
            tactic: Tactic::QuantityPivot,
            counter: current,
            agreed_price: None,
            consume_flounce: false,
        };
    }

    // Default row: concede along the curve / mirror the buyer
    Decision {
        state: SessionState::Responding,
        tactic: Tactic::Concession,
        counter: candidate,
        agreed_price: None,
        consume_flounce: false,
    }
}

/// Three consecutive buyer moves, each within the stall threshold
fn is_stalling(buyer_prices: &[u64], anchor: u64, stall_delta_pct: f64) -> bool {
    if buyer_prices.len() < 4 {
        return false;
    }
    let threshold = (anchor as f64 * stall_delta_pct).round() as i64;
    buyer_prices
        .windows(2)
        .rev()
        .take(3)
        .all(|pair| (pair[1] as i64 - pair[0] as i64).abs() <= threshold)
}
