//! Composite bot score over the trailing buyer-offer window. Timing flags
//! cadence faster or more regular than a human; pattern flags scripted price
//! sequences. Both components and the final score live in [0, 1].

use mol_bhav_types::Offer;

/// Score at or above this breaks the session
pub const BOT_BLOCK_THRESHOLD: f64 = 0.8;

/// Score at or above this hardens the concession curve for the round
pub const BOT_HARSH_THRESHOLD: f64 = 0.5;

/// Trailing buyer offers considered
const WINDOW: usize = 8;

/// Gap standard deviation under this reads as machine-regular cadence
const REGULARITY_STDDEV_MS: f64 = 100.0;

/// Regularity needs this many gaps before it counts; shorter streams are too
/// easy for a careful human to hit by accident
const REGULARITY_MIN_GAPS: usize = 5;

/// A "tiny" decrement is at most this fraction of the anchor
const TINY_STEP_PCT: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BotAssessment {
    pub score: f64,
    pub timing: f64,
    pub pattern: f64,
}

impl BotAssessment {
    pub fn blocks(&self) -> bool {
        self.score >= BOT_BLOCK_THRESHOLD
    }

    pub fn hardens_curve(&self) -> bool {
        self.score >= BOT_HARSH_THRESHOLD
    }
}

/// Assess the buyer-offer stream, newest last. `cooldown_ms` is the configured
/// minimum response delay, the reference for "too fast".
pub fn assess(buyer_offers: &[&Offer], cooldown_ms: u64, anchor: u64) -> BotAssessment {
    let window: Vec<&Offer> = buyer_offers
        .iter()
        .rev()
        .take(WINDOW)
        .rev()
        .copied()
        .collect();

    let timing = timing_component(&window, cooldown_ms);
    let pattern = pattern_component(&window, anchor);
    BotAssessment {
        score: 0.5 * timing + 0.5 * pattern,
        timing,
        pattern,
    }
}

fn timing_component(window: &[&Offer], cooldown_ms: u64) -> f64 {
    let gaps: Vec<f64> = window
        .windows(2)
        .map(|pair| pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms) as f64)
        .collect();
    if gaps.len() < 2 {
        return 0.0;
    }

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    let stddev = variance.sqrt();

    let mut component: f64 = 0.0;
    if mean < cooldown_ms as f64 {
        component += 0.75;
    }
    if gaps.len() >= REGULARITY_MIN_GAPS && stddev < REGULARITY_STDDEV_MS {
        component += 0.75;
    }
    component.min(1.0)
}

fn pattern_component(window: &[&Offer], anchor: u64) -> f64 {
    let prices: Vec<u64> = window.iter().map(|o| o.price).collect();
    if prices.len() < 3 {
        return 0.0;
    }

    let mut component: f64 = 0.0;

    // Repeated identical prices
    let mut best_run = 1usize;
    let mut run = 1usize;
    for pair in prices.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            best_run = best_run.max(run);
        } else {
            run = 1;
        }
    }
    if best_run >= 3 {
        component = component.max(1.0);
    }

    // Arithmetic sequence with a non-zero step
    if prices.len() >= 4 {
        let deltas: Vec<i64> = prices
            .windows(2)
            .map(|pair| pair[1] as i64 - pair[0] as i64)
            .collect();
        if deltas[0] != 0 && deltas.iter().all(|d| *d == deltas[0]) {
            component = component.max(0.75);
        }
    }

    // Monotonic tiny decrements: a greedy bot shaving rupees off its own bid
    let tiny = (anchor as f64 * TINY_STEP_PCT).round() as i64;
    let decrements: Vec<i64> = prices
        .windows(2)
        .map(|pair| pair[0] as i64 - pair[1] as i64)
        .collect();
    if decrements.len() >= 3
        && decrements
            .iter()
            .rev()
            .take(3)
            .all(|d| *d > 0 && *d <= tiny)
    {
        component = component.max(0.5);
    }

    component.min(1.0)
}
