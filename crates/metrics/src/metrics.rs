use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════
    // SESSION METRICS
    // ═══════════════════════════════════════════════════════════════════════

    /// Total negotiation sessions started
    pub static ref SESSIONS_STARTED: IntCounter = register_int_counter!(
        "mol_bhav_sessions_started_total",
        "Total negotiation sessions started"
    )
    .unwrap();

    /// Sessions currently in play
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "mol_bhav_sessions_active",
        "Negotiation sessions currently active"
    )
    .unwrap();

    /// Terminal outcomes by state
    pub static ref OUTCOME_COUNT: IntCounterVec = register_int_counter_vec!(
        "mol_bhav_session_outcome_total",
        "Terminal session outcomes by state",
        &["outcome"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════
    // OFFER METRICS
    // ═══════════════════════════════════════════════════════════════════════

    /// Buyer offers processed end to end
    pub static ref OFFERS_PROCESSED: IntCounter = register_int_counter!(
        "mol_bhav_offers_processed_total",
        "Buyer offers processed"
    )
    .unwrap();

    /// Seller tactics chosen per round
    pub static ref TACTIC_COUNT: IntCounterVec = register_int_counter_vec!(
        "mol_bhav_tactic_total",
        "Seller tactics chosen",
        &["tactic"]
    )
    .unwrap();

    /// Full round-trip latency for one offer, milliseconds
    pub static ref ROUND_LATENCY: Histogram = register_histogram!(
        "mol_bhav_round_latency_ms",
        "Offer round-trip latency in milliseconds",
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════
    // GUARDRAIL METRICS
    // ═══════════════════════════════════════════════════════════════════════

    /// Sessions broken by the bot detector
    pub static ref BOT_BLOCKS: IntCounter = register_int_counter!(
        "mol_bhav_bot_blocks_total",
        "Sessions broken by the bot detector"
    )
    .unwrap();

    /// Counters clamped by the validator after generation
    pub static ref VALIDATOR_OVERRIDES: IntCounter = register_int_counter!(
        "mol_bhav_validator_overrides_total",
        "Counter offers clamped by the validator"
    )
    .unwrap();

    /// Responses served from the deterministic template
    pub static ref DIALOGUE_FALLBACKS: IntCounter = register_int_counter!(
        "mol_bhav_dialogue_fallbacks_total",
        "Responses served from the deterministic template"
    )
    .unwrap();

    /// Language model call latency, milliseconds
    pub static ref LLM_LATENCY: Histogram = register_histogram!(
        "mol_bhav_llm_latency_ms",
        "Language model call latency in milliseconds",
        vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════
    // PERSISTENCE METRICS
    // ═══════════════════════════════════════════════════════════════════════

    /// Durable writes that exhausted their retries
    pub static ref DEGRADED_PERSISTS: IntCounter = register_int_counter!(
        "mol_bhav_degraded_persists_total",
        "Durable writes that exhausted retries"
    )
    .unwrap();

    /// Rejected requests by error kind
    pub static ref ERROR_COUNT: IntCounterVec = register_int_counter_vec!(
        "mol_bhav_errors_total",
        "Rejected requests by error kind",
        &["kind"]
    )
    .unwrap();
}
