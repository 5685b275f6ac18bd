//! One round, one pipeline: lock, load, detect, decide, price, clamp,
//! speak, persist, respond. Strict ordering within a session comes from the
//! per-session lock; everything pure in the middle is synchronous.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use mol_bhav_config::{AppConfig, Environment};
use mol_bhav_dialogue::{
    detect_exit_intent, detect_sentiment, sanitize_buyer_message, DialogueGenerator,
    DialogueRequest, HttpLlmClient, LlmClient,
};
use mol_bhav_engine::{
    assess, decide, floor_price, parse_buyer_price, validate_counter, CouponService, MachineConfig,
};
use mol_bhav_ratelimit::PersistBackoff;
use mol_bhav_store::{DurableStore, HotStore, OfferEvent, SessionSummary, StoreError};
use mol_bhav_types::{
    is_valid_product_id, is_valid_session_id, new_session_id, new_session_token, Actor, Clock,
    Language, NegotiationSession, Offer, OfferFeatures, SessionResponse, SessionState,
    SystemClock, Tactic,
};

use crate::auth::{verify_session_token, DUMMY_TOKEN};
use crate::catalog::ProductCatalog;
use crate::error::ServiceError;
use crate::quote::QuoteBuilder;

const START_RATE_WINDOW_MS: u64 = 60_000;
const DEV_SIGNING_KEY: &[u8] = b"molbhav-dev-signing-key";

#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub product_id: String,
    pub buyer_ref: String,
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfferRequest {
    pub session_id: String,
    pub session_token: String,
    pub price: f64,
    pub message: Option<String>,
    pub language: Option<Language>,

    /// Optional idempotency hint; a stale value reads as a blind retry
    pub round: Option<u32>,
}

/// Builder error
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// Builder for NegotiationService
#[derive(Default)]
pub struct NegotiationServiceBuilder {
    catalog: Option<Arc<dyn ProductCatalog>>,
    hot: Option<Arc<dyn HotStore>>,
    durable: Option<Arc<dyn DurableStore>>,
    llm: Option<Arc<dyn LlmClient>>,
    coupons: Option<CouponService>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<AppConfig>,
}

impl NegotiationServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_hot_store(mut self, hot: Arc<dyn HotStore>) -> Self {
        self.hot = Some(hot);
        self
    }

    pub fn with_durable_store(mut self, durable: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    /// Explicit LLM client; omitted, one is built from config when enabled
    pub fn with_llm_client(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_coupons(mut self, coupons: CouponService) -> Self {
        self.coupons = Some(coupons);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<NegotiationService, BuilderError> {
        let catalog = self.catalog.ok_or_else(|| BuilderError::MissingField {
            field: "catalog".to_string(),
        })?;
        let hot = self.hot.ok_or_else(|| BuilderError::MissingField {
            field: "hot_store".to_string(),
        })?;
        let durable = self.durable.ok_or_else(|| BuilderError::MissingField {
            field: "durable_store".to_string(),
        })?;

        let config = self.config.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let llm: Option<Arc<dyn LlmClient>> = match self.llm {
            Some(llm) => Some(llm),
            None if config.llm.enabled => Some(Arc::new(HttpLlmClient::new(
                config.llm.endpoint.clone(),
                config.llm.api_key.clone(),
                config.llm.model.clone(),
            ))),
            None => None,
        };
        let dialogue = DialogueGenerator::new(
            llm,
            config.server.env == Environment::Production,
            Duration::from_millis(config.llm.timeout_ms),
        );

        let signing_key = if config.quote.signing_key.is_empty() {
            DEV_SIGNING_KEY.to_vec()
        } else {
            config.quote.signing_key.clone().into_bytes()
        };

        let machine = MachineConfig {
            zopa_epsilon_pct: config.negotiation.zopa_epsilon_pct,
            ..MachineConfig::default()
        };

        Ok(NegotiationService {
            catalog,
            hot,
            durable,
            dialogue,
            coupons: self.coupons.unwrap_or_else(CouponService::empty),
            quotes: QuoteBuilder::new(signing_key),
            clock,
            machine,
            config,
        })
    }
}

/// Orchestrates negotiation rounds over the stores and the dialogue boundary
pub struct NegotiationService {
    catalog: Arc<dyn ProductCatalog>,
    hot: Arc<dyn HotStore>,
    durable: Arc<dyn DurableStore>,
    dialogue: DialogueGenerator,
    coupons: CouponService,
    quotes: QuoteBuilder,
    clock: Arc<dyn Clock>,
    machine: MachineConfig,
    config: AppConfig,
}

impl NegotiationService {
    pub fn builder() -> NegotiationServiceBuilder {
        NegotiationServiceBuilder::new()
    }

    /// Open a session: load the product, seed the state at the anchor, speak
    /// the opening line.
    pub async fn start(&self, request: StartRequest) -> Result<SessionResponse, ServiceError> {
        if !is_valid_product_id(&request.product_id) {
            return Err(ServiceError::BadInput("invalid product id".to_string()));
        }
        if request.buyer_ref.is_empty() {
            return Err(ServiceError::BadInput("missing buyer reference".to_string()));
        }

        self.with_hot_deadline(self.hot.incr_start_rate(
            &request.buyer_ref,
            START_RATE_WINDOW_MS,
            self.config.negotiation.start_rate_per_minute,
        ))
        .await?;

        let product = self
            .catalog
            .get(&request.product_id)
            .await?
            .ok_or_else(|| {
                error!(product_id = %request.product_id, kind = "internal", "product missing at start");
                ServiceError::Internal("product unavailable".to_string())
            })?;
        product
            .validate()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let now = self.clock.now_ms();
        let n = &self.config.negotiation;
        let language = request.language.unwrap_or_default();
        let floor = floor_price(product.cost_price, product.min_margin);

        let mut session = NegotiationSession::new(
            new_session_id().map_err(|e| ServiceError::Internal(e.to_string()))?,
            new_session_token().map_err(|e| ServiceError::Internal(e.to_string()))?,
            product.id.clone(),
            request.buyer_ref.clone(),
            language,
            product.anchor_price,
            floor,
            n.max_rounds,
            n.beta,
            n.alpha,
            n.quote_ttl_seconds,
            now,
        );

        let dialogue = self
            .dialogue
            .generate(&DialogueRequest {
                tactic: Tactic::OpeningAnchor,
                price: product.anchor_price,
                language,
                buyer_message: "",
                product_name: &product.name,
                round: 0,
                max_rounds: n.max_rounds,
            })
            .await;

        let mut opening = Offer::seller(
            product.anchor_price,
            dialogue.message.clone(),
            Tactic::OpeningAnchor,
            0,
            now,
        );
        // The opening event carries enough identity to reconstruct an audit
        // summary after the hot entry lapses
        opening
            .metadata
            .insert("product_id".to_string(), product.id.clone().into());
        opening
            .metadata
            .insert("buyer_ref".to_string(), request.buyer_ref.clone().into());

        let event = OfferEvent::from_offer(&session.session_id, &opening);
        session.record_seller_offer(opening)?;

        if !self.persist_durable(&[event], None).await {
            session.degraded = true;
            warn!(session_id = %session.session_id, "audit trail incomplete at start");
        }
        self.with_hot_deadline(self.hot.put_session(&session, self.session_ttl_ms()))
            .await?;

        info!(
            session_id = %session.session_id,
            product_id = %product.id,
            anchor = product.anchor_price,
            "session started"
        );

        Ok(self.decorate(
            SessionResponse::from_session(&session, dialogue.message),
            dialogue.fallback,
            dialogue.sanitized,
            false,
            session.degraded,
            dialogue.reasoning,
        ))
    }

    /// Process one buyer offer under the session lock
    pub async fn offer(&self, request: OfferRequest) -> Result<SessionResponse, ServiceError> {
        if !is_valid_session_id(&request.session_id) {
            return Err(ServiceError::BadInput("invalid session id".to_string()));
        }
        let price = parse_buyer_price(request.price)?;

        if self
            .with_hot_deadline(self.hot.cooldown_active(&request.session_id))
            .await?
        {
            return Err(ServiceError::Cooldown);
        }

        let lock = self
            .with_hot_deadline(
                self.hot
                    .acquire_lock(&request.session_id, self.config.negotiation.lock_lease_ms),
            )
            .await?;

        let outcome = self.offer_locked(&request, price).await;

        if let Err(e) = self.hot.release_lock(&lock).await {
            warn!(session_id = %request.session_id, error = %e, "lock release failed");
        }
        outcome
    }

    async fn offer_locked(
        &self,
        request: &OfferRequest,
        price: u64,
    ) -> Result<SessionResponse, ServiceError> {
        let now = self.clock.now_ms();

        let Some(session) = self
            .with_hot_deadline(self.hot.get_session(&request.session_id))
            .await?
        else {
            // Missing and expired sessions answer exactly like a bad token so
            // token probes learn nothing
            verify_session_token(DUMMY_TOKEN, &request.session_token);
            return Err(ServiceError::BadToken);
        };

        if !verify_session_token(&session.session_token, &request.session_token) {
            return Err(ServiceError::BadToken);
        }
        if session.is_terminal() {
            return Err(ServiceError::SessionClosed);
        }

        let round = session.round + 1;
        if let Some(hint) = request.round {
            if hint != round {
                return Err(ServiceError::OutOfOrder);
            }
        }

        let language = request.language.unwrap_or(session.language);
        let sanitized = sanitize_buyer_message(request.message.as_deref().unwrap_or(""));
        let exit_intent = detect_exit_intent(&sanitized.text);
        let sentiment = detect_sentiment(&sanitized.text);

        let features = OfferFeatures {
            gap_ms: session
                .last_buyer_timestamp()
                .map(|ts| now.saturating_sub(ts)),
            price_delta: session
                .last_buyer_price
                .map(|p| price as i64 - p as i64),
        };
        let buyer_offer = Offer::buyer(price, sanitized.text.clone(), round, now)
            .with_features(features)
            .with_sentiment(sentiment);

        let mut stream: Vec<&Offer> = session.buyer_offers().collect();
        stream.push(&buyer_offer);
        let bot = assess(
            &stream,
            self.config.negotiation.min_response_delay_ms,
            session.anchor_price,
        );

        let decision = decide(&session, price, exit_intent, &bot, &self.machine);

        let mut updated = session.clone();
        updated.bot_score = bot.score;
        updated.language = language;
        updated.record_buyer_offer(buyer_offer.clone())?;
        if decision.consume_flounce {
            updated.flounce_used = true;
        }

        let validated = validate_counter(
            decision.counter,
            updated.floor_price,
            updated.anchor_price,
            session.current_price,
        )
        .map_err(|e| ServiceError::ValidationFailed(e.to_string()))?;
        if validated.overridden {
            warn!(
                session_id = %updated.session_id,
                reasons = ?validated.reasons,
                "validator clamped the outbound counter"
            );
        }

        let product = self.catalog.get(&session.product_id).await?;
        let (product_name, category) = product
            .as_ref()
            .map(|p| (p.name.as_str(), p.category.as_str()))
            .unwrap_or((session.product_id.as_str(), ""));

        let mut counter = validated.price;
        let mut coupon_id = None;
        if decision.state == SessionState::Responding {
            if let Some(applied) = self.coupons.apply(&session, category, decision.tactic, counter)
            {
                counter = applied.discounted;
                coupon_id = Some(applied.coupon_id);
            }
        }

        let dialogue = self
            .dialogue
            .generate(&DialogueRequest {
                tactic: decision.tactic,
                price: counter,
                language,
                buyer_message: &sanitized.text,
                product_name,
                round,
                max_rounds: updated.max_rounds,
            })
            .await;
        updated.sentiment = dialogue.sentiment;

        let mut seller = Offer::seller(
            counter,
            dialogue.message.clone(),
            decision.tactic,
            round,
            now,
        );
        if validated.overridden {
            seller
                .metadata
                .insert("validator_override".to_string(), true.into());
            seller.metadata.insert(
                "validator_reasons".to_string(),
                serde_json::json!(validated.reasons),
            );
        }
        if let Some(id) = &coupon_id {
            seller
                .metadata
                .insert("coupon_applied".to_string(), true.into());
            seller
                .metadata
                .insert("coupon_id".to_string(), id.clone().into());
        }
        if dialogue.fallback {
            seller
                .metadata
                .insert("dialogue_fallback".to_string(), true.into());
        }
        if dialogue.sanitized {
            seller.metadata.insert("sanitized".to_string(), true.into());
        }

        let events = [
            OfferEvent::from_offer(&updated.session_id, &buyer_offer),
            OfferEvent::from_offer(&updated.session_id, &seller),
        ];

        updated.record_seller_offer(seller)?;
        if let Some(id) = coupon_id.clone() {
            updated.coupons_applied.insert(id);
        }

        let mut quote = None;
        match decision.state {
            SessionState::Agreed => {
                updated.close_agreed(counter, now);
                quote = Some(self.quotes.build(&updated, now)?);
            }
            SessionState::Broken => {
                updated.state = SessionState::Broken;
                updated.tactic = decision.tactic;
            }
            _ => {}
        }

        let summary = updated
            .is_terminal()
            .then(|| SessionSummary::from_session(&updated, now));
        if !self.persist_durable(&events, summary.as_ref()).await {
            updated.degraded = true;
            warn!(session_id = %updated.session_id, round, "audit trail incomplete");
        }

        // Failure here rolls the round back: the old snapshot stays the hot
        // truth and the buyer retries without having consumed a round
        self.with_hot_deadline(self.hot.put_session(&updated, self.session_ttl_ms()))
            .await?;

        if self.config.negotiation.min_response_delay_ms > 0 {
            let _ = self
                .with_hot_deadline(self.hot.set_cooldown(
                    &updated.session_id,
                    self.config.negotiation.min_response_delay_ms,
                ))
                .await;
        }

        debug_assert!(updated.check_invariants().is_ok());
        info!(
            session_id = %updated.session_id,
            round,
            tactic = %decision.tactic,
            state = %updated.state,
            counter,
            bot_score = bot.score,
            "round complete"
        );

        let mut response = self.decorate(
            SessionResponse::from_session(&updated, dialogue.message),
            dialogue.fallback,
            dialogue.sanitized,
            validated.overridden,
            updated.degraded,
            dialogue.reasoning,
        );
        if let Some(quote) = quote {
            let value = serde_json::to_value(&quote)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            response.metadata.insert("quote".to_string(), value);
        }
        Ok(response)
    }

    /// Read-only snapshot; never mutates negotiation state
    pub async fn status(
        &self,
        session_id: &str,
        session_token: &str,
    ) -> Result<SessionResponse, ServiceError> {
        if !is_valid_session_id(session_id) {
            return Err(ServiceError::BadInput("invalid session id".to_string()));
        }

        match self
            .with_hot_deadline(self.hot.get_session(session_id))
            .await?
        {
            Some(session) => {
                if !verify_session_token(&session.session_token, session_token) {
                    return Err(ServiceError::BadToken);
                }
                let message = session
                    .offers
                    .iter()
                    .rev()
                    .find(|o| o.actor == Actor::Seller)
                    .map(|o| o.message.clone())
                    .unwrap_or_default();
                Ok(SessionResponse::from_session(&session, message))
            }
            None => {
                verify_session_token(DUMMY_TOKEN, session_token);
                self.record_lapse(session_id).await;
                Err(ServiceError::NoSession)
            }
        }
    }

    /// Sessions that lapsed on TTL get their terminal audit row the first
    /// time anyone looks for them
    async fn record_lapse(&self, session_id: &str) {
        let known = self.durable.has_session(session_id).await.unwrap_or(false);
        if !known {
            return;
        }
        let closed = self
            .durable
            .get_summary(session_id)
            .await
            .unwrap_or(None)
            .is_some();
        if closed {
            return;
        }
        if let Some(summary) = self.timeout_summary(session_id).await {
            info!(session_id, "session lapsed on ttl");
            if let Err(e) = self.durable.write_summary(&summary).await {
                warn!(session_id, error = %e, "could not record lapse");
            }
        }
    }

    async fn timeout_summary(&self, session_id: &str) -> Option<SessionSummary> {
        let events = self.durable.get_events(session_id).await.ok()?;
        let first = events.first()?;
        let lookup = |key: &str| {
            first
                .metadata
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        Some(SessionSummary {
            session_id: session_id.to_string(),
            product_id: lookup("product_id"),
            buyer_ref: lookup("buyer_ref"),
            outcome: SessionState::TimedOut,
            rounds_used: events
                .iter()
                .filter(|e| e.actor == Actor::Buyer)
                .map(|e| e.round)
                .max()
                .unwrap_or(0),
            agreed_price: None,
            bot_score: 0.0,
            coupons: Vec::new(),
            degraded: false,
            created_at: first.timestamp_ms,
            closed_at: self.clock.now_ms(),
        })
    }

    fn session_ttl_ms(&self) -> u64 {
        self.config.negotiation.session_ttl_seconds * 1_000
    }

    fn decorate(
        &self,
        mut response: SessionResponse,
        dialogue_fallback: bool,
        sanitized: bool,
        validator_override: bool,
        degraded: bool,
        reasoning: Option<String>,
    ) -> SessionResponse {
        if dialogue_fallback {
            response
                .metadata
                .insert("dialogue_fallback".to_string(), true.into());
        }
        if sanitized {
            response.metadata.insert("sanitized".to_string(), true.into());
        }
        if validator_override {
            response
                .metadata
                .insert("validator_override".to_string(), true.into());
        }
        if degraded {
            response.metadata.insert("degraded".to_string(), true.into());
        }
        if let Some(reasoning) = reasoning {
            response
                .metadata
                .insert("reasoning".to_string(), reasoning.into());
        }
        response
    }

    async fn with_hot_deadline<T, F>(&self, operation: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let deadline = Duration::from_millis(self.config.stores.hot_timeout_ms);
        match tokio::time::timeout(deadline, operation).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => {
                warn!("hot tier deadline exceeded");
                Err(ServiceError::Degraded)
            }
        }
    }

    /// Durable writes retry on a budget-bounded schedule; exhaustion degrades
    /// the session instead of failing the round
    async fn persist_durable(
        &self,
        events: &[OfferEvent],
        summary: Option<&SessionSummary>,
    ) -> bool {
        let deadline = Duration::from_millis(self.config.stores.durable_timeout_ms);
        let retries = self.config.stores.persist_retries.max(1);
        let mut backoff = PersistBackoff::for_durable_writes(deadline);

        for attempt in 1..=retries {
            let write = async {
                for event in events {
                    self.durable.append_offer(event).await?;
                }
                if let Some(summary) = summary {
                    self.durable.write_summary(summary).await?;
                }
                Ok::<(), StoreError>(())
            };
            match tokio::time::timeout(deadline, write).await {
                Ok(Ok(())) => return true,
                Ok(Err(e)) => warn!(attempt, error = %e, "durable write failed"),
                Err(_) => warn!(attempt, "durable write deadline exceeded"),
            }
            if attempt < retries {
                // A drained budget ends the retries early; sleeping past the
                // persistence window would just stall the buyer
                match backoff.next_delay() {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => break,
                }
            }
        }

        // kind=degraded feeds the error counter through the metrics layer
        error!(
            kind = "degraded",
            attempts = backoff.attempts() + 1,
            slept_ms = backoff.spent().as_millis() as u64,
            "durable retries exhausted"
        );
        false
    }
}
