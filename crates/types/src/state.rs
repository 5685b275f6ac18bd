use serde::{Deserialize, Serialize};

/// Session states of the stacked-alternating-offers protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Proposing,
    Responding,
    Agreed,
    Broken,
    TimedOut,
}

impl SessionState {
    /// Terminal states are absorbing: no further mutation is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Agreed | SessionState::Broken | SessionState::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Proposing => "proposing",
            SessionState::Responding => "responding",
            SessionState::Agreed => "agreed",
            SessionState::Broken => "broken",
            SessionState::TimedOut => "timed_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SessionState::Idle),
            "proposing" => Some(SessionState::Proposing),
            "responding" => Some(SessionState::Responding),
            "agreed" => Some(SessionState::Agreed),
            "broken" => Some(SessionState::Broken),
            "timed_out" => Some(SessionState::TimedOut),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seller-side tactic tags attached to each counter-offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    OpeningAnchor,
    Accept,
    Concession,
    AnchorDefense,
    QuantityPivot,
    WalkAwaySave,
    BotBlock,
    Deadline,
    Timeout,
}

impl Tactic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tactic::OpeningAnchor => "opening_anchor",
            Tactic::Accept => "accept",
            Tactic::Concession => "concession",
            Tactic::AnchorDefense => "anchor_defense",
            Tactic::QuantityPivot => "quantity_pivot",
            Tactic::WalkAwaySave => "walk_away_save",
            Tactic::BotBlock => "bot_block",
            Tactic::Deadline => "deadline",
            Tactic::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opening_anchor" => Some(Tactic::OpeningAnchor),
            "accept" => Some(Tactic::Accept),
            "concession" => Some(Tactic::Concession),
            "anchor_defense" => Some(Tactic::AnchorDefense),
            "quantity_pivot" => Some(Tactic::QuantityPivot),
            "walk_away_save" => Some(Tactic::WalkAwaySave),
            "bot_block" => Some(Tactic::BotBlock),
            "deadline" => Some(Tactic::Deadline),
            "timeout" => Some(Tactic::Timeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tactic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buyer mood as read from the latest message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    #[default]
    Neutral,
    Positive,
    Frustrated,
    Exit,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
            Sentiment::Frustrated => "frustrated",
            Sentiment::Exit => "exit",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported vernacular languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Ta,
    Te,
    Mr,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Ta => "ta",
            Language::Te => "te",
            Language::Mr => "mr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en" => Some(Language::En),
            "hi" => Some(Language::Hi),
            "ta" => Some(Language::Ta),
            "te" => Some(Language::Te),
            "mr" => Some(Language::Mr),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
