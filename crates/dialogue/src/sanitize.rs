//! Buyer text hygiene before anything reaches a prompt: control characters
//! out, hard length cap, known prompt-injection shapes redacted.

use mol_bhav_types::Sentiment;

/// Characters of buyer text forwarded to generation
pub const MAX_BUYER_MESSAGE_CHARS: usize = 512;

/// Substrings that read as attempts to steer the model rather than haggle.
/// Matched case-insensitively; each occurrence is replaced wholesale.
const INJECTION_PATTERNS: &[&str] = &[
    "ignore previous",
    "ignore all previous",
    "ignore the above",
    "disregard previous",
    "disregard all",
    "forget your instructions",
    "system prompt",
    "you are now",
    "act as the",
    "new instructions",
    "reveal floor",
    "reveal the floor",
    "reveal your floor",
    "floor price",
    "[system]",
    "[assistant]",
    "<|",
    "###",
];

const REDACTION_MARKER: &str = "[redacted]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    pub redacted: bool,
    pub truncated: bool,
}

/// Sanitise free text from the buyer. Order matters: control characters are
/// dropped first so split markers cannot hide a pattern, then the cap, then
/// redaction.
pub fn sanitize_buyer_message(raw: &str) -> Sanitized {
    let stripped: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let truncated = stripped.chars().count() > MAX_BUYER_MESSAGE_CHARS;
    let capped: String = stripped.chars().take(MAX_BUYER_MESSAGE_CHARS).collect();

    let (text, redacted) = redact_injections(&capped);
    Sanitized {
        text,
        redacted,
        truncated,
    }
}

fn redact_injections(text: &str) -> (String, bool) {
    let mut out = text.to_string();
    let mut redacted = false;

    for pattern in INJECTION_PATTERNS {
        loop {
            // ASCII lowering keeps byte offsets aligned with `out`; the
            // patterns themselves are ASCII
            let lower = out.to_ascii_lowercase();
            match lower.find(pattern) {
                Some(start) => {
                    let end = start + pattern.len();
                    if !out.is_char_boundary(start) || !out.is_char_boundary(end) {
                        break;
                    }
                    out.replace_range(start..end, REDACTION_MARKER);
                    redacted = true;
                }
                None => break,
            }
        }
    }
    (out, redacted)
}

/// Phrases that read as the buyer walking out, across the supported
/// vernaculars.
const EXIT_PHRASES: &[&str] = &[
    "bye",
    "i am leaving",
    "i'm leaving",
    "walking away",
    "forget it",
    "no deal",
    "not interested",
    "some other shop",
    "rehne do",
    "jaane do",
    "chhodo",
    "nako",
    "vendam",
    "vaddu",
];

pub fn detect_exit_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    EXIT_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

const POSITIVE_PHRASES: &[&str] = &["great", "thanks", "thank you", "accha", "badhiya", "mast", "super"];
const FRUSTRATED_PHRASES: &[&str] = &["too much", "too expensive", "mehenga", "mehnga", "bahut zyada", "loot"];

/// Coarse mood read used to flavour prompts and responses
pub fn detect_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    if detect_exit_intent(&lower) {
        return Sentiment::Exit;
    }
    if FRUSTRATED_PHRASES.iter().any(|p| lower.contains(p)) {
        return Sentiment::Frustrated;
    }
    if POSITIVE_PHRASES.iter().any(|p| lower.contains(p)) {
        return Sentiment::Positive;
    }
    Sentiment::Neutral
}
