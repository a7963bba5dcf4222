//! Keyword-triggered canned answers
//!
//! Common questions on the flight-tracking site get a fixed reply without a
//! round trip to the language model. The same rules also serve as the first
//! fallback when the upstream provider fails.

use serde::{Deserialize, Serialize};

use crate::protocol::{ChatMessage, Role};

/// A fixed reply triggered by any of its keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedRule {
    /// Case-insensitive keywords; any one occurring in the text triggers the rule
    pub keywords: Vec<String>,
    /// Reply text
    pub response: String,
}

impl CannedRule {
    /// Build a rule from string slices
    pub fn new(keywords: &[&str], response: impl Into<String>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            response: response.into(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && lowered.contains(&k))
    }
}

/// Ordered canned rules; the first matching rule wins
#[derive(Debug, Clone, Default)]
pub struct CannedResponder {
    rules: Vec<CannedRule>,
}

impl CannedResponder {
    /// Responder over `rules`, in priority order
    #[must_use]
    pub fn new(rules: Vec<CannedRule>) -> Self {
        Self { rules }
    }

    /// Responder that never answers
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// `true` if there are no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Canned reply for a single piece of text
    #[must_use]
    pub fn respond(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.response.as_str())
    }

    /// Canned reply for any user turn of a conversation, newest turn first
    #[must_use]
    pub fn respond_to_conversation(&self, messages: &[ChatMessage]) -> Option<&str> {
        messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .find_map(|m| self.respond(&m.content))
    }
}

/// Built-in rules for the most frequent site questions
#[must_use]
pub fn default_rules() -> Vec<CannedRule> {
    vec![
        CannedRule::new(
            &["hello", "hi there", "good morning", "good evening"],
            "Hello! I can help with flight status, delays, airports and baggage. \
             What would you like to know?",
        ),
        CannedRule::new(
            &["track my flight", "flight status", "where is my flight"],
            "Enter your flight number (for example BA117) in the search bar at the top of \
             the page to see live status, gate and estimated arrival.",
        ),
        CannedRule::new(
            &["baggage", "luggage", "carry-on", "carry on"],
            "Baggage allowances depend on your airline and fare. Check your booking \
             confirmation or the airline's website for exact weight and size limits.",
        ),
        CannedRule::new(
            &["cancelled", "canceled", "cancellation", "compensation", "refund"],
            "If your flight is cancelled, contact your airline directly for rebooking or a \
             refund. You may also be entitled to compensation depending on the route.",
        ),
        CannedRule::new(
            &["check-in", "check in", "boarding pass"],
            "Most airlines open online check-in 24 to 48 hours before departure. Use your \
             booking reference on the airline's website or app.",
        ),
        CannedRule::new(
            &["notification", "alert"],
            "Open a flight's page and press \"Notify me\" to get push alerts for gate \
             changes, delays and landing.",
        ),
    ]
}
