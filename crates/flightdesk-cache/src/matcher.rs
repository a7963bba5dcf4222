//! Similarity predicates between a stored question and an incoming query

/// Decides whether a stored question answers an incoming query.
///
/// Both arguments are already normalized with [`normalize`]. Implementations
/// must be pure: same inputs, same answer, no side effects.
pub trait QueryMatcher: Send + Sync {
    /// Return `true` if `stored` is similar enough to `query`
    fn matches(&self, stored: &str, query: &str) -> bool;
}

/// Equality or containment in either direction
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl QueryMatcher for SubstringMatcher {
    fn matches(&self, stored: &str, query: &str) -> bool {
        stored == query || query.contains(stored) || stored.contains(query)
    }
}

impl<F> QueryMatcher for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn matches(&self, stored: &str, query: &str) -> bool {
        self(stored, query)
    }
}

/// Comparison form of a question: trimmed and lowercased
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
