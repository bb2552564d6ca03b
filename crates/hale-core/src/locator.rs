use std::time::Duration;

/// An ordered, non-empty list of equivalent selectors for one logical
/// UI element.
///
/// The first entry is the primary selector; the rest are fallbacks
/// tried in list order when the primary fails to resolve. Page objects
/// define these once and never mutate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSet {
    selectors: Vec<String>,
}

impl LocatorSet {
    /// A set with a single selector and no fallbacks.
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            selectors: vec![primary.into()],
        }
    }

    /// A set with a primary selector and ordered fallbacks.
    pub fn with_fallbacks<I, S>(primary: impl Into<String>, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selectors = vec![primary.into()];
        selectors.extend(fallbacks.into_iter().map(Into::into));
        Self { selectors }
    }

    pub fn primary(&self) -> &str {
        &self.selectors[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(String::as_str)
    }

    /// Number of selectors in the set; always at least 1.
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// One selector's share of a total timeout budget.
    ///
    /// Dividing the budget across fallbacks bounds the worst-case wait
    /// for a full resolution pass to one global timeout, no matter how
    /// many fallbacks the set carries.
    pub fn per_attempt(&self, total: Duration) -> Duration {
        total / self.selectors.len() as u32
    }
}
