/// Link state definitions for tracking crawl progress
///
/// The state of a link is never stored on its own: it follows from the
/// `fetched` and `yanked` fields of the link record.
use std::fmt;

/// Represents the crawl state of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Link is known but has not been fetched (and is not yanked)
    Pending,

    /// Link was excluded from fetching
    Yanked,

    /// A fetch attempt has been made (successful or not)
    Fetched,
}

impl LinkState {
    /// Derives the state from the fetch and yank markers of a link
    ///
    /// A yanked link is never fetched, so `yanked` takes precedence.
    pub fn derive(fetched: bool, yanked: bool) -> Self {
        if yanked {
            Self::Yanked
        } else if fetched {
            Self::Fetched
        } else {
            Self::Pending
        }
    }

    /// Returns true if the link still has to be crawled
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if no further processing of the link will happen
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Yanked => "yanked",
            Self::Fetched => "fetched",
        }
    }

    /// Returns all possible link states
    pub fn all_states() -> Vec<Self> {
        vec![Self::Pending, Self::Yanked, Self::Fetched]
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
