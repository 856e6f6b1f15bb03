/// Crawl state definitions for the post harvesting driver
///
/// This module defines every state the driver moves through and which
/// transitions between them are legal.
use std::fmt;

/// Represents the current state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Credential not yet acquired, parameters not yet built
    Init,

    /// Pulling the next post from the post cursor
    FetchingPosts,

    /// Collecting comments, likes and shares of the current post
    FanningOut,

    /// Flushing every shard buffer
    Draining,

    /// An error or stop signal interrupted the run; draining still follows
    Aborting,

    /// Summary emitted, nothing left to do
    Done,
}

impl CrawlState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true while records may still be produced
    pub fn is_active(&self) -> bool {
        matches!(self, Self::FetchingPosts | Self::FanningOut)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Aborting` is reachable from every non-terminal state and always
    /// leads to `Draining`, so buffered records are flushed before an
    /// error reaches the caller.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        use CrawlState::*;

        match (self, next) {
            (Done, _) => false,
            (Aborting, Draining) => true,
            (Aborting, _) => false,
            (_, Aborting) => true,
            (Init, FetchingPosts) => true,
            (FetchingPosts, FanningOut) | (FetchingPosts, Draining) => true,
            (FanningOut, FetchingPosts) | (FanningOut, Draining) => true,
            (Draining, Done) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::FetchingPosts => "fetching_posts",
            Self::FanningOut => "fanning_out",
            Self::Draining => "draining",
            Self::Aborting => "aborting",
            Self::Done => "done",
        }
    }

    /// Returns all possible crawl states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Init,
            Self::FetchingPosts,
            Self::FanningOut,
            Self::Draining,
            Self::Aborting,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(CrawlState::Init.can_transition_to(CrawlState::FetchingPosts));
        assert!(CrawlState::FetchingPosts.can_transition_to(CrawlState::FanningOut));
        assert!(CrawlState::FanningOut.can_transition_to(CrawlState::FetchingPosts));
        assert!(CrawlState::FanningOut.can_transition_to(CrawlState::Draining));
        assert!(CrawlState::FetchingPosts.can_transition_to(CrawlState::Draining));
        assert!(CrawlState::Draining.can_transition_to(CrawlState::Done));
    }

    #[test]
    fn test_aborting_reachable_from_every_live_state() {
        for state in CrawlState::all_states() {
            let expected = !matches!(state, CrawlState::Done | CrawlState::Aborting);
            assert_eq!(
                state.can_transition_to(CrawlState::Aborting),
                expected,
                "unexpected result for {:?}",
                state
            );
        }
    }

    #[test]
    fn test_aborting_must_drain() {
        assert!(CrawlState::Aborting.can_transition_to(CrawlState::Draining));
        assert!(!CrawlState::Aborting.can_transition_to(CrawlState::Done));
        assert!(!CrawlState::Aborting.can_transition_to(CrawlState::FetchingPosts));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!CrawlState::Init.can_transition_to(CrawlState::Done));
        assert!(!CrawlState::Init.can_transition_to(CrawlState::FanningOut));
        assert!(!CrawlState::Draining.can_transition_to(CrawlState::FetchingPosts));
        assert!(!CrawlState::FanningOut.can_transition_to(CrawlState::Done));
    }

    #[test]
    fn test_done_is_terminal() {
        assert!(CrawlState::Done.is_terminal());
        for state in CrawlState::all_states() {
            assert!(!CrawlState::Done.can_transition_to(state));
        }
    }

    #[test]
    fn test_is_active() {
        assert!(CrawlState::FetchingPosts.is_active());
        assert!(CrawlState::FanningOut.is_active());
        assert!(!CrawlState::Init.is_active());
        assert!(!CrawlState::Draining.is_active());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlState::FetchingPosts), "fetching_posts");
        assert_eq!(format!("{}", CrawlState::Done), "done");
    }
}
