use std::fmt;

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unopened,
    Open,
    Committed,
    RolledBack,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unopened => "unopened",
            SessionState::Open => "open",
            SessionState::Committed => "committed",
            SessionState::RolledBack => "rolled_back",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How an open session is settled on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Commit,
    Rollback,
}

/// Tracks the one legal path through the session states:
/// `unopened -> open -> (committed | rolled_back) -> closed`.
///
/// Transitions are driven only by the session types in this crate. Each one is
/// taken at most once; the debug assertions catch any code path that would
/// take a second one.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: SessionState,
    resolution: Option<Resolution>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The decision taken on release, once one has been taken.
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub(crate) fn open(&mut self) {
        debug_assert_eq!(self.state, SessionState::Unopened);
        self.state = SessionState::Open;
    }

    pub(crate) fn resolve(&mut self, resolution: Resolution) {
        debug_assert_eq!(self.state, SessionState::Open);
        debug_assert!(self.resolution.is_none());
        self.state = match resolution {
            Resolution::Commit => SessionState::Committed,
            Resolution::Rollback => SessionState::RolledBack,
        };
        self.resolution = Some(resolution);
    }

    pub(crate) fn close(&mut self) {
        debug_assert!(matches!(
            self.state,
            SessionState::Committed | SessionState::RolledBack
        ));
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_path() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), SessionState::Unopened);

        lifecycle.open();
        assert_eq!(lifecycle.state(), SessionState::Open);

        lifecycle.resolve(Resolution::Commit);
        assert_eq!(lifecycle.state(), SessionState::Committed);

        lifecycle.close();
        assert_eq!(lifecycle.state(), SessionState::Closed);
        assert_eq!(lifecycle.resolution(), Some(Resolution::Commit));
    }

    #[test]
    fn rollback_path_remembers_the_decision() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.open();
        lifecycle.resolve(Resolution::Rollback);
        assert_eq!(lifecycle.state(), SessionState::RolledBack);
        lifecycle.close();
        assert_eq!(lifecycle.resolution(), Some(Resolution::Rollback));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn resolving_twice_is_caught() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.open();
        lifecycle.resolve(Resolution::Commit);
        lifecycle.resolve(Resolution::Rollback);
    }

    #[test]
    fn states_display_in_snake_case() {
        assert_eq!(SessionState::RolledBack.to_string(), "rolled_back");
        assert_eq!(SessionState::Unopened.to_string(), "unopened");
    }
}
