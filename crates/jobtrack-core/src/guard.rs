use crate::session::{Identity, SessionManager, SessionState};

/// Outcome of gating the authenticated view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Session still bootstrapping. Not a denial; ask again later.
    Deferred,
    Granted(Identity),
    Denied,
}

pub fn check(session: &SessionManager) -> Access {
    match session.state() {
        SessionState::Bootstrapping => Access::Deferred,
        SessionState::Authenticated(identity) => Access::Granted(identity),
        SessionState::Anonymous => Access::Denied,
    }
}
