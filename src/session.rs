use crate::recurrence::FailurePolicy;

/// Credentials of the logged-in user, handed to every call that talks to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user_id: Option<i64>,
}

impl Session {
    pub fn bearer(token: impl Into<String>, user_id: i64) -> Self {
        Self {
            token: Some(token.into()),
            user_id: Some(user_id),
        }
    }

    /// No credentials; only the public lesson listing accepts it.
    pub fn anonymous() -> Self {
        Self {
            token: None,
            user_id: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}

/// What the current user may do. Teachers work on their own calendar; admins
/// may be allowed to delete lessons or move them to another teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Teacher,
    Admin { can_delete: bool, can_reassign: bool },
}

impl Mode {
    pub fn can_delete(&self) -> bool {
        matches!(self, Mode::Admin { can_delete: true, .. })
    }

    pub fn can_reassign(&self) -> bool {
        matches!(self, Mode::Admin { can_reassign: true, .. })
    }

    /// Teachers keep going past a failed occurrence; admins stop at the first one.
    pub fn default_failure_policy(&self) -> FailurePolicy {
        match self {
            Mode::Teacher => FailurePolicy::ContinueOnError,
            Mode::Admin { .. } => FailurePolicy::AbortOnError,
        }
    }
}
