use thiserror::Error;

/// Conditions the callers branch on. They travel inside `anyhow::Error` and
/// are recovered with `downcast_ref::<Error>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("too many requests")]
    RateLimited,

    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Message the judge rendered in place of the requested content.
    #[error("{0}")]
    JudgeMessage(String),

    #[error("unsupported language: {0}")]
    Unsupported(String),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("not logged in or session expired")]
    SessionExpired,

    #[error("runtime error: {0}")]
    RuntimeFailure(String),
}

impl Error {
    pub fn of(err: &anyhow::Error) -> Option<&Error> {
        err.downcast_ref::<Error>()
    }
}

pub fn is_rate_limited(err: &anyhow::Error) -> bool {
    matches!(Error::of(err), Some(Error::RateLimited))
}

pub fn is_session_expired(err: &anyhow::Error) -> bool {
    matches!(Error::of(err), Some(Error::SessionExpired))
}
