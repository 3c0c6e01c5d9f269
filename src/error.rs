//! Error kinds surfaced by the server core

/// Errors returned by the auth core, the stores, the resolver and handlers.
///
/// Orchestration code (startup, sync passes, the scheduler) keeps using
/// `anyhow` and only converts at the edges.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // authentication
    #[error("user not found")]
    UserNotFound,
    #[error("key mismatch")]
    KeyMismatch,
    #[error("missing totp")]
    MissingTotp,
    #[error("passcode required")]
    PasscodeRequired,
    #[error("invalid passcode")]
    InvalidPasscode,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid token method")]
    InvalidTokenMethod,
    #[error("invalid token issuer")]
    InvalidTokenIssuer,
    #[error("invalid token claims")]
    InvalidTokenClaims,
    #[error("invalid token audience")]
    InvalidTokenAudience,
    #[error("invalid token subject")]
    InvalidTokenSubject,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token secret")]
    InvalidTokenSecret,
    #[error("code not found")]
    CodeNotFound,
    #[error("code expired")]
    CodeExpired,
    #[error("code already used")]
    CodeAlreadyUsed,

    // resources
    #[error("{0} not found")]
    NotFound(&'static str),

    // validation
    #[error("invalid uuid")]
    InvalidUuid,
    #[error("invalid content")]
    InvalidContent,
    #[error("missing title")]
    MissingTitle,
    #[error("missing parameter {0}")]
    MissingParameter(String),
    #[error("invalid parameter {0}")]
    InvalidParameter(String),
    #[error("invalid offset")]
    InvalidOffset,
    #[error("password too weak")]
    WeakPassword,
    #[error("user already exists")]
    UserExists,

    // authorization
    #[error("access denied")]
    AccessDenied,
    #[error("access denied")]
    AccessDeniedRedirect,

    // ingestion
    #[error("duplicate found")]
    DuplicateFound,
    #[error("invalid episode")]
    InvalidEpisode,
    #[error("release type not found")]
    ReleaseTypeNotFound,

    // progress
    #[error("offset too old")]
    OffsetTooOld,
    #[error("offset same")]
    OffsetSame,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for the progress outcomes that callers accept as idempotent success.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Error::OffsetTooOld | Error::OffsetSame | Error::DuplicateFound
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::UserNotFound)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Error::TokenExpired,
            ErrorKind::InvalidIssuer => Error::InvalidTokenIssuer,
            ErrorKind::InvalidAudience => Error::InvalidTokenAudience,
            ErrorKind::InvalidSubject => Error::InvalidTokenSubject,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Error::InvalidTokenMethod
            }
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) => Error::InvalidTokenSecret,
            _ => Error::InvalidTokenClaims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_outcomes() {
        assert!(Error::OffsetSame.is_benign());
        assert!(Error::OffsetTooOld.is_benign());
        assert!(!Error::InvalidOffset.is_benign());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(Error::NotFound("track").to_string(), "track not found");
        assert!(Error::NotFound("movie").is_not_found());
    }
}
