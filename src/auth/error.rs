use super::{context::RejectReason, token};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("no user found for token")]
    UserNotFound,
    #[error("password reset required")]
    MandatoryReset,
    #[error("token issued before the last credential change")]
    Stale,
    #[error("a newer password reset has been requested")]
    SupersededReset,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email and password are required")]
    MissingCredentials,
    #[error("no token presented")]
    NotSignedIn,
    #[error("user already exists")]
    AlreadyRegistered,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Message safe to return to clients; detailed reasons stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NotSignedIn => "Please sign in",
            Self::InvalidCredentials => "Invalid email or password",
            Self::MissingCredentials => "Please submit an email and password",
            Self::AlreadyRegistered => "User already exists",
            Self::Internal(_) => "Internal server error",
            Self::MalformedToken
            | Self::BadSignature
            | Self::Expired
            | Self::UserNotFound
            | Self::MandatoryReset
            | Self::Stale
            | Self::SupersededReset => "Clear credentials and sign in again",
        }
    }
}

impl From<token::Error> for AuthError {
    fn from(err: token::Error) -> Self {
        match err {
            token::Error::Malformed => Self::MalformedToken,
            token::Error::BadSignature => Self::BadSignature,
            token::Error::Expired => Self::Expired,
            token::Error::Key | token::Error::Json(_) => Self::Internal(err.into()),
        }
    }
}

impl From<RejectReason> for AuthError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::UserNotFound => Self::UserNotFound,
            RejectReason::MandatoryReset => Self::MandatoryReset,
            RejectReason::Stale => Self::Stale,
            RejectReason::BadSignature => Self::BadSignature,
            RejectReason::Expired => Self::Expired,
            RejectReason::Malformed => Self::MalformedToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_map_to_taxonomy() {
        assert!(matches!(
            AuthError::from(token::Error::Malformed),
            AuthError::MalformedToken
        ));
        assert!(matches!(
            AuthError::from(token::Error::BadSignature),
            AuthError::BadSignature
        ));
        assert!(matches!(
            AuthError::from(token::Error::Expired),
            AuthError::Expired
        ));
        assert!(matches!(
            AuthError::from(token::Error::Key),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn rejections_share_one_public_message() {
        let messages: Vec<&str> = [
            RejectReason::UserNotFound,
            RejectReason::MandatoryReset,
            RejectReason::Stale,
            RejectReason::BadSignature,
            RejectReason::Expired,
            RejectReason::Malformed,
        ]
        .into_iter()
        .map(|reason| AuthError::from(reason).public_message())
        .collect();
        assert!(messages.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(AuthError::NotSignedIn.public_message(), "Please sign in");
    }
}
