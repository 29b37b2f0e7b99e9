//! Per-request authentication context.
//!
//! Token problems are captured in the context instead of failing the request,
//! so operations that do not need an identity still run with a stale or broken
//! token attached. They surface only through [`require_auth`].

use super::{
    token::{self, BearerClaims, TokenCodec},
    validity::{assess, Outcome},
    AuthError,
};
use crate::store::UserStore;
use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UserNotFound,
    MandatoryReset,
    Stale,
    BadSignature,
    Expired,
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthContext {
    NoTokenPresented,
    Authenticated { user_id: Uuid },
    Rejected { reason: RejectReason },
}

impl AuthContext {
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Authenticated { user_id } => Some(*user_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn rejection(&self) -> Option<RejectReason> {
        match self {
            Self::Rejected { reason } => Some(*reason),
            _ => None,
        }
    }
}

/// Pull the token out of an `Authorization` value; accepts a raw token or `Bearer <token>`.
///
/// A bare scheme word with nothing after it counts as no token at all.
#[must_use]
pub fn extract_token(header: Option<&str>) -> Option<&str> {
    let trimmed = header?.trim();
    let token = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if trimmed.eq_ignore_ascii_case("bearer") => "",
        _ => trimmed,
    };
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolve the `Authorization` header of a request into an [`AuthContext`].
///
/// # Errors
/// Returns an error only when the user store fails.
pub async fn resolve<S: UserStore>(
    header: Option<&str>,
    codec: &TokenCodec,
    store: &S,
    now: i64,
) -> Result<AuthContext> {
    let Some(token) = extract_token(header) else {
        return Ok(AuthContext::NoTokenPresented);
    };

    let claims: BearerClaims = match codec.verify(token, now) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("bearer token rejected: {err}");
            let reason = match err {
                token::Error::BadSignature => RejectReason::BadSignature,
                token::Error::Expired => RejectReason::Expired,
                token::Error::Malformed | token::Error::Key | token::Error::Json(_) => {
                    RejectReason::Malformed
                }
            };
            return Ok(AuthContext::Rejected { reason });
        }
    };

    let user = store.find_by_id(claims.id).await?;

    let context = match assess(&claims, user.as_ref()) {
        Outcome::Valid { user_id } => AuthContext::Authenticated { user_id },
        Outcome::NoUser => AuthContext::Rejected {
            reason: RejectReason::UserNotFound,
        },
        Outcome::MandatoryReset => AuthContext::Rejected {
            reason: RejectReason::MandatoryReset,
        },
        Outcome::Stale => AuthContext::Rejected {
            reason: RejectReason::Stale,
        },
    };

    if let AuthContext::Rejected { reason } = context {
        debug!(
            user_id = %claims.id,
            token_iat = claims.iat,
            last_valid_iat = ?user.as_ref().and_then(|u| u.last_valid_iat),
            "bearer token rejected: {reason:?}"
        );
    }

    Ok(context)
}

/// Guard used by handlers.
///
/// With `required` the caller must be authenticated; otherwise the guard never
/// fails and returns the identity when there is one.
///
/// # Errors
/// [`AuthError::NotSignedIn`] when no token was presented, or the rejection
/// reason mapped into [`AuthError`].
pub fn require_auth(context: &AuthContext, required: bool) -> Result<Option<Uuid>, AuthError> {
    match (context, required) {
        (AuthContext::Authenticated { user_id }, _) => Ok(Some(*user_id)),
        (_, false) => Ok(None),
        (AuthContext::NoTokenPresented, true) => Err(AuthError::NotSignedIn),
        (AuthContext::Rejected { reason }, true) => Err((*reason).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InsertOutcome, MemoryUserStore, NewUser};
    use secrecy::SecretString;

    const NOW: i64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(SecretString::from("secret".to_string()))
    }

    async fn registered(store: &MemoryUserStore, last_valid_iat: i64) -> Result<Uuid> {
        let outcome = store
            .insert(NewUser {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                last_valid_iat,
            })
            .await?;
        match outcome {
            InsertOutcome::Created(user) => Ok(user.id),
            InsertOutcome::Conflict => anyhow::bail!("unexpected conflict"),
        }
    }

    #[test]
    fn extract_token_variants() {
        assert_eq!(extract_token(None), None);
        assert_eq!(extract_token(Some("")), None);
        assert_eq!(extract_token(Some("Bearer ")), None);
        assert_eq!(extract_token(Some("abc")), Some("abc"));
        assert_eq!(extract_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_token(Some("bearer  abc ")), Some("abc"));
        assert_eq!(extract_token(Some("BEARER\tabc")), Some("abc"));
        assert_eq!(extract_token(Some("Bearer")), None);
        assert_eq!(extract_token(Some("  bearer  ")), None);
    }

    #[tokio::test]
    async fn bare_scheme_is_not_signed_in() -> Result<()> {
        let store = MemoryUserStore::new();
        let context = resolve(Some("Bearer "), &codec(), &store, NOW).await?;
        assert_eq!(context, AuthContext::NoTokenPresented);
        assert!(matches!(
            require_auth(&context, true),
            Err(AuthError::NotSignedIn)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn no_header_is_anonymous() -> Result<()> {
        let store = MemoryUserStore::new();
        let context = resolve(None, &codec(), &store, NOW).await?;
        assert_eq!(context, AuthContext::NoTokenPresented);
        assert!(matches!(
            require_auth(&context, true),
            Err(AuthError::NotSignedIn)
        ));
        assert!(matches!(require_auth(&context, false), Ok(None)));
        Ok(())
    }

    #[tokio::test]
    async fn valid_token_authenticates() -> Result<()> {
        let store = MemoryUserStore::new();
        let id = registered(&store, NOW).await?;
        let token = codec().sign_bearer(id, NOW)?;
        let context = resolve(Some(&token), &codec(), &store, NOW).await?;
        assert_eq!(context, AuthContext::Authenticated { user_id: id });
        assert!(matches!(require_auth(&context, true), Ok(Some(user)) if user == id));
        Ok(())
    }

    #[tokio::test]
    async fn token_before_threshold_is_stale() -> Result<()> {
        let store = MemoryUserStore::new();
        let id = registered(&store, NOW).await?;
        let token = codec().sign_bearer(id, NOW - 1)?;
        let header = format!("Bearer {token}");
        let context = resolve(Some(&header), &codec(), &store, NOW).await?;
        assert_eq!(context.rejection(), Some(RejectReason::Stale));
        assert!(matches!(require_auth(&context, true), Err(AuthError::Stale)));
        // anonymous-eligible operations still proceed
        assert!(matches!(require_auth(&context, false), Ok(None)));
        Ok(())
    }

    #[tokio::test]
    async fn forced_reset_rejects_every_token() -> Result<()> {
        let store = MemoryUserStore::new();
        let id = registered(&store, NOW).await?;
        store.require_reset("a@x.com").await?;
        let token = codec().sign_bearer(id, NOW + 1_000)?;
        let context = resolve(Some(&token), &codec(), &store, NOW).await?;
        assert_eq!(context.rejection(), Some(RejectReason::MandatoryReset));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_and_foreign_signature() -> Result<()> {
        let store = MemoryUserStore::new();
        let token = codec().sign_bearer(Uuid::new_v4(), NOW)?;
        let context = resolve(Some(&token), &codec(), &store, NOW).await?;
        assert_eq!(context.rejection(), Some(RejectReason::UserNotFound));

        let other = TokenCodec::new(SecretString::from("rotated".to_string()));
        let context = resolve(Some(&token), &other, &store, NOW).await?;
        assert_eq!(context.rejection(), Some(RejectReason::BadSignature));

        let context = resolve(Some("garbage"), &codec(), &store, NOW).await?;
        assert_eq!(context.rejection(), Some(RejectReason::Malformed));
        Ok(())
    }
}
