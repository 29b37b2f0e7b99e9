//! Two-layer password reset.
//!
//! The inner token is signed with `password_hash-created_at`, so it dies as
//! soon as the password changes, and expires after the configured TTL. The
//! outer token, signed with the process secret, carries the user id and the
//! inner token through the email link. Only the inner token's `iat` is stored
//! (`reset_last_iat`), which makes every older reset token unredeemable.
//!
//! Both operations report success to the caller whether or not an account
//! matched, so they cannot be used to enumerate accounts.

use super::{
    password::hash_password,
    state::AuthConfig,
    token::{
        self, derived_reset_secret, sign_with_secret, EmailedResetClaims, ResetClaims, TokenCodec,
    },
    utils::normalize_email,
    AuthError,
};
use crate::{
    email::{EmailMessage, EmailSender},
    store::{UserRecord, UserStore},
};
use tracing::{debug, error, info, warn};

/// An emailed reset token and the `iat` of the inner token it wraps.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub token: String,
    pub iat: i64,
}

/// Build the nested reset tokens for `user`.
///
/// # Errors
/// Returns an error if signing fails.
pub fn issue(
    codec: &TokenCodec,
    user: &UserRecord,
    ttl_seconds: i64,
    now: i64,
) -> Result<IssuedReset, token::Error> {
    let secret = derived_reset_secret(&user.password_hash, &user.created_at);
    let inner = ResetClaims {
        id: user.id,
        iat: now,
        exp: now.saturating_add(ttl_seconds),
    };
    let inner_token = sign_with_secret(&inner, secret.as_bytes())?;

    let outer = codec.sign(&EmailedResetClaims {
        id: user.id,
        token: inner_token,
        iat: now,
    })?;

    Ok(IssuedReset {
        token: outer,
        iat: inner.iat,
    })
}

/// Check an inner reset token against the user's current state.
///
/// # Errors
/// - `BadSignature`/`Expired`/`MalformedToken` from the derived-secret check,
/// - `SupersededReset` if a newer reset was issued,
/// - `UserNotFound` if the inner payload names a different user.
pub fn redeemable(
    inner_token: &str,
    user: &UserRecord,
    now: i64,
) -> Result<ResetClaims, AuthError> {
    let secret = derived_reset_secret(&user.password_hash, &user.created_at);
    let claims: ResetClaims = token::verify(inner_token, secret.as_bytes(), now)?;

    if user.reset_last_iat.is_some_and(|last| last > claims.iat) {
        return Err(AuthError::SupersededReset);
    }

    if claims.id != user.id {
        return Err(AuthError::UserNotFound);
    }

    Ok(claims)
}

/// Issue a reset for `email` and deliver it.
///
/// # Errors
/// Only store or signing failures; an unknown email is not an error and email
/// delivery failures are logged.
pub async fn request_reset<S: UserStore, M: EmailSender>(
    store: &S,
    mailer: &M,
    codec: &TokenCodec,
    config: &AuthConfig,
    email: &str,
    now: i64,
) -> Result<(), AuthError> {
    let email = normalize_email(email);

    let Some(user) = store.find_by_email(&email).await? else {
        debug!("password reset requested for unknown email");
        return Ok(());
    };

    let issued = issue(codec, &user, config.reset_token_ttl_seconds(), now)?;
    store.record_reset_issued(user.id, issued.iat).await?;

    let message = EmailMessage::password_reset(
        &user.email,
        config.email_from(),
        &config.reset_url(&issued.token),
    );
    if let Err(err) = mailer.send(&message).await {
        error!(user_id = %user.id, "failed to send password reset email: {err:#}");
    }

    info!(user_id = %user.id, reset_iat = issued.iat, "password reset issued");

    Ok(())
}

/// Redeem an emailed reset token and set `new_password`.
///
/// # Errors
/// Failures before the user lookup (missing password, forged or corrupt outer
/// token) and store failures. Everything after the lookup is logged and
/// reported as success.
pub async fn reset_password<S: UserStore>(
    store: &S,
    codec: &TokenCodec,
    emailed_token: &str,
    new_password: &str,
    now: i64,
) -> Result<(), AuthError> {
    if new_password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let outer: EmailedResetClaims = codec.verify(emailed_token, now)?;

    let Some(user) = store.find_by_id(outer.id).await? else {
        debug!(user_id = %outer.id, "password reset for unknown user");
        return Ok(());
    };

    let claims = match redeemable(&outer.token, &user, now) {
        Ok(claims) => claims,
        Err(AuthError::Internal(err)) => return Err(AuthError::Internal(err)),
        Err(err) => {
            warn!(user_id = %user.id, "password reset refused: {err}");
            return Ok(());
        }
    };

    let new_hash = hash_password(new_password)?;
    let applied = store
        .complete_reset(user.id, &user.password_hash, &new_hash, claims.iat)
        .await?;

    if applied {
        info!(user_id = %user.id, last_valid_iat = claims.iat, "password reset completed");
    } else {
        warn!(user_id = %user.id, "password reset lost a race with a concurrent update");
    }

    Ok(())
}
