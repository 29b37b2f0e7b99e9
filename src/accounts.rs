//! Account operations exposed to request handlers.
//!
//! Every operation takes the current time in epoch seconds so token issue
//! times stay deterministic under test.

use crate::{
    auth::{
        password::{hash_password, verify_password},
        require_auth, reset, resolve,
        utils::{normalize_email, valid_email},
        AuthConfig, AuthContext, AuthError, TokenCodec,
    },
    email::EmailSender,
    store::{InsertOutcome, NewUser, UserRecord, UserStore},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

/// User-shaped response: the record plus a freshly signed bearer token.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct Accounts<S, M> {
    codec: TokenCodec,
    store: S,
    mailer: M,
    config: AuthConfig,
}

impl<S: UserStore, M: EmailSender> Accounts<S, M> {
    #[must_use]
    pub fn new(codec: TokenCodec, store: S, mailer: M, config: AuthConfig) -> Self {
        Self {
            codec,
            store,
            mailer,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the `Authorization` header of a request.
    ///
    /// # Errors
    /// Only store failures.
    pub async fn resolve(&self, header: Option<&str>, now: i64) -> Result<AuthContext, AuthError> {
        Ok(resolve(header, &self.codec, &self.store, now).await?)
    }

    /// The `token` field of every user-shaped response.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn account_view(&self, user: &UserRecord, now: i64) -> Result<Account, AuthError> {
        Ok(Account {
            id: user.id,
            email: user.email.clone(),
            token: self.codec.sign_bearer(user.id, now)?,
        })
    }

    /// # Errors
    /// `MissingCredentials` for empty fields or an invalid email,
    /// `AlreadyRegistered` when the email is taken.
    pub async fn register(
        &self,
        context: &AuthContext,
        email: &str,
        password: &str,
        now: i64,
    ) -> Result<Account, AuthError> {
        require_auth(context, false)?;

        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() || !valid_email(&email) {
            return Err(AuthError::MissingCredentials);
        }

        let user = NewUser {
            email,
            password_hash: hash_password(password)?,
            last_valid_iat: now,
        };

        match self.store.insert(user).await? {
            InsertOutcome::Created(user) => {
                info!(user_id = %user.id, "user registered");
                self.account_view(&user, now)
            }
            InsertOutcome::Conflict => Err(AuthError::AlreadyRegistered),
        }
    }

    /// # Errors
    /// `MissingCredentials` for empty fields, `InvalidCredentials` for an
    /// unknown email or a wrong password.
    pub async fn sign_in(
        &self,
        context: &AuthContext,
        email: &str,
        password: &str,
        now: i64,
    ) -> Result<Account, AuthError> {
        require_auth(context, false)?;

        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let Some(user) = self.store.find_by_email(&email).await? else {
            debug!("sign in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "sign in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.account_view(&user, now)
    }

    /// Always `true` unless the store fails.
    ///
    /// # Errors
    /// Store or signing failures.
    pub async fn request_password_reset(
        &self,
        context: &AuthContext,
        email: &str,
        now: i64,
    ) -> Result<bool, AuthError> {
        require_auth(context, false)?;
        reset::request_reset(&self.store, &self.mailer, &self.codec, &self.config, email, now)
            .await?;
        Ok(true)
    }

    /// `true` once the emailed token has been accepted as authentic.
    ///
    /// # Errors
    /// Missing password, forged or corrupt emailed token, store failures.
    pub async fn reset_password(
        &self,
        context: &AuthContext,
        token: &str,
        new_password: &str,
        now: i64,
    ) -> Result<bool, AuthError> {
        require_auth(context, false)?;
        reset::reset_password(&self.store, &self.codec, token, new_password, now).await?;
        Ok(true)
    }

    /// The signed-in user's account.
    ///
    /// # Errors
    /// Any rejection of the presented token, or `UserNotFound` if the account
    /// disappeared since the context was resolved.
    pub async fn account(&self, context: &AuthContext, now: i64) -> Result<Account, AuthError> {
        let Some(user_id) = require_auth(context, true)? else {
            return Err(AuthError::NotSignedIn);
        };

        match self.store.find_by_id(user_id).await? {
            Some(user) => self.account_view(&user, now),
            None => Err(AuthError::UserNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{email::LogEmailSender, store::MemoryUserStore};
    use anyhow::Result;
    use secrecy::SecretString;

    const NOW: i64 = 1_700_000_000;

    fn accounts() -> Accounts<MemoryUserStore, LogEmailSender> {
        Accounts::new(
            TokenCodec::new(SecretString::from("secret".to_string())),
            MemoryUserStore::new(),
            LogEmailSender,
            AuthConfig::default(),
        )
    }

    #[tokio::test]
    async fn register_then_sign_in() -> Result<()> {
        let accounts = accounts();
        let anon = AuthContext::NoTokenPresented;
        let created = accounts.register(&anon, "A@x.com", "pw1", NOW).await?;
        assert_eq!(created.email, "a@x.com");

        let signed_in = accounts.sign_in(&anon, "a@x.com", "pw1", NOW + 1).await?;
        assert_eq!(signed_in.id, created.id);

        let context = accounts.resolve(Some(&signed_in.token), NOW + 2).await?;
        let account = accounts.account(&context, NOW + 2).await?;
        assert_eq!(account.id, created.id);
        Ok(())
    }

    #[tokio::test]
    async fn register_validates_input() -> Result<()> {
        let accounts = accounts();
        let anon = AuthContext::NoTokenPresented;
        for (email, password) in [("", "pw"), ("a@x.com", ""), ("not-an-email", "pw")] {
            assert!(matches!(
                accounts.register(&anon, email, password, NOW).await,
                Err(AuthError::MissingCredentials)
            ));
        }
        accounts.register(&anon, "a@x.com", "pw", NOW).await?;
        assert!(matches!(
            accounts.register(&anon, "a@x.com", "pw", NOW).await,
            Err(AuthError::AlreadyRegistered)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_failures() -> Result<()> {
        let accounts = accounts();
        let anon = AuthContext::NoTokenPresented;
        accounts.register(&anon, "a@x.com", "pw1", NOW).await?;

        assert!(matches!(
            accounts.sign_in(&anon, "a@x.com", "wrong", NOW).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.sign_in(&anon, "b@x.com", "pw1", NOW).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.sign_in(&anon, "a@x.com", "", NOW).await,
            Err(AuthError::MissingCredentials)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_operations_ignore_a_broken_token() -> Result<()> {
        let accounts = accounts();
        let context = accounts.resolve(Some("garbage"), NOW).await?;
        assert!(context.rejection().is_some());

        accounts.register(&context, "a@x.com", "pw1", NOW).await?;
        accounts.sign_in(&context, "a@x.com", "pw1", NOW).await?;
        assert!(accounts.request_password_reset(&context, "a@x.com", NOW).await?);
        assert!(matches!(
            accounts.account(&context, NOW).await,
            Err(AuthError::MalformedToken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn request_reset_is_true_for_unknown_email() -> Result<()> {
        let accounts = accounts();
        let anon = AuthContext::NoTokenPresented;
        accounts.register(&anon, "a@x.com", "pw1", NOW).await?;
        assert!(accounts.request_password_reset(&anon, "a@x.com", NOW).await?);
        assert!(accounts.request_password_reset(&anon, "nobody@x.com", NOW).await?);
        Ok(())
    }

    #[tokio::test]
    async fn force_reset_locks_out_existing_tokens() -> Result<()> {
        let accounts = accounts();
        let anon = AuthContext::NoTokenPresented;
        let created = accounts.register(&anon, "a@x.com", "pw1", NOW).await?;

        assert!(accounts.store().require_reset("a@x.com").await?);
        let context = accounts.resolve(Some(&created.token), NOW + 1).await?;
        assert!(matches!(
            accounts.account(&context, NOW + 1).await,
            Err(AuthError::MandatoryReset)
        ));
        Ok(())
    }
}
