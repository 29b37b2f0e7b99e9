use super::{authorization, register::Credentials, ErrorBody};
use crate::{
    accounts::{Account, Accounts},
    auth::{token::now_unix_seconds, AuthError},
    email::EmailSender,
    store::UserStore,
};
use axum::{extract::Extension, http::HeaderMap, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path= "/user/sign-in",
    request_body = Credentials,
    responses (
        (status = 200, description = "Sign in successful", body = Account, content_type = "application/json"),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
    ),
    tag= "user"
)]
#[instrument(skip(headers, accounts))]
pub async fn sign_in<S: UserStore + 'static, M: EmailSender + 'static>(
    headers: HeaderMap,
    accounts: Extension<Arc<Accounts<S, M>>>,
    payload: Option<Json<Credentials>>,
) -> Result<Json<Account>, AuthError> {
    let Some(Json(credentials)) = payload else {
        return Err(AuthError::MissingCredentials);
    };

    let now = now_unix_seconds();
    let context = accounts.resolve(authorization(&headers), now).await?;

    accounts
        .sign_in(&context, &credentials.email, &credentials.password, now)
        .await
        .map(Json)
}
