use super::{authorization, ErrorBody};
use crate::{
    accounts::Accounts,
    auth::{token::now_unix_seconds, AuthError},
    email::EmailSender,
    store::UserStore,
};
use axum::{extract::Extension, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

#[utoipa::path(
    post,
    path= "/user/password-reset",
    request_body = PasswordResetRequest,
    responses (
        (status = 200, description = "Reset email queued if the account exists", body = bool),
    ),
    tag= "user"
)]
#[instrument(skip(headers, accounts))]
pub async fn request_password_reset<S: UserStore + 'static, M: EmailSender + 'static>(
    headers: HeaderMap,
    accounts: Extension<Arc<Accounts<S, M>>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> Result<Json<bool>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingCredentials);
    };

    let now = now_unix_seconds();
    let context = accounts.resolve(authorization(&headers), now).await?;

    accounts
        .request_password_reset(&context, &request.email, now)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path= "/user/password-reset/confirm",
    request_body = PasswordResetConfirm,
    responses (
        (status = 200, description = "Reset token accepted", body = bool),
        (status = 401, description = "Missing password or forged token", body = ErrorBody),
    ),
    tag= "user"
)]
#[instrument(skip_all)]
pub async fn confirm_password_reset<S: UserStore + 'static, M: EmailSender + 'static>(
    headers: HeaderMap,
    accounts: Extension<Arc<Accounts<S, M>>>,
    payload: Option<Json<PasswordResetConfirm>>,
) -> Result<Json<bool>, AuthError> {
    let Some(Json(confirm)) = payload else {
        return Err(AuthError::MissingCredentials);
    };

    let now = now_unix_seconds();
    let context = accounts.resolve(authorization(&headers), now).await?;

    accounts
        .reset_password(&context, &confirm.token, &confirm.new_password, now)
        .await
        .map(Json)
}
