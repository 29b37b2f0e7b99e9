use super::{authorization, ErrorBody};
use crate::{
    accounts::{Account, Accounts},
    auth::{token::now_unix_seconds, AuthError},
    email::EmailSender,
    store::UserStore,
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/user/register",
    request_body = Credentials,
    responses (
        (status = 201, description = "Registration successful", body = Account, content_type = "application/json"),
        (status = 401, description = "Missing or invalid email or password", body = ErrorBody),
        (status = 409, description = "User with the specified email already exists", body = ErrorBody),
    ),
    tag= "user"
)]
#[instrument(skip(headers, accounts))]
pub async fn register<S: UserStore + 'static, M: EmailSender + 'static>(
    headers: HeaderMap,
    accounts: Extension<Arc<Accounts<S, M>>>,
    payload: Option<Json<Credentials>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(credentials)) = payload else {
        return Err(AuthError::MissingCredentials);
    };

    let now = now_unix_seconds();
    let context = accounts.resolve(authorization(&headers), now).await?;
    let account = accounts
        .register(&context, &credentials.email, &credentials.password, now)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}
