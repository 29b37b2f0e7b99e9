use super::{authorization, ErrorBody};
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
    get,
    path= "/user/account",
    responses (
        (status = 200, description = "The signed-in user", body = Account, content_type = "application/json"),
        (status = 401, description = "Missing, stale or invalid bearer token", body = ErrorBody),
    ),
    tag= "user"
)]
#[instrument(skip_all)]
pub async fn account<S: UserStore + 'static, M: EmailSender + 'static>(
    headers: HeaderMap,
    accounts: Extension<Arc<Accounts<S, M>>>,
) -> Result<Json<Account>, AuthError> {
    let now = now_unix_seconds();
    let context = accounts.resolve(authorization(&headers), now).await?;

    accounts.account(&context, now).await.map(Json)
}
