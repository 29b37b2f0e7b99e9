pub mod health;
pub use self::health::health;

pub mod register;
pub use self::register::register;

pub mod sign_in;
pub use self::sign_in::sign_in;

pub mod password_reset;
pub use self::password_reset::{confirm_password_reset, request_password_reset};

pub mod account;
pub use self::account::account;

// common functions for the handlers
use crate::auth::AuthError;
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AlreadyRegistered => StatusCode::CONFLICT,
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };

        if status != StatusCode::INTERNAL_SERVER_ERROR {
            debug!(reason = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.public_message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// The raw `Authorization` header, if it is valid UTF-8.
pub fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}
