#![allow(clippy::needless_for_each)]

use crate::{
    accounts::{Account, Accounts},
    auth::{AuthConfig, TokenCodec},
    email::{EmailSender, Mailer},
    passage::handlers::{
        health, password_reset::PasswordResetConfirm, password_reset::PasswordResetRequest,
        register::Credentials, ErrorBody,
    },
    store::{PgUserStore, UserStore},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

pub type AppAccounts = Accounts<PgUserStore, Mailer>;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::sign_in::sign_in,
        handlers::password_reset::request_password_reset,
        handlers::password_reset::confirm_password_reset,
        handlers::account::account,
    ),
    components(schemas(
        health::Health,
        Account,
        Credentials,
        PasswordResetRequest,
        PasswordResetConfirm,
        ErrorBody
    )),
    tags(
        (name = "passage", description = "Email and password accounts API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Connect to the database.
/// # Errors
/// Return error if the pool cannot connect
pub async fn connect(dsn: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")
}

/// The `/user` routes with request-id, tracing and CORS layers.
pub fn router<S, M>(accounts: Arc<Accounts<S, M>>) -> Router
where
    S: UserStore + 'static,
    M: EmailSender + 'static,
{
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .route("/user/register", post(handlers::register::<S, M>))
        .route("/user/sign-in", post(handlers::sign_in::<S, M>))
        .route(
            "/user/password-reset",
            post(handlers::request_password_reset::<S, M>),
        )
        .route(
            "/user/password-reset/confirm",
            post(handlers::confirm_password_reset::<S, M>),
        )
        .route("/user/account", get(handlers::account::<S, M>))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(accounts)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    codec: TokenCodec,
    mailer: Mailer,
    config: AuthConfig,
) -> Result<()> {
    let pool = connect(&dsn).await?;

    let accounts: Arc<AppAccounts> = Arc::new(Accounts::new(
        codec,
        PgUserStore::new(pool.clone()),
        mailer,
        config,
    ));

    let app = router(accounts)
        .route("/health", get(handlers::health).options(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi()))
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
