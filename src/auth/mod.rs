//! Authentication core.
//!
//! ## Bearer tokens
//!
//! Bearer tokens are HS256 tokens over `{id, iat}` signed with one process-wide
//! secret. They carry no expiry. A token is revoked when the user's
//! `last_valid_iat` moves past its `iat`, which happens on every password
//! change; setting `last_valid_iat` to `NULL` forces a reset for every holder.
//! No session table is kept.
//!
//! ## Password reset
//!
//! See [`reset`]: an inner token bound to the current password hash and
//! creation time, wrapped in an emailed outer token.
//!
//! > **Warning:** Rotating the process secret invalidates every outstanding
//! > bearer token and every emailed reset link.

pub mod context;
mod error;
pub mod password;
pub mod reset;
mod state;
pub mod token;
pub(crate) mod utils;
pub mod validity;

pub use context::{require_auth, resolve, AuthContext, RejectReason};
pub use error::AuthError;
pub use state::{AuthConfig, DEFAULT_RESET_TTL_SECONDS};
pub use token::TokenCodec;
