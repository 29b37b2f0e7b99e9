//! # Passage (email/password accounts)
//!
//! `passage` registers users by email and password, signs them in with
//! stateless bearer tokens, and lets them reset a forgotten password through an
//! emailed link.
//!
//! ## Revocation without sessions
//!
//! Each user row carries `last_valid_iat`. A bearer token is accepted only when
//! its `iat` is at or after that threshold, so a password change signs out every
//! other device. A `NULL` threshold means the user must reset before any token
//! is accepted again.
//!
//! ## Single-use reset links
//!
//! The reset token is signed with a key derived from the user's current password
//! hash and creation time. Changing the password burns every outstanding link,
//! and issuing a new link supersedes the older ones through `reset_last_iat`.

pub mod accounts;
pub mod auth;
pub mod cli;
pub mod email;
pub mod passage;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
