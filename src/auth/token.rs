//! HS256 token codec for bearer and password-reset tokens.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, base64url without
//! padding). The signature is checked over the exact signing input before any
//! claim is parsed, so a modified token never decodes through `verify`.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use std::time::SystemTime;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";
const TYP: &str = "JWT";

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    Key,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        }
    }
}

/// Claims carried by a signed token.
pub trait Claims: Serialize + DeserializeOwned {
    fn issued_at(&self) -> i64;

    /// Absolute expiry in epoch seconds, if the token has one.
    fn expires_at(&self) -> Option<i64> {
        None
    }
}

/// Identity asserted on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BearerClaims {
    pub id: Uuid,
    pub iat: i64,
}

impl Claims for BearerClaims {
    fn issued_at(&self) -> i64 {
        self.iat
    }
}

/// Inner reset token, signed with a secret derived from the user's current
/// password hash and creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResetClaims {
    pub id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims for ResetClaims {
    fn issued_at(&self) -> i64 {
        self.iat
    }

    fn expires_at(&self) -> Option<i64> {
        Some(self.exp)
    }
}

/// Outer reset token delivered by email; wraps the inner token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EmailedResetClaims {
    pub id: Uuid,
    pub token: String,
    pub iat: i64,
}

impl Claims for EmailedResetClaims {
    fn issued_at(&self) -> i64 {
        self.iat
    }
}

/// Signs and verifies tokens; holds the process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: SecretString,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn process_secret(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }

    /// Sign a bearer token for `user_id` issued at `now`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be serialized.
    pub fn sign_bearer(&self, user_id: Uuid, now: i64) -> Result<String, Error> {
        sign_with_secret(&BearerClaims { id: user_id, iat: now }, self.process_secret())
    }

    /// Sign any claims with the process-wide secret.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be serialized.
    pub fn sign<C: Claims>(&self, claims: &C) -> Result<String, Error> {
        sign_with_secret(claims, self.process_secret())
    }

    /// Verify a token signed with the process-wide secret.
    ///
    /// # Errors
    /// See [`verify`].
    pub fn verify<C: Claims>(&self, token: &str, now: i64) -> Result<C, Error> {
        verify(token, self.process_secret(), now)
    }
}

/// Secret for the inner reset token: `password_hash ++ "-" ++ created_at`.
#[must_use]
pub fn derived_reset_secret(password_hash: &str, created_at: &str) -> String {
    format!("{password_hash}-{created_at}")
}

#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: DeserializeOwned>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| Error::Malformed)
}

fn split(token: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = token.trim().split('.');
    let header = parts.next().ok_or(Error::Malformed)?;
    let claims = parts.next().ok_or(Error::Malformed)?;
    let signature = parts.next().ok_or(Error::Malformed)?;
    if parts.next().is_some() || header.is_empty() || claims.is_empty() {
        return Err(Error::Malformed);
    }
    Ok((header, claims, signature))
}

fn mac(secret: &[u8], signing_input: &str) -> Result<HmacSha256, Error> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::Key)?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

/// Sign `claims` with an arbitrary secret.
///
/// # Errors
/// Returns an error if the claims cannot be serialized.
pub fn sign_with_secret<C: Claims>(claims: &C, secret: &[u8]) -> Result<String, Error> {
    let header_b64 = b64e_json(&Header::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signature = mac(secret, &signing_input)?.finalize().into_bytes();
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Parse a token's claims without checking the signature.
///
/// # Errors
/// Returns [`Error::Malformed`] when the token is not three segments, the
/// header is not HS256, or the claims do not match `C` exactly.
pub fn decode<C: Claims>(token: &str) -> Result<C, Error> {
    let (header_b64, claims_b64, _) = split(token)?;
    let header: Header = b64d_json(header_b64)?;
    if header != Header::hs256() {
        return Err(Error::Malformed);
    }
    b64d_json(claims_b64)
}

/// Verify the signature and expiry of a token and return its claims.
///
/// A token is accepted up to and including its `exp` second.
///
/// # Errors
/// - [`Error::Malformed`] for structurally invalid tokens,
/// - [`Error::BadSignature`] when the HMAC does not match `secret`,
/// - [`Error::Expired`] when `now` is past `exp`.
pub fn verify<C: Claims>(token: &str, secret: &[u8], now: i64) -> Result<C, Error> {
    let (header_b64, claims_b64, signature_b64) = split(token)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signature =
        Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| Error::BadSignature)?;
    mac(secret, &signing_input)?
        .verify_slice(&signature)
        .map_err(|_| Error::BadSignature)?;

    let header: Header = b64d_json(header_b64)?;
    if header != Header::hs256() {
        return Err(Error::Malformed);
    }

    let claims: C = b64d_json(claims_b64)?;
    if claims.expires_at().is_some_and(|exp| now > exp) {
        return Err(Error::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(SecretString::from("process-secret".to_string()))
    }

    fn tamper(token: &str, index: usize) -> String {
        let mut bytes = token.as_bytes().to_vec();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap_or_default()
    }

    #[test]
    fn bearer_round_trips_through_decode() -> Result<(), Error> {
        let id = Uuid::new_v4();
        let token = codec().sign_bearer(id, NOW)?;
        let claims: BearerClaims = decode(&token)?;
        assert_eq!(claims.id, id);
        assert_eq!(claims.iat, NOW);
        Ok(())
    }

    #[test]
    fn bearer_verifies_with_process_secret() -> Result<(), Error> {
        let id = Uuid::new_v4();
        let token = codec().sign_bearer(id, NOW)?;
        let claims: BearerClaims = codec().verify(&token, NOW + 86_400)?;
        assert_eq!(claims, BearerClaims { id, iat: NOW });
        Ok(())
    }

    #[test]
    fn verify_rejects_other_secret() -> Result<(), Error> {
        let token = codec().sign_bearer(Uuid::new_v4(), NOW)?;
        let result = verify::<BearerClaims>(&token, b"another-secret", NOW);
        assert!(matches!(result, Err(Error::BadSignature)));
        Ok(())
    }

    #[test]
    fn any_tampered_byte_is_a_bad_signature() -> Result<(), Error> {
        let token = codec().sign_bearer(Uuid::new_v4(), NOW)?;
        for index in 0..token.len() {
            if token.as_bytes()[index] == b'.' {
                continue;
            }
            let tampered = tamper(&token, index);
            let result = codec().verify::<BearerClaims>(&tampered, NOW);
            assert!(
                matches!(result, Err(Error::BadSignature)),
                "byte {index} tampered but got {result:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn decode_rejects_structural_garbage() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.xx", ".."] {
            assert!(matches!(
                decode::<BearerClaims>(token),
                Err(Error::Malformed)
            ));
        }
    }

    #[test]
    fn decode_rejects_unknown_and_missing_fields() -> Result<(), Error> {
        let secret = b"s";
        let outer = sign_with_secret(
            &EmailedResetClaims {
                id: Uuid::new_v4(),
                token: "inner".to_string(),
                iat: NOW,
            },
            secret,
        )?;
        // extra `token` field
        assert!(matches!(
            decode::<BearerClaims>(&outer),
            Err(Error::Malformed)
        ));

        let bearer = sign_with_secret(&BearerClaims { id: Uuid::new_v4(), iat: NOW }, secret)?;
        // missing `token` field
        assert!(matches!(
            decode::<EmailedResetClaims>(&bearer),
            Err(Error::Malformed)
        ));
        Ok(())
    }

    #[test]
    fn expiry_is_inclusive_of_the_boundary() -> Result<(), Error> {
        let secret = derived_reset_secret("$argon2id$hash", "2024-01-01 00:00:00+00");
        let claims = ResetClaims {
            id: Uuid::new_v4(),
            iat: NOW,
            exp: NOW + 600,
        };
        let token = sign_with_secret(&claims, secret.as_bytes())?;

        let at_boundary: ResetClaims = verify(&token, secret.as_bytes(), NOW + 600)?;
        assert_eq!(at_boundary, claims);

        let late = verify::<ResetClaims>(&token, secret.as_bytes(), NOW + 601);
        assert!(matches!(late, Err(Error::Expired)));
        Ok(())
    }

    #[test]
    fn derived_secret_joins_with_dash() {
        assert_eq!(derived_reset_secret("hash", "created"), "hash-created");
    }

    #[test]
    fn codec_debug_hides_secret() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains("process-secret"));
    }
}
