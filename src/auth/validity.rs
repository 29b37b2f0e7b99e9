//! Threshold revocation: a bearer token is authoritative only if it was issued
//! at or after the user's `last_valid_iat`.

use super::token::{BearerClaims, Claims};
use crate::store::UserRecord;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoUser,
    MandatoryReset,
    Stale,
    Valid { user_id: Uuid },
}

/// Judge a verified bearer token against the current user record.
///
/// Order matters: a missing user is checked before the threshold, and the
/// force-reset sentinel before the numeric comparison.
#[must_use]
pub fn assess(claims: &BearerClaims, user: Option<&UserRecord>) -> Outcome {
    let Some(user) = user else {
        return Outcome::NoUser;
    };
    let Some(last_valid_iat) = user.last_valid_iat else {
        return Outcome::MandatoryReset;
    };
    if last_valid_iat > claims.issued_at() {
        return Outcome::Stale;
    }
    Outcome::Valid { user_id: user.id }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(last_valid_iat: Option<i64>) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            reset_last_iat: None,
            last_valid_iat,
        }
    }

    fn claims(user: &UserRecord, iat: i64) -> BearerClaims {
        BearerClaims { id: user.id, iat }
    }

    #[test]
    fn missing_user() {
        let claims = BearerClaims {
            id: Uuid::new_v4(),
            iat: 10,
        };
        assert_eq!(assess(&claims, None), Outcome::NoUser);
    }

    #[test]
    fn sentinel_wins_over_any_iat() {
        let user = user(None);
        for iat in [i64::MIN, 0, 10, i64::MAX] {
            assert_eq!(assess(&claims(&user, iat), Some(&user)), Outcome::MandatoryReset);
        }
    }

    #[test]
    fn valid_iff_threshold_not_after_iat() {
        let user = user(Some(100));
        assert_eq!(assess(&claims(&user, 99), Some(&user)), Outcome::Stale);
        assert_eq!(
            assess(&claims(&user, 100), Some(&user)),
            Outcome::Valid { user_id: user.id }
        );
        assert_eq!(
            assess(&claims(&user, 101), Some(&user)),
            Outcome::Valid { user_id: user.id }
        );
    }
}
