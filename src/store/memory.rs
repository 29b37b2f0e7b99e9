use super::{InsertOutcome, NewUser, UserRecord, UserStore};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process user table.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
    // keeps created_at unique even for inserts in the same microsecond
    sequence: AtomicU64,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn created_at(&self) -> String {
        let micros = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or(0);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{micros}.{sequence}")
    }
}

impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let mut users = self.users.lock().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Ok(InsertOutcome::Conflict);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: self.created_at(),
            reset_last_iat: None,
            last_valid_iat: Some(user.last_valid_iat),
        };
        users.insert(record.id, record.clone());

        Ok(InsertOutcome::Created(record))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn record_reset_issued(&self, id: Uuid, iat: i64) -> Result<()> {
        if let Some(user) = self.users.lock().await.get_mut(&id) {
            user.reset_last_iat = Some(user.reset_last_iat.map_or(iat, |last| last.max(iat)));
        }
        Ok(())
    }

    async fn complete_reset(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        reset_iat: i64,
    ) -> Result<bool> {
        let mut users = self.users.lock().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        if user.password_hash != expected_hash
            || user.reset_last_iat.is_some_and(|last| last > reset_iat)
        {
            return Ok(false);
        }

        user.password_hash = new_hash.to_string();
        user.last_valid_iat = Some(reset_iat);
        Ok(true)
    }

    async fn require_reset(&self, email: &str) -> Result<bool> {
        let mut users = self.users.lock().await;
        match users.values_mut().find(|user| user.email == email) {
            Some(user) => {
                user.last_valid_iat = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            last_valid_iat: 100,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() -> Result<()> {
        let store = MemoryUserStore::new();
        assert!(matches!(
            store.insert(new_user("a@x.com")).await?,
            InsertOutcome::Created(_)
        ));
        assert!(matches!(
            store.insert(new_user("a@x.com")).await?,
            InsertOutcome::Conflict
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reset_iat_never_moves_backward() -> Result<()> {
        let store = MemoryUserStore::new();
        let InsertOutcome::Created(user) = store.insert(new_user("a@x.com")).await? else {
            anyhow::bail!("expected insert");
        };
        store.record_reset_issued(user.id, 200).await?;
        store.record_reset_issued(user.id, 150).await?;
        let stored = store.find_by_id(user.id).await?;
        assert_eq!(stored.and_then(|u| u.reset_last_iat), Some(200));
        Ok(())
    }

    #[tokio::test]
    async fn complete_reset_is_conditional() -> Result<()> {
        let store = MemoryUserStore::new();
        let InsertOutcome::Created(user) = store.insert(new_user("a@x.com")).await? else {
            anyhow::bail!("expected insert");
        };
        store.record_reset_issued(user.id, 300).await?;

        // superseded by the reset issued at 300
        assert!(!store.complete_reset(user.id, "hash", "new", 250).await?);
        // stale expected hash
        assert!(!store.complete_reset(user.id, "other", "new", 300).await?);

        assert!(store.complete_reset(user.id, "hash", "new", 300).await?);
        // the hash moved on, a replay does nothing
        assert!(!store.complete_reset(user.id, "hash", "newer", 300).await?);

        let stored = store.find_by_id(user.id).await?;
        assert_eq!(
            stored.map(|u| (u.password_hash, u.last_valid_iat)),
            Some(("new".to_string(), Some(300)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn require_reset_clears_threshold() -> Result<()> {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@x.com")).await?;
        assert!(store.require_reset("a@x.com").await?);
        assert!(!store.require_reset("b@x.com").await?);
        let stored = store.find_by_email("a@x.com").await?;
        assert_eq!(stored.map(|u| u.last_valid_iat), Some(None));
        Ok(())
    }
}
