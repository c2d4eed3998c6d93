//! In-memory user store for tests and local runs without PostgreSQL

use super::user::{CreateUserError, NewUser, UserRecord, UserStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// User store held in a map keyed by email
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, CreateUserError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(CreateUserError::DuplicateEmail(user.email));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email.clone(),
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.email, record.clone());
        Ok(record)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
