use super::UserStore;
use crate::models::{User, UserId};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store for development and tests. Lists in key order.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<BTreeMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: &UserId) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn set(&self, user: &User) -> Result<(), AppError> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn remove(&self, id: &UserId) -> Result<(), AppError> {
        self.users.write().await.remove(id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
