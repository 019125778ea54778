//! Keyed document stores holding user records.

pub mod firebase;
pub mod memory;
pub mod mongo;

use crate::models::{User, UserId};
use async_trait::async_trait;
use service_core::error::AppError;

pub use firebase::FirebaseUserStore;
pub use memory::InMemoryUserStore;
pub use mongo::MongoUserStore;

/// Single-key reads and writes of user records.
///
/// `set` creates or fully replaces the record at `user.id`; `remove` succeeds
/// whether or not the record exists.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &UserId) -> Result<Option<User>, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;
    async fn set(&self, user: &User) -> Result<(), AppError>;
    async fn remove(&self, id: &UserId) -> Result<(), AppError>;
    async fn health_check(&self) -> Result<(), AppError>;
    fn backend(&self) -> &'static str;
}
