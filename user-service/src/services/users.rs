//! User record operations: geolocation enrichment on write, then persistence.

use super::geo::GeoProvider;
use super::store::UserStore;
use crate::dtos::{CreateUserRequest, UpdateUserRequest};
use crate::models::{User, UserId};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    geo: Arc<dyn GeoProvider>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, geo: Arc<dyn GeoProvider>) -> Self {
        Self { store, geo }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, AppError> {
        let location = self.geo.lookup(&request.zip).await?;
        let user = User::new(UserId::generate(), request.name, request.zip, location);

        self.store.set(&user).await?;

        metrics::counter!("user_writes_total", "operation" => "create").increment(1);
        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        self.store.list().await
    }

    pub async fn get(&self, id: &UserId) -> Result<User, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", id)))
    }

    /// Overlay the request onto the stored record. A supplied postal code is
    /// always re-resolved, so geo fields win over anything stored.
    #[tracing::instrument(skip(self, request), fields(user_id = %id))]
    pub async fn update(&self, id: &UserId, request: UpdateUserRequest) -> Result<User, AppError> {
        if request.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "At least one of name or zip must be provided"
            )));
        }

        let mut user = self.get(id).await?;

        if let Some(zip) = request.zip {
            let location = self.geo.lookup(&zip).await?;
            user.zip = zip;
            user.set_location(location);
        }
        if let Some(name) = request.name {
            user.name = name;
        }

        self.store.set(&user).await?;

        metrics::counter!("user_writes_total", "operation" => "update").increment(1);
        tracing::info!("User updated");
        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    pub async fn delete(&self, id: &UserId) -> Result<(), AppError> {
        self.store.remove(id).await?;

        metrics::counter!("user_writes_total", "operation" => "delete").increment(1);
        tracing::info!("User deleted");
        Ok(())
    }
}
