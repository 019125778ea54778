use super::UserStore;
use crate::config::MongoConfig;
use crate::models::{PostalCode, User, UserId};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{ClientOptions, FindOptions, ReplaceOptions},
    Client as MongoClient, Collection,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Stored shape: the user id doubles as the document `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: UserId,
    name: String,
    zip: PostalCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone: Option<i32>,
    lat: f64,
    lon: f64,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            zip: user.zip.clone(),
            timezone: user.timezone,
            lat: user.lat,
            lon: user.lon,
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            zip: doc.zip,
            timezone: doc.timezone,
            lat: doc.lat,
            lon: doc.lon,
        }
    }
}

#[derive(Clone)]
pub struct MongoUserStore {
    client: MongoClient,
    collection: Collection<UserDocument>,
}

impl MongoUserStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB URI: {}", e);
            AppError::from(e)
        })?;
        client_options.app_name = Some("user-service".to_string());

        let client = MongoClient::with_options(client_options)?;
        let collection = client
            .database(&config.database)
            .collection::<UserDocument>(&config.collection);

        tracing::info!(
            database = %config.database,
            collection = %config.collection,
            "Connected to MongoDB"
        );

        Ok(Self { client, collection })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn get(&self, id: &UserId) -> Result<Option<User>, AppError> {
        let found = self
            .collection
            .find_one(doc! { "_id": id.as_str() }, None)
            .await?;
        Ok(found.map(User::from))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let cursor = self.collection.find(None, options).await?;
        let documents: Vec<UserDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(User::from).collect())
    }

    async fn set(&self, user: &User) -> Result<(), AppError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(
                doc! { "_id": user.id.as_str() },
                UserDocument::from(user),
                options,
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &UserId) -> Result<(), AppError> {
        self.collection
            .delete_one(doc! { "_id": id.as_str() }, None)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
