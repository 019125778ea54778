use crate::dtos::{CreateUserRequest, DeleteUserResponse, UpdateUserRequest};
use crate::models::{User, UserId};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use service_core::extract::ValidatedJson;

#[tracing::instrument(skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.users.create(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = UserId::parse(&id)?;
    Ok(Json(state.users.get(&id).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let id = UserId::parse(&id)?;
    Ok(Json(state.users.update(&id, request).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    let id = UserId::parse(&id)?;
    state.users.delete(&id).await?;
    Ok(Json(DeleteUserResponse { id, deleted: true }))
}
