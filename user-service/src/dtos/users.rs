use crate::models::user::validate_postal_code;
use crate::models::{PostalCode, UserId};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_postal_code"))]
    pub zip: PostalCode,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_postal_code"))]
    pub zip: Option<PostalCode>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.zip.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub id: UserId,
    pub deleted: bool,
}
