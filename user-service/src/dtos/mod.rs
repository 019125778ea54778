pub mod users;

pub use users::{CreateUserRequest, DeleteUserResponse, UpdateUserRequest};
