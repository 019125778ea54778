pub mod user;

pub use user::{GeoLocation, PostalCode, User, UserId};
