pub mod geo;
pub mod metrics;
pub mod store;
pub mod users;

pub use geo::{GeoError, GeoProvider, MockGeoProvider, OpenWeatherProvider};
pub use metrics::{get_metrics, init_metrics};
pub use store::{FirebaseUserStore, InMemoryUserStore, MongoUserStore, UserStore};
pub use users::UserService;
