//! Application startup and lifecycle management.

use crate::config::{StoreConfig, UserServiceConfig};
use crate::handlers;
use crate::services::{
    FirebaseUserStore, GeoProvider, InMemoryUserStore, MockGeoProvider, MongoUserStore,
    OpenWeatherProvider, UserService, UserStore,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: UserServiceConfig,
    pub users: UserService,
}

async fn build_store(config: &StoreConfig) -> Result<Arc<dyn UserStore>, AppError> {
    let store: Arc<dyn UserStore> = match config {
        StoreConfig::Firebase(firebase) => {
            tracing::info!(database_url = %firebase.database_url, "Using Firebase user store");
            Arc::new(FirebaseUserStore::new(firebase.clone())?)
        }
        StoreConfig::Mongodb(mongo) => {
            tracing::info!("Using MongoDB user store");
            Arc::new(MongoUserStore::connect(mongo).await?)
        }
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory user store; records are lost on restart");
            Arc::new(InMemoryUserStore::new())
        }
    };
    Ok(store)
}

fn build_geo_provider(config: &UserServiceConfig) -> Result<Arc<dyn GeoProvider>, AppError> {
    if config.geo.enabled {
        tracing::info!(api_base_url = %config.geo.api_base_url, "OpenWeather geolocation provider initialized");
        Ok(Arc::new(OpenWeatherProvider::new(config.geo.clone())?))
    } else {
        tracing::info!("Geolocation disabled, using mock provider");
        Ok(Arc::new(MockGeoProvider::default()))
    }
}

impl AppState {
    pub async fn build(config: UserServiceConfig) -> Result<Self, AppError> {
        let store = build_store(&config.store).await?;
        let geo = build_geo_provider(&config)?;

        tracing::info!(
            store = store.backend(),
            geo_provider = geo.name(),
            "User service state initialized"
        );

        Ok(Self {
            users: UserService::new(store, geo),
            config,
        })
    }
}

/// Routes and middleware. The rate limit, when enabled, only guards `/users`.
pub fn build_router(state: AppState) -> Router {
    let mut users = Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        );

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter = create_ip_rate_limiter(rate_limit.requests, rate_limit.window_seconds);
        users = users.route_layer(from_fn_with_state(limiter, ip_rate_limit_middleware));
    }

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(users)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: UserServiceConfig) -> Result<Self, AppError> {
        let state = AppState::build(config.clone()).await.map_err(|e| {
            tracing::error!("Failed to initialize application state: {}", e);
            e
        })?;

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("User service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> Arc<dyn UserStore> {
        self.state.users.store().clone()
    }

    /// Serve until SIGINT/SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}
