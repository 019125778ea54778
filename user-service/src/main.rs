use service_core::observability::init_tracing;
use user_service::{config::UserServiceConfig, services::init_metrics, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = UserServiceConfig::load()?;

    init_tracing(
        "user-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
