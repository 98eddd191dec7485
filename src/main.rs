use anyhow::Result;
use parcel_proxy::config::Settings;
use parcel_proxy::infrastructure::{init_tracing, log_messages::application as messages};
use parcel_proxy::Application;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;

    info!(environment = %settings.application.environment, "{}", messages::STARTING);

    let app = Application::new(settings).await?;
    app.run().await?;

    Ok(())
}
