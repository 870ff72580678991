use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cptac_analytics::interface::QueryInterface;
use cptac_analytics::persist;
use cptac_analytics::server::router;
use cptac_analytics::settings::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // an explicit settings file may be given as the only argument
    let path = std::env::args().nth(1);
    let settings = Settings::load(path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();
    info!(version = env!("CARGO_PKG_VERSION"), data_path = %settings.data_path.display(), "starting");

    let store = persist::load(&settings.data_path)?;
    let interface = QueryInterface::new(Arc::new(store)).with_assay_type(settings.assay_type.as_str());
    let app = router(Arc::new(interface));

    let listener = TcpListener::bind(&settings.bind).await?;
    info!(bind = %settings.bind, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
