//! Read-only web page showing the activity log and connection status

use sweep_rs::dashboard::DashboardServer;
use sweep_rs::Config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    sweep_rs::init_tracing(&format!(
        "sweep_rs={},tower_http=info",
        config.logging.level
    ));
    info!("Starting sweep-dashboard v{}", env!("CARGO_PKG_VERSION"));

    let server = DashboardServer::new(config.paths(), config.dashboard.listen_addr.clone());
    server.run().await?;

    Ok(())
}
