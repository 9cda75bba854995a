use std::net::SocketAddr;

use anyhow::Context;
use log::info;
use weather_app::{api, config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = Config::from_env().context("failed to load configuration")?;
    let state = AppState::from_config(&config)
        .await
        .context("failed to initialise application state")?;

    let routes = api::build_filters(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    info!("Server is running on {}", addr);
    warp::serve(routes).run(addr).await;

    Ok(())
}
