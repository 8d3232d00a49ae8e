use ledis_engine::server::RedisServer;
use ledis_engine::config::Config;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    info!("ledis-engine starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(PathBuf::from(path)).await?,
        None => Config::default(),
    };

    info!(
        "binding {}:{}, {} logical DBs, data dir {}",
        config.static_config.bind,
        config.static_config.port,
        config.static_config.n_db,
        config.static_config.data_dir.display(),
    );

    let server = RedisServer::new(config).await?;
    server.run().await?;

    Ok(())
}
