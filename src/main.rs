//! Room server entrypoint.
//!
//! Reads `ROOM_TETRIS_*` configuration from the environment and serves rooms
//! over line-delimited JSON until interrupted.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use room_tetris::session::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        gravity_ms = config.gravity_ms,
        width = config.board_width,
        height = config.board_height,
        "starting room server"
    );

    tokio::select! {
        result = run_server(config, None) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
