use anyhow::Context;
use mudhost_lib::{init_logging, run, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = ServerConfig::from_args(std::env::args().skip(1)).context("Failed to load configuration")?;

    run(config)
        .await
        .with_context(|| "Server stopped with an error".to_string())
}
