//! Weather proxy server binary.

// crates.io
use clap::Parser;
use color_eyre::eyre::Result;
// self
use weather_proxy::{config::ProxyConfig, server};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ProxyConfig::parse();

	server::init_tracing();
	server::run(config).await?;

	Ok(())
}
