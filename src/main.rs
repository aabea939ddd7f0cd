//! kiln CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kiln::cli::Cli;
use kiln::errors::silent_message;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Parse and execute CLI
    let cli = Cli::parse();
    match cli.execute().await {
        Err(e) => match silent_message(&e) {
            Some(message) => {
                eprintln!("{}", message);
                std::process::exit(1);
            }
            None => Err(e),
        },
        ok => ok,
    }
}
