#[macro_use]
extern crate tracing;

use std::error::Error;
use std::net::SocketAddr;

use clap::Parser;
use streamchat_relay::{DEFAULT_MODEL, RelayConfig, router};
use tokio::net::TcpListener;

/// Relays chat conversations to an OpenAI-compatible backend.
#[derive(Parser)]
#[command(name = "streamchat-relay", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "STREAMCHAT_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Base URL of the completion backend.
    #[arg(
        long,
        env = "STREAMCHAT_UPSTREAM_URL",
        default_value = "https://api.together.xyz/v1"
    )]
    upstream_url: String,

    /// Model used when a request does not name one.
    #[arg(long, env = "STREAMCHAT_DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    default_model: String,

    /// API key sent to the backend.
    #[arg(long, env = "TOGETHER_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = RelayConfig::new(args.upstream_url, args.api_key)
        .with_default_model(args.default_model);
    debug!("{config:?}");

    let listener = TcpListener::bind(args.listen).await?;
    info!(
        "relaying to {} on http://{}",
        config.upstream_url(),
        listener.local_addr()?
    );
    axum::serve(listener, router(&config)).await?;
    Ok(())
}
