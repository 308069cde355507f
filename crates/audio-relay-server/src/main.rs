use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use audio_relay::{RelaySettings, Resolver};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Streaming proxy for remote audio sources.
#[derive(Debug, Parser)]
#[command(name = "audio-relay-server", version, about)]
struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Additional hostnames to allow beyond the built-in provider set.
    #[arg(long = "allow-host", value_name = "HOST")]
    allow_hosts: Vec<String>,

    /// Outbound connect timeout in seconds.
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::default()
                    .add_directive("audio_relay=debug".parse().expect("valid directive"))
                    .add_directive(LevelFilter::INFO.into())
            }),
        )
        .init();

    let args = Args::parse();

    let mut settings = RelaySettings::default()
        .with_connect_timeout(Duration::from_secs(args.connect_timeout));
    for host in args.allow_hosts {
        settings = settings.with_allowed_host(host);
    }

    let resolver = Resolver::new(settings)?;
    tracing::info!(
        allowed_hosts = ?resolver.settings().allowed_hosts,
        "outbound allow-list configured"
    );
    let app = audio_relay_server::router(resolver);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(addr = %args.bind, "audio relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {e}");
    }
}
