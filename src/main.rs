use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use avrd_avr::poller::spawn_poller;
use avrd_avr::subscription::{self, stream_addr};
use avrd_avr::{Avr, CommandTransport, EventBus, Session, StatusCache};
use avrd_server::{AppState, ServerConfig};
use avrd_wled::WledClient;

#[derive(Parser)]
#[command(name = "avrd", about = "Receiver bridge and HTTP facade")]
struct Args {
    /// Receiver command endpoint, host:port.
    #[arg(long, env = "AVR_ADDRESS")]
    avr_address: String,

    /// Lighting controller address, host or host:port.
    #[arg(long, env = "WLED_ADDRESS")]
    wled_address: Option<String>,

    /// Facade listen port.
    #[arg(long, env = "REST_PORT", default_value_t = 8080)]
    rest_port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("Starting avrd");

    let bus = EventBus::new();
    let session = Arc::new(Session::new(bus.clone()));
    let cache = Arc::new(StatusCache::new());
    let avr = Arc::new(Avr::new(
        Arc::clone(&session) as Arc<dyn CommandTransport>,
        bus.clone(),
        Arc::clone(&cache),
    ));

    session
        .connect(&args.avr_address)
        .await
        .expect("Failed to connect to receiver");

    // The status stream lives on its own port of the receiver's host.
    let host = args
        .avr_address
        .split(':')
        .next()
        .unwrap_or(&args.avr_address);
    let stream = {
        let cache = Arc::clone(&cache);
        match subscription::subscribe(&stream_addr(host), move |frame| cache.set_raw_frame(frame))
            .await
        {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!(error = %e, "status stream unavailable");
                None
            }
        }
    };

    let cancel = CancellationToken::new();
    let poller = spawn_poller(Arc::clone(&avr), cancel.clone());

    let wled = args
        .wled_address
        .as_deref()
        .map(|address| Arc::new(WledClient::new(address)));
    if wled.is_none() {
        tracing::info!("no lighting controller configured");
    }

    let config = ServerConfig { port: args.rest_port };
    let handle = avrd_server::start(config, AppState { avr, wled })
        .await
        .expect("Failed to start facade");

    tracing::info!(port = handle.port, "avrd ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
    cancel.cancel();
    if let Some(stream) = stream {
        stream.cancel();
    }
    let _ = poller.await;
    session.close().await;
}
