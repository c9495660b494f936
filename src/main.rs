mod config;
mod protocol;
mod transport;
mod vehicle;

use config::SimulatorConfig;
use std::sync::Arc;
use transport::{TcpTransport, TransportAdapter, TransportEvent};
use vehicle::{publisher, DispatchController, SubmitOutcome};

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = config_from_args();
    info!("AGV simulator starting at position {}", config.initial_position);
    info!("  listening on {}", config.listen_addr);

    let controller = Arc::new(DispatchController::new(
        &config.initial_position,
        config.travel_time,
    ));

    let transport = match TcpTransport::bind(&config.listen_addr).await {
        Ok(transport) => transport,
        Err(e) => {
            error!("failed to open transport: {}", e);
            controller.shutdown().await;
            return Err(e);
        }
    };

    let publisher = publisher::spawn(
        controller.clone(),
        transport.feedback_sink(),
        config.feedback_period,
    );

    let result = tokio::select! {
        result = run(controller.clone(), transport) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    };

    publisher.abort();
    controller.shutdown().await;
    result
}

/// Feed transport events into the controller until the transport stops
async fn run(
    controller: Arc<DispatchController>,
    mut transport: impl TransportAdapter,
) -> anyhow::Result<()> {
    while let Some(event) = transport.recv().await {
        match event {
            TransportEvent::PeerConnected { peer } => {
                info!("dispatcher {} attached", peer);
            }
            TransportEvent::PeerDisconnected { reason } => {
                warn!("dispatcher gone: {}", reason);
            }
            TransportEvent::OrderReceived(raw) => match controller.submit(&raw).await {
                SubmitOutcome::Accepted { order_number } => {
                    debug!(order = order_number, "transport order accepted");
                }
                // Rejections and duplicates are logged inside submit; the
                // protocol is fire-and-forget, nothing goes back either way.
                SubmitOutcome::Duplicate | SubmitOutcome::Rejected(_) => {}
            },
        }
    }
    Ok(())
}

/// `agv-simulator [port] [initial-position]`, both optional
fn config_from_args() -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    let mut args = std::env::args().skip(1);
    if let Some(port) = args.next() {
        match port.parse::<u16>() {
            Ok(port) => config.listen_addr = format!("0.0.0.0:{}", port),
            Err(_) => warn!("ignoring invalid port argument: {}", port),
        }
    }
    if let Some(position) = args.next() {
        config.initial_position = position;
    }
    config
}
