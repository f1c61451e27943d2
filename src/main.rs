use std::sync::Arc;

use axum::Router;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use trading_sim::config::{EngineConfig, MarketSimConfig};
use trading_sim::session_facade::TradingSessionFacade;
use trading_sim::state::AppState;
use trading_sim::utils::shutdown_token;
use trading_sim::{api, simulator};

#[derive(Parser)]
#[command(name = "trading-sim")]
#[command(version = "0.1", about = "A single-instrument BTC/USD trading simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WS server only.
    Server { #[arg(long, default_value_t = 8080)] port: u16 },
    /// Run the server plus the background market simulator.
    Simulate { #[arg(long, default_value_t = 8080)] port: u16 },
}

async fn build_listener(port: u16) -> anyhow::Result<(TcpListener, Router)> {
    let facade = Arc::new(TradingSessionFacade::new(EngineConfig::default()));
    let app = api::router(AppState::new(facade));
    let ep = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&ep).await?;
    Ok((listener, app))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let token = shutdown_token();
    let cli = Cli::parse();

    match cli.command {
        Commands::Server { port } => {
            let (listener, app) = build_listener(port).await?;
            tracing::info!(port, "HTTP/WS server listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await?;
        }
        Commands::Simulate { port } => {
            let facade = Arc::new(TradingSessionFacade::new(EngineConfig::default()));
            let app = api::router(AppState::new(facade.clone()));
            let ep = format!("0.0.0.0:{port}");
            let listener = TcpListener::bind(&ep).await?;

            let server_token = token.clone();
            let server = tokio::spawn(async move {
                tracing::info!(port, "HTTP/WS server listening");
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(server_token.cancelled_owned())
                    .await
                {
                    tracing::error!(error = %e, "server exited with an error");
                }
            });

            let sim_token = token.clone();
            let simulator = tokio::spawn(simulator::run(facade, MarketSimConfig::default(), sim_token));

            let _ = tokio::join!(server, simulator);
        }
    }

    Ok(())
}
