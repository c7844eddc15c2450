mod capture;
mod render;
mod repl;
mod status;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use tether_client::control::TracingInjector;
use tether_client::session::HostSetup;
use tether_client::signaling::WsTransport;
use tether_client::{ClientConfig, start_host, start_viewer};
use tether_core::RoomId;
use tether_server::SignalingService;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::capture::IdleCapture;
use crate::render::LoggingRenderTarget;
use crate::repl::ReplCommand;

#[derive(Parser)]
#[command(
    name = "tether",
    about = "Peer-to-peer screen sharing with remote control"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the signaling relay.
    Relay {
        #[arg(long, env = "TETHER_BIND", default_value = "0.0.0.0:3000")]
        bind: String,
    },
    /// Opens a room and shares this machine.
    Host {
        #[arg(long, env = "TETHER_ROOM")]
        room: Option<String>,

        #[arg(long, env = "TETHER_SIGNALING_URL")]
        server: Option<String>,
    },
    /// Joins a room and sends control input from stdin.
    View {
        room: Option<String>,

        #[arg(long, env = "TETHER_SIGNALING_URL")]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind } => run_relay(&bind).await,
        Commands::Host { room, server } => run_host(room, client_config(server)).await,
        Commands::View { room, server } => run_view(room, client_config(server)).await,
    }
}

fn client_config(server: Option<String>) -> ClientConfig {
    let config = ClientConfig::from_env();
    match server {
        Some(url) => config.with_signaling_url(url),
        None => config,
    }
}

async fn run_relay(bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    println!("{} ws://{}/ws", "📡 Relay listening on".green().bold(), bind);
    tether_server::serve(listener, SignalingService::new())
        .await
        .context("Relay stopped")
}

async fn run_host(room: Option<String>, config: ClientConfig) -> Result<()> {
    let room_id = room.as_deref().map(RoomId::parse).transpose()?;
    let transport = Arc::new(WsTransport::from_config(&config));

    let session = start_host(
        config,
        transport,
        HostSetup {
            capture: Arc::new(IdleCapture),
            injector: Arc::new(TracingInjector),
            room_id,
        },
    )
    .await
    .map_err(|e| anyhow!("Failed to connect: {}", e.user_message()))?;

    println!(
        "{} {}",
        "🔑 Room code:".cyan(),
        session.room_id().as_str().bold()
    );
    let printer = status::spawn_printer(session.subscribe());

    tokio::signal::ctrl_c().await?;
    session.close().await;
    printer.abort();
    Ok(())
}

async fn run_view(room: Option<String>, config: ClientConfig) -> Result<()> {
    let raw = match room {
        Some(room) => room,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Room code")
            .interact_text()?,
    };
    let room_id = RoomId::parse(&raw)?;
    let transport = Arc::new(WsTransport::from_config(&config));

    let session = start_viewer(config, transport, room_id)
        .await
        .map_err(|e| anyhow!("Failed to connect: {}", e.user_message()))?;
    session.attach_render_target(Arc::new(LoggingRenderTarget));
    let printer = status::spawn_printer(session.subscribe());

    println!("{}", repl::HELP.dimmed());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match repl::parse_line(&line) {
                    Ok(Some(ReplCommand::Quit)) => break,
                    Ok(Some(ReplCommand::Send(event))) => {
                        match session.send_control(event).await {
                            Ok(route) => debug!("Control event sent via {:?}", route),
                            Err(e) => eprintln!("{}", e.user_message().as_str().red()),
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e.to_string().as_str().yellow()),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.close().await;
    printer.abort();
    Ok(())
}
