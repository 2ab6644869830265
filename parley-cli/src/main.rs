mod observer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use parley::Identity;
use parley::model::IceServerConfig;
use parley::relay::RelayService;
use parley::session::{
    CallManager, CallState, MediaConfig, RelayClient, SessionConfig, WebRtcMediaBinding,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::observer::{CliObserver, UiEvent};

#[derive(Parser)]
#[command(name = "parley")]
#[command(version, about = "Peer-to-peer audio/video calls over a WebSocket relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, env = "PARLEY_BIND", default_value = "0.0.0.0:12000")]
        bind: SocketAddr,
    },

    /// Connect to a relay and place or answer calls.
    Call(CallArgs),
}

#[derive(clap::Args)]
struct CallArgs {
    #[arg(long, env = "PARLEY_RELAY", default_value = "ws://127.0.0.1:12000")]
    relay: String,

    #[arg(long, env = "PARLEY_IDENTITY")]
    identity: String,

    /// Call this peer right away and exit when the call is over.
    #[arg(long)]
    dial: Option<String>,

    #[arg(long, env = "PARLEY_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// STUN server URL, repeatable. Defaults to a public Google server.
    #[arg(long = "stun", env = "PARLEY_STUN", value_delimiter = ',')]
    stun: Vec<String>,

    #[arg(long)]
    no_video: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind } => run_relay(bind).await,
        Commands::Call(args) => run_call(args).await,
    }
}

async fn run_relay(bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    println!("{} {}", "🚀 Relay listening on".green().bold(), bind);

    parley::relay::serve(listener, RelayService::new()).await
}

async fn run_call(args: CallArgs) -> Result<()> {
    let identity = Identity::parse(args.identity)?;
    let dial = args.dial.map(|d| Identity::parse(d)).transpose()?;

    let mut media = MediaConfig {
        video: !args.no_video,
        ..Default::default()
    };
    if !args.stun.is_empty() {
        media.ice_servers = args.stun.into_iter().map(IceServerConfig::stun).collect();
    }
    let config = SessionConfig::default()
        .with_negotiation_timeout(Duration::from_secs(args.timeout_secs))
        .with_media(media.clone());

    let (client, inbound) = RelayClient::connect(&args.relay, identity.clone()).await?;
    println!(
        "{} {} {}",
        "✅ Connected to".green(),
        args.relay,
        format!("as {identity}").bold()
    );

    let (observer, mut ui_events) = CliObserver::new();
    let manager = CallManager::new(
        identity,
        Arc::new(client),
        Arc::new(observer),
        WebRtcMediaBinding::factory(media),
        config,
    );

    let (answer_tx, mut answers) = mpsc::unbounded_channel();
    let pump = manager.clone();
    let mut inbound_task = tokio::spawn(async move { pump.run_inbound(inbound).await });

    if let Some(peer) = &dial {
        manager.dial(peer)?;
        println!("{} {}", "📞 Calling".cyan().bold(), peer);
    } else {
        println!("{}", "Waiting for calls, Ctrl-C to quit".dimmed());
    }

    loop {
        tokio::select! {
            Some(event) = ui_events.recv() => match event {
                UiEvent::Incoming(remote) => prompt(remote, answer_tx.clone()),
                UiEvent::Finished(remote) => {
                    if dial.as_ref() == Some(&remote) {
                        break;
                    }
                }
            },

            Some((remote, accept)) = answers.recv() => answer(&manager, &remote, accept).await,

            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Hanging up...".yellow());
                manager.shutdown().await;
                wait_for_calls_to_end(&manager).await;
                break;
            }

            _ = &mut inbound_task => {
                println!("{}", "Relay connection lost".red().bold());
                wait_for_calls_to_end(&manager).await;
                break;
            }
        }
    }

    Ok(())
}

/// Ask on a plain thread so Ctrl-C and hangups are still handled while the
/// prompt is open, and a pending prompt never holds up process exit.
fn prompt(remote: Identity, answers: mpsc::UnboundedSender<(Identity, bool)>) {
    std::thread::spawn(move || {
        let question = format!("Accept call from {remote}?");
        match Confirm::new().with_prompt(question).default(true).interact() {
            Ok(accept) => {
                let _ = answers.send((remote, accept));
            }
            Err(e) => tracing::warn!("Prompt for call from {} failed: {}", remote, e),
        }
    });
}

async fn answer(manager: &CallManager, remote: &Identity, accept: bool) {
    if manager.state_of(remote) != Some(CallState::Ringing) {
        println!("{} {}", "Call is no longer ringing:".yellow(), remote);
        return;
    }

    let result = if accept {
        manager.accept(remote).await
    } else {
        manager.decline(remote).await
    };
    if let Err(e) = result {
        println!("{} {}", "Too late:".yellow(), e);
    }
}

/// Give sessions a moment to push their hangups out before the process exits.
async fn wait_for_calls_to_end(manager: &CallManager) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !manager.active_calls().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
}
