#![deny(clippy::unwrap_used, clippy::expect_used)]

mod input;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use liar_session::Command;
use liar_session::ConfigOverrides;
use liar_session::EventSender;
use liar_session::Orchestrator;
use liar_session::SessionConfig;
use liar_session::SessionEvent;
use liar_session::SessionStore;
use liar_session::config::CONFIG_TOML_FILE;
use liar_session::config::find_play_home;
use liar_session::config::load_config_toml;
use liar_step_client::HttpClient;
use liar_step_client::PathStyle;
use liar_step_client::SessionId;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::input::Input;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Parser)]
#[command(version, about = "Play a round of the Liar game against AI players")]
pub struct Cli {
    /// Game service URL. A URL ending in `/api` uses the web front-end routes.
    #[arg(long, env = "LIAR_GAME_BACKEND_URL")]
    pub base_url: Option<String>,

    /// Force the route layout instead of inferring it from the URL.
    #[arg(long)]
    pub path_style: Option<PathStyle>,

    /// Path to config.toml (defaults to the one in the data directory).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for session.json and last_ended.json.
    #[arg(long, env = "LIAR_PLAY_HOME")]
    pub data_dir: Option<PathBuf>,

    /// Reuse this session id instead of the stored one.
    #[arg(long)]
    pub session_id: Option<String>,

    #[arg(long = "name")]
    pub participant_name: Option<String>,

    #[arg(long)]
    pub ai_count: Option<u32>,

    /// Ask why you voted as you did before the AI players vote.
    #[arg(long, default_value_t = false)]
    pub interview: bool,
}

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();

    let home = match cli.data_dir {
        Some(dir) => dir,
        None => find_play_home()?,
    };
    let config_path = cli.config.unwrap_or_else(|| home.join(CONFIG_TOML_FILE));
    let config_toml = load_config_toml(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let base_url = cli
        .base_url
        .or_else(|| config_toml.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let config = SessionConfig::from_toml(
        config_toml,
        ConfigOverrides {
            participant_name: cli.participant_name,
            ai_count: cli.ai_count,
            post_vote_interview: cli.interview.then_some(true),
        },
    );

    let store = SessionStore::new(home);
    let session_id = match cli.session_id {
        Some(id) => SessionId(id),
        None => {
            store
                .load_or_create_session(&config.participant_name)
                .with_context(|| format!("failed to prepare {}", store.home().display()))?
                .session_id
        }
    };

    let mut client = HttpClient::new(base_url)?
        .with_user_agent(format!("liar-play/{}", env!("CARGO_PKG_VERSION")));
    if let Some(style) = cli.path_style {
        client = client.with_path_style(style);
    }
    info!(base_url = client.base_url(), path_style = ?client.path_style(), %session_id, "launching");

    let (tx, rx) = unbounded_channel();
    let orch = Orchestrator::new(
        Arc::new(client),
        session_id,
        config,
        EventSender::new(tx),
        Some(store),
    );
    play(orch, rx).await
}

async fn play(orch: Orchestrator, mut rx: UnboundedReceiver<SessionEvent>) -> anyhow::Result<()> {
    orch.dispatch(Command::Start);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut last_phase = None;
    let mut announced_turn = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::SessionUpdated => {
                        let view = orch.view();
                        if view.phase.is_some() && view.phase != last_phase {
                            last_phase = view.phase;
                            println!("{}", render::header(&view));
                        }
                        if view.input_enabled && !announced_turn {
                            println!("(your turn)");
                        }
                        announced_turn = view.input_enabled;
                    }
                    SessionEvent::MessageRevealed(entry) => println!("{}", render::entry_line(&entry)),
                    SessionEvent::CheckpointOpened(gate) => {
                        if let Some(prompt) = render::gate_prompt(gate, &orch.view()) {
                            println!("{prompt}");
                        }
                    }
                    SessionEvent::CheckpointClosed(_) => {}
                    SessionEvent::BusyChanged(true) => {
                        if let Some(status) = orch.view().status_text {
                            println!("({status})");
                        }
                    }
                    SessionEvent::BusyChanged(false) => {}
                    SessionEvent::Fatal(msg) => {
                        eprintln!("error: {msg}\n(type /retry to re-enable input)");
                    }
                    SessionEvent::Ended(snapshot) => {
                        orch.wait_delivered().await;
                        while let Ok(event) = rx.try_recv() {
                            if let SessionEvent::MessageRevealed(entry) = event {
                                println!("{}", render::entry_line(&entry));
                            }
                        }
                        println!("{}", render::results(&snapshot));
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match input::parse_line(orch.view().gate, &line) {
                    Input::Run(command) => {
                        orch.dispatch(command);
                    }
                    Input::Help => println!("{}", render::HELP),
                    Input::Quit => break,
                    Input::Ignored(why) => println!("({why})"),
                }
            }
        }
    }
    Ok(())
}

