//! aichat terminal client
//!
//! One chat screen driving an `aichat_core::ChatController`, backed by the
//! local mock responder or an OpenAI-compatible completion API.
//!
//! Logs go to `<config dir>/aichat/aichat.log`; set `RUST_LOG` to change the level.

mod app;
mod handler;
mod tui;
mod ui;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use aichat_core::{build_provider, ChatController, Config, ProviderKind};
use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "aichat")]
#[command(about = "Chat with a mock or OpenAI-compatible assistant in the terminal")]
struct Cli {
    /// Reply provider: mock or openai (overrides the config file)
    #[arg(short, long)]
    provider: Option<String>,
    /// Model name for the openai provider
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;
    let mut config = Config::load_or_default();

    let kind = match cli.provider.as_deref() {
        Some(name) => ProviderKind::from_str(name)
            .ok_or_else(|| anyhow!("Unknown provider '{}', expected one of: mock, openai", name))?,
        None => config.provider_kind(),
    };
    if let Some(model) = cli.model {
        config.model = Some(model);
    }

    let provider = build_provider(&config, kind)
        .map_err(|e| anyhow!("{}. Set OPENAI_API_KEY or use --provider mock", e))?;
    let controller = Arc::new(ChatController::new(provider, config.system_prompt()));

    let title = match kind {
        ProviderKind::Mock => kind.display_name().to_string(),
        ProviderKind::OpenAI => format!("{}: {}", kind.display_name(), config.model()),
    };
    tracing::info!(provider = kind.as_str(), "starting chat session");

    let mut app = App::new(Arc::clone(&controller), title);
    let mut events = EventHandler::new(controller.subscribe());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let log_dir = Config::config_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("aichat.log"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("aichat=info,aichat_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
