use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use nutrition_core::provider::UnavailableProvider;
use nutrition_core::{
    build_provider, ChatSession, Config, Message, ProviderKind, ResponseProvider, Role,
};

mod app;
mod handler;
mod logging;
mod markdown;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser, Debug)]
#[command(name = "nutrition-assistant", version)]
#[command(about = "Chat with a nutrition assistant in your terminal")]
struct Cli {
    /// Response provider: canned, ollama, claude or openai
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name for the selected provider
    #[arg(short, long)]
    model: Option<String>,

    /// Ask a single question, print the reply and exit (no TUI)
    #[arg(long, value_name = "QUESTION")]
    ask: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logging is best-effort; the chat works without it
    let log_path = logging::init();
    if let Err(err) = &log_path {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not load config, using defaults");
        Config::new()
    });
    if let Some(provider) = cli.provider {
        config.provider = Some(provider);
    }
    if let Some(model) = cli.model {
        config.default_model = Some(model);
    }
    let kind = config.provider_kind()?;
    tracing::debug!(?config.provider, ?config.default_model, "starting");

    if let Some(question) = cli.ask {
        return ask_once(&config, kind, &question).await;
    }

    let provider: Arc<dyn ResponseProvider> = match build_provider(&config, kind) {
        Ok(provider) => provider,
        Err(err) => {
            tracing::warn!(provider = %kind, error = %err, "provider unavailable");
            Arc::new(UnavailableProvider::new(kind, err.to_string()))
        }
    };
    let mut app = App::new(config, kind, provider);
    app.config_path = Config::config_path().ok();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Ok(path) = log_path {
        tracing::info!(log = %path.display(), "session ended");
    }
    result.map(|()| ExitCode::SUCCESS)
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

/// One question, one reply, printed to stdout. An error reply goes to stderr
/// and fails the process.
async fn ask_once(config: &Config, kind: ProviderKind, question: &str) -> Result<ExitCode> {
    let provider = build_provider(config, kind)?;
    let reply = ask(provider, config.response_timeout(), question).await?;

    if reply.is_error() {
        eprintln!("{}", reply.content);
        Ok(ExitCode::FAILURE)
    } else {
        println!("{}", reply.content);
        Ok(ExitCode::SUCCESS)
    }
}

async fn ask(
    provider: Arc<dyn ResponseProvider>,
    timeout: Duration,
    question: &str,
) -> Result<Message> {
    let mut session = ChatSession::new(provider, timeout);
    if !session.submit(question) {
        bail!("Question is empty");
    }
    session.wait().await;

    match session.conversation().last() {
        Some(reply) if reply.role == Role::Bot => Ok(reply.clone()),
        _ => bail!("No reply received"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrition_core::CannedProvider;

    #[tokio::test]
    async fn test_ask_returns_bot_reply() {
        let provider = Arc::new(CannedProvider::new(Duration::ZERO).with_reply("* Eggs"));
        let reply = ask(provider, Duration::from_secs(1), "  What foods boost energy? ").await.unwrap();
        assert_eq!(reply.role, Role::Bot);
        assert_eq!(reply.content, "* Eggs");
        assert!(!reply.is_error());
    }

    #[tokio::test]
    async fn test_ask_failure_is_an_error_reply() {
        let provider = Arc::new(UnavailableProvider::new(ProviderKind::Claude, "no key"));
        let reply = ask(provider, Duration::from_secs(1), "Is coffee healthy?").await.unwrap();
        assert!(reply.is_error());
        assert_eq!(reply.content, "Error: no key");
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let provider = Arc::new(CannedProvider::new(Duration::ZERO));
        assert!(ask(provider, Duration::from_secs(1), "   ").await.is_err());
    }
}
