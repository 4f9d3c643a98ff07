mod cli;
mod config;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use datachat_core::config::load_dotenv;
use datachat_core::{Action, ChatError, ChatState, Config, ResponsePhase};
use datachat_demo::{CannedCatalog, CannedResponder, DelayWindow};
use datachat_stream::{AgentTransport, Attachment, ChatSession, HttpTransport, TurnOutcome};

use crate::cli::{CliArgs, Command};
use crate::config::CliConfig;
use crate::terminal::{text_delta, Terminal, TextDelta};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let terminal = Terminal::new();

    load_dotenv();
    let mut config = Config::from_env();
    let file = CliConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    file.layer_onto(&mut config);
    args.apply(&mut config);
    config.log_summary();

    let demo = args.demo || file.demo;
    let mut show_logs = args.show_logs || file.show_logs;

    // Demo mode keeps a handle on the responder to render tables natively.
    let (transport, responder): (Arc<dyn AgentTransport>, Option<Arc<CannedResponder>>) = if demo {
        let responder = Arc::new(CannedResponder::new(
            CannedCatalog::builtin(),
            DelayWindow::from(&config.demo),
        ));
        let transport: Arc<dyn AgentTransport> = responder.clone();
        (transport, Some(responder))
    } else {
        let http = HttpTransport::new(&config.agent).context("failed to create HTTP client")?;
        let transport: Arc<dyn AgentTransport> = Arc::new(http);
        (transport, None)
    };

    let mut state = ChatState::new();
    if let Some(ref session_id) = args.session {
        info!(session_id = %session_id, "Resuming session");
        state = state.with_session(session_id.clone());
    }
    let greeting = state
        .messages()
        .last()
        .map(|m| m.text.clone())
        .unwrap_or_default();

    let mode = if demo { "demo mode" } else { "data agent chat" };
    terminal.print_banner(mode, &transport.describe(), &greeting)?;
    if let Some(ref responder) = responder {
        terminal.print_samples(responder.catalog().questions())?;
    }

    let mut session = ChatSession::new(transport, config.agent.clone()).with_state(state);

    loop {
        let line = match terminal.read_input()? {
            Some(line) => line,
            None => {
                terminal.end_line()?;
                break;
            }
        };

        match Command::parse(&line) {
            Command::Blank => continue,
            Command::Exit => break,
            Command::Help => terminal.print_help()?,
            Command::Unknown(cmd) => {
                terminal.print_error(&format!("unknown command '{}', try /help", cmd))?
            }
            Command::NewChat => {
                let state = session.dispatch(Action::NewChat)?;
                terminal.print_info("Started a new chat.")?;
                if let Some(greeting) = state.messages().last() {
                    terminal.print_bot_line(&greeting.text)?;
                }
            }
            Command::ClearHistory => {
                let state = session.dispatch(Action::ClearHistory)?;
                terminal.print_info("History cleared.")?;
                if let Some(greeting) = state.messages().last() {
                    terminal.print_bot_line(&greeting.text)?;
                }
            }
            Command::History => terminal.print_history(session.state().history())?,
            Command::Attach(path) => match Attachment::from_path(Path::new(&path)) {
                Ok(attachment) => {
                    terminal.print_info(&format!(
                        "Attached {} ({}, {} bytes); it goes out with your next message.",
                        attachment.file_name,
                        attachment.mime_type,
                        attachment.bytes.len()
                    ))?;
                    session.stage_attachment(attachment);
                }
                Err(e) => terminal.print_error(&format!("cannot attach {}: {}", path, e))?,
            },
            Command::Logs => {
                show_logs = !show_logs;
                let logs = last_bot_logs(session.state());
                terminal.print_logs(&logs)?;
                terminal.print_info(if show_logs {
                    "Logs will be shown after each answer."
                } else {
                    "Logs hidden after answers."
                })?;
            }
            Command::Send(text) => {
                run_turn(&terminal, &mut session, responder.as_deref(), &text, show_logs).await?;
            }
        }
    }

    terminal.print_info("Goodbye.")?;
    Ok(())
}

/// Send one message and print the reply as it arrives.
async fn run_turn(
    terminal: &Terminal,
    session: &mut ChatSession,
    responder: Option<&CannedResponder>,
    text: &str,
    show_logs: bool,
) -> Result<()> {
    terminal.print_typing()?;
    let mut printed = String::new();
    let mut typing_shown = true;

    let result = session
        .send(text, |state| {
            // Demo answers are HTML; they are rendered as tables once complete.
            if responder.is_some() || state.phase() == ResponsePhase::Failed {
                return;
            }
            let Some(message) = state.messages().last().filter(|m| m.is_bot()) else {
                return;
            };
            let delta = text_delta(&printed, &message.text);
            if delta == TextDelta::None {
                return;
            }
            if let Err(e) = terminal.print_delta(&delta, typing_shown) {
                warn!(error = %e, "Failed to write to terminal");
            }
            typing_shown = false;
            printed = message.text.clone();
        })
        .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ChatError::Busy) => {
            terminal.end_line()?;
            terminal.print_error("still answering the previous message")?;
            return Ok(());
        }
        Err(e) => {
            terminal.end_line()?;
            terminal.print_error(&e.to_string())?;
            return Ok(());
        }
    };

    if typing_shown {
        terminal.print_delta(&TextDelta::None, true)?;
    }

    let state = session.state();
    let Some(message) = state.messages().last() else {
        return Ok(());
    };

    match outcome {
        TurnOutcome::Failed { reason } => {
            warn!(reason = %reason, "Agent response failed");
            let mid_line = printed.is_empty();
            if !mid_line {
                terminal.end_line()?;
            }
            terminal.print_failed(message, mid_line)?;
        }
        TurnOutcome::Closed { envelopes } => {
            match responder {
                Some(responder) => terminal.print_payload(&responder.reply(text))?,
                None => {
                    if envelopes == 0 {
                        terminal.print_info("(no response)")?;
                    } else {
                        terminal.end_line()?;
                    }
                }
            }
            terminal.print_artifacts(&message.artifacts)?;
        }
    }

    if show_logs && !message.logs.is_empty() {
        terminal.print_logs(&message.logs)?;
    }
    Ok(())
}

fn last_bot_logs(state: &ChatState) -> Vec<String> {
    state
        .messages()
        .iter()
        .rev()
        .find(|m| m.is_bot())
        .map(|m| m.logs.clone())
        .unwrap_or_default()
}
