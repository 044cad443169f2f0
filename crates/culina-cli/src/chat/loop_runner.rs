//! Main chat loop orchestration.
//!
//! Drives the generation pipeline from a single `tokio::select!` event
//! loop: user input on one branch, pipeline events (token fragments and
//! completions) on the other. All user-visible state lives on this task;
//! fragments and completions are fenced by generation id, and submitting
//! while a reply is still streaming cancels the old generation before the
//! new one starts.

use std::time::Instant;

use console::style;
use uuid::Uuid;

use culina_core::chat::coordinator::{GenerationCoordinator, PipelineEvent};
use culina_core::chat::mention;
use culina_core::runtime::LlmRuntime;
use culina_core::transcript::TranscriptRepository;
use culina_infra::ollama::OllamaRuntime;
use culina_infra::sqlite::transcript::SqliteTranscriptRepository;
use culina_types::chat::MessageRole;

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{ChatRenderer, highlight_mentions};

type Coordinator = GenerationCoordinator<OllamaRuntime, SqliteTranscriptRepository>;

fn thinking_spinner() -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg}")
            .expect("spinner template is valid"),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let runtime = OllamaRuntime::new(&state.config.runtime_url, &state.config.default_model);

    let installed = runtime.installed_models().await.map_err(|e| {
        anyhow::anyhow!(
            "could not reach Ollama at {}: {e}. Is `ollama serve` running?",
            state.config.runtime_url
        )
    })?;
    if !installed.iter().any(|m| m == &state.config.default_model) {
        anyhow::bail!(
            "model '{}' is not installed. Pull it with: ollama pull {}",
            state.config.default_model,
            state.config.default_model
        );
    }

    let mut coordinator = Coordinator::new(
        runtime,
        state.transcripts.clone(),
        state.config.clone(),
        installed,
    );

    let recipe_count = state.catalog.recipe_count().await.ok();
    print_welcome_banner(coordinator.model(), recipe_count);

    let renderer = ChatRenderer::new();
    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("failed to initialize input: {e}"))?;

    // Transient per-generation UI state.
    let mut streamed = String::new();
    let mut spinner: Option<indicatif::ProgressBar> = None;
    let mut turn_started = Instant::now();

    loop {
        tokio::select! {
            event = coordinator.next_event(), if coordinator.is_generating() => match event {
                PipelineEvent::Fragment(fragment) => {
                    // Fencing: drop anything from a generation that is no
                    // longer the active one.
                    if fragment.generation_id != coordinator.current_generation() {
                        continue;
                    }
                    if streamed.is_empty() {
                        if let Some(s) = spinner.take() {
                            s.finish_and_clear();
                        }
                        print!("\n  {} ", style("Culina >").magenta().bold());
                    }
                    renderer.print_streaming_token(&fragment.text);
                    streamed.push_str(&fragment.text);
                }
                PipelineEvent::Completed(outcome) => {
                    let Some(response) = coordinator.finalize(outcome).await else {
                        // Stale completion from a cancelled generation.
                        continue;
                    };
                    if let Some(s) = spinner.take() {
                        s.finish_and_clear();
                    }

                    if response.is_empty() {
                        eprintln!(
                            "\n  {} No answer. Type a message to retry, /exit to quit.",
                            style("!").red().bold()
                        );
                    } else {
                        if streamed.is_empty() {
                            // Nothing streamed (no answer marker observed);
                            // render the full response now.
                            print!("\n  {} ", style("Culina >").magenta().bold());
                            println!("{}", renderer.render_final(&response).trim_end());
                        } else {
                            println!();
                        }
                        renderer.print_stats_footer(
                            turn_started.elapsed().as_millis() as u64,
                            coordinator.model(),
                        );
                    }
                    println!();
                    streamed.clear();
                }
            },

            event = chat_input.read_line() => match event {
                InputEvent::Eof => {
                    coordinator.cancel();
                    tracing::info!(session = ?coordinator.session_id(), "chat session ended");
                    println!("\n  {}", style("Session ended.").dim());
                    break;
                }
                InputEvent::Interrupted => {
                    if coordinator.is_generating() {
                        coordinator.cancel();
                        if let Some(s) = spinner.take() {
                            s.finish_and_clear();
                        }
                        streamed.clear();
                        println!("\n  {}", style("Generation cancelled.").dim());
                    } else {
                        println!(
                            "\n  {}",
                            style("Press Ctrl+D to exit, or keep chatting.").dim()
                        );
                    }
                }
                InputEvent::Message(text) => {
                    if text.is_empty() {
                        continue;
                    }

                    if let Some(cmd) = commands::parse(&text) {
                        if handle_command(cmd, &mut coordinator, state, &mut chat_input).await {
                            break;
                        }
                        continue;
                    }

                    // A new submission while streaming cancels the old
                    // generation; clear its transient render state.
                    if coordinator.is_generating() {
                        if let Some(s) = spinner.take() {
                            s.finish_and_clear();
                        }
                        streamed.clear();
                    }

                    let resolved = mention::resolve(&text, state.catalog.as_ref()).await;
                    if let Err(err) = coordinator.prepare(&resolved.display).await {
                        eprintln!("\n  {} {err}\n", style("!").red().bold());
                        continue;
                    }
                    coordinator.dispatch(resolved.prompt, resolved.display);
                    turn_started = Instant::now();
                    spinner = Some(thinking_spinner());
                }
            }
        }
    }

    Ok(())
}

/// Execute a slash command. Returns true when the loop should exit.
async fn handle_command(
    cmd: ChatCommand,
    coordinator: &mut Coordinator,
    state: &AppState,
    chat_input: &mut ChatInput,
) -> bool {
    match cmd {
        ChatCommand::Help => commands::print_help(),

        ChatCommand::Clear => chat_input.clear(),

        ChatCommand::Exit => {
            coordinator.cancel();
            println!("\n  {}", style("Session ended.").dim());
            return true;
        }

        ChatCommand::New => {
            coordinator.reset_session();
            println!(
                "\n  {} Session reset. The next message starts a fresh one.\n",
                style("*").cyan().bold()
            );
        }

        ChatCommand::History => {
            println!();
            for entry in coordinator.memory().entries() {
                let label = match entry.role {
                    MessageRole::Human => format!("{}", style("You").green().bold()),
                    MessageRole::Assistant => format!("{}", style("Culina").magenta().bold()),
                    MessageRole::System | MessageRole::Tool => continue,
                };
                println!("  {label} {}", highlight_mentions(&entry.content));
            }
            println!();
        }

        ChatCommand::Summary => match coordinator.session_summary().await {
            Some(summary) => println!("\n  {} {summary}\n", style("Summary:").bold()),
            None => println!("\n  {}\n", style("No summary yet.").dim()),
        },

        ChatCommand::Model(None) => {
            println!();
            for model in coordinator.installed_models() {
                let marker = if model == coordinator.model() { "*" } else { " " };
                println!("  {} {}", style(marker).cyan().bold(), model);
            }
            println!();
        }

        ChatCommand::Model(Some(name)) => match coordinator.set_model(&name) {
            Ok(()) => {
                tracing::info!(model = %name, "model switched");
                println!("\n  {} Switched to {name}\n", style("*").cyan().bold());
            }
            Err(err) => eprintln!("\n  {} {err}\n", style("!").red().bold()),
        },

        ChatCommand::Sessions => match state.transcripts.list_sessions().await {
            Ok(sessions) => {
                println!();
                if sessions.is_empty() {
                    println!("  {}", style("No sessions yet.").dim());
                }
                for (i, session) in sessions.iter().enumerate() {
                    let summary = session.summary.as_deref().unwrap_or("-");
                    let current = coordinator.session_id() == Some(session.id);
                    let marker = if current { "*" } else { " " };
                    println!(
                        "  {} {} {} ({} messages) {}",
                        style(marker).cyan().bold(),
                        style(i + 1).bold(),
                        session.started_at.format("%Y-%m-%d %H:%M"),
                        session.message_count,
                        style(summary).dim(),
                    );
                }
                println!();
            }
            Err(err) => eprintln!("\n  {} Failed to list sessions: {err}\n", style("!").red().bold()),
        },

        ChatCommand::Session(selector) => match resolve_session_selector(state, &selector).await {
            Some(session_id) => match coordinator.load_session(session_id).await {
                Ok(()) => {
                    println!(
                        "\n  {} Loaded session ({} messages, model {})\n",
                        style("*").cyan().bold(),
                        coordinator.memory().len(),
                        coordinator.model(),
                    );
                }
                Err(err) => eprintln!("\n  {} {err}\n", style("!").red().bold()),
            },
            None => eprintln!(
                "\n  {} No session matching '{selector}'. Try /sessions first.\n",
                style("!").red().bold()
            ),
        },

        ChatCommand::Recipes(query) => {
            let probe = format!("@{query}");
            let suggestions = mention::suggest(
                &probe,
                probe.len(),
                state.config.suggestion_limit,
                state.catalog.as_ref(),
            )
            .await;
            println!();
            if suggestions.is_empty() {
                println!("  {}", style("No matching recipes.").dim());
            }
            for suggestion in &suggestions {
                println!(
                    "  {}",
                    highlight_mentions(&format!("@[{}]", suggestion.name))
                );
            }
            println!();
        }

        ChatCommand::Unknown(message) => {
            println!(
                "\n  {} {}. Type /help for available commands.\n",
                style("?").yellow().bold(),
                style(message).dim()
            );
        }
    }
    false
}

/// Map a `/session` selector (1-based list index or UUID) to a session id.
async fn resolve_session_selector(state: &AppState, selector: &str) -> Option<Uuid> {
    if let Ok(id) = Uuid::parse_str(selector) {
        return Some(id);
    }
    let index: usize = selector.parse().ok()?;
    let sessions = state.transcripts.list_sessions().await.ok()?;
    sessions.get(index.checked_sub(1)?).map(|s| s.id)
}
