//! `culina models` -- list models installed on the Ollama host.

use console::style;

use culina_core::runtime::LlmRuntime;
use culina_infra::ollama::OllamaRuntime;

use crate::state::AppState;

/// Print the installed models, marking the configured default.
pub async fn list_models(state: &AppState) -> anyhow::Result<()> {
    let runtime = OllamaRuntime::new(&state.config.runtime_url, &state.config.default_model);

    let installed = runtime.installed_models().await.map_err(|e| {
        anyhow::anyhow!(
            "could not reach Ollama at {}: {e}. Is `ollama serve` running?",
            state.config.runtime_url
        )
    })?;

    println!();
    if installed.is_empty() {
        println!("  {}", style("No models installed. Pull one with `ollama pull`.").dim());
    }
    for model in &installed {
        let marker = if model == &state.config.default_model {
            "*"
        } else {
            " "
        };
        println!("  {} {}", style(marker).cyan().bold(), model);
    }
    println!();
    Ok(())
}
