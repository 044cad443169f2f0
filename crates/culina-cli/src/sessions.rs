//! `culina sessions` -- list persisted chat sessions.

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use culina_core::transcript::TranscriptRepository;

use crate::state::AppState;

/// Print all persisted sessions, most recent first.
pub async fn list_sessions(state: &AppState) -> anyhow::Result<()> {
    let sessions = state
        .transcripts
        .list_sessions()
        .await
        .map_err(|e| anyhow::anyhow!("failed to list sessions: {e}"))?;

    if sessions.is_empty() {
        println!("\n  {}\n", console::style("No sessions yet. Start one with `culina chat`.").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Started", "Model", "Messages", "Summary"]);

    for (i, session) in sessions.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(session.started_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&session.model),
            Cell::new(session.message_count),
            Cell::new(session.summary.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    Ok(())
}
