use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use triage_core::{AppViewModel, CardView, SavedKind, SavedRowView, View};

const RULE: &str = "----------------------------------------------------------------";

/// Renders the whole screen as plain text.
pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    match view.view {
        View::Review => render_review(&mut out, view),
        View::List => render_saved(&mut out, &view.saved),
    }
    if view.settings_open {
        render_settings(&mut out, view.needs_configuration);
    }
    if let Some(error) = &view.last_error {
        let _ = writeln!(out, "! {error}");
    }
    let _ = write!(out, "{}", prompt(view));
    out
}

fn render_review(out: &mut String, view: &AppViewModel) {
    if view.loading {
        let _ = writeln!(out, "Loading tabs...");
        return;
    }
    match &view.current {
        Some(card) => {
            let _ = writeln!(out, "Tab {} of {}", view.position + 1, view.remaining);
            render_card(out, card);
            if view.busy {
                let _ = writeln!(out, "  (working...)");
            }
        }
        None if view.finished => {
            let _ = writeln!(
                out,
                "All caught up. {} saved item{}.",
                view.saved.len(),
                plural(view.saved.len())
            );
        }
        None => {
            let _ = writeln!(out, "Nothing to review.");
        }
    }
}

fn render_card(out: &mut String, card: &CardView) {
    let _ = writeln!(out, "  {}", card.title);
    let _ = writeln!(out, "  {}", card.url);
    match (&card.preview_image, &card.gradient) {
        (Some(image), _) => {
            let _ = writeln!(out, "  preview: {image}");
        }
        (None, Some(gradient)) => {
            let _ = writeln!(out, "  backdrop: {gradient}");
        }
        (None, None) => {}
    }
}

fn render_saved(out: &mut String, rows: &[SavedRowView]) {
    if rows.is_empty() {
        let _ = writeln!(out, "No saved items.");
        return;
    }
    let _ = writeln!(out, "Saved items ({})", rows.len());
    for (index, row) in rows.iter().enumerate() {
        let star = if row.favorite { "*" } else { " " };
        let _ = writeln!(
            out,
            "{:>3}. {star} [{}] {}  {}",
            index + 1,
            kind_label(row.kind),
            row.title,
            format_millis(row.created_at)
        );
        let _ = writeln!(out, "        {}", row.url);
        if let Some(note) = row.note.as_deref().filter(|note| !note.is_empty()) {
            let _ = writeln!(out, "        note: {note}");
        }
        if let Some(summary) = &row.summary {
            let _ = writeln!(out, "        summary: {summary}");
        }
    }
}

fn render_settings(out: &mut String, needs_configuration: bool) {
    let _ = writeln!(out, "Settings");
    if needs_configuration {
        let _ = writeln!(out, "  Summaries need an endpoint and API key.");
    }
    let _ = writeln!(out, "  endpoint <url> | key <api key> | done");
}

fn prompt(view: &AppViewModel) -> &'static str {
    if view.editing_note {
        "note (empty line cancels)> "
    } else if view.settings_open {
        "settings> "
    } else {
        "> "
    }
}

fn kind_label(kind: SavedKind) -> &'static str {
    match kind {
        SavedKind::Plain => "saved",
        SavedKind::Note => "note",
        SavedKind::Summary => "summary",
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
