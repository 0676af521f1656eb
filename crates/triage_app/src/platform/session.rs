use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use triage_core::{CandidateItem, ItemId};
use triage_engine::InMemoryTabs;
use triage_logging::triage_info;

/// Url of the tab hosting the triage session itself.
const OWN_TAB_URL: &str = "chrome-extension://tab-triage/index.html";

#[derive(Debug, Clone, Deserialize)]
struct TabEntry {
    title: String,
    url: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    window: Option<u64>,
    #[serde(default)]
    discarded: bool,
}

/// Builds the simulated browser: tabs from `tabs_file` when given, otherwise the sample
/// set, plus a pinned-on-load tab standing for the triage session.
pub fn load_tabs(tabs_file: Option<&Path>) -> anyhow::Result<InMemoryTabs> {
    let mut tabs = match tabs_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading tab session {}", path.display()))?;
            let tabs = parse_tabs(&content)
                .with_context(|| format!("parsing tab session {}", path.display()))?;
            triage_info!("Loaded {} tabs from {:?}", tabs.len(), path);
            tabs
        }
        None => sample_tabs(),
    };

    let own_id = tabs.iter().map(|tab| tab.id).max().unwrap_or(0) + 1;
    tabs.push(CandidateItem::new(own_id, "Tab Triage", OWN_TAB_URL));
    Ok(InMemoryTabs::new(tabs).with_own_tab(own_id))
}

fn parse_tabs(content: &str) -> Result<Vec<CandidateItem>, ron::error::SpannedError> {
    let entries: Vec<TabEntry> = ron::from_str(content)?;
    Ok(entries
        .into_iter()
        .zip(1..)
        .map(|(entry, id): (TabEntry, ItemId)| {
            let mut item = CandidateItem::new(id, entry.title, entry.url);
            item.icon_ref = entry.icon;
            item.window_id = entry.window;
            item.discarded = entry.discarded;
            item
        })
        .collect())
}

fn sample_tabs() -> Vec<CandidateItem> {
    let tab = |id, title: &str, url: &str, icon: &str| {
        CandidateItem::new(id, title, url).with_icon(icon)
    };
    vec![
        tab(1, "React Documentation", "https://react.dev", "https://react.dev/favicon.ico"),
        tab(2, "Tailwind CSS - Rapid UI", "https://tailwindcss.com", "https://tailwindcss.com/favicon.ico"),
        tab(3, "Rust Programming Language", "https://www.rust-lang.org", "https://www.rust-lang.org/static/images/favicon-32x32.png"),
        tab(4, "GitHub - Pull Requests", "https://github.com/pulls", "https://github.com/fluidicon.png"),
        tab(5, "Hacker News", "https://news.ycombinator.com", "https://news.ycombinator.com/favicon.ico"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_get_positional_ids() {
        let tabs = parse_tabs(
            r#"[
                (title: "Docs", url: "https://docs.example", icon: Some("https://docs.example/favicon.ico")),
                (title: "Asleep", url: "https://old.example", window: Some(2), discarded: true),
            ]"#,
        )
        .unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].id, 1);
        assert_eq!(tabs[0].icon_ref.as_deref(), Some("https://docs.example/favicon.ico"));
        assert_eq!(tabs[1].id, 2);
        assert_eq!(tabs[1].window_id, Some(2));
        assert!(tabs[1].discarded);
    }

    #[test]
    fn sample_session_adds_own_tab_last() {
        let urls = load_tabs(None).unwrap().urls();
        assert_eq!(urls.len(), 6);
        assert_eq!(urls.last().map(String::as_str), Some(OWN_TAB_URL));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tabs.ron");
        std::fs::write(&path, "not ron at all [").unwrap();
        assert!(load_tabs(Some(&path)).is_err());
        assert!(load_tabs(Some(&temp.path().join("missing.ron"))).is_err());
    }
}
