use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::item::{CandidateItem, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedKind {
    #[default]
    Plain,
    Note,
    Summary,
}

/// A persisted triage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: String,
    pub source_tab_id: ItemId,
    pub title: String,
    pub url: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default)]
    pub kind: SavedKind,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl SavedItem {
    pub fn has_note(&self) -> bool {
        self.note.as_deref().is_some_and(|note| !note.is_empty())
    }

    /// Preference used to pick the survivor among same-url duplicates.
    pub fn dedup_score(&self) -> u8 {
        2 * u8::from(self.favorite) + u8::from(self.has_note())
    }
}

/// Everything needed to record a saved item except its identity and timestamp,
/// which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedItemDraft {
    pub source_tab_id: ItemId,
    pub title: String,
    pub url: String,
    pub kind: SavedKind,
    pub favorite: bool,
    pub note: Option<String>,
    pub summary: Option<String>,
}

impl SavedItemDraft {
    pub fn from_candidate(item: &CandidateItem, kind: SavedKind) -> Self {
        Self {
            source_tab_id: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
            kind,
            favorite: false,
            note: None,
            summary: None,
        }
    }

    pub fn into_saved(self, id: String, created_at: i64) -> SavedItem {
        SavedItem {
            id,
            source_tab_id: self.source_tab_id,
            title: self.title,
            url: self.url,
            created_at,
            kind: self.kind,
            favorite: self.favorite,
            note: self.note,
            summary: self.summary,
        }
    }
}

/// Replace-on-url insert at the head of a most-recent-first list.
pub fn upsert(items: &mut Vec<SavedItem>, item: SavedItem) {
    items.retain(|existing| existing.url != item.url);
    items.insert(0, item);
}

/// Keeps one entry per url: highest [`SavedItem::dedup_score`], then latest
/// `created_at`. Survivors are ordered by `created_at`, newest first.
pub fn compact(items: Vec<SavedItem>) -> Vec<SavedItem> {
    let mut best: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut order: Vec<String> = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match best.get(&item.url) {
            None => {
                best.insert(item.url.clone(), index);
                order.push(item.url.clone());
            }
            Some(&current) => {
                let held = &items[current];
                let better = (item.dedup_score(), item.created_at)
                    > (held.dedup_score(), held.created_at);
                if better {
                    best.insert(item.url.clone(), index);
                }
            }
        }
    }

    let keep: HashSet<usize> = order.iter().filter_map(|url| best.get(url).copied()).collect();
    let mut survivors: Vec<SavedItem> = items
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .map(|(_, item)| item)
        .collect();
    survivors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    survivors
}

/// Flips the favorite flag of the entry with `id`, returning the updated entry.
pub fn toggle_favorite(items: &mut [SavedItem], id: &str) -> Option<SavedItem> {
    let item = items.iter_mut().find(|item| item.id == id)?;
    item.favorite = !item.favorite;
    Some(item.clone())
}

/// Drops candidates whose url is already saved.
pub fn exclude_saved(candidates: Vec<CandidateItem>, saved: &[SavedItem]) -> Vec<CandidateItem> {
    let saved_urls: HashSet<&str> = saved.iter().map(|item| item.url.as_str()).collect();
    candidates
        .into_iter()
        .filter(|candidate| !saved_urls.contains(candidate.url.as_str()))
        .collect()
}
