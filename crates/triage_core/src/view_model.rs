use crate::{CandidateItem, ItemId, SavedItem, SavedKind, View};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub view: View,
    pub loading: bool,
    pub finished: bool,
    pub remaining: usize,
    pub position: usize,
    pub current: Option<CardView>,
    pub busy: bool,
    pub editing_note: bool,
    pub settings_open: bool,
    pub needs_configuration: bool,
    pub last_error: Option<String>,
    pub saved: Vec<SavedRowView>,
    pub dirty: bool,
}

/// The card shown for the item under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: ItemId,
    pub title: String,
    pub url: String,
    pub preview_image: Option<String>,
    pub gradient: Option<String>,
}

impl From<&CandidateItem> for CardView {
    fn from(item: &CandidateItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
            preview_image: item.preview_image.clone(),
            gradient: item.gradient.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRowView {
    pub id: String,
    pub title: String,
    pub url: String,
    pub kind: SavedKind,
    pub favorite: bool,
    pub created_at: i64,
    pub note: Option<String>,
    pub summary: Option<String>,
}

impl From<&SavedItem> for SavedRowView {
    fn from(item: &SavedItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            kind: item.kind,
            favorite: item.favorite,
            created_at: item.created_at,
            note: item.note.clone(),
            summary: item.summary.clone(),
        }
    }
}
