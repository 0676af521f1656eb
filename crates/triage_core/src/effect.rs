use std::fmt;

use crate::{CandidateItem, ItemId, SavedItemDraft};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// List tabs and saved items; compact the store first when `compact` is set.
    LoadSession { compact: bool },
    StartEnrichment { candidates: Vec<CandidateItem> },
    CloseTab { id: ItemId },
    /// Persist the draft, then close the tab it came from.
    RecordAndClose { draft: SavedItemDraft },
    /// Summarize, persist the summary, then close.
    SummarizeAndClose { item: CandidateItem },
    ActivateTab { id: ItemId, window_id: Option<u64> },
    DeleteSaved { id: String },
    ToggleFavorite { id: String },
    ClearSaved,
    OpenUrl { url: String },
    OpenInNewWindow { urls: Vec<String> },
}

/// Why the engine could not carry out an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    StoreUnavailable(String),
    MissingCredential,
    TabControl(String),
    Summarize(String),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::StoreUnavailable(message) => write!(f, "store unavailable: {message}"),
            ActionError::MissingCredential => write!(f, "summarizer is not configured"),
            ActionError::TabControl(message) => write!(f, "tab control failed: {message}"),
            ActionError::Summarize(message) => write!(f, "summarization failed: {message}"),
        }
    }
}
