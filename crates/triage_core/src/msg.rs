use crate::{ActionError, CandidateItem, EnrichmentPatch, ItemId, SavedItem};

/// Triage decisions available for the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Close,
    Save,
    Favorite,
    Note,
    Summarize,
    Open,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Review,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// App finished starting; load the first session.
    Started,
    /// User asked for a fresh snapshot of open tabs.
    RefreshRequested,
    /// Engine delivered a tab snapshot together with the (compacted) saved items.
    SessionLoaded {
        candidates: Vec<CandidateItem>,
        saved: Vec<SavedItem>,
    },
    /// Engine could not read tabs or saved items.
    SessionFailed(ActionError),
    /// User picked an action for the current item.
    ActionRequested(Action),
    /// User confirmed the note editor.
    NoteConfirmed(String),
    /// User dismissed the note editor.
    NoteCancelled,
    /// Engine finished the IO for a triage action.
    ActionCompleted {
        item_id: ItemId,
        saved: Option<Vec<SavedItem>>,
    },
    /// Engine could not finish the IO for a triage action.
    ActionFailed { item_id: ItemId, error: ActionError },
    /// The browser closed a tab on its own.
    TabRemoved(ItemId),
    /// The browser changed a tab's title, url, icon or discarded state.
    TabUpdated(CandidateItem),
    /// Enrichment pipeline produced decoration for a candidate.
    Enriched(EnrichmentPatch),
    /// Saved list changed outside a triage action.
    SavedItemsChanged(Vec<SavedItem>),
    /// A saved-list operation failed.
    SavedListFailed(ActionError),
    ViewSelected(View),
    DeleteSavedClicked { id: String },
    ToggleFavoriteClicked { id: String },
    ClearSavedClicked,
    OpenSavedClicked { id: String },
    /// Reopen every saved item in a new window.
    RestoreSavedClicked,
    SettingsOpened,
    SettingsClosed,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
