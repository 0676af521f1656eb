use crate::saved::exclude_saved;
use crate::{Action, ActionError, AppState, Effect, Msg, SavedItemDraft, SavedKind, View};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => {
            state.set_loading(true);
            vec![Effect::LoadSession { compact: true }]
        }
        Msg::RefreshRequested => request_refresh(&mut state),
        Msg::SessionLoaded { candidates, saved } => {
            let candidates = exclude_saved(candidates, &saved);
            state.queue_mut().load(candidates);
            state.set_saved(saved);
            state.set_loading(false);
            if state.queue().is_empty() {
                Vec::new()
            } else {
                vec![Effect::StartEnrichment {
                    candidates: state.queue().items().to_vec(),
                }]
            }
        }
        Msg::SessionFailed(error) => {
            state.set_loading(false);
            state.set_error(error.to_string());
            Vec::new()
        }
        Msg::ActionRequested(action) => handle_action(&mut state, action),
        Msg::NoteConfirmed(note) => {
            let Some(target) = state.note_target() else {
                return (state, Vec::new());
            };
            state.set_note_target(None);
            // A blank note is the same as cancelling the editor.
            let note = note.trim();
            if note.is_empty() {
                return (state, Vec::new());
            }
            // The tab may have been closed while the editor was open.
            let Some(item) = state.queue().items().iter().find(|i| i.id == target).cloned() else {
                return (state, Vec::new());
            };
            let mut draft = SavedItemDraft::from_candidate(&item, SavedKind::Note);
            draft.note = Some(note.to_string());
            state.begin_action(item.id, Action::Note);
            vec![Effect::RecordAndClose { draft }]
        }
        Msg::NoteCancelled => {
            state.set_note_target(None);
            Vec::new()
        }
        Msg::ActionCompleted { item_id, saved } => {
            state.end_action(item_id);
            state.queue_mut().remove_by_id(item_id);
            if let Some(saved) = saved {
                state.set_saved(saved);
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::ActionFailed { item_id, error } => {
            state.end_action(item_id);
            if error == ActionError::MissingCredential {
                state.request_configuration();
            }
            state.set_error(error.to_string());
            Vec::new()
        }
        Msg::TabRemoved(id) => {
            if state.queue_mut().on_external_removal(id).is_some() {
                if state.note_target() == Some(id) {
                    state.set_note_target(None);
                }
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::TabUpdated(tab) => {
            if state.queue_mut().apply_tab_update(&tab) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Enriched(patch) => {
            if state.queue_mut().apply_enrichment(&patch) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SavedItemsChanged(saved) => {
            state.set_saved(saved);
            Vec::new()
        }
        Msg::SavedListFailed(error) => {
            state.set_error(error.to_string());
            Vec::new()
        }
        Msg::ViewSelected(view) => {
            let previous = state.current_view();
            state.set_view(view);
            if view == View::Review && previous != View::Review {
                request_refresh(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::DeleteSavedClicked { id } => vec![Effect::DeleteSaved { id }],
        Msg::ToggleFavoriteClicked { id } => vec![Effect::ToggleFavorite { id }],
        Msg::ClearSavedClicked => vec![Effect::ClearSaved],
        Msg::OpenSavedClicked { id } => state
            .saved_items()
            .iter()
            .find(|item| item.id == id)
            .map(|item| vec![Effect::OpenUrl { url: item.url.clone() }])
            .unwrap_or_default(),
        Msg::RestoreSavedClicked => {
            let urls: Vec<String> = state.saved_items().iter().map(|i| i.url.clone()).collect();
            if urls.is_empty() {
                Vec::new()
            } else {
                vec![Effect::OpenInNewWindow { urls }]
            }
        }
        Msg::SettingsOpened => {
            state.set_settings_open(true);
            Vec::new()
        }
        Msg::SettingsClosed => {
            state.set_settings_open(false);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn request_refresh(state: &mut AppState) -> Vec<Effect> {
    // A reload while an action is in flight would resurrect the item being closed.
    if state.is_loading() || state.pending().is_some() {
        return Vec::new();
    }
    state.set_note_target(None);
    state.set_loading(true);
    vec![Effect::LoadSession { compact: false }]
}

fn handle_action(state: &mut AppState, action: Action) -> Vec<Effect> {
    if state.is_blocked() {
        return Vec::new();
    }
    let Some(current) = state.queue().current().cloned() else {
        return Vec::new();
    };

    match action {
        Action::Skip => {
            state.queue_mut().skip();
            state.mark_dirty();
            Vec::new()
        }
        Action::Open => vec![Effect::ActivateTab {
            id: current.id,
            window_id: current.window_id,
        }],
        Action::Note => {
            state.set_note_target(Some(current.id));
            Vec::new()
        }
        Action::Close => {
            state.begin_action(current.id, action);
            vec![Effect::CloseTab { id: current.id }]
        }
        Action::Save | Action::Favorite => {
            let mut draft = SavedItemDraft::from_candidate(&current, SavedKind::Plain);
            draft.favorite = action == Action::Favorite;
            state.begin_action(current.id, action);
            vec![Effect::RecordAndClose { draft }]
        }
        Action::Summarize => {
            state.begin_action(current.id, action);
            vec![Effect::SummarizeAndClose { item: current }]
        }
    }
}
