use crate::view_model::{AppViewModel, CardView, SavedRowView};
use crate::{Action, ItemId, ReviewQueue, SavedItem, View};

/// A triage action whose IO is in flight. The queue keeps the item until the
/// engine confirms, so a failed write never loses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAction {
    pub item_id: ItemId,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    queue: ReviewQueue,
    saved: Vec<SavedItem>,
    view: View,
    loading: bool,
    pending: Option<PendingAction>,
    note_target: Option<ItemId>,
    settings_open: bool,
    needs_configuration: bool,
    last_error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            view: self.view,
            loading: self.loading,
            finished: self.queue.is_finished(),
            remaining: self.queue.len(),
            position: self.queue.cursor(),
            current: self.queue.current().map(CardView::from),
            busy: self.pending.is_some(),
            editing_note: self.note_target.is_some(),
            settings_open: self.settings_open,
            needs_configuration: self.needs_configuration,
            last_error: self.last_error.clone(),
            saved: self.saved.iter().map(SavedRowView::from).collect(),
            dirty: self.dirty,
        }
    }

    pub fn queue(&self) -> &ReviewQueue {
        &self.queue
    }

    pub fn saved_items(&self) -> &[SavedItem] {
        &self.saved
    }

    pub fn pending(&self) -> Option<PendingAction> {
        self.pending
    }

    pub fn needs_configuration(&self) -> bool {
        self.needs_configuration
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn queue_mut(&mut self) -> &mut ReviewQueue {
        &mut self.queue
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.mark_dirty();
    }

    pub(crate) fn set_saved(&mut self, saved: Vec<SavedItem>) {
        self.saved = saved;
        self.mark_dirty();
    }

    pub(crate) fn current_view(&self) -> View {
        self.view
    }

    pub(crate) fn set_view(&mut self, view: View) {
        self.view = view;
        self.mark_dirty();
    }

    pub(crate) fn begin_action(&mut self, item_id: ItemId, action: Action) {
        self.pending = Some(PendingAction { item_id, action });
        self.last_error = None;
        self.mark_dirty();
    }

    /// Clears the pending marker if it belongs to `item_id`.
    pub(crate) fn end_action(&mut self, item_id: ItemId) -> Option<PendingAction> {
        let pending = self.pending.filter(|pending| pending.item_id == item_id)?;
        self.pending = None;
        self.mark_dirty();
        Some(pending)
    }

    pub(crate) fn note_target(&self) -> Option<ItemId> {
        self.note_target
    }

    pub(crate) fn set_note_target(&mut self, target: Option<ItemId>) {
        self.note_target = target;
        self.mark_dirty();
    }

    pub(crate) fn set_settings_open(&mut self, open: bool) {
        self.settings_open = open;
        if !open {
            self.needs_configuration = false;
        }
        self.mark_dirty();
    }

    pub(crate) fn request_configuration(&mut self) {
        self.needs_configuration = true;
        self.settings_open = true;
        self.mark_dirty();
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
        self.mark_dirty();
    }

    /// True while input that starts a triage action must be ignored.
    pub(crate) fn is_blocked(&self) -> bool {
        self.loading || self.pending.is_some() || self.note_target.is_some()
    }
}
