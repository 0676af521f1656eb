//! Triage core: review queue, saved-item merge rules and the pure session state machine.
mod color;
mod effect;
mod item;
mod msg;
mod queue;
mod saved;
mod state;
mod update;
mod view_model;

pub use color::{fallback_gradient, gradient_from_color, Rgb, NEUTRAL};
pub use effect::{ActionError, Effect};
pub use item::{merge_by_id, CandidateItem, EnrichmentPatch, ItemId};
pub use msg::{Action, Msg, View};
pub use queue::ReviewQueue;
pub use saved::{
    compact, exclude_saved, toggle_favorite, upsert, SavedItem, SavedItemDraft, SavedKind,
};
pub use state::{AppState, PendingAction};
pub use update::update;
pub use view_model::{AppViewModel, CardView, SavedRowView};
