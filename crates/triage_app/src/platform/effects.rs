use std::time::Duration;

use triage_core::{ActionError, Effect, Msg};
use triage_engine::{EngineCommand, EngineEvent, EngineHandle, EngineServices, TriageError};
use triage_logging::{triage_debug, triage_warn};

/// Forwards effects to the engine thread and turns its events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(services: EngineServices) -> std::io::Result<Self> {
        Ok(Self {
            engine: EngineHandle::new(services)?,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            let command = command_for(effect);
            triage_debug!("Engine command {:?}", command);
            self.engine.send(command);
        }
    }

    /// Waits up to `timeout` for the first event, then drains whatever else is ready.
    pub fn poll(&self, timeout: Duration) -> Vec<Msg> {
        let Some(first) = self.engine.recv_timeout(timeout) else {
            return Vec::new();
        };
        std::iter::once(first)
            .chain(std::iter::from_fn(|| self.engine.try_recv()))
            .map(msg_for)
            .collect()
    }
}

pub fn command_for(effect: Effect) -> EngineCommand {
    match effect {
        Effect::LoadSession { compact } => EngineCommand::LoadSession { compact },
        Effect::StartEnrichment { candidates } => EngineCommand::Enrich { candidates },
        Effect::CloseTab { id } => EngineCommand::Close { id },
        Effect::RecordAndClose { draft } => EngineCommand::RecordAndClose { draft },
        Effect::SummarizeAndClose { item } => EngineCommand::SummarizeAndClose { item },
        Effect::ActivateTab { id, window_id } => EngineCommand::Activate { id, window_id },
        Effect::DeleteSaved { id } => EngineCommand::DeleteSaved { id },
        Effect::ToggleFavorite { id } => EngineCommand::ToggleFavorite { id },
        Effect::ClearSaved => EngineCommand::ClearSaved,
        Effect::OpenUrl { url } => EngineCommand::OpenUrl { url },
        Effect::OpenInNewWindow { urls } => EngineCommand::OpenInNewWindow { urls },
    }
}

pub fn msg_for(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SessionLoaded { candidates, saved } => Msg::SessionLoaded { candidates, saved },
        EngineEvent::SessionFailed(err) => Msg::SessionFailed(action_error(err)),
        EngineEvent::Enriched(patch) => Msg::Enriched(patch),
        EngineEvent::TabRemoved(id) => Msg::TabRemoved(id),
        EngineEvent::TabUpdated(item) => Msg::TabUpdated(item),
        EngineEvent::ActionSettled { item_id, result } => match result {
            Ok(saved) => Msg::ActionCompleted { item_id, saved },
            Err(err) => {
                triage_warn!("Action on tab {} failed: {}", item_id, err);
                Msg::ActionFailed {
                    item_id,
                    error: action_error(err),
                }
            }
        },
        EngineEvent::SavedItemsChanged(saved) => Msg::SavedItemsChanged(saved),
        EngineEvent::SavedListFailed(err) => Msg::SavedListFailed(action_error(err)),
    }
}

fn action_error(err: TriageError) -> ActionError {
    match err {
        TriageError::MissingCredential => ActionError::MissingCredential,
        TriageError::StoreUnavailable(message) => ActionError::StoreUnavailable(message),
        TriageError::TabControl(message) => ActionError::TabControl(message),
        TriageError::Summarize(message) => ActionError::Summarize(message),
        // Fetch failures only escape the pipeline through the summarizer.
        other @ (TriageError::FetchTimeout
        | TriageError::CrossOriginRestricted { .. }
        | TriageError::IconUnreadable(_)) => ActionError::Summarize(other.to_string()),
    }
}
