use std::io;
use std::sync::{mpsc, Arc};
use std::thread;

use triage_core::{CandidateItem, ItemId, SavedItem, SavedItemDraft};
use triage_logging::{triage_error, triage_info, triage_warn};

use crate::enrich::EnrichmentPipeline;
use crate::store::SavedItemStore;
use crate::summarize::Summarizer;
use crate::tabs::TabControl;
use crate::{EngineEvent, TriageError};

/// Work the engine thread performs on behalf of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    LoadSession { compact: bool },
    Enrich { candidates: Vec<CandidateItem> },
    Close { id: ItemId },
    RecordAndClose { draft: SavedItemDraft },
    SummarizeAndClose { item: CandidateItem },
    Activate { id: ItemId, window_id: Option<u64> },
    DeleteSaved { id: String },
    ToggleFavorite { id: String },
    ClearSaved,
    OpenUrl { url: String },
    OpenInNewWindow { urls: Vec<String> },
}

/// Collaborators the engine drives.
#[derive(Clone)]
pub struct EngineServices {
    pub tabs: Arc<dyn TabControl>,
    pub store: Arc<SavedItemStore>,
    pub pipeline: Arc<EnrichmentPipeline>,
    pub summarizer: Arc<dyn Summarizer>,
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    /// Starts the engine thread with its own tokio runtime.
    pub fn new(services: EngineServices) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::Builder::new()
            .name("triage-engine".into())
            .spawn(move || {
                let removal_tx = event_tx.clone();
                let _removals = services.tabs.subscribe_removal(Box::new(move |id| {
                    let _ = removal_tx.send(EngineEvent::TabRemoved(id));
                }));
                let change_tx = event_tx.clone();
                let _changes = services.tabs.subscribe_property_change(Box::new(move |item| {
                    let _ = change_tx.send(EngineEvent::TabUpdated(item));
                }));
                let patch_tx = event_tx.clone();
                let _patches = services.pipeline.subscribe(move |patch| {
                    let _ = patch_tx.send(EngineEvent::Enriched(patch.clone()));
                });

                while let Ok(command) = cmd_rx.recv() {
                    let services = services.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(&services, command, event_tx).await;
                    });
                }
                triage_info!("Engine command channel closed; shutting down");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            triage_error!("Engine thread is gone; command dropped");
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    services: &EngineServices,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::LoadSession { compact } => Some(load_session(services, compact).await),
        EngineCommand::Enrich { candidates } => {
            services.pipeline.run(&candidates).await;
            None
        }
        EngineCommand::Close { id } => Some(EngineEvent::ActionSettled {
            item_id: id,
            result: close_tab(services, id).await.map(|()| None),
        }),
        EngineCommand::RecordAndClose { draft } => {
            let item_id = draft.source_tab_id;
            Some(EngineEvent::ActionSettled {
                item_id,
                result: record_and_close(services, draft).await.map(Some),
            })
        }
        EngineCommand::SummarizeAndClose { item } => Some(EngineEvent::ActionSettled {
            item_id: item.id,
            result: summarize_and_close(services, &item).await.map(Some),
        }),
        EngineCommand::Activate { id, window_id } => {
            if let Err(err) = services.tabs.activate(id, window_id).await {
                triage_warn!("Could not activate tab {}: {}", id, err);
            }
            None
        }
        EngineCommand::DeleteSaved { id } => Some(saved_list_event(services.store.delete(&id).await)),
        EngineCommand::ToggleFavorite { id } => {
            Some(saved_list_event(services.store.toggle_favorite(&id).await))
        }
        EngineCommand::ClearSaved => Some(saved_list_event(
            services.store.clear().await.map(|()| Vec::new()),
        )),
        EngineCommand::OpenUrl { url } => {
            if let Err(err) = services.tabs.open_or_switch(&url).await {
                triage_warn!("Could not open {}: {}", url, err);
            }
            None
        }
        EngineCommand::OpenInNewWindow { urls } => {
            if let Err(err) = services.tabs.open_in_new_window(&urls).await {
                triage_warn!("Could not restore {} urls: {}", urls.len(), err);
            }
            None
        }
    };

    if let Some(event) = event {
        let _ = event_tx.send(event);
    }
}

async fn load_session(services: &EngineServices, compact: bool) -> EngineEvent {
    let saved = if compact {
        services.store.cleanup_duplicates().await
    } else {
        services.store.get_all().await
    };
    let saved = match saved {
        Ok(saved) => saved,
        Err(err) => {
            triage_error!("Could not read saved items: {}", err);
            return EngineEvent::SessionFailed(err.into());
        }
    };
    let candidates = match services.tabs.list_candidates().await {
        Ok(candidates) => candidates,
        Err(err) => {
            triage_error!("Could not list tabs: {}", err);
            return EngineEvent::SessionFailed(TriageError::TabControl(err.to_string()));
        }
    };

    if let Ok(Some(own)) = services.tabs.current_tab().await {
        if let Err(err) = services.tabs.pin(own.id, true).await {
            triage_warn!("Could not pin triage tab {}: {}", own.id, err);
        }
    }

    triage_info!(
        "Session loaded: {} open tabs, {} saved items",
        candidates.len(),
        saved.len()
    );
    EngineEvent::SessionLoaded { candidates, saved }
}

async fn close_tab(services: &EngineServices, id: ItemId) -> Result<(), TriageError> {
    services
        .tabs
        .close(id)
        .await
        .map_err(|err| TriageError::TabControl(err.to_string()))
}

/// The tab is only closed once the item is safely stored.
async fn record_and_close(
    services: &EngineServices,
    draft: SavedItemDraft,
) -> Result<Vec<SavedItem>, TriageError> {
    let tab_id = draft.source_tab_id;
    let (_, items) = services.store.record(draft).await.map_err(|err| {
        triage_error!("Saving tab {} failed: {}", tab_id, err);
        TriageError::from(err)
    })?;
    close_tab(services, tab_id).await?;
    Ok(items)
}

async fn summarize_and_close(
    services: &EngineServices,
    item: &CandidateItem,
) -> Result<Vec<SavedItem>, TriageError> {
    let summary = services.summarizer.summarize(item).await.map_err(|err| {
        triage_warn!("Summarizing tab {} failed: {}", item.id, err);
        TriageError::from(err)
    })?;
    let mut draft = SavedItemDraft::from_candidate(item, triage_core::SavedKind::Summary);
    draft.summary = Some(summary);
    record_and_close(services, draft).await
}

fn saved_list_event<E>(result: Result<Vec<SavedItem>, E>) -> EngineEvent
where
    E: Into<TriageError> + std::fmt::Display,
{
    match result {
        Ok(items) => EngineEvent::SavedItemsChanged(items),
        Err(err) => {
            triage_error!("Saved list update failed: {}", err);
            EngineEvent::SavedListFailed(err.into())
        }
    }
}
