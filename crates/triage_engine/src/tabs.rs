use std::sync::Mutex;

use thiserror::Error;
use triage_core::{CandidateItem, ItemId};
use triage_logging::{triage_debug, triage_info};

use crate::subscription::{Listeners, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabError {
    #[error("no tab with id {0}")]
    NotFound(ItemId),
    #[error("tab backend unavailable: {0}")]
    Backend(String),
}

/// Browser tab operations the triage session relies on.
#[async_trait::async_trait]
pub trait TabControl: Send + Sync {
    /// Tabs eligible for review, in tab-strip order.
    async fn list_candidates(&self) -> Result<Vec<CandidateItem>, TabError>;
    /// Closing an already-closed tab succeeds.
    async fn close(&self, id: ItemId) -> Result<(), TabError>;
    async fn activate(&self, id: ItemId, window_id: Option<u64>) -> Result<(), TabError>;
    async fn pin(&self, id: ItemId, pinned: bool) -> Result<(), TabError>;
    /// The tab hosting the triage session itself, if any.
    async fn current_tab(&self) -> Result<Option<CandidateItem>, TabError>;
    /// Focuses a tab already showing `url`, or opens a new one.
    async fn open_or_switch(&self, url: &str) -> Result<(), TabError>;
    async fn open_in_new_window(&self, urls: &[String]) -> Result<(), TabError>;
    /// `callback` runs for every tab removal, whoever caused it.
    fn subscribe_removal(&self, callback: Box<dyn Fn(ItemId) + Send + Sync>) -> Subscription;
    /// `callback` receives the new snapshot whenever a tab's title, url, icon or
    /// discarded state changes.
    fn subscribe_property_change(
        &self,
        callback: Box<dyn Fn(CandidateItem) + Send + Sync>,
    ) -> Subscription;
}

#[derive(Debug, Clone)]
struct TabRecord {
    item: CandidateItem,
    pinned: bool,
    active: bool,
}

struct TabTable {
    tabs: Vec<TabRecord>,
    next_id: ItemId,
    next_window: u64,
    own_tab: Option<ItemId>,
}

/// A browser simulated in memory. Closing or editing a tab fires the same events a
/// real browser does.
pub struct InMemoryTabs {
    table: Mutex<TabTable>,
    removals: Listeners<ItemId>,
    changes: Listeners<CandidateItem>,
}

const INTERNAL_SCHEMES: [&str; 3] = ["chrome-extension://", "moz-extension://", "about:"];

impl InMemoryTabs {
    pub fn new(tabs: Vec<CandidateItem>) -> Self {
        let next_id = tabs.iter().map(|tab| tab.id).max().unwrap_or(0) + 1;
        let next_window = tabs.iter().filter_map(|tab| tab.window_id).max().unwrap_or(0) + 1;
        Self {
            table: Mutex::new(TabTable {
                tabs: tabs
                    .into_iter()
                    .map(|item| TabRecord {
                        item,
                        pinned: false,
                        active: false,
                    })
                    .collect(),
                next_id,
                next_window,
                own_tab: None,
            }),
            removals: Listeners::new(),
            changes: Listeners::new(),
        }
    }

    /// Marks `id` as the tab running the triage session.
    pub fn with_own_tab(self, id: ItemId) -> Self {
        self.lock().own_tab = Some(id);
        self
    }

    /// Simulates the user closing a tab directly in the browser.
    pub fn close_externally(&self, id: ItemId) {
        if self.remove(id) {
            triage_info!("Tab {} closed outside the triage session", id);
        }
    }

    /// Simulates the browser editing a tab, e.g. after navigation or a title change.
    /// Returns `false` for unknown ids. Subscribers only hear about changes to the
    /// fields a reviewer sees.
    pub fn update_tab(&self, id: ItemId, edit: impl FnOnce(&mut CandidateItem)) -> bool {
        let changed = {
            let mut table = self.lock();
            let Some(tab) = table.tabs.iter_mut().find(|tab| tab.item.id == id) else {
                return false;
            };
            let before = tab.item.clone();
            edit(&mut tab.item);
            tab.item.id = id;
            let item = &tab.item;
            let visible = item.title != before.title
                || item.url != before.url
                || item.icon_ref != before.icon_ref
                || item.discarded != before.discarded;
            visible.then(|| item.clone())
        };
        if let Some(item) = changed {
            triage_debug!("Tab {} changed", id);
            self.changes.emit(&item);
        }
        true
    }

    pub fn is_pinned(&self, id: ItemId) -> bool {
        self.lock().tabs.iter().any(|tab| tab.item.id == id && tab.pinned)
    }

    pub fn active_tab(&self) -> Option<ItemId> {
        self.lock().tabs.iter().find(|tab| tab.active).map(|tab| tab.item.id)
    }

    pub fn urls(&self) -> Vec<String> {
        self.lock().tabs.iter().map(|tab| tab.item.url.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TabTable> {
        self.table.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn remove(&self, id: ItemId) -> bool {
        let removed = {
            let mut table = self.lock();
            let before = table.tabs.len();
            table.tabs.retain(|tab| tab.item.id != id);
            table.tabs.len() != before
        };
        // Emit outside the lock; listeners may call back into the table.
        if removed {
            self.removals.emit(&id);
        }
        removed
    }

    fn set_active(table: &mut TabTable, id: ItemId) -> Result<(), TabError> {
        if !table.tabs.iter().any(|tab| tab.item.id == id) {
            return Err(TabError::NotFound(id));
        }
        for tab in &mut table.tabs {
            tab.active = tab.item.id == id;
        }
        Ok(())
    }

    fn push_tab(table: &mut TabTable, url: &str, window_id: Option<u64>) -> ItemId {
        let id = table.next_id;
        table.next_id += 1;
        let mut item = CandidateItem::new(id, url, url);
        item.window_id = window_id;
        table.tabs.push(TabRecord {
            item,
            pinned: false,
            active: false,
        });
        id
    }
}

#[async_trait::async_trait]
impl TabControl for InMemoryTabs {
    async fn list_candidates(&self) -> Result<Vec<CandidateItem>, TabError> {
        let table = self.lock();
        Ok(table
            .tabs
            .iter()
            .filter(|tab| Some(tab.item.id) != table.own_tab)
            .filter(|tab| !INTERNAL_SCHEMES.iter().any(|scheme| tab.item.url.starts_with(scheme)))
            .map(|tab| tab.item.clone())
            .collect())
    }

    async fn close(&self, id: ItemId) -> Result<(), TabError> {
        if !self.remove(id) {
            triage_debug!("Tab {} was already closed", id);
        }
        Ok(())
    }

    async fn activate(&self, id: ItemId, _window_id: Option<u64>) -> Result<(), TabError> {
        Self::set_active(&mut self.lock(), id)
    }

    async fn pin(&self, id: ItemId, pinned: bool) -> Result<(), TabError> {
        let mut table = self.lock();
        let tab = table
            .tabs
            .iter_mut()
            .find(|tab| tab.item.id == id)
            .ok_or(TabError::NotFound(id))?;
        tab.pinned = pinned;
        Ok(())
    }

    async fn current_tab(&self) -> Result<Option<CandidateItem>, TabError> {
        let table = self.lock();
        Ok(table.own_tab.and_then(|own| {
            table
                .tabs
                .iter()
                .find(|tab| tab.item.id == own)
                .map(|tab| tab.item.clone())
        }))
    }

    async fn open_or_switch(&self, url: &str) -> Result<(), TabError> {
        let mut table = self.lock();
        let existing = table.tabs.iter().find(|tab| tab.item.url == url).map(|tab| tab.item.id);
        let id = match existing {
            Some(id) => id,
            None => Self::push_tab(&mut table, url, None),
        };
        Self::set_active(&mut table, id)
    }

    async fn open_in_new_window(&self, urls: &[String]) -> Result<(), TabError> {
        if urls.is_empty() {
            return Ok(());
        }
        let mut table = self.lock();
        let window = table.next_window;
        table.next_window += 1;
        for url in urls {
            Self::push_tab(&mut table, url, Some(window));
        }
        Ok(())
    }

    fn subscribe_removal(&self, callback: Box<dyn Fn(ItemId) + Send + Sync>) -> Subscription {
        self.removals.subscribe(move |id| callback(*id))
    }

    fn subscribe_property_change(
        &self,
        callback: Box<dyn Fn(CandidateItem) + Send + Sync>,
    ) -> Subscription {
        self.changes.subscribe(move |item| callback(item.clone()))
    }
}
