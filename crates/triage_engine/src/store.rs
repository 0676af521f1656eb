use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use triage_core::{compact, toggle_favorite, upsert, SavedItem, SavedItemDraft};
use triage_logging::{triage_debug, triage_info};
use uuid::Uuid;

use crate::kv::{KeyValueStore, KvError};
use crate::TriageError;

/// Key holding the saved list, most recent first.
pub const SAVED_ITEMS_KEY: &str = "tab_triage_saved_items";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] KvError),
    #[error("saved items are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<StoreError> for TriageError {
    fn from(err: StoreError) -> Self {
        TriageError::StoreUnavailable(err.to_string())
    }
}

/// Url-deduplicated saved items on top of a key-value backend.
///
/// Every mutation is a read-modify-write of the whole list performed under one
/// async lock, so concurrent triage actions cannot lose each other's writes.
pub struct SavedItemStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl SavedItemStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn get_all(&self) -> Result<Vec<SavedItem>, StoreError> {
        match self.kv.get(SAVED_ITEMS_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Inserts `item` at the head, replacing any entry with the same url.
    pub async fn save(&self, item: SavedItem) -> Result<Vec<SavedItem>, StoreError> {
        self.mutate(|items| {
            upsert(items, item);
            true
        })
        .await
    }

    /// Assigns an id and timestamp to `draft`, then saves it.
    pub async fn record(&self, draft: SavedItemDraft) -> Result<(SavedItem, Vec<SavedItem>), StoreError> {
        let item = draft.into_saved(Uuid::new_v4().to_string(), Utc::now().timestamp_millis());
        triage_debug!("Recording {:?} item {} for {}", item.kind, item.id, item.url);
        let items = self.save(item.clone()).await?;
        Ok((item, items))
    }

    pub async fn delete(&self, id: &str) -> Result<Vec<SavedItem>, StoreError> {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        })
        .await
    }

    /// Unknown ids leave the stored list untouched.
    pub async fn toggle_favorite(&self, id: &str) -> Result<Vec<SavedItem>, StoreError> {
        self.mutate(|items| toggle_favorite(items, id).is_some()).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.kv.remove(SAVED_ITEMS_KEY).await?;
        Ok(())
    }

    /// Collapses same-url duplicates left behind by writers that bypassed [`Self::save`].
    pub async fn cleanup_duplicates(&self) -> Result<Vec<SavedItem>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let items = self.get_all().await?;
        if items.is_empty() {
            return Ok(items);
        }
        let before = items.len();
        let cleaned = compact(items);
        if cleaned.len() != before {
            triage_info!("Removed {} duplicate saved items", before - cleaned.len());
        }
        self.persist(&cleaned).await?;
        Ok(cleaned)
    }

    /// `change` reports whether it modified the list; nothing is written if not.
    async fn mutate(
        &self,
        change: impl FnOnce(&mut Vec<SavedItem>) -> bool,
    ) -> Result<Vec<SavedItem>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.get_all().await?;
        if change(&mut items) {
            self.persist(&items).await?;
        } else {
            triage_debug!("Saved list unchanged; skipping write");
        }
        Ok(items)
    }

    async fn persist(&self, items: &[SavedItem]) -> Result<(), StoreError> {
        let value = serde_json::to_value(items)?;
        self.kv.set(SAVED_ITEMS_KEY, value).await?;
        Ok(())
    }
}
