use std::collections::HashSet;

use crate::item::{merge_by_id, CandidateItem, EnrichmentPatch, ItemId};

/// Ordered candidates plus the index of the one under review.
///
/// Items are only ever removed by id. The cursor is a view over the sequence and
/// is adjusted on removal so the same logical item stays under it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewQueue {
    items: Vec<CandidateItem>,
    cursor: usize,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents and rewinds the cursor. Later duplicates of an id are dropped.
    pub fn load(&mut self, candidates: Vec<CandidateItem>) {
        let mut seen = HashSet::with_capacity(candidates.len());
        self.items = candidates
            .into_iter()
            .filter(|item| seen.insert(item.id))
            .collect();
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&CandidateItem> {
        self.items.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn items(&self) -> &[CandidateItem] {
        &self.items
    }

    /// Items not yet passed by the cursor, current one first.
    pub fn remaining(&self) -> &[CandidateItem] {
        &self.items[self.cursor.min(self.items.len())..]
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.position(id).is_some()
    }

    /// Removes the item with `id`. Returns the removed item, or `None` if it was
    /// already gone.
    pub fn remove_by_id(&mut self, id: ItemId) -> Option<CandidateItem> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        if index < self.cursor {
            self.cursor = self.cursor.saturating_sub(1);
        }
        self.cursor = self.cursor.min(self.items.len());
        Some(removed)
    }

    /// The environment closed the tab on its own.
    pub fn on_external_removal(&mut self, id: ItemId) -> Option<CandidateItem> {
        self.remove_by_id(id)
    }

    /// Moves past the current item without removing it.
    pub fn skip(&mut self) {
        if self.cursor < self.items.len() {
            self.cursor += 1;
        }
    }

    /// Returns `false` when the patch targets an item no longer in the queue.
    pub fn apply_enrichment(&mut self, patch: &EnrichmentPatch) -> bool {
        self.items
            .iter_mut()
            .find(|item| item.id == patch.id)
            .is_some_and(|item| merge_by_id(item, patch))
    }

    /// Refreshes the browser-owned fields of a queued tab. Decorations from the
    /// enrichment pipeline are kept. Returns `false` for ids not in the queue or
    /// when nothing changed.
    pub fn apply_tab_update(&mut self, tab: &CandidateItem) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == tab.id) else {
            return false;
        };
        let updated = CandidateItem {
            preview_image: item.preview_image.clone(),
            gradient: item.gradient.clone(),
            ..tab.clone()
        };
        let changed = *item != updated;
        *item = updated;
        changed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(ids: &[ItemId]) -> ReviewQueue {
        let mut queue = ReviewQueue::new();
        queue.load(
            ids.iter()
                .map(|id| CandidateItem::new(*id, format!("tab {id}"), format!("https://{id}.example")))
                .collect(),
        );
        queue
    }

    #[test]
    fn load_rewinds_and_dedupes_ids() {
        let mut queue = queue_of(&[1, 2, 2, 3]);
        queue.skip();
        queue.load(queue.items().to_vec());
        assert_eq!(queue.cursor(), 0);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn removal_before_cursor_keeps_current_item() {
        let mut queue = queue_of(&[1, 2, 3, 4]);
        queue.skip();
        queue.skip();
        assert_eq!(queue.current().map(|i| i.id), Some(3));
        queue.on_external_removal(1);
        assert_eq!(queue.current().map(|i| i.id), Some(3));
        assert_eq!(queue.cursor(), 1);
    }

    #[test]
    fn removal_of_current_advances_to_next() {
        let mut queue = queue_of(&[1, 2, 3]);
        queue.skip();
        queue.remove_by_id(2);
        assert_eq!(queue.current().map(|i| i.id), Some(3));
    }

    #[test]
    fn removing_last_current_clamps_to_finished() {
        let mut queue = queue_of(&[1, 2]);
        queue.skip();
        queue.remove_by_id(2);
        assert_eq!(queue.cursor(), 1);
        assert!(queue.is_finished());
        assert!(queue.current().is_none());
    }

    #[test]
    fn skip_saturates_at_length() {
        let mut queue = queue_of(&[1]);
        queue.skip();
        queue.skip();
        assert_eq!(queue.cursor(), 1);
    }

    #[test]
    fn tab_update_keeps_decorations() {
        let mut queue = queue_of(&[1, 2]);
        queue.apply_enrichment(&EnrichmentPatch::gradient(2, "g"));
        let mut renamed = CandidateItem::new(2, "renamed", "https://2.example/next");
        renamed.discarded = true;

        assert!(queue.apply_tab_update(&renamed));
        let item = &queue.items()[1];
        assert_eq!(item.title, "renamed");
        assert_eq!(item.url, "https://2.example/next");
        assert!(item.discarded);
        assert_eq!(item.gradient.as_deref(), Some("g"));
        assert!(!queue.apply_tab_update(&renamed));
    }

    #[test]
    fn tab_update_for_removed_id_is_noop() {
        let mut queue = queue_of(&[1, 2]);
        queue.on_external_removal(2);
        let before = queue.clone();
        assert!(!queue.apply_tab_update(&CandidateItem::new(2, "late", "https://late.example")));
        assert_eq!(queue, before);
    }

    #[test]
    fn unknown_id_is_noop() {
        let mut queue = queue_of(&[1, 2]);
        let before = queue.clone();
        assert!(queue.remove_by_id(42).is_none());
        assert_eq!(queue, before);
    }
}
