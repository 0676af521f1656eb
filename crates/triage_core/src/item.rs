use serde::{Deserialize, Serialize};

/// Session-scoped handle of a tab under review.
pub type ItemId = u64;

/// A tab waiting for a triage decision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: ItemId,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon_ref: Option<String>,
    #[serde(default)]
    pub window_id: Option<u64>,
    #[serde(default)]
    pub preview_image: Option<String>,
    #[serde(default)]
    pub gradient: Option<String>,
    /// Suspended by the browser; metadata fetches are not attempted.
    #[serde(default)]
    pub discarded: bool,
}

impl CandidateItem {
    pub fn new(id: ItemId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon_ref: impl Into<String>) -> Self {
        self.icon_ref = Some(icon_ref.into());
        self
    }

    pub fn discarded(mut self) -> Self {
        self.discarded = true;
        self
    }
}

/// Decoration produced by the enrichment pipeline for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentPatch {
    pub id: ItemId,
    pub preview_image: Option<String>,
    pub gradient: Option<String>,
}

impl EnrichmentPatch {
    pub fn preview(id: ItemId, image: impl Into<String>) -> Self {
        Self {
            id,
            preview_image: Some(image.into()),
            gradient: None,
        }
    }

    pub fn gradient(id: ItemId, gradient: impl Into<String>) -> Self {
        Self {
            id,
            preview_image: None,
            gradient: Some(gradient.into()),
        }
    }
}

/// Shallow merge of `patch` into `item`. Fields absent from the patch are left alone,
/// so applying the same patch twice yields the same item.
///
/// Returns `false` without touching `item` when the ids differ.
pub fn merge_by_id(item: &mut CandidateItem, patch: &EnrichmentPatch) -> bool {
    if item.id != patch.id {
        return false;
    }
    if let Some(image) = &patch.preview_image {
        item.preview_image = Some(image.clone());
    }
    if let Some(gradient) = &patch.gradient {
        item.gradient = Some(gradient.clone());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_idempotent() {
        let mut item = CandidateItem::new(3, "t", "https://a");
        let patch = EnrichmentPatch::preview(3, "https://a/og.png");
        assert!(merge_by_id(&mut item, &patch));
        let once = item.clone();
        assert!(merge_by_id(&mut item, &patch));
        assert_eq!(item, once);
    }

    #[test]
    fn merge_keeps_fields_missing_from_patch() {
        let mut item = CandidateItem::new(1, "t", "https://a");
        merge_by_id(&mut item, &EnrichmentPatch::preview(1, "img"));
        merge_by_id(&mut item, &EnrichmentPatch::gradient(1, "grad"));
        assert_eq!(item.preview_image.as_deref(), Some("img"));
        assert_eq!(item.gradient.as_deref(), Some("grad"));
    }

    #[test]
    fn merge_ignores_other_ids() {
        let mut item = CandidateItem::new(1, "t", "https://a");
        assert!(!merge_by_id(&mut item, &EnrichmentPatch::preview(2, "img")));
        assert_eq!(item.preview_image, None);
    }
}
