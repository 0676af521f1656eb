use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use triage_core::{gradient_from_color, CandidateItem, EnrichmentPatch, NEUTRAL};
use triage_logging::{triage_debug, triage_info};

use crate::color::ColorSampler;
use crate::metadata::PageInspector;
use crate::subscription::{Listeners, Subscription};

#[derive(Debug, Clone)]
pub struct EnrichSettings {
    /// Upper bound on concurrently outstanding fetches.
    pub batch_size: usize,
    /// Deadline for each metadata fetch and each icon sample.
    pub item_timeout: Duration,
    /// Pause between consecutive batches.
    pub batch_pause: Duration,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            batch_size: 4,
            item_timeout: Duration::from_millis(2000),
            batch_pause: Duration::from_millis(100),
        }
    }
}

/// What a run produced, for logging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnrichmentReport {
    pub batch_sizes: Vec<usize>,
    pub previews: usize,
    pub gradients: usize,
}

/// Best-effort decorator: gives every candidate a preview image or a gradient.
///
/// Patches are published to subscribers as soon as each item settles.
/// Overlapping runs queue behind each other, so at most `batch_size`
/// fetches are outstanding across the whole pipeline.
pub struct EnrichmentPipeline {
    inspector: Arc<dyn PageInspector>,
    sampler: Arc<dyn ColorSampler>,
    settings: EnrichSettings,
    listeners: Listeners<EnrichmentPatch>,
    run_lock: tokio::sync::Mutex<()>,
}

impl EnrichmentPipeline {
    pub fn new(
        inspector: Arc<dyn PageInspector>,
        sampler: Arc<dyn ColorSampler>,
        settings: EnrichSettings,
    ) -> Self {
        Self {
            inspector,
            sampler,
            settings,
            listeners: Listeners::new(),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &EnrichSettings {
        &self.settings
    }

    pub fn subscribe(
        &self,
        callback: impl Fn(&EnrichmentPatch) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(callback)
    }

    /// Enriches `candidates` batch by batch. Never fails.
    pub async fn run(&self, candidates: &[CandidateItem]) -> EnrichmentReport {
        let _running = self.run_lock.lock().await;
        let mut report = EnrichmentReport::default();
        let batches = batches(candidates, self.settings.batch_size);
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            triage_debug!(
                "Enrichment batch {}/{} with {} items",
                index + 1,
                batch_count,
                batch.len()
            );
            report.batch_sizes.push(batch.len());

            let mut in_flight: FuturesUnordered<_> =
                batch.iter().map(|item| self.enrich_item(item)).collect();
            while let Some(patch) = in_flight.next().await {
                if patch.preview_image.is_some() {
                    report.previews += 1;
                } else {
                    report.gradients += 1;
                }
                self.listeners.emit(&patch);
            }

            if index + 1 < batch_count && !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }
        }

        triage_info!(
            "Enrichment finished: {} items, {} previews, {} gradients",
            candidates.len(),
            report.previews,
            report.gradients
        );
        report
    }

    async fn enrich_item(&self, item: &CandidateItem) -> EnrichmentPatch {
        if !item.discarded {
            let fetch = self.inspector.fetch_metadata(item);
            match tokio::time::timeout(self.settings.item_timeout, fetch).await {
                Ok(Ok(metadata)) => {
                    if let Some(image) = metadata.image {
                        return EnrichmentPatch::preview(item.id, image);
                    }
                    triage_debug!("No preview image for tab {}", item.id);
                }
                Ok(Err(err)) => triage_debug!("Metadata fetch failed for tab {}: {}", item.id, err),
                Err(_) => triage_debug!("Metadata fetch timed out for tab {}", item.id),
            }
        }

        let sample = self.sampler.dominant_color(item.icon_ref.as_deref());
        let color = tokio::time::timeout(self.settings.item_timeout, sample)
            .await
            .unwrap_or(NEUTRAL);
        EnrichmentPatch::gradient(item.id, gradient_from_color(color))
    }
}

/// Consecutive groups of at most `size` items. A zero size is treated as one.
pub fn batches<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}
