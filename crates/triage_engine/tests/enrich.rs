use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use triage_core::{fallback_gradient, gradient_from_color, CandidateItem, EnrichmentPatch, ItemId, Rgb};
use triage_engine::{
    ColorSampler, DominantColorExtractor, EnrichSettings, EnrichmentPipeline, FailureKind,
    FetchError, FetchOutput, Fetcher, PageInspector, PageMetadata,
};

#[derive(Clone, Copy)]
enum Behaviour {
    Image(&'static str),
    NoImage,
    Fail,
    Hang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Start(ItemId),
    End(ItemId),
}

#[derive(Default)]
struct ScriptedInspector {
    script: HashMap<ItemId, Behaviour>,
    marks: Mutex<Vec<Mark>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedInspector {
    fn new(script: impl IntoIterator<Item = (ItemId, Behaviour)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    fn marks(&self) -> Vec<Mark> {
        self.marks.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PageInspector for ScriptedInspector {
    async fn fetch_metadata(&self, item: &CandidateItem) -> Result<PageMetadata, FetchError> {
        self.marks.lock().unwrap().push(Mark::Start(item.id));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        // Later ids finish first so completion order differs from input order.
        tokio::time::sleep(Duration::from_millis(5 + (20 - item.id.min(20)))).await;
        let behaviour = self.script.get(&item.id).copied().unwrap_or(Behaviour::NoImage);
        if matches!(behaviour, Behaviour::Hang) {
            std::future::pending::<()>().await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.marks.lock().unwrap().push(Mark::End(item.id));
        match behaviour {
            Behaviour::Image(url) => Ok(PageMetadata {
                image: Some(url.to_string()),
                ..PageMetadata::default()
            }),
            Behaviour::NoImage | Behaviour::Hang => Ok(PageMetadata::default()),
            Behaviour::Fail => Err(FetchError {
                kind: FailureKind::Network,
                message: "boom".into(),
            }),
        }
    }
}

struct FixedSampler(Rgb);

#[async_trait::async_trait]
impl ColorSampler for FixedSampler {
    async fn dominant_color(&self, _icon_ref: Option<&str>) -> Rgb {
        self.0
    }
}

struct StalledSampler;

#[async_trait::async_trait]
impl ColorSampler for StalledSampler {
    async fn dominant_color(&self, _icon_ref: Option<&str>) -> Rgb {
        std::future::pending().await
    }
}

struct HangingFetcher;

#[async_trait::async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchOutput, FetchError> {
        std::future::pending().await
    }
}

fn settings(batch_size: usize) -> EnrichSettings {
    EnrichSettings {
        batch_size,
        item_timeout: Duration::from_millis(100),
        batch_pause: Duration::from_millis(5),
    }
}

fn candidates(count: u64) -> Vec<CandidateItem> {
    (1..=count)
        .map(|id| {
            CandidateItem::new(id, format!("tab {id}"), format!("https://{id}.example"))
                .with_icon(format!("https://{id}.example/favicon.ico"))
        })
        .collect()
}

fn collect_patches(pipeline: &EnrichmentPipeline) -> (Arc<Mutex<Vec<EnrichmentPatch>>>, triage_engine::Subscription) {
    let patches = Arc::new(Mutex::new(Vec::new()));
    let sink = patches.clone();
    let subscription = pipeline.subscribe(move |patch| sink.lock().unwrap().push(patch.clone()));
    (patches, subscription)
}

#[tokio::test]
async fn twelve_items_run_as_three_sequential_batches() {
    triage_logging::initialize_for_tests();
    let inspector = Arc::new(ScriptedInspector::new([]));
    let pipeline = EnrichmentPipeline::new(
        inspector.clone(),
        Arc::new(FixedSampler(Rgb::new(10, 20, 30))),
        settings(5),
    );
    let (patches, _subscription) = collect_patches(&pipeline);

    let report = pipeline.run(&candidates(12)).await;
    assert_eq!(report.batch_sizes, vec![5, 5, 2]);
    assert!(inspector.max_active.load(Ordering::SeqCst) <= 5);

    // Every member of a batch settles before the next batch starts.
    let marks = inspector.marks();
    let batch_of = |id: ItemId| ((id - 1) / 5) as usize;
    for (position, mark) in marks.iter().enumerate() {
        if let Mark::Start(id) = mark {
            let earlier_batches_done = marks[..position]
                .iter()
                .filter(|m| matches!(m, Mark::End(other) if batch_of(*other) < batch_of(*id)))
                .count();
            let expected = batch_of(*id) * 5;
            assert_eq!(earlier_batches_done, expected, "tab {id} started early");
        }
    }

    let patches = patches.lock().unwrap();
    assert_eq!(patches.len(), 12);
    let gradient = gradient_from_color(Rgb::new(10, 20, 30));
    assert!(patches.iter().all(|p| p.gradient.as_deref() == Some(gradient.as_str())));
}

#[tokio::test]
async fn overlapping_runs_share_one_batch_budget() {
    triage_logging::initialize_for_tests();
    let inspector = Arc::new(ScriptedInspector::new([]));
    let pipeline = EnrichmentPipeline::new(
        inspector.clone(),
        Arc::new(FixedSampler(Rgb::new(4, 5, 6))),
        settings(2),
    );
    let (patches, _subscription) = collect_patches(&pipeline);

    let first = candidates(6);
    let second = candidates(6);
    let (a, b) = tokio::join!(pipeline.run(&first), pipeline.run(&second));

    assert_eq!(a.batch_sizes, vec![2, 2, 2]);
    assert_eq!(b.batch_sizes, vec![2, 2, 2]);
    assert_eq!(inspector.max_active.load(Ordering::SeqCst), 2);
    assert_eq!(patches.lock().unwrap().len(), 12);
}

#[tokio::test]
async fn images_win_and_failures_fall_back_to_gradient() {
    triage_logging::initialize_for_tests();
    let inspector = Arc::new(ScriptedInspector::new([
        (1, Behaviour::Image("https://1.example/og.png")),
        (2, Behaviour::Fail),
        (3, Behaviour::Hang),
    ]));
    let pipeline = EnrichmentPipeline::new(
        inspector,
        Arc::new(FixedSampler(Rgb::new(1, 2, 3))),
        settings(3),
    );
    let (patches, _subscription) = collect_patches(&pipeline);

    let report = pipeline.run(&candidates(3)).await;
    assert_eq!(report.previews, 1);
    assert_eq!(report.gradients, 2);

    let mut patches = patches.lock().unwrap().clone();
    patches.sort_by_key(|p| p.id);
    let gradient = gradient_from_color(Rgb::new(1, 2, 3));
    assert_eq!(
        patches,
        vec![
            EnrichmentPatch::preview(1, "https://1.example/og.png"),
            EnrichmentPatch::gradient(2, gradient.clone()),
            EnrichmentPatch::gradient(3, gradient),
        ]
    );
}

#[tokio::test]
async fn discarded_tabs_skip_metadata() {
    triage_logging::initialize_for_tests();
    let inspector = Arc::new(ScriptedInspector::new([(1, Behaviour::Image("img"))]));
    let pipeline = EnrichmentPipeline::new(
        inspector.clone(),
        Arc::new(FixedSampler(Rgb::new(9, 9, 9))),
        settings(4),
    );
    let (patches, _subscription) = collect_patches(&pipeline);

    let items = vec![CandidateItem::new(1, "sleeping", "https://1.example").discarded()];
    pipeline.run(&items).await;

    assert!(inspector.marks().is_empty());
    let patches = patches.lock().unwrap();
    assert_eq!(patches[0].preview_image, None);
    assert!(patches[0].gradient.is_some());
}

#[tokio::test]
async fn icon_that_never_loads_yields_fallback_gradient() {
    triage_logging::initialize_for_tests();
    let sampler = DominantColorExtractor::with_fetcher(Box::new(HangingFetcher), Duration::from_millis(30));
    let pipeline = EnrichmentPipeline::new(
        Arc::new(ScriptedInspector::new([(1, Behaviour::Fail)])),
        Arc::new(sampler),
        settings(4),
    );
    let (patches, _subscription) = collect_patches(&pipeline);

    pipeline.run(&candidates(1)).await;
    assert_eq!(
        patches.lock().unwrap().clone(),
        vec![EnrichmentPatch::gradient(1, fallback_gradient())]
    );
}

#[tokio::test]
async fn stalled_sampler_is_cut_off_by_item_deadline() {
    triage_logging::initialize_for_tests();
    let pipeline = EnrichmentPipeline::new(
        Arc::new(ScriptedInspector::new([(1, Behaviour::NoImage)])),
        Arc::new(StalledSampler),
        settings(4),
    );
    let (patches, _subscription) = collect_patches(&pipeline);

    pipeline.run(&candidates(1)).await;
    assert_eq!(
        patches.lock().unwrap().clone(),
        vec![EnrichmentPatch::gradient(1, fallback_gradient())]
    );
}

#[tokio::test]
async fn disposed_subscription_receives_nothing() {
    triage_logging::initialize_for_tests();
    let pipeline = EnrichmentPipeline::new(
        Arc::new(ScriptedInspector::new([])),
        Arc::new(FixedSampler(Rgb::new(0, 0, 0))),
        settings(2),
    );
    let (patches, subscription) = collect_patches(&pipeline);
    subscription.dispose();

    pipeline.run(&candidates(3)).await;
    assert!(patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_input_publishes_nothing() {
    triage_logging::initialize_for_tests();
    let pipeline = EnrichmentPipeline::new(
        Arc::new(ScriptedInspector::new([])),
        Arc::new(FixedSampler(Rgb::new(0, 0, 0))),
        settings(2),
    );
    let report = pipeline.run(&[]).await;
    assert!(report.batch_sizes.is_empty());
}
