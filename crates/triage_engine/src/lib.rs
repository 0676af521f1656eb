//! Triage engine: tab control, saved-item persistence and background enrichment.
mod color;
mod engine;
mod enrich;
mod fetch;
mod kv;
mod metadata;
mod store;
mod subscription;
mod summarize;
mod tabs;
mod types;

pub use color::{average_color, ColorSampler, DominantColorExtractor, DEFAULT_SAMPLE_TIMEOUT};
pub use engine::{EngineCommand, EngineHandle, EngineServices};
pub use enrich::{batches, EnrichSettings, EnrichmentPipeline, EnrichmentReport};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use kv::{
    ensure_storage_dir, write_atomic, FileKeyValueStore, KeyValueStore, KvError,
    MemoryKeyValueStore,
};
pub use metadata::{extract_metadata, HttpPageInspector, PageInspector, PageMetadata};
pub use store::{SavedItemStore, StoreError, SAVED_ITEMS_KEY};
pub use subscription::{Listeners, Subscription};
pub use summarize::{HttpSummarizer, SummarizeError, Summarizer};
pub use tabs::{InMemoryTabs, TabControl, TabError};
pub use types::{
    EngineEvent, FailureKind, FetchError, FetchOutput, TriageError,
};
