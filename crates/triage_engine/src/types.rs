use std::fmt;

use triage_core::{CandidateItem, EnrichmentPatch, ItemId, SavedItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SessionLoaded {
        candidates: Vec<CandidateItem>,
        saved: Vec<SavedItem>,
    },
    SessionFailed(TriageError),
    Enriched(EnrichmentPatch),
    TabRemoved(ItemId),
    TabUpdated(CandidateItem),
    /// IO for a triage action finished. `Ok(Some(_))` carries the saved list after a write.
    ActionSettled {
        item_id: ItemId,
        result: Result<Option<Vec<SavedItem>>, TriageError>,
    },
    SavedItemsChanged(Vec<SavedItem>),
    SavedListFailed(TriageError),
}

/// Failure conditions the engine distinguishes.
///
/// `FetchTimeout`, `CrossOriginRestricted` and `IconUnreadable` never leave the
/// enrichment pipeline; they are turned into fallback values there.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriageError {
    #[error("fetch timed out")]
    FetchTimeout,
    #[error("icon {icon_ref} cannot be sampled from here")]
    CrossOriginRestricted { icon_ref: String },
    #[error("icon unreadable: {0}")]
    IconUnreadable(String),
    #[error("summarizer credentials missing")]
    MissingCredential,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("tab control failed: {0}")]
    TabControl(String),
    #[error("summarization failed: {0}")]
    Summarize(String),
}

/// A fetched body together with where it ended up after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub final_url: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

impl From<FetchError> for TriageError {
    fn from(err: FetchError) -> Self {
        match err.kind {
            FailureKind::Timeout => TriageError::FetchTimeout,
            _ => TriageError::IconUnreadable(err.to_string()),
        }
    }
}
