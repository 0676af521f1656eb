use std::time::Duration;

use base64::Engine as _;
use image::GenericImageView;
use triage_core::{Rgb, NEUTRAL};
use triage_logging::triage_debug;

use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::TriageError;

pub const DEFAULT_SAMPLE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Derives a representative color for an icon. Always resolves; failures map to [`NEUTRAL`].
#[async_trait::async_trait]
pub trait ColorSampler: Send + Sync {
    async fn dominant_color(&self, icon_ref: Option<&str>) -> Rgb;
}

/// Loads the icon, averages it down to one pixel and reads that pixel.
pub struct DominantColorExtractor {
    fetcher: Box<dyn Fetcher>,
    timeout: Duration,
}

impl DominantColorExtractor {
    pub fn new(settings: FetchSettings, timeout: Duration) -> Self {
        Self {
            fetcher: Box::new(ReqwestFetcher::new(settings)),
            timeout,
        }
    }

    pub fn with_fetcher(fetcher: Box<dyn Fetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Like [`ColorSampler::dominant_color`] but reports why sampling failed.
    pub async fn sample(&self, icon_ref: &str) -> Result<Rgb, TriageError> {
        match tokio::time::timeout(self.timeout, self.load_and_average(icon_ref)).await {
            Ok(result) => result,
            Err(_) => Err(TriageError::FetchTimeout),
        }
    }

    async fn load_and_average(&self, icon_ref: &str) -> Result<Rgb, TriageError> {
        let bytes = match IconSource::classify(icon_ref) {
            IconSource::Remote => self.fetcher.fetch(icon_ref).await?.bytes,
            IconSource::Inline(payload) => decode_data_uri(payload)?,
            IconSource::Restricted => {
                return Err(TriageError::CrossOriginRestricted {
                    icon_ref: icon_ref.to_string(),
                })
            }
        };
        average_color(&bytes)
    }
}

#[async_trait::async_trait]
impl ColorSampler for DominantColorExtractor {
    async fn dominant_color(&self, icon_ref: Option<&str>) -> Rgb {
        let Some(icon_ref) = icon_ref.filter(|icon| !icon.is_empty()) else {
            return NEUTRAL;
        };
        match self.sample(icon_ref).await {
            Ok(color) => color,
            Err(err) => {
                triage_debug!("Color fallback for icon {}: {}", icon_ref, err);
                NEUTRAL
            }
        }
    }
}

enum IconSource<'a> {
    Remote,
    /// Everything after `data:`.
    Inline(&'a str),
    /// Browser-internal or extension urls we are not allowed to read.
    Restricted,
}

impl<'a> IconSource<'a> {
    fn classify(icon_ref: &'a str) -> Self {
        let Some((scheme, rest)) = icon_ref.split_once(':') else {
            return IconSource::Restricted;
        };
        if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
            IconSource::Remote
        } else if scheme.eq_ignore_ascii_case("data") {
            IconSource::Inline(rest)
        } else {
            IconSource::Restricted
        }
    }
}

fn decode_data_uri(payload: &str) -> Result<Vec<u8>, TriageError> {
    let (header, data) = payload
        .split_once(',')
        .ok_or_else(|| TriageError::IconUnreadable("malformed data uri".into()))?;
    if !header.ends_with(";base64") {
        return Err(TriageError::IconUnreadable(
            "only base64 data uris carry bitmaps".into(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|err| TriageError::IconUnreadable(err.to_string()))
}

/// Box-average of the whole bitmap. Fully transparent icons have no color to offer.
pub fn average_color(bytes: &[u8]) -> Result<Rgb, TriageError> {
    let image =
        image::load_from_memory(bytes).map_err(|err| TriageError::IconUnreadable(err.to_string()))?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TriageError::IconUnreadable("empty bitmap".into()));
    }
    let pixel = image.thumbnail_exact(1, 1).to_rgba8();
    let [r, g, b, a] = pixel.get_pixel(0, 0).0;
    if a == 0 {
        return Ok(NEUTRAL);
    }
    Ok(Rgb::new(r, g, b))
}
