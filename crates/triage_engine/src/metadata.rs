use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use scraper::{Html, Selector};
use triage_core::CandidateItem;
use url::Url;

use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::FetchError;

/// Preview-relevant fields of a page. Every field is optional; pages routinely omit them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageMetadata {
    pub image: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
}

/// Reads preview metadata for an open tab.
#[async_trait::async_trait]
pub trait PageInspector: Send + Sync {
    async fn fetch_metadata(&self, item: &CandidateItem) -> Result<PageMetadata, FetchError>;
}

/// Fetches the tab's url over HTTP and reads Open Graph / Twitter / `<title>` tags.
pub struct HttpPageInspector {
    fetcher: Box<dyn Fetcher>,
}

impl HttpPageInspector {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            fetcher: Box::new(ReqwestFetcher::new(settings)),
        }
    }

    pub fn with_fetcher(fetcher: Box<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl PageInspector for HttpPageInspector {
    async fn fetch_metadata(&self, item: &CandidateItem) -> Result<PageMetadata, FetchError> {
        let output = self.fetcher.fetch(&item.url).await?;
        let html = decode_document(&output.bytes, output.content_type.as_deref());
        let base = Url::parse(&output.final_url).ok();
        Ok(extract_metadata(&html, base.as_ref()))
    }
}

/// Pulls preview fields out of an HTML document. Relative image urls are resolved
/// against `base` when given.
pub fn extract_metadata(html: &str, base: Option<&Url>) -> PageMetadata {
    let doc = Html::parse_document(html);

    let image = meta_content(&doc, "og:image")
        .or_else(|| meta_content(&doc, "twitter:image"))
        .or_else(|| link_href(&doc, "apple-touch-icon"))
        .map(|raw| resolve(&raw, base));
    let description =
        meta_content(&doc, "og:description").or_else(|| meta_content(&doc, "description"));
    let title = meta_content(&doc, "og:title").or_else(|| document_title(&doc));

    PageMetadata {
        image,
        description,
        title,
    }
}

fn meta_content(doc: &Html, key: &str) -> Option<String> {
    ["property", "name"].iter().find_map(|attr| {
        let selector = Selector::parse(&format!(r#"meta[{attr}="{key}"]"#)).ok()?;
        doc.select(&selector)
            .filter_map(|node| node.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(ToOwned::to_owned)
    })
}

fn link_href(doc: &Html, rel: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"link[rel="{rel}"]"#)).ok()?;
    doc.select(&selector)
        .filter_map(|node| node.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(ToOwned::to_owned)
}

fn document_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn resolve(raw: &str, base: Option<&Url>) -> String {
    match base.and_then(|base| base.join(raw).ok()) {
        Some(joined) => joined.to_string(),
        None => raw.to_string(),
    }
}

/// Decode page bytes as text: BOM, then Content-Type charset, then detection.
fn decode_document(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(&['"', '\''][..]).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_graph_wins_over_fallbacks() {
        let html = r#"<html><head>
            <title>Plain title</title>
            <meta property="og:title" content="OG title">
            <meta property="og:image" content="https://cdn.example/og.png">
            <meta name="twitter:image" content="https://cdn.example/tw.png">
            <meta name="description" content="plain description">
            <meta property="og:description" content="og description">
        </head></html>"#;
        let meta = extract_metadata(html, None);
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example/og.png"));
        assert_eq!(meta.title.as_deref(), Some("OG title"));
        assert_eq!(meta.description.as_deref(), Some("og description"));
    }

    #[test]
    fn falls_back_to_touch_icon_and_title() {
        let base = Url::parse("https://site.example/blog/post").unwrap();
        let html = r#"<html><head>
            <title> Post </title>
            <link rel="apple-touch-icon" href="/touch.png">
        </head></html>"#;
        let meta = extract_metadata(html, Some(&base));
        assert_eq!(meta.image.as_deref(), Some("https://site.example/touch.png"));
        assert_eq!(meta.title.as_deref(), Some("Post"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn empty_content_is_ignored() {
        let html = r#"<meta property="og:image" content="  "><meta name="twitter:image" content="t.png">"#;
        assert_eq!(extract_metadata(html, None).image.as_deref(), Some("t.png"));
    }

    #[test]
    fn charset_is_read_from_content_type() {
        assert_eq!(
            charset_label("text/html; Charset=\"ISO-8859-1\"").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn latin1_document_is_decoded() {
        let bytes = b"<title>caf\xe9</title>";
        let text = decode_document(bytes, Some("text/html; charset=iso-8859-1"));
        assert!(text.contains("café"));
    }
}
