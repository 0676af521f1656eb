use std::io::Cursor;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use triage_core::{CandidateItem, Rgb, NEUTRAL};
use triage_engine::{
    ColorSampler, DominantColorExtractor, FailureKind, FetchSettings, Fetcher, HttpPageInspector,
    HttpSummarizer, PageInspector, ReqwestFetcher, SummarizeError, Summarizer, TriageError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_bytes(color: [u8; 4]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba(color)))
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

#[tokio::test]
async fn fetcher_returns_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::pages());
    let url = format!("{}/doc", server.uri());

    let output = fetcher.fetch(&url).await.expect("fetch ok");
    assert_eq!(output.final_url, url);
    assert!(output.content_type.unwrap().starts_with("text/html"));
    assert_eq!(output.bytes, b"<html>ok</html>");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::pages());
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_follows_redirects_and_reports_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html/>", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::pages());
    let output = fetcher.fetch(&format!("{}/old", server.uri())).await.unwrap();
    assert_eq!(output.final_url, format!("{}/new", server.uri()));

    let err = fetcher
        .fetch(&format!("{}/loop", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn fetcher_rejects_oversized_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("0123456789A", "text/html"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::pages()
    };
    let err = ReqwestFetcher::new(settings)
        .fetch(&format!("{}/large", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 10, .. }));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::pages()
    };
    let err = ReqwestFetcher::new(settings)
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn icon_fetcher_rejects_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html/>", "text/html"))
        .mount(&server)
        .await;

    let err = ReqwestFetcher::new(FetchSettings::icons())
        .fetch(&format!("{}/favicon.ico", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::UnsupportedContentType { .. }));
}

#[tokio::test]
async fn inspector_reads_og_image_and_resolves_relative_urls() {
    triage_logging::initialize_for_tests();
    let server = MockServer::start().await;
    let html = r#"<html><head>
        <title>Plain title</title>
        <meta property="og:image" content="/img/card.png">
        <meta name="description" content="A page">
    </head><body></body></html>"#;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let inspector = HttpPageInspector::new(FetchSettings::pages());
    let item = CandidateItem::new(1, "Article", format!("{}/article", server.uri()));
    let metadata = inspector.fetch_metadata(&item).await.unwrap();

    assert_eq!(metadata.image, Some(format!("{}/img/card.png", server.uri())));
    assert_eq!(metadata.description.as_deref(), Some("A page"));
    assert_eq!(metadata.title.as_deref(), Some("Plain title"));
}

#[tokio::test]
async fn extractor_samples_served_icon() {
    triage_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/favicon.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes([30, 144, 255, 255]), "image/png"))
        .mount(&server)
        .await;

    let extractor = DominantColorExtractor::new(FetchSettings::icons(), Duration::from_secs(2));
    let icon = format!("{}/favicon.png", server.uri());
    assert_eq!(extractor.dominant_color(Some(&icon)).await, Rgb::new(30, 144, 255));
}

#[tokio::test]
async fn extractor_falls_back_when_icon_is_missing_or_slow() {
    triage_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.ico"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.ico"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_raw(png_bytes([255, 0, 0, 255]), "image/png"),
        )
        .mount(&server)
        .await;

    let extractor = DominantColorExtractor::new(FetchSettings::icons(), Duration::from_millis(100));
    let gone = format!("{}/gone.ico", server.uri());
    let slow = format!("{}/slow.ico", server.uri());

    assert_eq!(extractor.dominant_color(Some(&gone)).await, NEUTRAL);
    assert_eq!(extractor.sample(&slow).await, Err(TriageError::FetchTimeout));
    assert_eq!(extractor.dominant_color(None).await, NEUTRAL);
}

#[tokio::test]
async fn extractor_refuses_restricted_icons_and_reads_data_uris() {
    triage_logging::initialize_for_tests();
    use base64::Engine as _;
    let extractor = DominantColorExtractor::new(FetchSettings::icons(), Duration::from_secs(1));

    let restricted = extractor.sample("chrome://favicon/size/16/https://a").await;
    assert!(matches!(restricted, Err(TriageError::CrossOriginRestricted { .. })));

    let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes([0, 128, 0, 255]));
    let inline = format!("data:image/png;base64,{encoded}");
    assert_eq!(extractor.sample(&inline).await, Ok(Rgb::new(0, 128, 0)));
}

#[tokio::test]
async fn summarizer_posts_title_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"summary":"  Short.  "}"#, "application/json"))
        .mount(&server)
        .await;

    let summarizer = HttpSummarizer::new(
        Some(format!("{}/summarize", server.uri())),
        Some("secret".into()),
    );
    let item = CandidateItem::new(3, "Long read", "https://a.example/long");
    assert_eq!(summarizer.summarize(&item).await.unwrap(), "Short.");
}

#[tokio::test]
async fn summarizer_without_key_or_rejected_key_needs_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let item = CandidateItem::new(3, "Long read", "https://a.example/long");

    let unconfigured = HttpSummarizer::new(Some(server.uri()), Some("  ".into()));
    assert_eq!(
        unconfigured.summarize(&item).await,
        Err(SummarizeError::MissingCredential)
    );

    let rejected = HttpSummarizer::new(Some(server.uri()), Some("stale".into()));
    assert_eq!(rejected.summarize(&item).await, Err(SummarizeError::MissingCredential));
}
