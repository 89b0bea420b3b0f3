use sitewalker_core::{ControllerConfig, CrawlEvent};
use sitewalker_engine::{run_crawl, SessionOptions};
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn html_page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(body.as_bytes()),
        )
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> (Url, ControllerConfig) {
    let start = Url::parse(&server.uri()).unwrap();
    let config = ControllerConfig::new(start.host_str().unwrap())
        .with_port(start.port().unwrap())
        .with_lock_to_path(false)
        .with_check_fragments(false);
    (start, config)
}

#[tokio::test]
async fn crawl_resolves_links_and_records_failures() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/good">good</a>
            <a href="/missing">missing</a>
        </body></html>"#,
    )
    .await;
    html_page(&server, "/good", "<html><body>fine</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (start, config) = config_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let frontier = run_crawl(start, config, SessionOptions::default(), tx)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.iter().any(|event| matches!(
        event,
        CrawlEvent::NotFound { url } if url.ends_with("/missing")
    )));
    assert!(matches!(events.last(), Some(CrawlEvent::Complete { .. })));

    let report = serde_json::to_value(&frontier).unwrap();
    let base = format!("http://{}:{}", "127.0.0.1", server.address().port());
    let entry = &report[&base];
    assert_eq!(entry[format!("{base}/good")], serde_json::json!(true));
    assert_eq!(entry[format!("{base}/missing")], serde_json::json!(404));
}

#[tokio::test]
async fn path_locked_crawl_never_fetches_off_scope_urls() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/a",
        r#"<html><body>
            <a href="/a/sub">in scope</a>
            <a href="/elsewhere">out of scope</a>
        </body></html>"#,
    )
    .await;
    html_page(&server, "/a/sub", "<html><body>sub</body></html>").await;
    html_page(&server, "/elsewhere", "<html><body>never fetched</body></html>").await;

    let start = Url::parse(&format!("{}/a", server.uri())).unwrap();
    let config = ControllerConfig::new(start.host_str().unwrap())
        .with_port(start.port().unwrap())
        .with_path("/a")
        .with_check_fragments(false);

    let (tx, _rx) = mpsc::unbounded_channel();
    let frontier = run_crawl(start, config, SessionOptions::default(), tx)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests.iter().all(|request| request.url.path() != "/elsewhere"),
        "off-scope URL was fetched despite the path lock"
    );

    // the off-scope link is still known, just unresolved
    let report = serde_json::to_value(&frontier).unwrap();
    let base = format!("http://{}:{}", "127.0.0.1", server.address().port());
    let entry = &report[format!("{base}/a")];
    assert_eq!(entry[format!("{base}/a/sub")], serde_json::json!(true));
    assert_eq!(entry[format!("{base}/elsewhere")], serde_json::json!(""));
}

#[tokio::test]
async fn redirect_targets_are_followed_and_recorded() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/",
        r#"<html><body><a href="/old">old</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    html_page(&server, "/new", "<html><body>moved here</body></html>").await;

    let (start, config) = config_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let frontier = run_crawl(start, config, SessionOptions::default(), tx)
        .await
        .unwrap();

    let mut saw_redirect = false;
    while let Ok(event) = rx.try_recv() {
        if let CrawlEvent::Redirect { url, target, status } = &event {
            assert!(url.ends_with("/old"));
            assert!(target.ends_with("/new"));
            assert_eq!(*status, 301);
            saw_redirect = true;
        }
    }
    assert!(saw_redirect);

    let report = serde_json::to_value(&frontier).unwrap();
    let base = format!("http://{}:{}", "127.0.0.1", server.address().port());
    let record = &report[&base][format!("{base}/old")];
    assert_eq!(record["redirect"], serde_json::json!(true));
    assert_eq!(record["statusCode"], serde_json::json!(301));
    // the target was fetched and resolved under the redirect record
    assert_eq!(record[format!("{base}/new")], serde_json::json!(true));
}
