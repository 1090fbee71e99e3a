use yuque_exporter::api::{ApiClient, AssetSource, RemoteCatalog};
use yuque_exporter::export::Exporter;
use yuque_exporter::storage::ExportPaths;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(uri: String) -> ApiClient {
    ApiClient::new("test_token".into(), Some(uri))
        .unwrap()
        .disable_throttle()
        .with_retries(2, 0)
}

fn doc_page(start: usize, len: usize) -> serde_json::Value {
    let docs: Vec<_> = (start..start + len)
        .map(|i| {
            serde_json::json!({
                "id": i,
                "title": format!("Doc {}", i),
                "slug": format!("doc-{}", i),
                "updated_at": "2024-03-01T08:00:00.000Z",
                "content_updated_at": "2024-03-01T08:00:00.000Z"
            })
        })
        .collect();
    serde_json::json!({ "data": docs })
}

#[tokio::test]
async fn test_list_repositories_success() {
    let mock_server = MockServer::start().await;

    let response = serde_json::json!({
        "data": [
            { "id": 11, "slug": "wiki", "name": "Wiki" },
            { "id": 12, "slug": "notes", "name": "Notes" }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/users/team/repos"))
        .and(header("X-Auth-Token", "test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    // Run blocking client in a blocking context
    let result = tokio::task::spawn_blocking(move || client(uri).list_repositories("team"))
        .await
        .unwrap();

    let repos = result.unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos["wiki"].remote_id, 11);
}

#[tokio::test]
async fn test_list_documents_paginates_until_empty_page() {
    let mock_server = MockServer::start().await;

    for (offset, size) in [(0, 100), (100, 100), (200, 37), (300, 0)] {
        Mock::given(method("GET"))
            .and(path("/repos/9/docs"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc_page(offset, size)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || client(uri).list_documents(9))
        .await
        .unwrap();

    let docs = result.unwrap();
    assert_eq!(docs.len(), 237);
    assert_eq!(docs[236].slug, "doc-236");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
}

#[tokio::test]
async fn test_api_error_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/team/repos"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || client(uri).list_repositories("team"))
        .await
        .unwrap();

    if let Err(yuque_exporter::Error::Api { status, .. }) = result {
        assert_eq!(status, 401);
    } else {
        panic!("Expected API error");
    }
}

#[tokio::test]
async fn test_malformed_envelope_is_distinct_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs/intro"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "soft error" })),
        )
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || client(uri).fetch_document(9, "intro"))
        .await
        .unwrap();

    assert!(matches!(
        result,
        Err(yuque_exporter::Error::Malformed { .. })
    ));
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs/intro"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs/intro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "id": 5, "slug": "intro", "title": "Intro", "body": "# Hi" }
        })))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || client(uri).fetch_document(9, "intro"))
        .await
        .unwrap();

    let doc = result.unwrap();
    assert_eq!(doc.body(), "# Hi");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetch_asset_sends_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/yuque/0/2024/png/pic.png"))
        .and(header("X-Auth-Token", "test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/yuque/0/2024/png/pic.png", mock_server.uri());
    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || client(uri).fetch_asset(&url))
        .await
        .unwrap();

    assert_eq!(result.unwrap(), b"\x89PNG".to_vec());
}

#[tokio::test]
async fn test_dump_repository_end_to_end() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/users/team/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": 9, "slug": "wiki", "name": "Wiki" }]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": 1,
                "title": "Getting Started",
                "slug": "guide.start",
                "updated_at": "2024-03-01T08:00:00.000Z",
                "content_updated_at": "2024-03-01T08:00:00.000Z"
            }]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&mock_server)
        .await;

    let body = format!(
        "<a name=\"t1\"></a>\n## Start<br />\n![diagram]({}/yuque/0/2024/png/1/diagram.png#align=left)",
        uri
    );
    Mock::given(method("GET"))
        .and(path("/repos/9/docs/guide.start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "id": 1,
                "slug": "guide.start",
                "title": "Getting Started",
                "description": "First steps",
                "body": body
            }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/yuque/0/2024/png/1/diagram.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = tempfile::TempDir::new().unwrap();
    let paths = ExportPaths::new(temp.path().join("wiki"));
    let export_paths = paths.clone();

    let result = tokio::task::spawn_blocking(move || {
        let client = client(uri);
        Exporter::new(&client, &client, export_paths).dump_repository("team", "wiki")
    })
    .await
    .unwrap();

    let report = result.unwrap();
    assert_eq!(report.exported, 1);
    assert_eq!(report.assets_stored, 1);
    assert!(report.is_complete());

    let markdown =
        std::fs::read_to_string(paths.export_dir.join("guide").join("guide.start.md")).unwrap();
    assert_eq!(
        markdown,
        "---\ntitle: Getting Started\ndescription: First steps\ndoc_id: 1\n---\n\n\
         \n## Start\n\n![diagram](./../assets/diagram.png)"
    );
    assert_eq!(
        std::fs::read(paths.assets_dir.join("diagram.png")).unwrap(),
        b"PNGDATA"
    );
    assert!(paths.watermark_file.exists());
}

#[tokio::test]
async fn test_dump_repository_aborts_when_a_listing_page_fails() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/users/team/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": 9, "slug": "wiki", "name": "Wiki" }]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_page(0, 100)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/9/docs"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let temp = tempfile::TempDir::new().unwrap();
    let paths = ExportPaths::new(temp.path().join("wiki"));
    paths.ensure_export_dir().unwrap();
    std::fs::write(&paths.watermark_file, "2020-01-01T00:00:00.000Z").unwrap();
    let export_paths = paths.clone();

    let result = tokio::task::spawn_blocking(move || {
        let client = client(uri);
        Exporter::new(&client, &client, export_paths).dump_repository("team", "wiki")
    })
    .await
    .unwrap();

    assert!(matches!(
        result,
        Err(yuque_exporter::Error::Api { status: 500, .. })
    ));
    assert!(!paths.export_dir.join("doc-0").exists());
    assert_eq!(
        std::fs::read_to_string(&paths.watermark_file).unwrap(),
        "2020-01-01T00:00:00.000Z"
    );
}
