//! Integration tests for the Resource Client against an in-process HTTP backend.

use paper_qa_client::{Client, ClientError, RequestTracker, SessionId};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> Client {
    Client::new(&format!("{}/api", server.uri())).expect("client should build")
}

#[tokio::test]
async fn lists_libraries_in_backend_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/libraries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "zeta", "count": 2, "created": 1714550400.0},
            {"name": "alpha"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let libraries = client.list_libraries().await.expect("list should succeed");
    let names: Vec<_> = libraries.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha"]);
    assert_eq!(libraries[0].count, Some(2));
    assert_eq!(libraries[1].count, None);
}

#[tokio::test]
async fn create_library_posts_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/libraries"))
        .and(body_json(json!({"name": "ml-papers"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ml-papers"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let lib = client.create_library("ml-papers").await.unwrap();
    assert_eq!(lib.name, "ml-papers");
}

#[tokio::test]
async fn create_existing_library_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/libraries"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Library already exists"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.create_library("ml-papers").await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    assert!(err.is_conflict());
    assert_eq!(err.server_message().as_deref(), Some("Library already exists"));
}

#[tokio::test]
async fn empty_library_name_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.create_library("  ").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn deleting_twice_is_left_to_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/libraries/ml-papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/libraries/ml-papers"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Library not found"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.delete_library("ml-papers").await.expect("first delete succeeds");
    let err = client.delete_library("ml-papers").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn library_names_are_path_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/libraries/deep%20learning/papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "transformer.pdf", "path": "/data/transformer.pdf"},
            {"name": "bert.pdf"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let papers = client.list_papers("deep learning").await.unwrap();
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].path.as_deref(), Some("/data/transformer.pdf"));
    assert_eq!(papers[1].path, None);
}

#[tokio::test]
async fn upload_sends_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/libraries/ml-papers/upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains(r#"name="file"; filename="transformer.pdf""#))
        .and(body_string_contains("%PDF-1.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "transformer.pdf"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("transformer.pdf");
    std::fs::write(&file, b"%PDF-1.4 fake").unwrap();

    let client = client_for(&server).await;
    let paper = client.upload_paper_file("ml-papers", &file).await.unwrap();
    assert_eq!(paper.name, "transformer.pdf");
}

#[tokio::test]
async fn add_papers_accepts_array_and_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/libraries/a/add"))
        .and(body_json(json!({"paper_descs": ["https://arxiv.org/abs/1706.03762"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "attention"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/libraries/b/add"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"added": [{"name": "aniportrait"}]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let descs = vec!["https://arxiv.org/abs/1706.03762".to_string()];
    let added = client.add_papers("a", &descs).await.unwrap();
    assert_eq!(added[0].name, "attention");
    let added = client
        .add_papers("b", &["https://github.com/Zejun-Yang/AniPortrait".to_string()])
        .await
        .unwrap();
    assert_eq!(added[0].name, "aniportrait");
}

#[tokio::test]
async fn delete_paper_targets_nested_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/libraries/ml-papers/papers/transformer.pdf"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .delete_paper("ml-papers", "transformer.pdf")
        .await
        .expect("delete should succeed");
}

#[tokio::test]
async fn ask_with_no_papers_sends_empty_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .and(body_json(json!({
            "library": "ml-papers",
            "papers": [],
            "question": "What is attention?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "A weighting."})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let answer = client
        .ask("ml-papers", &[], "What is attention?")
        .await
        .unwrap();
    assert_eq!(answer.answer, "A weighting.");
    assert!(answer.sources().is_empty());
}

#[tokio::test]
async fn empty_question_never_reaches_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.ask("ml-papers", &[], "").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn detached_ask_is_correlated_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"answer": "late", "sources": ["p.pdf"]}))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let tracker = RequestTracker::new();
    let question = paper_qa_client::Question::new("lib", ["p.pdf"], "q?").unwrap();
    let first = client.ask_detached(&tracker, question.clone()).unwrap();
    let second = client.ask_detached(&tracker, question).unwrap();
    assert_ne!(first.id(), second.id());

    let stale = first.wait().await;
    assert!(stale.outcome.is_ok(), "the call itself still completes");
    assert!(stale.if_current(&tracker).is_none());

    let fresh = second.wait().await;
    let answer = fresh.if_current(&tracker).unwrap().unwrap();
    assert_eq!(answer.sources(), ["p.pdf"]);
}

#[tokio::test]
async fn session_detail_unknown_id_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Session not found"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .session_detail(&SessionId::from("missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {}})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_history().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let client = Client::new(&format!("http://127.0.0.1:{port}/api")).unwrap();
    let err = client.list_libraries().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
}
