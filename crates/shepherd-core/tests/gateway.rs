//! Gateway behavior against canned HTTP responses served from a local
//! socket: the comments 404 degrade and rate-limit classification, without
//! touching the real API.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use shepherd_core::config::ShepherdConfig;
use shepherd_core::envelope::{ErrorKind, IntoRecord};
use shepherd_core::github::{ApiError, GitHubClient};

/// Serves exactly one canned HTTP response, then closes the connection.
async fn one_shot_server(status_line: &str, extra_headers: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let response = format!(
        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n{extra_headers}content-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}")
}

fn client_for(base: String) -> GitHubClient {
    let config = ShepherdConfig {
        api_base: base,
        ..ShepherdConfig::default()
    };
    GitHubClient::new(&config).unwrap()
}

#[tokio::test]
async fn comments_404_degrades_to_an_empty_list() {
    let base = one_shot_server("404 Not Found", "", r#"{"message":"Not Found"}"#).await;
    let client = client_for(base);

    let comments = client.issue_comments("owner/repo", 1, 10).await.unwrap();
    assert!(comments.is_empty());
}

#[tokio::test]
async fn issue_404_is_a_not_found_error() {
    let base = one_shot_server("404 Not Found", "", r#"{"message":"Not Found"}"#).await;
    let client = client_for(base);

    let error = client.issue("owner/repo", 12345).await.unwrap_err();
    match &error {
        ApiError::NotFound { resource } => assert!(resource.contains("#12345")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(error.into_record().code, ErrorKind::NotFound);
}

#[tokio::test]
async fn search_429_surfaces_rate_limit_with_reset_epoch() {
    let base = one_shot_server(
        "429 Too Many Requests",
        "x-ratelimit-limit: 60\r\nx-ratelimit-remaining: 0\r\nx-ratelimit-reset: 1700000000\r\n",
        r#"{"message":"API rate limit exceeded"}"#,
    )
    .await;
    let client = client_for(base);

    let error = client.search_issues("is:issue", "relevance", 10).await.unwrap_err();
    assert!(matches!(error, ApiError::RateLimited { .. }));

    let record = error.into_record();
    assert_eq!(record.code, ErrorKind::RateLimit);
    assert_eq!(
        record.details["resets_at"],
        serde_json::json!(1_700_000_000u64)
    );
    assert_eq!(record.details["limit_remaining"], serde_json::json!(0));
}

#[tokio::test]
async fn forbidden_403_with_rate_limit_body_is_rate_limit() {
    let base = one_shot_server(
        "403 Forbidden",
        "x-ratelimit-remaining: 0\r\n",
        r#"{"message":"API rate limit exceeded for 203.0.113.9"}"#,
    )
    .await;
    let client = client_for(base);

    let error = client.repository("owner/repo").await.unwrap_err();
    assert_eq!(error.into_record().code, ErrorKind::RateLimit);
}

#[tokio::test]
async fn search_results_parse_into_typed_hits() {
    let body = r#"{
        "total_count": 1,
        "items": [{
            "repository_url": "https://api.github.com/repos/owner/repo",
            "number": 9,
            "title": "Fix the widget",
            "html_url": "https://github.com/owner/repo/issues/9",
            "labels": [{"name": "bug"}],
            "comments": 2,
            "state": "open",
            "body": "the widget is broken"
        }]
    }"#;
    let base = one_shot_server("200 OK", "", body).await;
    let client = client_for(base);

    let hits = client.search_issues("is:issue", "relevance", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].repo, "owner/repo");
    assert_eq!(hits[0].number, 9);
    assert_eq!(hits[0].labels, vec!["bug".to_string()]);
}
