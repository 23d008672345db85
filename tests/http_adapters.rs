//! HTTP adapters against mock servers.
//!
//! Coverage:
//! - chat completion success, retry on 429, no retry on 401, empty choices
//! - Tavily request body and result mapping
//! - page fetch: HTML to text, custom headers, 5xx retry, permanent 404

use mockito::{Matcher, Server};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

use rave::domain::errors::ServiceError;
use rave::domain::models::{CompletionConfig, FetchConfig, RetryConfig, SearchConfig};
use rave::domain::ports::{CompletionService, FetchRequest, PageFetchService, Prompt, SearchService};
use rave::infrastructure::{HttpPageFetcher, OpenAiClient, TavilySearch};

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_backoff_ms: 1,
        max_backoff_ms: 10,
    }
}

fn completion_client(base_url: String, max_retries: u32) -> OpenAiClient {
    let config = CompletionConfig {
        base_url,
        api_key: Some("test-api-key".to_string()),
        timeout_secs: 5,
        requests_per_second: 100.0,
        retry: fast_retry(max_retries),
    };
    OpenAiClient::new(&config).expect("Failed to create client")
}

fn chat_body(text: &str) -> String {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

fn prompt() -> Prompt {
    Prompt::new("You answer briefly.", "What is the capital of France?")
}

#[tokio::test]
async fn test_completion_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-api-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "You answer briefly."},
                {"role": "user", "content": "What is the capital of France?"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_body("Paris."))
        .create_async()
        .await;

    let client = completion_client(server.url(), 0);
    let text = client.complete(&prompt(), "gpt-4o").await.unwrap();

    assert_eq!(text, "Paris.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_completion_retries_rate_limit() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error": {"message": "Rate limit exceeded"}}"#)
        .expect(1)
        .create_async()
        .await;
    let success = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_body("Paris."))
        .expect(1)
        .create_async()
        .await;

    let client = completion_client(server.url(), 2);
    let text = client.complete(&prompt(), "gpt-4o").await.unwrap();

    assert_eq!(text, "Paris.");
    limited.assert_async().await;
    success.assert_async().await;
}

#[tokio::test]
async fn test_completion_unauthorized_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = completion_client(server.url(), 3);
    let err = client.complete(&prompt(), "gpt-4o").await.unwrap_err();

    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert!(!err.is_transient());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_completion_gives_up_after_max_retries() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(503)
        .with_body("overloaded")
        .expect(3)
        .create_async()
        .await;

    let client = completion_client(server.url(), 2);
    let err = client.complete(&prompt(), "gpt-4o").await.unwrap_err();

    assert!(matches!(err, ServiceError::Server { status: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_completion_without_choices_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "chatcmpl-1", "choices": []}"#)
        .create_async()
        .await;

    let client = completion_client(server.url(), 0);
    let err = client.complete(&prompt(), "gpt-4o").await.unwrap_err();

    assert!(err.is_schema_violation());
}

fn search_client(base_url: String) -> TavilySearch {
    let config = SearchConfig {
        base_url,
        api_key: Some("tvly-test".to_string()),
        max_results: 3,
        timeout_secs: 5,
        retry: fast_retry(1),
    };
    TavilySearch::new(&config).expect("Failed to create search client")
}

#[tokio::test]
async fn test_tavily_maps_results() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .match_body(Matcher::Json(json!({
            "api_key": "tvly-test",
            "query": "capital of france",
            "max_results": 2
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "query": "capital of france",
                "results": [
                    {"title": "Paris", "url": "https://en.wikipedia.org/wiki/Paris", "content": "Paris is the capital of France.", "score": 0.98},
                    {"title": "France", "url": "https://en.wikipedia.org/wiki/France", "content": "France's capital is Paris.", "score": 0.91}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let results = search_client(server.url())
        .search("capital of france", 2)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Paris");
    assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/Paris");
    assert_eq!(results[0].snippet, "Paris is the capital of France.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_tavily_empty_results() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/search")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"query": "nothing", "results": []}"#)
        .create_async()
        .await;

    let results = search_client(server.url()).search("nothing", 3).await.unwrap();
    assert!(results.is_empty());
}

fn fetcher() -> HttpPageFetcher {
    let config = FetchConfig {
        retry: fast_retry(2),
        ..FetchConfig::default()
    };
    HttpPageFetcher::new(&config).expect("Failed to create fetcher")
}

fn fetch_request(url: String) -> FetchRequest {
    FetchRequest::new(url, Duration::from_secs(5))
}

#[tokio::test]
async fn test_fetch_converts_html_to_text() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/paris")
        .match_header("x-research", "rave")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html><body><h1>Paris</h1><p>Paris is the capital of France.</p></body></html>")
        .create_async()
        .await;

    let mut headers = BTreeMap::new();
    headers.insert("X-Research".to_string(), "rave".to_string());
    let request = fetch_request(format!("{}/paris", server.url())).with_headers(headers);
    let text = fetcher().fetch(&request).await.unwrap();

    assert!(text.contains("Paris is the capital of France."));
    assert!(!text.contains("<p>"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_plain_text_passthrough() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/notes.txt")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("Population: 2.1 million")
        .create_async()
        .await;

    let text = fetcher()
        .fetch(&fetch_request(format!("{}/notes.txt", server.url())))
        .await
        .unwrap();
    assert_eq!(text, "Population: 2.1 million");
}

#[tokio::test]
async fn test_fetch_retries_server_error() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/flaky")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/flaky")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("recovered")
        .expect(1)
        .create_async()
        .await;

    let text = fetcher()
        .fetch(&fetch_request(format!("{}/flaky", server.url())))
        .await
        .unwrap();

    assert_eq!(text, "recovered");
    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_fetch_not_found_is_permanent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let err = fetcher()
        .fetch(&fetch_request(format!("{}/missing", server.url())))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Rejected { status: 404, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_rejects_binary_content() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/report.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body(vec![0x25, 0x50, 0x44, 0x46])
        .create_async()
        .await;

    let err = fetcher()
        .fetch(&fetch_request(format!("{}/report.pdf", server.url())))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}
