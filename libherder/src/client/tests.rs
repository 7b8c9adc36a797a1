use super::*;

#[test]
fn test_client_new_with_https_url() {
    let client = Client::new("https://registry.example.com");
    assert!(client.is_ok());
}

#[test]
fn test_client_normalizes_url_without_scheme() {
    let client = Client::new("quay.io").unwrap();
    assert_eq!(client.base_url(), "https://quay.io");
}

#[test]
fn test_client_keeps_plain_http_scheme() {
    let client = Client::new("http://localhost:5000").unwrap();
    assert_eq!(client.base_url(), "http://localhost:5000");
}

#[test]
fn test_client_removes_multiple_trailing_slashes() {
    let client = Client::new("https://quay.io///").unwrap();
    assert_eq!(client.base_url(), "https://quay.io");
}

#[test]
fn test_client_new_with_empty_url_fails() {
    let client = Client::new("   ");
    assert!(matches!(client.unwrap_err(), HerderError::Validation { .. }));
}

#[test]
fn test_client_config_default() {
    let config = ClientConfig::new();
    assert_eq!(config.timeout, Duration::from_secs(10));
    assert_eq!(config.max_idle_per_host, 10);
}

#[test]
fn test_client_config_builder_chaining() {
    let config = ClientConfig::new()
        .with_timeout(Duration::from_millis(250))
        .with_max_idle_per_host(50);
    assert_eq!(config.timeout, Duration::from_millis(250));
    assert_eq!(config.max_idle_per_host, 50);
}

#[test]
fn test_tags_response_null_tags() {
    let response: TagsResponse = serde_json::from_str(r#"{"name":"foo","tags":null}"#).unwrap();
    assert!(response.tags.is_none());
}

#[test]
fn test_quay_page_deserialization_defaults() {
    let page: QuayTagPage = serde_json::from_str(r#"{"tags":[{"name":"v1","size":1}]}"#).unwrap();
    assert!(page.contains("v1"));
    assert!(!page.contains("v2"));
    assert!(!page.has_additional);
    assert_eq!(page.page, None);
}

// Mock-based tests

#[tokio::test]
async fn test_fetch_tags_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/openshiftio/rhel-foo/tags/list")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"openshiftio/rhel-foo","tags":["v1","v2"]}"#)
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let tags = client
        .fetch_tags("openshiftio/rhel-foo", &Credentials::Anonymous)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(tags, vec!["v1", "v2"]);
}

#[tokio::test]
async fn test_fetch_tags_sends_authorization_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/ns/foo/tags/list")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_body(r#"{"name":"ns/foo","tags":["v1"]}"#)
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let result = client
        .fetch_tags("ns/foo", &Credentials::basic("user", "pass"))
        .await;

    mock.assert_async().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_fetch_tags_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/ns/foo/tags/list")
        .with_status(401)
        .with_body("authentication required")
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let result = client.fetch_tags("ns/foo", &Credentials::Anonymous).await;

    mock.assert_async().await;
    assert!(matches!(
        result.unwrap_err(),
        HerderError::Authentication {
            status_code: Some(401),
            ..
        }
    ));
}

#[tokio::test]
async fn test_fetch_tags_not_found() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/ns/missing/tags/list")
        .with_status(404)
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let result = client.fetch_tags("ns/missing", &Credentials::Anonymous).await;

    mock.assert_async().await;
    assert!(matches!(result.unwrap_err(), HerderError::NotFound { .. }));
}

#[tokio::test]
async fn test_fetch_tags_server_error_keeps_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/ns/foo/tags/list")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let err = client
        .fetch_tags("ns/foo", &Credentials::Anonymous)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.status_code(), Some(502));
}

#[tokio::test]
async fn test_fetch_tags_invalid_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/ns/foo/tags/list")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let result = client.fetch_tags("ns/foo", &Credentials::Anonymous).await;

    mock.assert_async().await;
    assert!(matches!(result.unwrap_err(), HerderError::Validation { .. }));
}

#[tokio::test]
async fn test_fetch_quay_tag_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/repository/openshiftio/rhel-foo/tag/")
        .match_query(mockito::Matcher::UrlEncoded("page".into(), "2".into()))
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_body(r#"{"tags":[{"name":"v3"}],"has_additional":true,"page":2}"#)
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let page = client
        .fetch_quay_tag_page("openshiftio/rhel-foo", 2, &Credentials::bearer("tok"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(page.contains("v3"));
    assert!(page.has_additional);
    assert_eq!(page.page, Some(2));
}

#[tokio::test]
async fn test_fetch_quay_tag_page_non_200_success_is_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/repository/ns/foo/tag/")
        .match_query(mockito::Matcher::Any)
        .with_status(204)
        .create_async()
        .await;

    let client = Client::new(&server.url()).unwrap();
    let err = client
        .fetch_quay_tag_page("ns/foo", 1, &Credentials::Anonymous)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.status_code(), Some(204));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Nothing listens on port 9 (discard) in test environments.
    let client = Client::new("http://127.0.0.1:9").unwrap();
    let result = client.fetch_tags("ns/foo", &Credentials::Anonymous).await;
    assert!(matches!(result.unwrap_err(), HerderError::Network { .. }));
}
