use libherder::registry::RegistrySettings;
use libherder::verify::AuthPath;
use libherder::{StatusTag, Verifier, VerifierConfig, images_from_manifest, status_lines};
use mockito::Matcher;
use std::io::Write;
use std::time::Duration;

const MANIFEST: &str = r#"
apiVersion: v1
kind: List
items:
- apiVersion: v1
  kind: DeploymentConfig
  metadata:
    name: foo
  spec:
    replicas: 1
    template:
      spec:
        containers:
        - name: foo
          image: quay.io/openshiftio/rhel-foo:v1
"#;

fn verifier_for(endpoint: &str) -> Verifier {
    Verifier::new(VerifierConfig {
        backoff_unit: Duration::from_millis(1),
        registry: RegistrySettings {
            quay_endpoint: endpoint.to_string(),
            ..RegistrySettings::default()
        },
        ..VerifierConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_manifest_image_verified_against_quay() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/api/v1/repository/openshiftio/rhel-foo/tag/")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"tags":[{"name":"latest"},{"name":"v1"}],"has_additional":false,"page":1}"#)
        .expect(1)
        .create_async()
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MANIFEST.as_bytes()).unwrap();
    let images = images_from_manifest(file.path()).unwrap();
    assert_eq!(images, vec!["quay.io/openshiftio/rhel-foo:v1"]);

    let verifier = verifier_for(&server.url());
    let report = verifier.verify_batch(images, std::future::pending()).await;

    page.assert_async().await;
    assert!(report.is_success());
    let (image, outcome) = &report.results[0];
    let verified = outcome.as_ref().unwrap();
    assert_eq!(verified.path, AuthPath::Anonymous);

    let lines = status_lines(image, outcome);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].tag.is_ok());
    assert_eq!(lines[0].tag, StatusTag::OkNoAuth);
    assert!(lines[0].to_string().contains("rhel-foo"));
}

#[tokio::test]
async fn test_missing_tag_fails_after_retries() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/api/v1/repository/openshiftio/rhel-foo/tag/")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_body(r#"{"tags":[{"name":"v0"}],"has_additional":false,"page":1}"#)
        .expect(5)
        .create_async()
        .await;

    let verifier = verifier_for(&server.url());
    let report = verifier
        .verify_batch(
            vec!["quay.io/openshiftio/rhel-foo:v1".to_string()],
            std::future::pending(),
        )
        .await;

    page.assert_async().await;
    assert!(!report.is_success());
    assert_eq!(report.failures().count(), 1);
    let (image, outcome) = &report.results[0];
    assert_eq!(status_lines(image, outcome)[0].tag, StatusTag::ErrorNoAuth);
}

#[tokio::test]
async fn test_quay_lookup_sends_token_file_as_bearer() {
    let dir = tempfile::tempdir().unwrap();
    let auth_file = dir.path().join("skopeo.json");
    std::fs::write(
        &auth_file,
        r#"{"auths":{"quay.io":{"auth":"dXNlcjpzZWNyZXQ="}}}"#,
    )
    .unwrap();
    let token_file = dir.path().join("quay.token");
    std::fs::write(&token_file, "tok\n").unwrap();

    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/api/v1/repository/openshiftio/rhel-foo/tag/")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .match_header("authorization", "Bearer tok")
        .with_body(r#"{"tags":[{"name":"v1"}],"has_additional":false,"page":1}"#)
        .expect(1)
        .create_async()
        .await;

    let verifier = Verifier::new(VerifierConfig {
        auth_file: Some(auth_file),
        token_file: Some(token_file),
        backoff_unit: Duration::from_millis(1),
        registry: RegistrySettings {
            quay_endpoint: server.url(),
            ..RegistrySettings::default()
        },
        ..VerifierConfig::default()
    })
    .unwrap();

    let verified = verifier
        .verify("quay.io/openshiftio/rhel-foo:v1", "v1")
        .await
        .unwrap();

    page.assert_async().await;
    assert_eq!(verified.path, AuthPath::Authenticated);
}
