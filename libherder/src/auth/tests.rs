use super::*;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_credentials_anonymous() {
    let creds = Credentials::anonymous();
    assert_eq!(creds, Credentials::Anonymous);
    assert!(creds.is_anonymous());
    assert_eq!(creds.to_header_value(), None);
}

#[test]
fn test_credentials_basic_header() {
    let creds = Credentials::basic("user", "pass");
    // base64("user:pass")
    assert_eq!(creds.to_header_value().as_deref(), Some("Basic dXNlcjpwYXNz"));
}

#[test]
fn test_credentials_bearer_header() {
    let creds = Credentials::bearer("my_token");
    assert_eq!(creds.to_header_value().as_deref(), Some("Bearer my_token"));
}

#[test]
fn test_token_file_is_trimmed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quay.token");
    std::fs::write(&path, "  s3cr3t\n").unwrap();

    let creds = Credentials::from_token_file(&path).unwrap();
    assert_eq!(creds, Credentials::bearer("s3cr3t"));
}

#[test]
fn test_empty_token_file_is_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quay.token");
    std::fs::write(&path, "\n").unwrap();

    let result = Credentials::from_token_file(&path);
    assert!(matches!(result, Err(HerderError::Config { .. })));
}

fn chain_with_both_files(dir: &Path) -> CredentialChain {
    let auth = dir.join("skopeo.json");
    std::fs::write(&auth, r#"{"auths":{"quay.io":{"auth":"dXNlcjpzZWNyZXQ="}}}"#).unwrap();
    let token = dir.join("token");
    std::fs::write(&token, "tok").unwrap();
    CredentialChain::new(None, Some(auth), Some(token))
}

#[test]
fn test_chain_without_sources_is_anonymous() {
    let chain = CredentialChain::default();
    assert!(chain.is_empty());
    for target in [
        CredentialTarget::QuayApi,
        CredentialTarget::Registry,
        CredentialTarget::Skopeo,
    ] {
        assert_eq!(
            chain.resolve("quay.io", target).unwrap(),
            Credentials::Anonymous
        );
    }
}

#[test]
fn test_chain_prefers_explicit_credentials() {
    let dir = tempdir().unwrap();
    let mut chain = chain_with_both_files(dir.path());
    chain.explicit = Some(Credentials::basic("u", "p"));

    assert_eq!(
        chain.resolve("quay.io", CredentialTarget::Registry).unwrap(),
        Credentials::basic("u", "p")
    );
    assert_eq!(
        chain.resolve("quay.io", CredentialTarget::Skopeo).unwrap(),
        Credentials::basic("u", "p")
    );
}

#[test]
fn test_chain_quay_api_uses_token_file() {
    let dir = tempdir().unwrap();
    let chain = chain_with_both_files(dir.path());

    assert_eq!(
        chain.resolve("quay.io", CredentialTarget::QuayApi).unwrap(),
        Credentials::bearer("tok")
    );
}

#[test]
fn test_chain_registry_uses_auth_file_entry() {
    let dir = tempdir().unwrap();
    let chain = chain_with_both_files(dir.path());

    assert_eq!(
        chain.resolve("quay.io", CredentialTarget::Registry).unwrap(),
        Credentials::basic("user", "secret")
    );
    // The token file is for the Quay API only.
    assert_eq!(
        chain
            .resolve("registry.example.com", CredentialTarget::Registry)
            .unwrap(),
        Credentials::Anonymous
    );
}

#[test]
fn test_chain_skopeo_gets_auth_file_path() {
    let dir = tempdir().unwrap();
    let chain = chain_with_both_files(dir.path());

    let creds = chain.resolve("quay.io", CredentialTarget::Skopeo).unwrap();
    assert_eq!(
        creds,
        Credentials::AuthFile {
            path: dir.path().join("skopeo.json")
        }
    );
    assert!(!creds.is_anonymous());
    assert_eq!(creds.to_header_value(), None);
}

#[test]
fn test_chain_ignores_missing_files() {
    let dir = tempdir().unwrap();
    let chain = CredentialChain::new(
        None,
        Some(dir.path().join("missing.json")),
        Some(dir.path().join("missing.token")),
    );
    assert!(!chain.is_empty());
    for target in [
        CredentialTarget::QuayApi,
        CredentialTarget::Registry,
        CredentialTarget::Skopeo,
    ] {
        assert_eq!(
            chain.resolve("quay.io", target).unwrap(),
            Credentials::Anonymous
        );
    }
}
