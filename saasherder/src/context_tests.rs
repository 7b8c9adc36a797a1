use super::*;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

const CONFIG: &str = r#"
current: prod
contexts:
- name: prod
  data:
    services_dir: services
verify:
  timeout: 3
  token_file: /etc/quay/token
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_build_without_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::build(&dir.path().join("config.yaml"), None, ColorChoice::Never).unwrap();

    assert!(ctx.config.contexts.is_empty());
    assert_eq!(ctx.config.verify.max_retries, 5);
    assert_eq!(ctx.color, ColorChoice::Never);
}

#[test]
fn test_build_loads_config_file() {
    let file = write_config(CONFIG);
    let ctx = AppContext::build(file.path(), Some("prod".to_string()), ColorChoice::Always).unwrap();

    assert_eq!(ctx.config.get_contexts(), vec!["prod"]);
    assert_eq!(ctx.context.as_deref(), Some("prod"));
    assert_eq!(ctx.config.verify.timeout, 3);
    assert_eq!(ctx.color, ColorChoice::Always);
}

#[test]
fn test_build_rejects_malformed_config() {
    let file = write_config("current: nowhere\ncontexts: []\n");
    assert!(AppContext::build(file.path(), None, ColorChoice::Never).is_err());
}

#[test]
fn test_apply_env_overrides_file_values() {
    let mut settings = SaasConfig::from_yaml_str(CONFIG).unwrap().verify;
    let env: HashMap<&str, &str> = [
        ("SKOPEO_AUTHFILE", "/run/skopeo.json"),
        ("QUAY_TOKEN_FILE", "/run/quay-token"),
    ]
    .into_iter()
    .collect();

    apply_env(&mut settings, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(settings.auth_file, Some(PathBuf::from("/run/skopeo.json")));
    assert_eq!(settings.token_file, Some(PathBuf::from("/run/quay-token")));
}

#[test]
fn test_apply_env_ignores_unset_and_empty() {
    let mut settings = SaasConfig::from_yaml_str(CONFIG).unwrap().verify;

    apply_env(&mut settings, |key| {
        (key == "SKOPEO_AUTHFILE").then(String::new)
    });

    assert_eq!(settings.auth_file, None);
    assert_eq!(settings.token_file, Some(PathBuf::from("/etc/quay/token")));
}

#[test]
fn test_verifier_config_from_context() {
    let file = write_config(CONFIG);
    let mut ctx = AppContext::build(file.path(), None, ColorChoice::Never).unwrap();
    ctx.credentials = Some(Credentials::basic("robot", "secret"));

    let verifier = ctx.verifier_config(Some("^quay\\.io/"), true).unwrap();

    assert_eq!(verifier.timeout, Duration::from_secs(3));
    assert_eq!(verifier.credentials, Some(Credentials::basic("robot", "secret")));
    assert_eq!(verifier.registry.inspector, Inspector::Skopeo);
    let pattern = verifier.pattern.unwrap();
    assert!(pattern.is_match("quay.io/foo/bar:v1"));
    assert!(!pattern.is_match("docker.io/foo/bar:v1"));
}

#[test]
fn test_verifier_config_rejects_invalid_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::build(&dir.path().join("config.yaml"), None, ColorChoice::Never).unwrap();

    let err = ctx.verifier_config(Some("quay.io/(unclosed"), false).unwrap_err();
    assert!(err.to_string().contains("Invalid pattern"));
}
