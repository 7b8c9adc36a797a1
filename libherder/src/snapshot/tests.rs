use super::*;

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_snapshot_insert_replaces_by_name() {
    let mut snapshot = ServiceSnapshot::new();
    snapshot.insert(Service::new("a", "u1", Some("h1")));
    snapshot.insert(Service::new("b", "u2", None));
    snapshot.insert(Service::new("a", "u1", Some("h9")));

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("a").unwrap().hash.as_deref(), Some("h9"));
    let names: Vec<&str> = snapshot.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_load_dir_reads_service_files_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "b.yaml",
        "services:\n- name: worker\n  url: https://github.com/o/worker\n  hash: abc\n  path: /openshift/worker.yaml\n  hash_length: 7\n",
    );
    write(
        dir.path(),
        "a.yaml",
        "services:\n- name: api\n  url: https://github.com/o/api/\n  hash: null\n",
    );
    write(dir.path(), "README.md", "not a service file");

    let snapshot = load_dir(dir.path()).unwrap();

    let names: Vec<&str> = snapshot.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["api", "worker"]);
    assert_eq!(snapshot.get("api").unwrap().hash, None);
    let worker = snapshot.get("worker").unwrap();
    assert_eq!(worker.hash.as_deref(), Some("abc"));
    assert_eq!(
        worker.extra.get("hash_length").and_then(|v| v.as_u64()),
        Some(7)
    );
}

#[test]
fn test_load_dir_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.yaml", "services:\n- name: [oops\n");

    assert!(matches!(
        load_dir(dir.path()),
        Err(HerderError::Validation { .. })
    ));
}

#[test]
fn test_services_dir_follows_context() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("dsaas-services")).unwrap();
    std::fs::create_dir(root.path().join("staging-services")).unwrap();
    write(
        &root.path().join("dsaas-services"),
        "s.yaml",
        "services:\n- name: prod-svc\n  url: u\n  hash: h1\n",
    );
    write(
        &root.path().join("staging-services"),
        "s.yaml",
        "services:\n- name: staging-svc\n  url: u\n  hash: h2\n",
    );

    let config = SaasConfig::from_yaml_str(
        r#"
current: dsaas
contexts:
- name: dsaas
  data: {services_dir: dsaas-services}
- name: staging
  data: {services_dir: staging-services}
"#,
    )
    .unwrap();
    let mut source = ServicesDir::new(config, root.path());

    let prod = source.load_service_snapshot("HEAD").unwrap();
    assert!(prod.get("prod-svc").is_some());

    source.switch_context("staging").unwrap();
    let staging = source.load_service_snapshot("HEAD").unwrap();
    assert!(staging.get("staging-svc").is_some());
    assert!(staging.get("prod-svc").is_none());

    assert!(source.switch_context("missing").is_err());
}

fn service_with_path(url: &str, hash: Option<&str>) -> Service {
    let mut service = Service::new("api", url, hash);
    service
        .extra
        .insert("path".to_string(), "/openshift/api.yaml".into());
    service
}

#[test]
fn test_template_url_per_repository_host() {
    assert_eq!(
        service_with_path("https://github.com/org/api/", Some("abc")).template_url(),
        Some("https://raw.githubusercontent.com/org/api/abc/openshift/api.yaml".to_string())
    );
    assert_eq!(
        service_with_path("https://gitlab.example.com/org/api", Some("abc")).template_url(),
        Some("https://gitlab.example.com/org/api/raw/abc/openshift/api.yaml".to_string())
    );
    assert_eq!(
        service_with_path("https://git.example.com/org/api", Some("abc")).template_url(),
        None
    );
    assert_eq!(
        service_with_path("https://github.com/org/api", None).template_url(),
        None
    );
}

#[test]
fn test_service_field_values() {
    let mut service = service_with_path("https://github.com/org/api", Some("abc"));
    service.extra.insert("hash_length".to_string(), 7.into());

    assert_eq!(service.field(ServiceField::Path).as_deref(), Some("/openshift/api.yaml"));
    assert_eq!(service.field(ServiceField::Url).as_deref(), Some("https://github.com/org/api"));
    assert_eq!(service.field(ServiceField::Hash).as_deref(), Some("abc"));
    assert_eq!(service.field(ServiceField::HashLength).as_deref(), Some("7"));

    let bare = Service::new("worker", "https://github.com/org/worker", None);
    assert_eq!(bare.field(ServiceField::Hash), None);
    assert_eq!(bare.field(ServiceField::HashLength), None);
}

#[test]
fn test_service_field_names() {
    for name in ["path", "url", "hash", "hash_length", "template-url"] {
        let field: ServiceField = name.parse().unwrap();
        assert_eq!(field.to_string(), name);
    }
    assert!(matches!(
        "name".parse::<ServiceField>(),
        Err(HerderError::Validation { .. })
    ));
}

#[test]
fn test_select_services() {
    let snapshot: ServiceSnapshot = [
        Service::new("a", "u1", None),
        Service::new("b", "u2", None),
    ]
    .into_iter()
    .collect();

    let all: Vec<&str> = snapshot.select(&[]).unwrap().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(all, vec!["a", "b"]);

    let some = snapshot
        .select(&["b".to_string(), "missing".to_string()])
        .unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some[0].name, "b");

    assert!(matches!(
        snapshot.select(&["missing".to_string()]),
        Err(HerderError::NotFound { .. })
    ));
}
