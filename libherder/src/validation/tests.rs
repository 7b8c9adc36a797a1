use super::*;
use std::io::Write;

fn parse(yaml: &str) -> Value {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_complete_resources_pass() {
    let template = parse(
        r#"
objects:
- kind: DeploymentConfig
  metadata:
    name: foo
  spec:
    template:
      spec:
        containers:
        - name: foo
          resources:
            limits: {memory: 1Gi, cpu: "1"}
            requests: {memory: 512Mi, cpu: 500m}
"#,
    );
    assert!(ContainerRequestsLimitsRule.validate(&template).unwrap().is_empty());
}

#[test]
fn test_missing_memory_limit_reported() {
    let template = parse(
        r#"
objects:
- kind: DeploymentConfig
  metadata:
    name: foo
  spec:
    template:
      spec:
        containers:
        - name: web
          resources:
            limits: {cpu: "1"}
            requests: {memory: 512Mi, cpu: 500m}
"#,
    );
    assert_eq!(
        ContainerRequestsLimitsRule.validate(&template).unwrap(),
        vec!["ContainerRequestsLimitsRule: dc foo, container web: Undefined memory limit"]
    );
}

#[test]
fn test_unnamed_objects_use_defaults() {
    let template = parse(
        r#"
objects:
- kind: DeploymentConfig
  spec:
    template:
      spec:
        containers:
        - image: quay.io/ns/foo:v1
"#,
    );
    let errors = ContainerRequestsLimitsRule.validate(&template).unwrap();
    assert_eq!(errors.len(), 4);
    assert!(
        errors
            .iter()
            .all(|e| e.contains("dc unnamed_dc, container unnamed_container"))
    );
    assert!(errors[3].ends_with("Undefined cpu request"));
}

#[test]
fn test_other_kinds_are_ignored() {
    let template = parse(
        r#"
items:
- kind: StatefulSet
  spec:
    template:
      spec:
        containers:
        - name: db
"#,
    );
    assert!(ContainerRequestsLimitsRule.validate(&template).unwrap().is_empty());
}

#[test]
fn test_validate_template_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "objects:\n- kind: DeploymentConfig\n  metadata: {{name: bar}}\n  spec:\n    template:\n      spec:\n        containers:\n        - name: c\n          resources:\n            limits: {{memory: '', cpu: 1}}\n            requests: {{memory: 1Gi, cpu: 1}}"
    )
    .unwrap();

    let errors = validate_template(file.path()).unwrap();
    assert_eq!(
        errors,
        vec!["ContainerRequestsLimitsRule: dc bar, container c: Undefined memory limit"]
    );
}
