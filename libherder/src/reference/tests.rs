use super::*;
use std::str::FromStr;

#[test]
fn test_reference_with_registry_and_namespace() {
    let reference = ImageReference::from_str("quay.io/openshiftio/rhel-foo:v1").unwrap();
    assert_eq!(reference.registry(), Some("quay.io"));
    assert_eq!(reference.repository(), "openshiftio");
    assert_eq!(reference.image_name(), "rhel-foo");
    assert_eq!(reference.tag(), "v1");
}

#[test]
fn test_reference_with_nested_repository() {
    let reference = ImageReference::from_str("r.c.o/prod/foo/bar:tag1").unwrap();
    assert_eq!(reference.registry(), Some("r.c.o"));
    assert_eq!(reference.repository(), "prod/foo");
    assert_eq!(reference.image_name(), "bar");
    assert_eq!(reference.tag(), "tag1");
    assert_eq!(reference.path(), "prod/foo/bar");
}

#[test]
fn test_reference_registry_with_port() {
    let reference = ImageReference::from_str("localhost:5000/foo").unwrap();
    assert_eq!(reference.registry(), Some("localhost:5000"));
    assert_eq!(reference.repository(), "");
    assert_eq!(reference.image_name(), "foo");
    assert_eq!(reference.tag(), "latest");
}

#[test]
fn test_reference_without_registry() {
    let reference = ImageReference::from_str("foo/bar:tag1").unwrap();
    assert_eq!(reference.registry(), None);
    assert_eq!(reference.repository(), "foo");
    assert_eq!(reference.image_name(), "bar");
}

#[test]
fn test_reference_single_segment_with_dot_is_not_registry() {
    let reference = ImageReference::from_str("foo.bar:1").unwrap();
    assert_eq!(reference.registry(), None);
    assert_eq!(reference.image_name(), "foo.bar");
    assert_eq!(reference.tag(), "1");
}

#[test]
fn test_reference_defaults_tag_to_latest() {
    let reference = ImageReference::from_str("quay.io/ns/foo").unwrap();
    assert_eq!(reference.tag(), DEFAULT_TAG);
}

#[test]
fn test_reference_rejects_empty() {
    assert!(matches!(
        ImageReference::from_str("   "),
        Err(HerderError::Validation { .. })
    ));
}

#[test]
fn test_reference_rejects_empty_segments() {
    assert!(ImageReference::from_str("quay.io//foo:v1").is_err());
    assert!(ImageReference::from_str("quay.io/ns/foo:").is_err());
    assert!(ImageReference::from_str("quay.io/ns/:v1").is_err());
}

#[test]
fn test_reference_display_rejoins_parts() {
    for raw in [
        "quay.io/openshiftio/rhel-foo:v1",
        "r.c.o/prod/foo/bar:tag1",
        "localhost:5000/foo:latest",
        "foo/bar:tag1",
    ] {
        let reference = ImageReference::from_str(raw).unwrap();
        assert_eq!(reference.to_string(), raw);
        assert_eq!(ImageReference::from_str(&reference.to_string()).unwrap(), reference);
    }
}

#[test]
fn test_reference_display_adds_default_tag() {
    let reference = ImageReference::from_str("quay.io/ns/foo").unwrap();
    assert_eq!(reference.to_string(), "quay.io/ns/foo:latest");
}

#[test]
fn test_reference_with_tag_replaces_only_tag() {
    let reference = ImageReference::from_str("quay.io/ns/foo:v1").unwrap();
    let retagged = reference.with_tag("abc123");
    assert_eq!(retagged.to_string(), "quay.io/ns/foo:abc123");
    assert_eq!(retagged.path(), reference.path());
}
