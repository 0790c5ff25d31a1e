use super::*;

#[test]
fn test_empty_set_is_not_complete() {
    let set = ShaderSet::new();
    assert!(!set.is_complete());
}

#[test]
fn test_resolve_without_vertex_shader_is_configuration_error() {
    let set = ShaderSet::new();
    match set.resolve_stages() {
        Err(Error::Configuration(msg)) => assert!(msg.contains("vertex")),
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_validate_key_rejects_empty_name() {
    assert!(matches!(
        ShaderSet::validate_key("", None),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_validate_key_rejects_shared_key() {
    assert!(matches!(
        ShaderSet::validate_key("standard.vert", Some("standard.vert")),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_validate_key_accepts_distinct_names() {
    assert!(ShaderSet::validate_key("standard.vert", Some("vertex_color.frag")).is_ok());
    assert!(ShaderSet::validate_key("standard.vert", None).is_ok());
}
