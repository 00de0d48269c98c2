//! Tests for configuration validation

use parallel_mapper::{MapError, MapperConfig, ParallelMapper};

#[test]
fn test_mapper_config_validation() {
    let valid = MapperConfig::new().with_worker_count(4);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_mapper_config_invalid_worker_count() {
    let invalid = MapperConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_mapper_config_invalid_prefix() {
    let invalid = MapperConfig::new().with_thread_name_prefix("");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_mapper_config_invalid_stack_size() {
    let invalid = MapperConfig::new().with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_mapper_config_from_json() {
    let json = r#"{
        "worker_count": 3,
        "thread_name_prefix": "json-worker",
        "thread_stack_size": 2097152
    }"#;

    let config = MapperConfig::from_json_str(json).unwrap();
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.thread_name_prefix, "json-worker");
    assert_eq!(config.thread_stack_size, Some(2_097_152));
}

#[test]
fn test_mapper_config_from_json_defaults_missing_fields() {
    let config = MapperConfig::from_json_str(r#"{ "worker_count": 2 }"#).unwrap();
    assert_eq!(config.worker_count, 2);
    assert_eq!(config.thread_name_prefix, MapperConfig::default().thread_name_prefix);
    assert_eq!(config.thread_stack_size, None);
}

#[test]
fn test_mapper_config_from_json_rejects_bad_counts() {
    assert!(MapperConfig::from_json_str(r#"{ "worker_count": 0 }"#).is_err());
    assert!(MapperConfig::from_json_str(r#"{ "worker_count": -1 }"#).is_err());
    assert!(MapperConfig::from_json_str("not json").is_err());
}

#[test]
fn test_construction_error_for_zero_workers() {
    let err = ParallelMapper::new(MapperConfig::new().with_worker_count(0)).unwrap_err();
    assert!(matches!(err, MapError::InvalidConfig(_)));
    assert_eq!(
        err.to_string(),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_mapper_keeps_config() {
    let config = MapperConfig::new()
        .with_worker_count(2)
        .with_thread_name_prefix("kept");
    let mapper = ParallelMapper::new(config.clone()).unwrap();
    assert_eq!(mapper.config(), &config);
    assert_eq!(mapper.worker_count(), 2);
    assert_eq!(mapper.stats().worker_count, 2);
}
