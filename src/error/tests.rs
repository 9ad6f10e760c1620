//! # 错误处理测试

use crate::error::{AuthError, Context, RelayError};
use axum::http::StatusCode;
use std::error::Error;

#[test]
fn test_config_error_creation() {
    let err = RelayError::config("upstream base url missing");
    assert!(matches!(err, RelayError::Config { .. }));
    assert_eq!(err.to_string(), "配置错误: upstream base url missing");
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.error_label(), "configuration_error");
    assert!(err.hint().is_some());
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err = RelayError::config_with_source("配置文件加载失败", io_err);

    assert!(err.to_string().contains("配置错误: 配置文件加载失败"));
    assert!(err.source().is_some());
}

#[test]
fn test_auth_error_maps_to_401_with_hint() {
    let err: RelayError = AuthError::MissingCredential.into();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.error_label(), "unauthorized");
    assert_eq!(err.public_message(), "bearer credential was not provided");
    assert!(err.hint().unwrap().contains("Bearer"));
}

#[test]
fn test_status_mapping() {
    let join_err = std::io::Error::other("task panicked");
    assert_eq!(
        RelayError::aggregation_with_source("aggregation task aborted", join_err).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        RelayError::not_implemented("streaming", &[]).status_code(),
        StatusCode::NOT_IMPLEMENTED
    );
    assert_eq!(
        RelayError::validation("bad format").status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        RelayError::upstream("broker", "timeout", None).status_code(),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn test_context_keeps_inner_classification() {
    let result: std::result::Result<(), RelayError> = Err(RelayError::config("signing key missing"));
    let err = result.context("minting internal token").unwrap_err();

    assert!(matches!(err, RelayError::Context { .. }));
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.error_label(), "configuration_error");
    assert!(err.to_string().starts_with("minting internal token"));
}

#[test]
fn test_auto_conversion_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err: RelayError = io_err.into();
    assert!(matches!(err, RelayError::Internal { .. }));
}

#[test]
fn test_not_implemented_carries_planned_paths() {
    let err = RelayError::not_implemented("streaming updates", &["/v1/stream/dashboard"]);
    assert_eq!(err.error_label(), "not_implemented");
    assert_eq!(err.planned(), ["/v1/stream/dashboard".to_string()]);
    assert_eq!(err.public_message(), "streaming updates: not implemented yet");
}
