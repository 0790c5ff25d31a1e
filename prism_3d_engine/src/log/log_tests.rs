use super::*;
use crate::prism3d::{Error, Result};
use crate::{engine_bail, engine_err};
use serial_test::serial;

// ============================================================================
// ERROR-PRODUCING MACROS
// ============================================================================

#[test]
#[serial]
fn test_engine_err_produces_backend_error() {
    let err = engine_err!("prism3d::Test", "device lost: {}", 7);
    match err {
        Error::BackendError(msg) => assert_eq!(msg, "device lost: 7"),
        other => panic!("unexpected error variant: {:?}", other),
    }
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    fn failing() -> Result<u32> {
        engine_bail!("prism3d::Test", "unreachable state");
    }
    assert!(matches!(failing(), Err(Error::BackendError(_))));
}

// ============================================================================
// DEFAULT LOGGER
// ============================================================================

#[test]
fn test_default_logger_does_not_panic() {
    // Smoke test: DefaultLogger formats both plain and detailed entries.
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Info,
        timestamp: std::time::SystemTime::now(),
        source: "prism3d::Test".to_string(),
        message: "plain".to_string(),
        file: None,
        line: None,
    });
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: std::time::SystemTime::now(),
        source: "prism3d::Test".to_string(),
        message: "detailed".to_string(),
        file: Some("log_tests.rs"),
        line: Some(1),
    });
}
