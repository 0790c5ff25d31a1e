use super::*;
use crate::{engine_error, engine_info, engine_warn};
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Logger that captures entries for inspection
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture_logger() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger {
        entries: Arc::clone(&entries),
    });
    entries
}

// ============================================================================
// LOGGER ROUTING
// ============================================================================

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    let entries = install_capture_logger();

    engine_info!("prism3d::Test", "hello {}", 42);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "prism3d::Test");
    assert_eq!(captured[0].message, "hello 42");
    assert!(captured[0].file.is_none());
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_error_macro_carries_file_and_line() {
    let entries = install_capture_logger();

    engine_error!("prism3d::Test", "boom");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert!(captured[0].file.is_some());
    assert!(captured[0].line.is_some());
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_stops_capture() {
    let entries = install_capture_logger();
    Engine::reset_logger();

    engine_warn!("prism3d::Test", "not captured");

    assert!(entries.lock().unwrap().is_empty());
}

// ============================================================================
// SEVERITY ORDERING
// ============================================================================

#[test]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}
