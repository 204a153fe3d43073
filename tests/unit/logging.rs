//! Unit tests for logging setup

use signal_curator::logging::{init_logging, is_production, json_layer};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_production_detection() {
    assert!(is_production("production"));
    assert!(is_production("prod"));
    assert!(!is_production("development"));
    assert!(!is_production("sandbox"));
}

#[test]
fn test_repeated_init_is_harmless() {
    let _ = init_logging();
    assert!(!init_logging());
}

#[test]
fn test_json_lines_carry_source_location() {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::registry().with(json_layer(move || writer.clone()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(symbol = "BTC", "Analysis complete");
    });

    let raw = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let line: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert_eq!(line["level"], "INFO");
    assert_eq!(line["fields"]["symbol"], "BTC");
    assert!(line["filename"].as_str().unwrap().ends_with("logging.rs"));
    assert!(line["line_number"].as_u64().is_some());
}
