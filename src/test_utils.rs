//! Common testing infrastructure for unit tests.

use crate::{event::ConnectionEvent, listener::ConnectionListener};
use std::sync::{Mutex, Once};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "kestrel_failover=debug".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A listener that records every event it is handed, in delivery order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionListener for RecordingListener {
    fn on_event(&self, event: &ConnectionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
