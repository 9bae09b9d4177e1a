pub mod fixtures;

use arbor::{ConfigurationEvent, ConfigurationListener, EventKind};
use std::sync::Mutex;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A listener that remembers every event it receives.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<ConfigurationEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<ConfigurationEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// The (kind, before_update) pairs received so far.
    pub fn kinds(&self) -> Vec<(EventKind, bool)> {
        self.events()
            .iter()
            .map(|event| (event.kind, event.before_update))
            .collect()
    }
}

impl ConfigurationListener for EventRecorder {
    fn configuration_changed(&self, event: &ConfigurationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
