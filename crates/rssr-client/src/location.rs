// File: src/location.rs
// Purpose: Stream of distinct locations observed on an intercepted history

use tokio::sync::broadcast;
use tracing::warn;

use crate::history::LocationEvent;

/// Receives location changes, skipping events that leave it unchanged
pub struct LocationSubscription {
    current: String,
    rx: broadcast::Receiver<LocationEvent>,
}

impl LocationSubscription {
    pub(crate) fn new(current: String, rx: broadcast::Receiver<LocationEvent>) -> Self {
        Self { current, rx }
    }

    /// Last location seen
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Waits for the location to differ from [`Self::current`]
    ///
    /// `None` once the interceptor is gone.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.location == self.current => continue,
                Ok(event) => {
                    self.current = event.location;
                    return Some(self.current.clone());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Location subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
