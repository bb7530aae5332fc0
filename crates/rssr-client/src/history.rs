// File: src/history.rs
// Purpose: Session history, its interception and the process-wide navigate()

use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::location::LocationSubscription;

/// What moved the current location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Push,
    Replace,
    /// Back/forward
    Pop,
}

/// Broadcast after every location change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEvent {
    pub kind: LocationKind,
    /// Pathname plus search
    pub location: String,
}

/// The host's session history
pub trait History: Send + Sync {
    /// Current pathname plus search
    fn location(&self) -> String;

    fn push_state(&self, url: &str);

    fn replace_state(&self, url: &str);

    /// Full page load of `url`, leaving client-side routing behind
    fn assign(&self, url: &str);
}

#[derive(Debug)]
struct Entries {
    stack: Vec<String>,
    index: usize,
    assigned: Vec<String>,
}

/// In-memory [`History`] for tests and headless hosts
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<Entries>,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                stack: vec![initial.into()],
                index: 0,
                assigned: Vec::new(),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves one entry back; `None` at the start of the stack
    pub fn back(&self) -> Option<String> {
        let mut entries = self.entries();
        entries.index = entries.index.checked_sub(1)?;
        Some(entries.stack[entries.index].clone())
    }

    pub fn forward(&self) -> Option<String> {
        let mut entries = self.entries();
        if entries.index + 1 >= entries.stack.len() {
            return None;
        }
        entries.index += 1;
        Some(entries.stack[entries.index].clone())
    }

    pub fn len(&self) -> usize {
        self.entries().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// URLs handed to [`History::assign`], oldest first
    pub fn assigned(&self) -> Vec<String> {
        self.entries().assigned.clone()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> String {
        let entries = self.entries();
        entries.stack[entries.index].clone()
    }

    fn push_state(&self, url: &str) {
        let mut entries = self.entries();
        let next = entries.index + 1;
        entries.stack.truncate(next);
        entries.stack.push(url.to_string());
        entries.index = next;
    }

    fn replace_state(&self, url: &str) {
        let mut entries = self.entries();
        let index = entries.index;
        entries.stack[index] = url.to_string();
    }

    fn assign(&self, url: &str) {
        self.entries().assigned.push(url.to_string());
    }
}

/// Wraps a [`History`] so every push/replace is observable
pub struct HistoryInterceptor {
    history: Arc<dyn History>,
    tx: broadcast::Sender<LocationEvent>,
}

impl HistoryInterceptor {
    pub fn new(history: Arc<dyn History>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { history, tx }
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.history
    }

    pub fn location(&self) -> String {
        self.history.location()
    }

    pub fn push_state(&self, url: &str) {
        self.history.push_state(url);
        self.emit(LocationKind::Push);
    }

    pub fn replace_state(&self, url: &str) {
        self.history.replace_state(url);
        self.emit(LocationKind::Replace);
    }

    /// Called by the host after back/forward changed the location
    pub fn notify_popstate(&self) {
        self.emit(LocationKind::Pop);
    }

    pub fn assign(&self, url: &str) {
        self.history.assign(url);
    }

    /// Location updates from now on, starting at the current location
    pub fn subscribe(&self) -> LocationSubscription {
        LocationSubscription::new(self.location(), self.tx.subscribe())
    }

    fn emit(&self, kind: LocationKind) {
        let event = LocationEvent {
            kind,
            location: self.history.location(),
        };
        debug!("Location {:?}: {}", event.kind, event.location);
        // Nobody listening is fine
        let _ = self.tx.send(event);
    }
}

static INSTALLED: OnceCell<Arc<HistoryInterceptor>> = OnceCell::new();

/// Installs the process-wide interceptor around `history`
///
/// Only the first call wraps anything; later calls return the interceptor
/// already installed and drop their argument.
pub fn install(history: Arc<dyn History>) -> Arc<HistoryInterceptor> {
    INSTALLED
        .get_or_init(|| Arc::new(HistoryInterceptor::new(history)))
        .clone()
}

pub fn installed() -> Option<Arc<HistoryInterceptor>> {
    INSTALLED.get().cloned()
}

/// Pushes (or replaces) `to` through the installed interceptor
///
/// Returns `false` when no interceptor is installed.
pub fn navigate(to: &str, replace: bool) -> bool {
    let Some(interceptor) = INSTALLED.get() else {
        warn!("navigate({}) before history was installed", to);
        return false;
    };
    if replace {
        interceptor.replace_state(to);
    } else {
        interceptor.push_state(to);
    }
    true
}
