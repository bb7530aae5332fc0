// File: src/watch.rs
// Purpose: Coalesce reload triggers into one running task plus one pending

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct Flags {
    running: bool,
    pending: bool,
}

type Task = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs a task at most once at a time
///
/// A trigger while the task runs schedules exactly one more run after it;
/// further triggers in that window are absorbed.
#[derive(Clone)]
pub struct ReloadScheduler {
    task: Task,
    flags: Arc<Mutex<Flags>>,
}

impl ReloadScheduler {
    pub fn new<F, Fut>(task: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task: Task = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(task()) });
        Self {
            task,
            flags: Arc::new(Mutex::new(Flags::default())),
        }
    }

    /// Requests a run; must be called inside a Tokio runtime
    pub fn trigger(&self) {
        {
            let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
            if flags.running {
                flags.pending = true;
                debug!("Reload already running, queued another");
                return;
            }
            flags.running = true;
        }

        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.drive().await });
    }

    async fn drive(self) {
        loop {
            (self.task)().await;

            let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
            if flags.pending {
                flags.pending = false;
            } else {
                flags.running = false;
                return;
            }
        }
    }

    /// Whether no run is in progress or queued
    pub fn is_idle(&self) -> bool {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        !flags.running && !flags.pending
    }
}
