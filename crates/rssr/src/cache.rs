// File: src/cache.rs
// Purpose: Loaded-module bookkeeping and the per-pathname render cache

use axum::body::Bytes;
use glob::Pattern;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::graph;
use crate::module::{Dependency, ModuleLoader};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Page modules loaded since the last reload
#[derive(Debug, Default)]
pub struct ModuleCache {
    loaded: Mutex<BTreeSet<String>>,
}

impl ModuleCache {
    pub fn record(&self, path: &str) {
        lock(&self.loaded).insert(path.to_string());
    }

    pub fn paths(&self) -> Vec<String> {
        lock(&self.loaded).iter().cloned().collect()
    }

    /// Evicts every recorded module and its local import closure
    ///
    /// External packages and paths matching `exclude` are neither evicted
    /// nor followed. Returns the evicted paths in walk order.
    pub fn evict(&self, loader: &dyn ModuleLoader, exclude: &[Pattern]) -> Vec<String> {
        let roots = std::mem::take(&mut *lock(&self.loaded));
        let excluded = |path: &str| exclude.iter().any(|pattern| pattern.matches(path));

        let closure = graph::walk(
            roots.into_iter().filter(|path| !excluded(path)),
            |path| {
                loader
                    .dependencies(path)
                    .into_iter()
                    .filter_map(|dep| match dep {
                        Dependency::Local(local) if !excluded(&local) => Some(local),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            },
        );

        for path in &closure {
            loader.evict(path);
        }
        closure
    }
}

#[derive(Debug, Default)]
struct Pages {
    generation: u64,
    entries: HashMap<String, Bytes>,
}

/// Fully rendered pages keyed by request pathname
///
/// Every `clear` starts a new generation. Renders tagged with an older
/// generation are never stored.
#[derive(Debug, Default)]
pub struct RenderCache {
    pages: Mutex<Pages>,
}

impl RenderCache {
    pub fn get(&self, pathname: &str) -> Option<Bytes> {
        lock(&self.pages).entries.get(pathname).cloned()
    }

    pub fn generation(&self) -> u64 {
        lock(&self.pages).generation
    }

    /// Stores a page unless one is already cached for the pathname
    pub fn insert(&self, pathname: &str, html: Bytes) {
        let generation = self.generation();
        self.insert_at(generation, pathname, html);
    }

    /// Like `insert`, but only while `generation` is still current
    pub fn insert_at(&self, generation: u64, pathname: &str, html: Bytes) -> bool {
        let mut pages = lock(&self.pages);
        if pages.generation != generation {
            return false;
        }
        pages.entries.entry(pathname.to_string()).or_insert(html);
        true
    }

    pub fn remove(&self, pathname: &str) -> bool {
        lock(&self.pages).entries.remove(pathname).is_some()
    }

    pub fn clear(&self) {
        let mut pages = lock(&self.pages);
        pages.entries.clear();
        pages.generation += 1;
    }

    pub fn len(&self) -> usize {
        lock(&self.pages).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
