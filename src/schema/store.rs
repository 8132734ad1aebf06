//! The global provider schema store.
//!
//! One [`ProviderSchemas`] document is published at a time. Readers load the
//! current document without blocking; a refresh loads a whole new document
//! from the [`SchemaSource`] and swaps it in. A [`Watcher`] triggers refreshes
//! when plugin or lock files change.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use arc_swap::{ArcSwap, ArcSwapOption};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ProviderSchemas, SchemaError};
use crate::state::OpError;

/// Supplies the provider schema document.
pub trait SchemaSource: Send + Sync {
    fn load(&self) -> anyhow::Result<ProviderSchemas>;
}

/// Always returns the same document.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub ProviderSchemas);

impl SchemaSource for StaticSource {
    fn load(&self) -> anyhow::Result<ProviderSchemas> {
        Ok(self.0.clone())
    }
}

/// Reads the document from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl SchemaSource for JsonFileSource {
    fn load(&self) -> anyhow::Result<ProviderSchemas> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }
}

pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Signals plugin and lock file changes in watched workspaces.
pub trait Watcher: Send + Sync {
    fn add_workspace(&self, dir: &Path) -> anyhow::Result<()>;
    fn on_plugin_change(&self, callback: ChangeCallback);
}

/// A watcher that only fires when told to.
#[derive(Default)]
pub struct ManualWatcher {
    workspaces: Mutex<Vec<PathBuf>>,
    callbacks: Mutex<Vec<ChangeCallback>>,
}

impl ManualWatcher {
    pub fn new() -> ManualWatcher {
        ManualWatcher::default()
    }

    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Invokes every registered callback. Returns how many ran.
    pub fn fire(&self) -> usize {
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }
}

impl Watcher for ManualWatcher {
    fn add_workspace(&self, dir: &Path) -> anyhow::Result<()> {
        self.workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dir.to_path_buf());
        Ok(())
    }

    fn on_plugin_change(&self, callback: ChangeCallback) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshMode {
    /// Loads on the blocking pool of the tokio runtime the store was created in.
    #[default]
    Async,
    /// Loads before `refresh` returns.
    Sync,
}

/// Read access to the current provider schemas.
pub trait SchemaReader {
    fn provider_schemas(&self) -> Arc<ProviderSchemas>;
}

pub struct SchemaStore {
    current: ArcSwap<ProviderSchemas>,
    last_error: ArcSwapOption<OpError>,
    source: Arc<dyn SchemaSource>,
    mode: RefreshMode,
    runtime: Option<Handle>,
    started: AtomicU64,
    published: Mutex<u64>,
}

impl SchemaStore {
    /// An empty store. Nothing is loaded until the first refresh.
    ///
    /// Asynchronous refreshes run on the tokio runtime current at this call;
    /// without one they fall back to loading synchronously.
    pub fn new(source: Arc<dyn SchemaSource>, mode: RefreshMode) -> Arc<SchemaStore> {
        Arc::new(SchemaStore {
            current: ArcSwap::from_pointee(ProviderSchemas::default()),
            last_error: ArcSwapOption::empty(),
            source,
            mode,
            runtime: Handle::try_current().ok(),
            started: AtomicU64::new(0),
            published: Mutex::new(0),
        })
    }

    /// A synchronous store already holding `schemas`.
    pub fn with_schemas(schemas: ProviderSchemas) -> Arc<SchemaStore> {
        let store = SchemaStore::new(Arc::new(StaticSource(schemas.clone())), RefreshMode::Sync);
        store.current.store(Arc::new(schemas));
        store
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// The current document, possibly empty before the first load.
    pub fn schemas(&self) -> Arc<ProviderSchemas> {
        self.current.load_full()
    }

    /// The error of the most recent failed load, cleared by the next success.
    pub fn last_error(&self) -> Option<OpError> {
        self.last_error.load_full().map(|err| OpError::clone(&err))
    }

    /// Registers a refresh on every plugin change signalled by `watcher`.
    pub fn watch(self: &Arc<Self>, watcher: &dyn Watcher) {
        let store = Arc::downgrade(self);
        watcher.on_plugin_change(Arc::new(move || {
            if let Some(store) = store.upgrade() {
                let _ = store.refresh();
            }
        }));
    }

    /// Reloads the document according to the store's mode.
    ///
    /// Returns the task handle for an asynchronous refresh.
    pub fn refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        match (self.mode, &self.runtime) {
            (RefreshMode::Async, Some(runtime)) => {
                let store = Arc::clone(self);
                Some(runtime.spawn_blocking(move || {
                    let _ = store.load(generation);
                }))
            }
            (RefreshMode::Async, None) => {
                debug!("no runtime for asynchronous schema refresh, loading synchronously");
                let _ = self.load(generation);
                None
            }
            (RefreshMode::Sync, _) => {
                let _ = self.load(generation);
                None
            }
        }
    }

    /// Loads and publishes the document on the calling thread.
    pub fn load_now(&self) -> Result<usize, SchemaError> {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        self.load(generation)
    }

    fn load(&self, generation: u64) -> Result<usize, SchemaError> {
        match self.source.load() {
            Ok(schemas) => {
                let count = schemas.len();
                let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
                // An older load finishing late must not replace a newer document
                if generation < *published {
                    debug!(generation, "discarding stale provider schemas");
                    return Ok(count);
                }
                *published = generation;
                self.current.store(Arc::new(schemas));
                self.last_error.store(None);
                info!(providers = count, generation, "provider schemas refreshed");
                Ok(count)
            }
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    generation,
                    "failed to refresh provider schemas"
                );
                let shared = OpError::new(err);
                let published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
                if generation < *published {
                    debug!(generation, "discarding stale schema load error");
                } else {
                    self.last_error.store(Some(Arc::new(shared.clone())));
                }
                Err(SchemaError::Source(anyhow::anyhow!("{shared}")))
            }
        }
    }
}

impl SchemaReader for SchemaStore {
    fn provider_schemas(&self) -> Arc<ProviderSchemas> {
        self.schemas()
    }
}
