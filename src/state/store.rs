//! The module store: an in-memory, snapshot-isolated table of [`Module`]s.
//!
//! # Concurrency
//!
//! - Readers load the current [`StoreSnapshot`] through `ArcSwap` and never
//!   block. A snapshot, and every module reachable from it, is immutable.
//! - Writers are serialised by a single mutex. Each write transaction starts
//!   from the latest committed snapshot, copies the module it changes and
//!   publishes a whole new snapshot, so concurrent updates to different
//!   artifacts of one module cannot lose each other.
//! - A failed transaction publishes nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::debug;

use super::index::CallIndex;
use super::operation::{ArtifactKind, OpError, OpState};
use super::{Module, ModuleMetadata, StoreError, ToolVersion};
use crate::ast::{Diagnostics, ParsedFiles};
use crate::datadir::{clean_path, ModuleManifest};
use crate::lang::{ReferenceOrigins, ReferenceTargets};
use crate::module_meta::{ModuleCall, ModuleMeta};

/// A consistent point-in-time view of every tracked module.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    modules: BTreeMap<PathBuf, Arc<Module>>,
    calls: Arc<CallIndex>,
}

impl StoreSnapshot {
    pub fn module_by_path(&self, path: &Path) -> Result<Arc<Module>, StoreError> {
        let key = clean_path(path);
        self.modules
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound { path: key })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(&clean_path(path))
    }

    /// All modules ordered by path.
    pub fn list(&self) -> Vec<Arc<Module>> {
        self.modules.values().cloned().collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.modules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules whose manifest records a local call resolving to `path`.
    pub fn callers_of_module(&self, path: &Path) -> Vec<Arc<Module>> {
        self.calls
            .callers(&clean_path(path))
            .iter()
            .filter_map(|caller| self.modules.get(caller).cloned())
            .collect()
    }

    /// Modules reaching `path` through any chain of local calls.
    pub fn transitive_callers_of_module(&self, path: &Path) -> Vec<Arc<Module>> {
        self.calls
            .transitive_callers(&clean_path(path))
            .iter()
            .filter_map(|caller| self.modules.get(caller).cloned())
            .collect()
    }

    /// Direct module calls recorded for `path` by any stored manifest rooted
    /// at `path`, resolved to absolute directories.
    pub fn module_calls(&self, path: &Path) -> Vec<ModuleCall> {
        let root = clean_path(path);
        let mut calls: BTreeMap<String, ModuleCall> = BTreeMap::new();

        for module in self.modules.values() {
            let Some(manifest) = module.manifest.payload.as_ref() else {
                continue;
            };
            if manifest.root_dir() != root {
                continue;
            }
            for record in manifest.records.iter().filter(|r| r.is_direct_call()) {
                calls
                    .entry(record.key.clone())
                    .or_insert_with(|| ModuleCall {
                        local_name: record.key.clone(),
                        source_addr: record.source_addr.clone(),
                        path: clean_path(&root.join(&record.dir)),
                    });
            }
        }

        calls.into_values().collect()
    }

    pub fn module_meta(&self, path: &Path) -> Result<ModuleMeta, StoreError> {
        Ok(self.module_by_path(path)?.module_meta())
    }
}

/// Transactionally consistent, concurrently readable collection of modules.
#[derive(Debug, Default)]
pub struct ModuleStore {
    current: ArcSwap<StoreSnapshot>,
    writer: Mutex<()>,
}

struct Txn {
    modules: BTreeMap<PathBuf, Arc<Module>>,
    dirty: bool,
    calls_dirty: bool,
}

impl Txn {
    fn modify(
        &mut self,
        path: &Path,
        apply: impl FnOnce(&mut Module),
    ) -> Result<(), StoreError> {
        let current = self.modules.get(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_path_buf(),
        })?;
        let mut copy = Module::clone(current);
        apply(&mut copy);
        self.modules.insert(path.to_path_buf(), Arc::new(copy));
        self.dirty = true;
        Ok(())
    }
}

impl ModuleStore {
    pub fn new() -> ModuleStore {
        ModuleStore::default()
    }

    /// The latest committed snapshot. Holding it pins that version.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.current.load_full()
    }

    fn write<R>(
        &self,
        body: impl FnOnce(&mut Txn) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        // Committed snapshots are immutable, so a poisoned lock guards nothing broken.
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.current.load_full();
        let mut txn = Txn {
            modules: base.modules.clone(),
            dirty: false,
            calls_dirty: false,
        };

        let out = body(&mut txn)?;

        if txn.dirty {
            let calls = if txn.calls_dirty {
                Arc::new(CallIndex::build(txn.modules.values().map(Arc::as_ref)))
            } else {
                Arc::clone(&base.calls)
            };
            self.current.store(Arc::new(StoreSnapshot {
                modules: txn.modules,
                calls,
            }));
        }
        Ok(out)
    }

    pub fn add(&self, path: &Path) -> Result<(), StoreError> {
        let key = clean_path(path);
        self.write(|txn| {
            if txn.modules.contains_key(&key) {
                return Err(StoreError::AlreadyExists { path: key.clone() });
            }
            txn.modules
                .insert(key.clone(), Arc::new(Module::new(key.clone())));
            txn.dirty = true;
            txn.calls_dirty = true;
            Ok(())
        })?;
        debug!(path = %key.display(), "added module");
        Ok(())
    }

    /// Removes the module for `path` if there is one.
    pub fn remove(&self, path: &Path) {
        let key = clean_path(path);
        let removed = self
            .write(|txn| {
                let removed = txn.modules.remove(&key).is_some();
                txn.dirty = removed;
                txn.calls_dirty = removed;
                Ok(removed)
            })
            .unwrap_or(false);
        debug!(path = %key.display(), removed, "removed module");
    }

    pub fn module_by_path(&self, path: &Path) -> Result<Arc<Module>, StoreError> {
        self.snapshot().module_by_path(path)
    }

    pub fn list(&self) -> Vec<Arc<Module>> {
        self.snapshot().list()
    }

    pub fn callers_of_module(&self, path: &Path) -> Vec<Arc<Module>> {
        self.snapshot().callers_of_module(path)
    }

    pub fn transitive_callers_of_module(&self, path: &Path) -> Vec<Arc<Module>> {
        self.snapshot().transitive_callers_of_module(path)
    }

    pub fn module_calls(&self, path: &Path) -> Vec<ModuleCall> {
        self.snapshot().module_calls(path)
    }

    pub fn module_meta(&self, path: &Path) -> Result<ModuleMeta, StoreError> {
        self.snapshot().module_meta(path)
    }

    /// State and last captured error of one artifact.
    pub fn artifact_status(
        &self,
        path: &Path,
        kind: ArtifactKind,
    ) -> Result<(OpState, Option<OpError>), StoreError> {
        let module = self.module_by_path(path)?;
        let (state, err) = module.status(kind);
        Ok((state, err.cloned()))
    }

    pub fn set_state(
        &self,
        path: &Path,
        kind: ArtifactKind,
        state: OpState,
    ) -> Result<(), StoreError> {
        let key = clean_path(path);
        self.write(|txn| txn.modify(&key, |m| m.set_state(kind, state)))?;
        debug!(path = %key.display(), artifact = %kind, %state, "set artifact state");
        Ok(())
    }

    /// Applies one artifact update and marks it loaded in the same commit.
    fn finish(
        &self,
        path: &Path,
        kind: ArtifactKind,
        failed: bool,
        apply: impl FnOnce(&mut Module),
    ) -> Result<(), StoreError> {
        let key = clean_path(path);
        self.write(|txn| {
            txn.modify(&key, |m| {
                apply(m);
                m.set_state(kind, OpState::Loaded);
            })?;
            txn.calls_dirty = kind == ArtifactKind::Manifest;
            Ok(())
        })?;
        debug!(path = %key.display(), artifact = %kind, failed, "artifact loaded");
        Ok(())
    }

    pub fn set_manifest_state(&self, path: &Path, state: OpState) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::Manifest, state)
    }

    pub fn update_manifest(
        &self,
        path: &Path,
        manifest: Option<ModuleManifest>,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::Manifest, failed, |m| {
            m.manifest.finish(manifest.map(Arc::new), err)
        })
    }

    pub fn set_tool_version_state(&self, path: &Path, state: OpState) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::ToolVersion, state)
    }

    pub fn update_tool_version(
        &self,
        path: &Path,
        version: ToolVersion,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::ToolVersion, failed, |m| {
            m.tool_version.finish(version, err)
        })
    }

    pub fn set_provider_schema_state(&self, path: &Path, state: OpState) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::ProviderSchema, state)
    }

    /// Records the outcome of acquiring provider schemas for a module.
    pub fn finish_provider_schema_loading(
        &self,
        path: &Path,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::ProviderSchema, failed, |m| {
            m.provider_schema.finish((), err)
        })
    }

    pub fn set_module_parsing_state(&self, path: &Path, state: OpState) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::ModuleParsing, state)
    }

    pub fn update_parsed_module_files(
        &self,
        path: &Path,
        files: ParsedFiles,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::ModuleParsing, failed, |m| {
            m.module_files.finish(files, err)
        })
    }

    pub fn set_vars_parsing_state(&self, path: &Path, state: OpState) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::VarsParsing, state)
    }

    pub fn update_parsed_vars_files(
        &self,
        path: &Path,
        files: ParsedFiles,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::VarsParsing, failed, |m| {
            m.vars_files.finish(files, err)
        })
    }

    pub fn set_meta_state(&self, path: &Path, state: OpState) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::Meta, state)
    }

    pub fn update_metadata(
        &self,
        path: &Path,
        meta: ModuleMetadata,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::Meta, failed, |m| m.meta.finish(meta, err))
    }

    pub fn set_reference_targets_state(
        &self,
        path: &Path,
        state: OpState,
    ) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::ReferenceTargets, state)
    }

    pub fn update_reference_targets(
        &self,
        path: &Path,
        targets: ReferenceTargets,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::ReferenceTargets, failed, |m| {
            m.ref_targets.finish(targets, err)
        })
    }

    pub fn set_reference_origins_state(
        &self,
        path: &Path,
        state: OpState,
    ) -> Result<(), StoreError> {
        self.set_state(path, ArtifactKind::ReferenceOrigins, state)
    }

    pub fn update_reference_origins(
        &self,
        path: &Path,
        origins: ReferenceOrigins,
        err: Option<anyhow::Error>,
    ) -> Result<(), StoreError> {
        let failed = err.is_some();
        self.finish(path, ArtifactKind::ReferenceOrigins, failed, |m| {
            m.ref_origins.finish(origins, err)
        })
    }

    /// Replaces definition-file diagnostics. No state is tracked for these.
    pub fn update_module_diagnostics(
        &self,
        path: &Path,
        diags: Diagnostics,
    ) -> Result<(), StoreError> {
        let key = clean_path(path);
        self.write(|txn| txn.modify(&key, |m| m.module_diagnostics = diags))?;
        debug!(path = %key.display(), "updated module diagnostics");
        Ok(())
    }

    /// Replaces variable-file diagnostics. No state is tracked for these.
    pub fn update_vars_diagnostics(
        &self,
        path: &Path,
        diags: Diagnostics,
    ) -> Result<(), StoreError> {
        let key = clean_path(path);
        self.write(|txn| txn.modify(&key, |m| m.vars_diagnostics = diags))?;
        debug!(path = %key.display(), "updated vars diagnostics");
        Ok(())
    }
}
