use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{module_path_context, vars_path_context, DecoderError, PathContext};
use crate::context::LanguageId;
use crate::module_meta::{ModuleCall, ModuleMeta};
use crate::schema::SchemaReader;
use crate::state::{ModuleStore, StoreError, StoreSnapshot};

/// Access to other modules' interfaces while building a module's context.
pub trait ModuleReader {
    fn module_calls(&self, path: &Path) -> Vec<ModuleCall>;
    fn module_meta(&self, path: &Path) -> Result<ModuleMeta, StoreError>;
}

impl ModuleReader for StoreSnapshot {
    fn module_calls(&self, path: &Path) -> Vec<ModuleCall> {
        StoreSnapshot::module_calls(self, path)
    }

    fn module_meta(&self, path: &Path) -> Result<ModuleMeta, StoreError> {
        StoreSnapshot::module_meta(self, path)
    }
}

/// A directory served in one language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LangPath {
    pub path: PathBuf,
    pub language: LanguageId,
}

impl LangPath {
    pub fn new(path: impl Into<PathBuf>, language: LanguageId) -> LangPath {
        LangPath {
            path: path.into(),
            language,
        }
    }

    pub fn module(path: impl Into<PathBuf>) -> LangPath {
        LangPath::new(path, LanguageId::Module)
    }
}

/// Source of path contexts for the decoder.
pub trait PathReader: Send + Sync {
    /// Every servable path, ordered by directory.
    fn paths(&self) -> Vec<LangPath>;
    fn path_context(&self, path: &LangPath) -> Result<PathContext, DecoderError>;
}

/// Builds path contexts from one pinned store snapshot, so that every context
/// of a request sees the same version of the workspace.
pub struct StorePathReader {
    snapshot: Arc<StoreSnapshot>,
    schemas: Arc<dyn SchemaReader + Send + Sync>,
}

impl StorePathReader {
    pub fn new(
        store: &ModuleStore,
        schemas: Arc<dyn SchemaReader + Send + Sync>,
    ) -> StorePathReader {
        StorePathReader::from_snapshot(store.snapshot(), schemas)
    }

    pub fn from_snapshot(
        snapshot: Arc<StoreSnapshot>,
        schemas: Arc<dyn SchemaReader + Send + Sync>,
    ) -> StorePathReader {
        StorePathReader { snapshot, schemas }
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }
}

impl PathReader for StorePathReader {
    fn paths(&self) -> Vec<LangPath> {
        self.snapshot
            .list()
            .iter()
            .flat_map(|module| {
                let vars = (!module.vars_files.payload.is_empty())
                    .then(|| LangPath::new(module.path.clone(), LanguageId::Vars));
                std::iter::once(LangPath::module(module.path.clone())).chain(vars)
            })
            .collect()
    }

    fn path_context(&self, path: &LangPath) -> Result<PathContext, DecoderError> {
        let module = self.snapshot.module_by_path(&path.path)?;
        match path.language {
            LanguageId::Module => module_path_context(&module, &*self.schemas, &*self.snapshot),
            LanguageId::Vars => vars_path_context(&module),
        }
    }
}
