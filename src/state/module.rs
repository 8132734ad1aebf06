use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;

use super::operation::{Artifact, ArtifactKind, OpError, OpState};
use crate::ast::{Diagnostics, ParsedFiles};
use crate::datadir::ModuleManifest;
use crate::lang::{ReferenceOrigins, ReferenceTargets};
use crate::module_meta::{
    ModuleMeta, Output, ProviderAddr, ProviderRef, Variable, VersionConstraints,
};

/// Facts derived from a module's declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub core_requirements: VersionConstraints,
    pub provider_references: BTreeMap<ProviderRef, ProviderAddr>,
    pub provider_requirements: BTreeMap<ProviderAddr, VersionConstraints>,
    pub variables: BTreeMap<String, Variable>,
    pub outputs: BTreeMap<String, Output>,
}

impl From<ModuleMeta> for ModuleMetadata {
    fn from(meta: ModuleMeta) -> Self {
        ModuleMetadata {
            core_requirements: meta.core_requirements,
            provider_references: meta.provider_references,
            provider_requirements: meta.provider_requirements,
            variables: meta.variables,
            outputs: meta.outputs,
        }
    }
}

/// Resolved version of the core engine and of each provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolVersion {
    pub core: Option<Version>,
    pub providers: BTreeMap<ProviderAddr, Version>,
}

/// One tracked module directory and every artifact derived from it.
///
/// A `Module` handed out by the store is shared and never mutated; writers
/// clone it, change one artifact and publish the clone. Cloning copies every
/// map and list, while parsed files and the manifest are shared behind `Arc`
/// because they are immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub path: PathBuf,

    pub manifest: Artifact<Option<Arc<ModuleManifest>>>,
    pub tool_version: Artifact<ToolVersion>,
    /// Schema data lives in the schema store; this only tracks acquisition.
    pub provider_schema: Artifact<()>,

    pub ref_targets: Artifact<ReferenceTargets>,
    pub ref_origins: Artifact<ReferenceOrigins>,

    pub module_files: Artifact<ParsedFiles>,
    pub vars_files: Artifact<ParsedFiles>,

    pub meta: Artifact<ModuleMetadata>,

    pub module_diagnostics: Diagnostics,
    pub vars_diagnostics: Diagnostics,
}

impl Module {
    pub(crate) fn new(path: PathBuf) -> Module {
        Module {
            path,
            manifest: Artifact::default(),
            tool_version: Artifact::default(),
            provider_schema: Artifact::default(),
            ref_targets: Artifact::default(),
            ref_origins: Artifact::default(),
            module_files: Artifact::default(),
            vars_files: Artifact::default(),
            meta: Artifact::default(),
            module_diagnostics: Diagnostics::new(),
            vars_diagnostics: Diagnostics::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self, kind: ArtifactKind) -> OpState {
        self.status(kind).0
    }

    /// Current state and last captured error of an artifact.
    pub fn status(&self, kind: ArtifactKind) -> (OpState, Option<&OpError>) {
        match kind {
            ArtifactKind::Manifest => (self.manifest.state, self.manifest.err.as_ref()),
            ArtifactKind::ToolVersion => (self.tool_version.state, self.tool_version.err.as_ref()),
            ArtifactKind::ProviderSchema => {
                (self.provider_schema.state, self.provider_schema.err.as_ref())
            }
            ArtifactKind::ModuleParsing => {
                (self.module_files.state, self.module_files.err.as_ref())
            }
            ArtifactKind::VarsParsing => (self.vars_files.state, self.vars_files.err.as_ref()),
            ArtifactKind::Meta => (self.meta.state, self.meta.err.as_ref()),
            ArtifactKind::ReferenceTargets => {
                (self.ref_targets.state, self.ref_targets.err.as_ref())
            }
            ArtifactKind::ReferenceOrigins => {
                (self.ref_origins.state, self.ref_origins.err.as_ref())
            }
        }
    }

    pub(crate) fn set_state(&mut self, kind: ArtifactKind, state: OpState) {
        match kind {
            ArtifactKind::Manifest => self.manifest.set_state(state),
            ArtifactKind::ToolVersion => self.tool_version.set_state(state),
            ArtifactKind::ProviderSchema => self.provider_schema.set_state(state),
            ArtifactKind::ModuleParsing => self.module_files.set_state(state),
            ArtifactKind::VarsParsing => self.vars_files.set_state(state),
            ArtifactKind::Meta => self.meta.set_state(state),
            ArtifactKind::ReferenceTargets => self.ref_targets.set_state(state),
            ArtifactKind::ReferenceOrigins => self.ref_origins.set_state(state),
        }
    }

    /// Projects metadata into the shape consumed by the decoder.
    pub fn module_meta(&self) -> ModuleMeta {
        let meta = &self.meta.payload;
        ModuleMeta {
            path: self.path.clone(),
            core_requirements: meta.core_requirements.clone(),
            provider_references: meta.provider_references.clone(),
            provider_requirements: meta.provider_requirements.clone(),
            variables: meta.variables.clone(),
            outputs: meta.outputs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParsedFile;

    #[test]
    fn test_new_module_is_unknown_everywhere() {
        let module = Module::new(PathBuf::from("/ws/app"));
        for kind in ArtifactKind::ALL {
            assert_eq!(module.state(kind), OpState::Unknown, "{kind}");
            assert!(module.status(kind).1.is_none());
        }
        assert!(module.module_diagnostics.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut module = Module::new(PathBuf::from("/ws/app"));
        module.module_files.payload.insert(
            "main.tf".into(),
            Arc::new(ParsedFile::new("main.tf", "locals {}\n")),
        );
        module
            .meta
            .payload
            .variables
            .insert("region".into(), Variable::default());

        let mut copy = module.clone();
        copy.module_files.payload.clear();
        copy.meta.payload.variables.clear();
        copy.set_state(ArtifactKind::Meta, OpState::Loading);

        assert_eq!(module.module_files.payload.len(), 1);
        assert_eq!(module.meta.payload.variables.len(), 1);
        assert_eq!(module.state(ArtifactKind::Meta), OpState::Unknown);
    }

    #[test]
    fn test_module_meta_projection() {
        let mut module = Module::new(PathBuf::from("/ws/app"));
        module
            .meta
            .payload
            .outputs
            .insert("id".into(), Output::default());

        let meta = module.module_meta();
        assert_eq!(meta.path, PathBuf::from("/ws/app"));
        assert!(meta.outputs.contains_key("id"));
    }
}
