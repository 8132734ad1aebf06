//! Workspace discovery.
//!
//! Walks a root directory for module directories, tracks each in a
//! [`ModuleStore`], and loads what can be read straight from disk: the
//! module manifest and the raw text of both file families. Everything else
//! is left to the producers that own it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::ast::{self, FileFamily, ParsedFile, ParsedFiles};
use crate::config::Settings;
use crate::datadir::{self, ModuleManifest};
use crate::state::{ModuleStore, StoreError};

/// Outcome of indexing one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub modules: Vec<PathBuf>,
    /// Tracked modules under the root that no longer exist on disk.
    pub removed: Vec<PathBuf>,
    pub manifests: usize,
    pub failed_manifests: usize,
}

/// Every module directory under `root_dir`, in path order.
///
/// Directories named in `ignore_directory_names` are not walked, and
/// directories listed in `exclude_module_paths` are skipped.
pub fn discover_module_dirs(settings: &Settings, root_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(root_dir)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !e
                    .file_name()
                    .to_str()
                    .is_some_and(|name| settings.ignore_directory_names.iter().any(|i| i == name))
        })
        .flatten()
        .filter(|e| e.file_type().is_dir())
        .map(|e| datadir::clean_path(e.path()))
        .filter(|dir| !settings.is_excluded(root_dir, dir))
        .filter(|dir| ast::is_module_dir(dir))
        .sorted()
        .collect()
}

/// Reads every definition and variable file of a module directory.
fn read_module_files(dir: &Path) -> anyhow::Result<(ParsedFiles, ParsedFiles)> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let family = FileFamily::of(&name)?;
            Some((name, family, entry.path()))
        })
        .collect_vec();

    let read = entries
        .into_par_iter()
        .map(|(name, family, path)| {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok::<_, anyhow::Error>((family, name.clone(), Arc::new(ParsedFile::new(name, &text))))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (mut module_files, mut vars_files) = (ParsedFiles::new(), ParsedFiles::new());
    for (family, name, file) in read {
        match family {
            FileFamily::Module => module_files.insert(name, file),
            FileFamily::Vars => vars_files.insert(name, file),
        };
    }
    Ok((module_files, vars_files))
}

/// Tracks every module under `root_dir` and loads its manifest and files.
///
/// Modules already in the store are refreshed, not duplicated, and tracked
/// modules under `root_dir` that were not rediscovered are removed. A missing
/// manifest is normal before installation and leaves the artifact empty; an
/// unreadable one is recorded on the module.
pub fn index_workspace(
    store: &ModuleStore,
    settings: &Settings,
    root_dir: &Path,
) -> Result<IndexSummary, StoreError> {
    let root = datadir::clean_path(root_dir);
    let modules = discover_module_dirs(settings, &root);
    info!(root = %root.display(), count = modules.len(), "discovered modules");

    let mut summary = IndexSummary::default();
    for gone in store
        .snapshot()
        .paths()
        .into_iter()
        .filter(|path| path.starts_with(&root) && modules.binary_search(path).is_err())
    {
        debug!(path = %gone.display(), "module no longer on disk");
        store.remove(&gone);
        summary.removed.push(gone);
    }

    for dir in &modules {
        match store.add(dir) {
            Err(err) if err.is_already_exists() => {
                debug!(path = %dir.display(), "module already tracked")
            }
            other => other?,
        }

        if datadir::manifest_path(dir).is_file() {
            match ModuleManifest::from_module_dir(dir) {
                Ok(manifest) => {
                    store.update_manifest(dir, Some(manifest), None)?;
                    summary.manifests += 1;
                }
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "failed to load module manifest");
                    store.update_manifest(dir, None, Some(err.into()))?;
                    summary.failed_manifests += 1;
                }
            }
        } else {
            store.update_manifest(dir, None, None)?;
        }

        match read_module_files(dir) {
            Ok((module_files, vars_files)) => {
                store.update_parsed_module_files(dir, module_files, None)?;
                store.update_parsed_vars_files(dir, vars_files, None)?;
            }
            Err(err) => {
                warn!(
                    path = %dir.display(),
                    error = %format!("{err:#}"),
                    "failed to read module files"
                );
                let vars_err = anyhow::anyhow!("{err:#}");
                store.update_parsed_module_files(dir, ParsedFiles::new(), Some(err))?;
                store.update_parsed_vars_files(dir, ParsedFiles::new(), Some(vars_err))?;
            }
        }
    }

    summary.modules = modules;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::state::{ArtifactKind, OpState};

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("main.tf"), "module \"child\" {\n  source = \"./child\"\n}\n").unwrap();
        fs::write(root.join("terraform.tfvars"), "region = \"eu-west-1\"\n").unwrap();
        fs::create_dir_all(root.join("child")).unwrap();
        fs::write(root.join("child/outputs.tf"), "output \"id\" {\n  value = 1\n}\n").unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/README.md"), "# docs\n").unwrap();
        fs::create_dir_all(root.join(".terraform/modules")).unwrap();
        fs::write(
            root.join(".terraform/modules/modules.json"),
            concat!(
                r#"{"Modules":[{"Key":"","Source":"","Dir":"."},"#,
                r#"{"Key":"child","Source":"./child","Dir":"child"}]}"#,
            ),
        )
        .unwrap();
        fs::create_dir_all(root.join(".terraform/modules/remote")).unwrap();
        fs::write(root.join(".terraform/modules/remote/main.tf"), "").unwrap();
        dir
    }

    #[test]
    fn test_discovery_skips_ignored_and_plain_dirs() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());

        let found = discover_module_dirs(&Settings::default(), &root);

        assert_eq!(found, vec![root.clone(), root.join("child")]);
    }

    #[test]
    fn test_discovery_honours_excludes() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());
        let settings = Settings {
            exclude_module_paths: vec!["child".to_string()],
            ..Settings::default()
        };

        assert_eq!(discover_module_dirs(&settings, &root), vec![root]);
    }

    #[test]
    fn test_index_loads_manifest_and_files() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());
        let store = ModuleStore::new();

        let summary = index_workspace(&store, &Settings::default(), &root).unwrap();

        assert_eq!(summary.modules.len(), 2);
        assert_eq!(summary.manifests, 1);
        assert_eq!(summary.failed_manifests, 0);

        let module = store.module_by_path(&root).unwrap();
        assert!(module.module_files.payload.contains_key("main.tf"));
        assert!(module.vars_files.payload.contains_key("terraform.tfvars"));

        let callers = store.callers_of_module(&root.join("child"));
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].path(), root.as_path());

        let (state, err) = store
            .artifact_status(&root.join("child"), ArtifactKind::Manifest)
            .unwrap();
        assert_eq!(state, OpState::Loaded);
        assert!(err.is_none());
    }

    #[test]
    fn test_broken_manifest_is_recorded() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());
        fs::write(root.join(".terraform/modules/modules.json"), "{not json").unwrap();
        let store = ModuleStore::new();

        let summary = index_workspace(&store, &Settings::default(), &root).unwrap();

        assert_eq!(summary.failed_manifests, 1);
        let (state, err) = store.artifact_status(&root, ArtifactKind::Manifest).unwrap();
        assert_eq!(state, OpState::Loaded);
        assert!(err.is_some());
    }

    #[test]
    fn test_reindex_removes_deleted_modules() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());
        let store = ModuleStore::new();
        store.add(Path::new("/elsewhere/app")).unwrap();
        index_workspace(&store, &Settings::default(), &root).unwrap();
        assert_eq!(store.callers_of_module(&root.join("child")).len(), 1);

        fs::remove_dir_all(root.join("child")).unwrap();
        let summary = index_workspace(&store, &Settings::default(), &root).unwrap();

        assert_eq!(summary.removed, vec![root.join("child")]);
        assert!(store.module_by_path(&root.join("child")).unwrap_err().is_not_found());
        assert!(store.callers_of_module(&root.join("child")).is_empty());
        assert!(
            store.module_by_path(Path::new("/elsewhere/app")).is_ok(),
            "modules outside the root are left alone"
        );
    }

    #[test]
    fn test_unreadable_files_fail_both_families() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());
        fs::write(root.join("child/broken.tf"), [0xff, 0xfe, 0xfd]).unwrap();
        let store = ModuleStore::new();

        index_workspace(&store, &Settings::default(), &root).unwrap();

        let child = root.join("child");
        for kind in [ArtifactKind::ModuleParsing, ArtifactKind::VarsParsing] {
            let (state, err) = store.artifact_status(&child, kind).unwrap();
            assert_eq!(state, OpState::Loaded, "{kind}");
            assert!(err.is_some_and(|e| e.to_string().contains("broken.tf")), "{kind}");
        }
        let (_, err) = store.artifact_status(&root, ArtifactKind::VarsParsing).unwrap();
        assert!(err.is_none());
    }

    #[test]
    fn test_reindex_keeps_modules() {
        let ws = workspace();
        let root = datadir::clean_path(ws.path());
        let store = ModuleStore::new();

        index_workspace(&store, &Settings::default(), &root).unwrap();
        index_workspace(&store, &Settings::default(), &root).unwrap();

        assert_eq!(store.list().len(), 2);
    }
}
