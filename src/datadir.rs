//! Module manifest recorded in a module's data directory.
//!
//! After modules are installed, `<module>/.terraform/modules/modules.json`
//! lists every module call with its resolved directory:
//!
//! ```json
//! {"Modules":[
//!   {"Key":"","Source":"","Dir":"."},
//!   {"Key":"child","Source":"./child","Dir":"child"}
//! ]}
//! ```

use std::path::{Component, Path, PathBuf};

use semver::Version;
use serde::Deserialize;

pub const DATA_DIR: &str = ".terraform";

/// Path of the module manifest for a module directory.
pub fn manifest_path(module_dir: &Path) -> PathBuf {
    module_dir.join(DATA_DIR).join("modules").join("modules.json")
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read module manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode module manifest: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Dotted call path; empty for the root module.
    pub key: String,
    pub source_addr: String,
    pub version: Option<Version>,
    /// Directory relative to the manifest's root module.
    pub dir: PathBuf,
}

impl ModuleRecord {
    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }

    pub fn is_local(&self) -> bool {
        ["./", "../", ".\\", "..\\"]
            .iter()
            .any(|prefix| self.source_addr.starts_with(prefix))
    }

    /// True for records naming a direct child of the root module.
    pub fn is_direct_call(&self) -> bool {
        !self.is_root() && !self.key.contains('.')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleManifest {
    root_dir: PathBuf,
    pub records: Vec<ModuleRecord>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(rename = "Modules", default)]
    modules: Vec<RawRecord>,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Version", default)]
    version: Option<String>,
    #[serde(rename = "Dir")]
    dir: String,
}

impl ModuleManifest {
    pub fn new(root_dir: impl Into<PathBuf>, records: Vec<ModuleRecord>) -> ModuleManifest {
        ModuleManifest {
            root_dir: root_dir.into(),
            records,
        }
    }

    pub fn parse(root_dir: &Path, bytes: &[u8]) -> Result<ModuleManifest, ManifestError> {
        let raw: RawManifest = serde_json::from_slice(bytes)?;
        let records = raw
            .modules
            .into_iter()
            .map(|r| ModuleRecord {
                key: r.key,
                source_addr: r.source,
                // Unparseable versions are kept out of the way rather than failing the manifest
                version: r.version.as_deref().and_then(|v| Version::parse(v).ok()),
                dir: PathBuf::from(r.dir),
            })
            .collect();

        Ok(ModuleManifest::new(clean_path(root_dir), records))
    }

    pub fn from_module_dir(module_dir: &Path) -> Result<ModuleManifest, ManifestError> {
        let path = manifest_path(module_dir);
        let bytes = std::fs::read(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        ModuleManifest::parse(module_dir, &bytes)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Absolute directory of a record.
    pub fn record_path(&self, record: &ModuleRecord) -> PathBuf {
        clean_path(&self.root_dir.join(&record.dir))
    }

    /// Whether any local, non-root record resolves to `path`.
    pub fn contains_local_module(&self, path: &Path) -> bool {
        let wanted = clean_path(path);
        self.records
            .iter()
            .filter(|r| !r.is_root() && r.is_local())
            .any(|r| self.record_path(r) == wanted)
    }
}

/// Lexically normalises a path: removes `.` and resolves `..` against the
/// preceding component without touching the filesystem.
///
/// Leading `..` components of a relative path are kept; `..` directly below
/// the root is dropped.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{"Modules":[
        {"Key":"","Source":"","Dir":"."},
        {"Key":"child","Source":"./child","Dir":"child"},
        {"Key":"child.grand","Source":"./grand","Dir":"child/grand"},
        {"Key":"vpc","Source":"registry.terraform.io/terraform-aws-modules/vpc/aws",
         "Version":"3.14.0","Dir":".terraform/modules/vpc"}
    ]}"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = ModuleManifest::parse(Path::new("/root"), MANIFEST.as_bytes()).unwrap();

        assert_eq!(manifest.records.len(), 4);
        assert!(manifest.records[0].is_root());
        assert!(manifest.records[1].is_local());
        assert!(manifest.records[1].is_direct_call());
        assert!(!manifest.records[2].is_direct_call());
        assert!(!manifest.records[3].is_local());
        assert_eq!(manifest.records[3].version, Some(Version::new(3, 14, 0)));
    }

    #[test]
    fn test_contains_local_module() {
        let manifest = ModuleManifest::parse(Path::new("/root"), MANIFEST.as_bytes()).unwrap();

        assert!(manifest.contains_local_module(Path::new("/root/child")));
        assert!(manifest.contains_local_module(Path::new("/root/./child/grand")));
        assert!(!manifest.contains_local_module(Path::new("/root")));
        assert!(
            !manifest.contains_local_module(Path::new("/root/.terraform/modules/vpc")),
            "registry modules are not local"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ModuleManifest::parse(Path::new("/root"), b"not json"),
            Err(ManifestError::Json(_))
        ));
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModuleManifest::from_module_dir(dir.path()),
            Err(ManifestError::Io { .. })
        ));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(clean_path(Path::new("../../x")), PathBuf::from("../../x"));
        assert_eq!(clean_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
    }
}
