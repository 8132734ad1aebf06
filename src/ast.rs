//! Parsed-file handles and per-file diagnostics for the two file families of
//! a module: definition files (`*.tf`, `*.tf.json`) and variable-value files
//! (`*.tfvars`, `*.tfvars.json`).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFamily {
    Module,
    Vars,
}

impl FileFamily {
    /// Classifies a file name, ignoring editor backups and hidden files.
    pub fn of(filename: &str) -> Option<FileFamily> {
        if is_ignored_file(filename) {
            return None;
        }
        if filename.ends_with(".tf") || filename.ends_with(".tf.json") {
            Some(FileFamily::Module)
        } else if filename.ends_with(".tfvars") || filename.ends_with(".tfvars.json") {
            Some(FileFamily::Vars)
        } else {
            None
        }
    }
}

pub fn is_ignored_file(filename: &str) -> bool {
    filename.starts_with('.') || filename.starts_with('#') || filename.ends_with('~')
}

pub fn is_json_file(filename: &str) -> bool {
    filename.ends_with(".json")
}

/// Variable files loaded without being named on the command line.
pub fn is_auto_loaded_vars_file(filename: &str) -> bool {
    filename == "terraform.tfvars"
        || filename == "terraform.tfvars.json"
        || filename.ends_with(".auto.tfvars")
        || filename.ends_with(".auto.tfvars.json")
}

/// Whether a directory holds at least one definition file.
pub fn is_module_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry.file_type().is_ok_and(|t| t.is_file())
                    && entry
                        .file_name()
                        .to_str()
                        .and_then(FileFamily::of)
                        .is_some_and(|family| family == FileFamily::Module)
            })
        })
        .unwrap_or(false)
}

/// An immutable parsed file.
///
/// The syntax tree itself belongs to the external parser; the store only
/// needs the name and the source the tree was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub name: String,
    pub source: Rope,
}

impl ParsedFile {
    pub fn new(name: impl Into<String>, source: &str) -> ParsedFile {
        ParsedFile {
            name: name.into(),
            source: Rope::from_str(source),
        }
    }

    pub fn family(&self) -> Option<FileFamily> {
        FileFamily::of(&self.name)
    }

    pub fn is_json(&self) -> bool {
        is_json_file(&self.name)
    }

    pub fn line_count(&self) -> usize {
        self.source.len_lines()
    }
}

/// Parsed files of one family keyed by filename.
pub type ParsedFiles = BTreeMap<String, Arc<ParsedFile>>;

/// Findings per filename, in the order they were reported.
pub type Diagnostics = BTreeMap<String, Vec<Diagnostic>>;

/// Total number of findings across files.
pub fn diagnostic_count(diags: &Diagnostics) -> usize {
    diags.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_family() {
        assert_eq!(FileFamily::of("main.tf"), Some(FileFamily::Module));
        assert_eq!(FileFamily::of("main.tf.json"), Some(FileFamily::Module));
        assert_eq!(FileFamily::of("prod.tfvars"), Some(FileFamily::Vars));
        assert_eq!(FileFamily::of("README.md"), None);
        assert_eq!(FileFamily::of(".hidden.tf"), None);
        assert_eq!(FileFamily::of("main.tf~"), None);
    }

    #[test]
    fn test_auto_loaded_vars() {
        assert!(is_auto_loaded_vars_file("terraform.tfvars"));
        assert!(is_auto_loaded_vars_file("x.auto.tfvars.json"));
        assert!(!is_auto_loaded_vars_file("prod.tfvars"));
    }

    #[test]
    fn test_is_module_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_module_dir(dir.path()));

        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert!(!is_module_dir(dir.path()));

        std::fs::write(dir.path().join("main.tf"), "").unwrap();
        assert!(is_module_dir(dir.path()));
    }

    #[test]
    fn test_parsed_file() {
        let file = ParsedFile::new("vars.tf", "variable \"a\" {}\n");
        assert_eq!(file.family(), Some(FileFamily::Module));
        assert_eq!(file.line_count(), 2);
        assert!(!file.is_json());
    }
}
