use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;
use tower_lsp::lsp_types::ClientCapabilities;

use crate::schema::RefreshMode;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    pub schema_refresh: RefreshMode,
    /// Directory names never walked during discovery
    pub ignore_directory_names: Vec<String>,
    /// Module directories, relative to the root, that are never tracked
    pub exclude_module_paths: Vec<String>,
    pub workspace_symbol_limit: usize,
    pub case_matching: Case,
    pub link_support: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Case {
    Ignore,
    Smart,
    Respect,
}

impl From<Case> for nucleo_matcher::pattern::CaseMatching {
    fn from(case: Case) -> Self {
        match case {
            Case::Ignore => nucleo_matcher::pattern::CaseMatching::Ignore,
            Case::Smart => nucleo_matcher::pattern::CaseMatching::Smart,
            Case::Respect => nucleo_matcher::pattern::CaseMatching::Respect,
        }
    }
}

impl Settings {
    pub fn new(root_dir: &Path, capabilities: &ClientCapabilities) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/modstore/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.modstore",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("log_filter", "info")?
            .set_default("schema_refresh", "Async")?
            .set_default("ignore_directory_names", vec![".git", ".terraform", "node_modules"])?
            .set_default("exclude_module_paths", Vec::<String>::new())?
            .set_default("workspace_symbol_limit", 100)?
            .set_default("case_matching", "Smart")?
            .set_default("link_support", false)?
            .set_override_option(
                "link_support",
                capabilities
                    .text_document
                    .as_ref()
                    .and_then(|it| it.definition.as_ref())
                    .and_then(|it| it.link_support),
            )?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    /// Whether `dir`, relative to `root_dir`, is excluded from tracking.
    pub fn is_excluded(&self, root_dir: &Path, dir: &Path) -> bool {
        let Some(relative) = pathdiff::diff_paths(dir, root_dir) else {
            return false;
        };
        self.exclude_module_paths
            .iter()
            .any(|excluded| relative == Path::new(excluded))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_filter: "info".to_string(),
            schema_refresh: RefreshMode::Async,
            ignore_directory_names: vec![
                ".git".to_string(),
                ".terraform".to_string(),
                "node_modules".to_string(),
            ],
            exclude_module_paths: vec![],
            workspace_symbol_limit: 100,
            case_matching: Case::Smart,
            link_support: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tower_lsp::lsp_types::{GotoCapability, TextDocumentClientCapabilities};

    use super::*;

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new(dir.path(), &ClientCapabilities::default()).unwrap();

        assert_eq!(settings.log_filter, "info");
        assert_eq!(settings.schema_refresh, RefreshMode::Async);
        assert_eq!(settings.workspace_symbol_limit, 100);
        assert_eq!(settings.case_matching, Case::Smart);
        assert!(settings.ignore_directory_names.contains(&".terraform".to_string()));
        assert!(!settings.link_support);
    }

    #[test]
    fn test_workspace_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".modstore.toml"),
            "schema_refresh = \"Sync\"\n\
             workspace_symbol_limit = 5\n\
             exclude_module_paths = [\"legacy\"]\n",
        )
        .unwrap();

        let settings = Settings::new(dir.path(), &ClientCapabilities::default()).unwrap();

        assert_eq!(settings.schema_refresh, RefreshMode::Sync);
        assert_eq!(settings.workspace_symbol_limit, 5);
        assert!(settings.is_excluded(dir.path(), &dir.path().join("legacy")));
        assert!(!settings.is_excluded(dir.path(), &dir.path().join("app")));
    }

    #[test]
    fn test_link_support_follows_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let capabilities = ClientCapabilities {
            text_document: Some(TextDocumentClientCapabilities {
                definition: Some(GotoCapability {
                    dynamic_registration: None,
                    link_support: Some(true),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let settings = Settings::new(dir.path(), &capabilities).unwrap();
        assert!(settings.link_support);
    }
}
