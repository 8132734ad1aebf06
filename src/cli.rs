//! Command-line interface for the `modstore` binary.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tower_lsp::lsp_types::ClientCapabilities;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::datadir;
use crate::indexer;
use crate::module_meta::ModuleCall;
use crate::state::{ArtifactKind, ModuleStore, OpState, StoreSnapshot};

#[derive(Parser, Debug)]
#[command(name = "modstore")]
#[command(about = "Inspect the module state of a configuration workspace", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover modules under DIR and print their state, calls and callers
    Inspect {
        dir: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Installs the stderr subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub state: OpState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub path: PathBuf,
    pub artifacts: BTreeMap<&'static str, ArtifactReport>,
    pub calls: Vec<ModuleCall>,
    pub callers: Vec<PathBuf>,
}

/// One report per tracked module, in path order.
pub fn inspect(snapshot: &StoreSnapshot) -> Vec<ModuleReport> {
    snapshot
        .list()
        .iter()
        .map(|module| ModuleReport {
            path: module.path.clone(),
            artifacts: ArtifactKind::ALL
                .iter()
                .map(|kind| {
                    let (state, err) = module.status(*kind);
                    (
                        kind.as_str(),
                        ArtifactReport {
                            state,
                            error: err.map(ToString::to_string),
                        },
                    )
                })
                .collect(),
            calls: snapshot.module_calls(&module.path),
            callers: snapshot
                .callers_of_module(&module.path)
                .iter()
                .map(|caller| caller.path.clone())
                .collect(),
        })
        .collect()
}

pub fn render_text(reports: &[ModuleReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "{}", report.path.display());
        for (kind, artifact) in &report.artifacts {
            match &artifact.error {
                Some(err) => {
                    let _ = writeln!(out, "  {kind}: {} ({err})", artifact.state);
                }
                None => {
                    let _ = writeln!(out, "  {kind}: {}", artifact.state);
                }
            }
        }
        for call in &report.calls {
            let _ = writeln!(out, "  call {} -> {}", call.local_name, call.path.display());
        }
        for caller in &report.callers {
            let _ = writeln!(out, "  called by {}", caller.display());
        }
    }
    out
}

fn inspect_dir(dir: &Path, json: bool) -> anyhow::Result<String> {
    let resolved = std::fs::canonicalize(dir)
        .with_context(|| format!("failed to resolve {}", dir.display()))?;
    let root = datadir::clean_path(&resolved);
    let settings = Settings::new(&root, &ClientCapabilities::default())?;
    init_logging(&settings.log_filter);

    let store = ModuleStore::new();
    let summary = indexer::index_workspace(&store, &settings, &root)?;
    info!(
        modules = summary.modules.len(),
        manifests = summary.manifests,
        failed = summary.failed_manifests,
        "indexed workspace"
    );

    let reports = inspect(&store.snapshot());
    if json {
        Ok(serde_json::to_string_pretty(&reports)?)
    } else {
        Ok(render_text(&reports))
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Inspect { dir, json } => {
            let out = inspect_dir(&dir, json)?;
            print!("{out}");
            if json {
                println!();
            }
        }
    }
    Ok(())
}
