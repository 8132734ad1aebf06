//! Shared test fixtures.
//!
//! Only compiled for tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use crate::ast::{ParsedFile, ParsedFiles};
use crate::config::Settings;
use crate::context::LanguageId;
use crate::datadir::{ModuleManifest, ModuleRecord};
use crate::document::{Document, InMemoryDocuments};
use crate::lang::{Address, FileRange, ReferenceOrigin, ReferenceTarget, SourceRange, TargetKind};
use crate::module_meta::{Output, Variable};
use crate::schema::SchemaStore;
use crate::service::Service;
use crate::state::{ModuleMetadata, ModuleStore};

pub fn addr(s: &str) -> Address {
    Address::parse(s).expect("valid address")
}

pub fn file_range(filename: &str, start: (u32, u32), end: (u32, u32)) -> FileRange {
    FileRange::new(filename, SourceRange::new(start, end))
}

pub fn origin(
    address: &str,
    filename: &str,
    start: (u32, u32),
    end: (u32, u32),
) -> ReferenceOrigin {
    ReferenceOrigin {
        addr: addr(address),
        range: file_range(filename, start, end),
    }
}

pub fn target(
    address: &str,
    kind: TargetKind,
    filename: &str,
    start: (u32, u32),
    end: (u32, u32),
) -> ReferenceTarget {
    ReferenceTarget::new(addr(address), kind)
        .with_range(file_range(filename, start, end))
        .with_def_range(file_range(filename, start, (start.0, start.1 + 1)))
}

/// A manifest rooted at `root` recording the root module plus `calls`
/// given as `(key, source, dir)`.
pub fn manifest(root: &str, calls: &[(&str, &str, &str)]) -> ModuleManifest {
    let mut records = vec![ModuleRecord {
        key: String::new(),
        source_addr: String::new(),
        version: None,
        dir: PathBuf::from("."),
    }];
    records.extend(calls.iter().map(|(key, source, dir)| ModuleRecord {
        key: key.to_string(),
        source_addr: source.to_string(),
        version: None,
        dir: PathBuf::from(dir),
    }));
    ModuleManifest::new(root, records)
}

pub fn parsed_files(names: &[&str]) -> ParsedFiles {
    names
        .iter()
        .map(|name| (name.to_string(), Arc::new(ParsedFile::new(*name, ""))))
        .collect()
}

pub const ROOT: &str = "/root";
pub const CHILD: &str = "/root/child";

/// Two modules: `/root` calls the local module `/root/child`, which declares
/// output `id`; `/root/main.tf` references `module.child.id` on line 5.
pub fn scenario_store() -> ModuleStore {
    let store = ModuleStore::new();
    let root = Path::new(ROOT);
    let child = Path::new(CHILD);

    store.add(root).unwrap();
    store.add(child).unwrap();

    store
        .update_manifest(root, Some(manifest(ROOT, &[("child", "./child", "child")])), None)
        .unwrap();

    store
        .update_parsed_module_files(root, parsed_files(&["main.tf", "variables.tf"]), None)
        .unwrap();
    store
        .update_parsed_vars_files(root, parsed_files(&["terraform.tfvars"]), None)
        .unwrap();
    store
        .update_parsed_module_files(child, parsed_files(&["main.tf", "outputs.tf"]), None)
        .unwrap();

    let mut root_meta = ModuleMetadata::default();
    root_meta.variables.insert(
        "region".into(),
        Variable {
            default: Some(serde_json::json!("eu-west-1")),
            ..Default::default()
        },
    );
    store.update_metadata(root, root_meta, None).unwrap();

    let mut child_meta = ModuleMetadata::default();
    child_meta.variables.insert("name".into(), Variable::default());
    child_meta.outputs.insert("id".into(), Output::default());
    store.update_metadata(child, child_meta, None).unwrap();

    store
        .update_reference_targets(
            root,
            vec![
                target("module.child", TargetKind::ModuleCall, "main.tf", (0, 0), (3, 1)),
                target("var.region", TargetKind::Variable, "variables.tf", (0, 0), (2, 1)),
            ],
            None,
        )
        .unwrap();
    store
        .update_reference_origins(
            root,
            vec![
                origin("var.region", "main.tf", (1, 12), (1, 22)),
                origin("module.child.id", "main.tf", (5, 10), (5, 25)),
                origin("module.child", "main.tf", (6, 10), (6, 22)),
            ],
            None,
        )
        .unwrap();

    store
        .update_reference_targets(
            child,
            vec![
                target("var.name", TargetKind::Variable, "main.tf", (0, 0), (2, 1)),
                target("output.id", TargetKind::Output, "outputs.tf", (0, 0), (2, 1)),
            ],
            None,
        )
        .unwrap();
    store
        .update_reference_origins(
            child,
            vec![origin("var.name", "outputs.tf", (1, 10), (1, 18))],
            None,
        )
        .unwrap();

    store
}

const ROOT_MAIN: &str = r#"module "child" {
  region  = var.region
  source = "./child"
}

output "child_id" {
  value = module.child.id
  extra = module.child
}
"#;

/// [`scenario_store`] behind a service, with every scenario file open.
pub fn scenario_service() -> Service {
    let documents = Arc::new(InMemoryDocuments::new());
    let files = [
        (format!("{ROOT}/main.tf"), LanguageId::Module, ROOT_MAIN),
        (
            format!("{ROOT}/variables.tf"),
            LanguageId::Module,
            "variable \"region\" {\n  default = \"eu-west-1\"\n}\n",
        ),
        (
            format!("{ROOT}/terraform.tfvars"),
            LanguageId::Vars,
            "region = \"eu-west-1\"\n",
        ),
        (
            format!("{CHILD}/main.tf"),
            LanguageId::Module,
            "variable \"name\" {\n  type = string\n}\n",
        ),
        (
            format!("{CHILD}/outputs.tf"),
            LanguageId::Module,
            "output \"id\" {\n  value = var.name\n}\n",
        ),
    ];
    for (file, language, text) in files {
        let uri = Url::from_file_path(&file).expect("absolute path");
        documents.open(Document::new(uri, language, text, 1).expect("valid document"));
    }

    Service {
        modules: Arc::new(scenario_store()),
        schemas: SchemaStore::with_schemas(Default::default()),
        documents,
        settings: Settings::default(),
    }
}
