//! Path contexts: the self-contained, per-directory view handed to queries.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::{DecoderError, ModuleReader};
use crate::ast::ParsedFiles;
use crate::context::LanguageId;
use crate::lang::{ReferenceOrigins, ReferenceTargets};
use crate::module_meta::{ModuleCall, ProviderAddr};
use crate::schema::{
    core_module_schema, merge_provider_schema, schema_for_variables, BodySchema, SchemaError,
    SchemaReader,
};
use crate::state::Module;

/// Everything needed to answer queries about one directory in one language.
#[derive(Debug, Clone)]
pub struct PathContext {
    pub dir_path: PathBuf,
    pub language: LanguageId,
    pub schema: Arc<BodySchema>,
    pub reference_origins: ReferenceOrigins,
    pub reference_targets: ReferenceTargets,
    /// Parsed files of the context's language, keyed by filename.
    pub files: ParsedFiles,
    /// Calls made by the module. Empty for variable files.
    pub module_calls: Vec<ModuleCall>,
}

/// Context for the module's definition files.
pub fn module_path_context(
    module: &Module,
    schemas: &dyn SchemaReader,
    modules: &dyn ModuleReader,
) -> Result<PathContext, DecoderError> {
    let schema = schema_for_module(module, schemas, modules)?;

    Ok(PathContext {
        dir_path: module.path.clone(),
        language: LanguageId::Module,
        schema: Arc::new(schema),
        reference_origins: module.ref_origins.payload.clone(),
        reference_targets: module.ref_targets.payload.clone(),
        files: module.module_files.payload.clone(),
        module_calls: modules.module_calls(&module.path),
    })
}

/// Context for the module's variable-value files.
pub fn vars_path_context(module: &Module) -> Result<PathContext, DecoderError> {
    let schema = schema_for_variables(&module.meta.payload.variables)?;

    Ok(PathContext {
        dir_path: module.path.clone(),
        language: LanguageId::Vars,
        schema: Arc::new(schema),
        reference_origins: module.ref_origins.payload.clone(),
        reference_targets: module.ref_targets.payload.clone(),
        files: module.vars_files.payload.clone(),
        module_calls: vec![],
    })
}

/// Core schema for the module's core version, with provider schemas and the
/// inputs of called modules merged in.
pub fn schema_for_module(
    module: &Module,
    schemas: &dyn SchemaReader,
    modules: &dyn ModuleReader,
) -> Result<BodySchema, SchemaError> {
    let meta = &module.meta.payload;
    let mut schema = core_module_schema(
        &meta.core_requirements,
        module.tool_version.payload.core.as_ref(),
    )?;

    // Explicit references name providers first; requirements fall back to the type name
    let mut local_names: BTreeMap<String, &ProviderAddr> = BTreeMap::new();
    for (reference, addr) in &meta.provider_references {
        local_names
            .entry(reference.local_name.clone())
            .or_insert(addr);
    }
    for addr in meta.provider_requirements.keys() {
        local_names.entry(addr.type_name.clone()).or_insert(addr);
    }

    let provider_schemas = schemas.provider_schemas();
    for (local_name, addr) in local_names {
        match provider_schemas.provider(addr) {
            Some(provider) => merge_provider_schema(&mut schema, &local_name, provider),
            None => debug!(provider = %addr, "no schema for provider"),
        }
    }

    for call in modules.module_calls(&module.path) {
        match modules.module_meta(&call.path) {
            Ok(callee) => {
                let inputs = schema_for_variables(&callee.variables)?;
                schema.add_dependent("module", &call.local_name, inputs);
            }
            Err(err) => {
                debug!(call = %call.local_name, error = %err, "called module not available")
            }
        }
    }

    Ok(schema)
}
