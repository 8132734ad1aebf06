//! Reference resolution over the whole workspace.
//!
//! A [`Decoder`] answers navigation queries against the [`PathContext`]s of a
//! [`PathReader`]. It never touches the store directly: a
//! [`StorePathReader`] pins one snapshot and builds contexts from it.
//!
//! # Resolution
//!
//! - **Origin to target**: an origin `module.<name>.<attr>` whose module calls
//!   `<name>` resolves to `output.<attr>` in the called module when that
//!   module declares it. Any other origin resolves in its own module to the
//!   target with the longest address prefixing the origin's address.
//! - **Target to origins**: every origin in the workspace whose forward
//!   resolution lands on one of the given targets. Modules are visited in
//!   path order, origins in recorded order.
//!
//! A position covered by no target is *not addressable*: queries return
//! `None` there, as opposed to an empty list for an addressable position
//! nobody references.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tower_lsp::lsp_types::Position;
use tracing::debug;

mod path_context;
mod reader;
mod symbols;

pub use path_context::{module_path_context, schema_for_module, vars_path_context, PathContext};
pub use reader::{LangPath, ModuleReader, PathReader, StorePathReader};
pub use symbols::Symbol;

use crate::context::{DecoderContext, LanguageId};
use crate::lang::{self, AddressStep, ReferenceOrigin, ReferenceTarget};
use crate::schema::SchemaError;
use crate::state::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("no path context for {path}")]
    NoPathContext { path: PathBuf },
}

type Contexts = BTreeMap<PathBuf, PathContext>;

pub struct Decoder<'a> {
    reader: &'a dyn PathReader,
    ctx: DecoderContext,
}

impl<'a> Decoder<'a> {
    pub fn new(reader: &'a dyn PathReader, ctx: DecoderContext) -> Decoder<'a> {
        Decoder { reader, ctx }
    }

    pub fn context(&self) -> &DecoderContext {
        &self.ctx
    }

    pub fn path_context(&self, path: &LangPath) -> Result<PathContext, DecoderError> {
        self.reader.path_context(path)
    }

    /// Module contexts for `paths`. Paths without a context are skipped.
    fn module_contexts(&self, paths: Vec<PathBuf>) -> Contexts {
        paths
            .into_par_iter()
            .filter_map(|path| match self.reader.path_context(&LangPath::module(path.clone())) {
                Ok(ctx) => Some((path, ctx)),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping path without context");
                    None
                }
            })
            .collect()
    }

    fn all_module_contexts(&self) -> Contexts {
        let paths = self
            .reader
            .paths()
            .into_iter()
            .filter(|p| p.language == LanguageId::Module)
            .map(|p| p.path)
            .collect();
        self.module_contexts(paths)
    }

    pub fn reference_origin_at_pos(
        &self,
        path: &LangPath,
        filename: &str,
        position: Position,
    ) -> Result<Option<ReferenceOrigin>, DecoderError> {
        let ctx = self.reader.path_context(path)?;
        Ok(lang::origin_at_pos(&ctx.reference_origins, filename, position).cloned())
    }

    /// The target `origin`, recorded in module `path`, refers to, together
    /// with the directory declaring it.
    pub fn reference_target_for_origin(
        &self,
        path: &Path,
        origin: &ReferenceOrigin,
    ) -> Result<Option<(PathBuf, ReferenceTarget)>, DecoderError> {
        let own = self.reader.path_context(&LangPath::module(path))?;
        let callees = own.module_calls.iter().map(|c| c.path.clone()).collect();
        let mut contexts = self.module_contexts(callees);
        contexts.insert(own.dir_path.clone(), own);

        Ok(resolve(&contexts, path, origin)
            .map(|(dir, target)| (dir.to_path_buf(), target.clone())))
    }

    /// Innermost targets covering the position, or `None` when the position
    /// is not addressable.
    pub fn innermost_reference_targets_at_pos(
        &self,
        path: &LangPath,
        filename: &str,
        position: Position,
    ) -> Result<Option<Vec<ReferenceTarget>>, DecoderError> {
        let ctx = self.reader.path_context(path)?;
        Ok(
            lang::innermost_targets_at(&ctx.reference_targets, filename, position)
                .map(|targets| targets.into_iter().cloned().collect()),
        )
    }

    /// Every origin in the workspace resolving to one of `targets`, all of
    /// which are declared in module `owner`.
    pub fn reference_origins_targeting(
        &self,
        owner: &Path,
        targets: &[ReferenceTarget],
    ) -> Vec<(PathBuf, ReferenceOrigin)> {
        let contexts = self.all_module_contexts();
        let contexts = &contexts;

        contexts
            .par_iter()
            .flat_map_iter(|(path, ctx)| {
                ctx.reference_origins
                    .iter()
                    .filter(|origin| {
                        resolve(contexts, path, origin).is_some_and(|(dir, found)| {
                            dir == owner && targets.iter().any(|t| t.addr == found.addr)
                        })
                    })
                    .map(|origin| (path.clone(), origin.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Resolves an origin recorded in module `path` against loaded contexts.
fn resolve<'c>(
    contexts: &'c Contexts,
    path: &Path,
    origin: &ReferenceOrigin,
) -> Option<(&'c Path, &'c ReferenceTarget)> {
    let ctx = contexts.get(path)?;
    if let Some(found) = resolve_in_callee(contexts, ctx, origin) {
        return Some(found);
    }
    lang::best_match(&ctx.reference_targets, &origin.addr).map(|t| (ctx.dir_path.as_path(), t))
}

fn resolve_in_callee<'c>(
    contexts: &'c Contexts,
    ctx: &PathContext,
    origin: &ReferenceOrigin,
) -> Option<(&'c Path, &'c ReferenceTarget)> {
    let name = match origin.addr.steps() {
        [AddressStep::Root(root), AddressStep::Attr(name), ..] if root == "module" => name,
        _ => return None,
    };
    let call = ctx.module_calls.iter().find(|c| &c.local_name == name)?;
    let callee = contexts.get(&call.path)?;
    let output = origin.addr.rebase(2, "output")?;

    lang::best_match(&callee.reference_targets, &output).map(|t| (callee.dir_path.as_path(), t))
}
