use std::path::{Path, PathBuf};

use itertools::Itertools;
use nucleo_matcher::{
    pattern::{CaseMatching, Normalization, Pattern},
    Matcher, Utf32Str,
};

use super::{Decoder, DecoderError, LangPath};
use crate::lang::{self, Address, FileRange, ReferenceTarget, TargetKind};

/// A declared symbol located in one file of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub path: PathBuf,
    pub address: Address,
    pub kind: TargetKind,
    /// The whole declaration.
    pub range: FileRange,
    /// The declaration header.
    pub selection: FileRange,
    pub children: Vec<Symbol>,
}

impl Symbol {
    fn from_target(path: &Path, target: &ReferenceTarget) -> Option<Symbol> {
        let selection = target.navigation_range()?.clone();
        let range = target.range.clone().unwrap_or_else(|| selection.clone());
        Some(Symbol {
            path: path.to_path_buf(),
            address: target.addr.clone(),
            kind: target.kind,
            range,
            selection,
            children: vec![],
        })
    }

    pub fn name(&self) -> String {
        self.address.to_string()
    }
}

impl Decoder<'_> {
    /// Every declared symbol in the workspace matching `query`, best match
    /// first. An empty query matches everything, in path order.
    pub fn symbols(&self, query: &str, case: CaseMatching) -> Vec<Symbol> {
        let all = self
            .all_module_contexts()
            .iter()
            .flat_map(|(path, ctx)| {
                lang::walk_targets(&ctx.reference_targets)
                    .into_iter()
                    .filter_map(|target| Symbol::from_target(path, target))
                    .collect_vec()
            })
            .collect_vec();

        if query.trim().is_empty() {
            return all;
        }

        let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
        let pattern = Pattern::parse(query, case, Normalization::Smart);
        let mut buf = Vec::new();

        all.into_iter()
            .filter_map(|symbol| {
                let name = symbol.name();
                pattern
                    .score(Utf32Str::new(&name, &mut buf), &mut matcher)
                    .map(|score| (score, symbol))
            })
            .sorted_by(|(a, _), (b, _)| Ord::cmp(b, a))
            .map(|(_, symbol)| symbol)
            .collect()
    }

    /// Outline of one file: top-level targets declared in it, with nested
    /// targets as children, in document order.
    pub fn document_symbols(
        &self,
        path: &LangPath,
        filename: &str,
    ) -> Result<Vec<Symbol>, DecoderError> {
        fn outline(dir: &Path, targets: &[ReferenceTarget], filename: &str) -> Vec<Symbol> {
            targets
                .iter()
                .filter_map(|target| {
                    let mut symbol = Symbol::from_target(dir, target)?;
                    if symbol.selection.filename != filename {
                        return None;
                    }
                    symbol.children = outline(dir, &target.nested, filename);
                    Some(symbol)
                })
                .sorted_by_key(|symbol| {
                    let start = symbol.range.range.start;
                    (start.line, start.character)
                })
                .collect()
        }

        let ctx = self.path_context(path)?;
        Ok(outline(&ctx.dir_path, &ctx.reference_targets, filename))
    }
}
