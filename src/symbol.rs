//! Symbol providers.
//!
//! - `workspace/symbol`: fuzzy search over every declared target in the
//!   workspace using [`nucleo_matcher`], best match first, capped by
//!   `Settings::workspace_symbol_limit`
//! - `textDocument/documentSymbol`: outline of one file, nested targets
//!   (resource attributes, module outputs) as children
//!
//! | Target kind | LSP kind |
//! |-------------|----------|
//! | variable | `Variable` |
//! | local | `Constant` |
//! | output | `Property` |
//! | resource, data source | `Class` |
//! | module call | `Module` |
//! | provider | `Namespace` |
//! | attribute | `Field` |

use tower_lsp::lsp_types::{
    DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse, Location, SymbolInformation,
    SymbolKind, Url, WorkspaceSymbolParams,
};

use crate::context::{RequestContext, RequestError};
use crate::decoder::{Decoder, Symbol};
use crate::lang::TargetKind;
use crate::service::Service;

fn symbol_kind(kind: TargetKind) -> SymbolKind {
    match kind {
        TargetKind::Variable => SymbolKind::VARIABLE,
        TargetKind::Local => SymbolKind::CONSTANT,
        TargetKind::Output => SymbolKind::PROPERTY,
        TargetKind::Resource | TargetKind::DataSource => SymbolKind::CLASS,
        TargetKind::ModuleCall => SymbolKind::MODULE,
        TargetKind::Provider => SymbolKind::NAMESPACE,
        TargetKind::Attribute => SymbolKind::FIELD,
    }
}

#[allow(deprecated)] // field deprecated has been deprecated in favor of using tags
fn to_symbol_information(symbol: Symbol) -> Option<SymbolInformation> {
    let uri = Url::from_file_path(symbol.path.join(&symbol.selection.filename)).ok()?;
    Some(SymbolInformation {
        name: symbol.name(),
        kind: symbol_kind(symbol.kind),
        tags: None,
        deprecated: None,
        location: Location {
            uri,
            range: *symbol.selection.range,
        },
        container_name: Some(symbol.path.to_string_lossy().into_owned()),
    })
}

/// Search for symbols across every module in the workspace.
pub fn workspace_symbol(
    service: &Service,
    ctx: &RequestContext,
    params: &WorkspaceSymbolParams,
) -> Vec<SymbolInformation> {
    let reader = service.path_reader();
    let decoder = Decoder::new(&reader, ctx.decoder_context());

    decoder
        .symbols(&params.query, service.settings.case_matching.into())
        .into_iter()
        .filter_map(to_symbol_information)
        .take(service.settings.workspace_symbol_limit)
        .collect()
}

#[allow(deprecated)] // field deprecated has been deprecated in favor of using tags
fn to_document_symbols(symbols: Vec<Symbol>) -> Vec<DocumentSymbol> {
    symbols
        .into_iter()
        .map(|symbol| DocumentSymbol {
            name: symbol.name(),
            detail: None,
            kind: symbol_kind(symbol.kind),
            tags: None,
            deprecated: None,
            range: *symbol.range.range,
            selection_range: *symbol.selection.range,
            children: (!symbol.children.is_empty()).then(|| to_document_symbols(symbol.children)),
        })
        .collect()
}

/// Outline of the requested document.
///
/// Returns `None` when the document declares nothing.
pub fn document_symbol(
    service: &Service,
    ctx: &RequestContext,
    params: &DocumentSymbolParams,
) -> Result<Option<DocumentSymbolResponse>, RequestError> {
    let (doc, path) = service.document_path(ctx, &params.text_document.uri)?;

    let reader = service.path_reader();
    let decoder = Decoder::new(&reader, ctx.decoder_context());
    let symbols = decoder.document_symbols(&path, &doc.filename)?;

    if symbols.is_empty() {
        return Ok(None);
    }
    Ok(Some(DocumentSymbolResponse::Nested(to_document_symbols(symbols))))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tower_lsp::lsp_types::{Position, TextDocumentIdentifier};

    use super::*;
    use crate::context::LanguageId;
    use crate::lang::TargetKind;
    use crate::test_utils::{scenario_service, target, CHILD, ROOT};

    fn query(q: &str) -> WorkspaceSymbolParams {
        WorkspaceSymbolParams {
            query: q.to_string(),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        }
    }

    fn doc_params(file: &str) -> DocumentSymbolParams {
        DocumentSymbolParams {
            text_document: TextDocumentIdentifier {
                uri: Url::from_file_path(file).unwrap(),
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        }
    }

    #[test]
    fn test_workspace_symbol_fuzzy() {
        let service = scenario_service();

        let symbols = workspace_symbol(&service, &RequestContext::new(), &query("outid"));

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "output.id");
        assert_eq!(symbols[0].kind, SymbolKind::PROPERTY);
        assert_eq!(
            symbols[0].location.uri,
            Url::from_file_path(format!("{CHILD}/outputs.tf")).unwrap()
        );
    }

    #[test]
    fn test_workspace_symbol_limit() {
        let mut service = scenario_service();
        service.settings.workspace_symbol_limit = 2;

        let symbols = workspace_symbol(&service, &RequestContext::new(), &query(""));
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "module.child");
    }

    #[test]
    fn test_document_symbol_nests_children() {
        let service = scenario_service();
        let path = Path::new(ROOT);
        service
            .modules
            .update_reference_targets(
                path,
                vec![
                    target("var.region", TargetKind::Variable, "variables.tf", (0, 0), (2, 1)),
                    target("aws_instance.web", TargetKind::Resource, "main.tf", (8, 0), (12, 1))
                        .with_nested(vec![target(
                            "aws_instance.web.ami",
                            TargetKind::Attribute,
                            "main.tf",
                            (9, 2),
                            (9, 20),
                        )]),
                    target("module.child", TargetKind::ModuleCall, "main.tf", (0, 0), (3, 1)),
                ],
                None,
            )
            .unwrap();
        let ctx = RequestContext::new().with_language_id(LanguageId::Module);

        let Some(DocumentSymbolResponse::Nested(symbols)) =
            document_symbol(&service, &ctx, &doc_params(&format!("{ROOT}/main.tf"))).unwrap()
        else {
            panic!("expected nested symbols");
        };

        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["module.child", "aws_instance.web"]);
        let children = symbols[1].children.as_ref().unwrap();
        assert_eq!(children[0].name, "aws_instance.web.ami");
        assert_eq!(children[0].kind, SymbolKind::FIELD);
        assert_eq!(symbols[1].range.start, Position::new(8, 0));
        assert!(symbols[0].children.is_none());
    }

    #[test]
    fn test_document_without_declarations() {
        let service = scenario_service();
        let ctx = RequestContext::new().with_language_id(LanguageId::Vars);

        let file = format!("{ROOT}/terraform.tfvars");
        let result = document_symbol(&service, &ctx, &doc_params(&file)).unwrap();
        assert!(result.is_none());
    }
}
