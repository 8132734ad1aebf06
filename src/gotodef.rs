use std::path::Path;

use tower_lsp::lsp_types::{
    GotoDefinitionResponse, Location, LocationLink, TextDocumentPositionParams, Url,
};
use tracing::debug;

use crate::context::{RequestContext, RequestError};
use crate::decoder::Decoder;
use crate::lang::{ReferenceOrigin, ReferenceTarget};
use crate::service::Service;

/// Resolves the reference under the cursor to its declaration.
///
/// Returns `None` when the cursor is not on a reference or the reference
/// resolves to nothing.
pub fn goto_reference_target(
    service: &Service,
    ctx: &RequestContext,
    params: &TextDocumentPositionParams,
) -> Result<Option<GotoDefinitionResponse>, RequestError> {
    let (doc, path) = service.document_path(ctx, &params.text_document.uri)?;
    doc.check_position(params.position)?;

    let reader = service.path_reader();
    let decoder = Decoder::new(&reader, ctx.decoder_context());

    debug!(
        file = %doc.filename,
        line = params.position.line,
        character = params.position.character,
        "looking for ref origin"
    );
    let Some(origin) = decoder.reference_origin_at_pos(&path, &doc.filename, params.position)?
    else {
        return Ok(None);
    };
    debug!(origin = %origin.addr, "found origin");

    let Some((dir, target)) = decoder.reference_target_for_origin(&doc.dir, &origin)? else {
        return Ok(None);
    };

    Ok(reference_to_location(
        &dir,
        &origin,
        &target,
        service.link_support(ctx),
    ))
}

fn file_url(dir: &Path, filename: &str) -> Option<Url> {
    Url::from_file_path(dir.join(filename)).ok()
}

fn reference_to_location(
    target_dir: &Path,
    origin: &ReferenceOrigin,
    target: &ReferenceTarget,
    link_support: bool,
) -> Option<GotoDefinitionResponse> {
    let nav = target.navigation_range()?;
    let uri = file_url(target_dir, &nav.filename)?;

    if !link_support {
        return Some(GotoDefinitionResponse::Scalar(Location {
            uri,
            range: *nav.range,
        }));
    }

    let whole = target.range.as_ref().unwrap_or(nav);
    Some(GotoDefinitionResponse::Link(vec![LocationLink {
        origin_selection_range: Some(*origin.range.range),
        target_uri: uri,
        target_range: *whole.range,
        target_selection_range: *nav.range,
    }]))
}
