use std::path::Path;

use itertools::Itertools;
use tower_lsp::lsp_types::{Location, ReferenceParams, Url};
use tracing::debug;

use crate::context::{RequestContext, RequestError};
use crate::decoder::Decoder;
use crate::lang::FileRange;
use crate::service::Service;

fn to_location(dir: &Path, range: &FileRange) -> Option<Location> {
    Url::from_file_path(dir.join(&range.filename))
        .map(|uri| Location {
            uri,
            range: *range.range,
        })
        .ok()
}

/// Every reference to the innermost targets under the cursor.
///
/// Returns `None` when the position is not addressable, and an empty list
/// when it is but nothing refers to it.
pub fn references(
    service: &Service,
    ctx: &RequestContext,
    params: &ReferenceParams,
) -> Result<Option<Vec<Location>>, RequestError> {
    let position = params.text_document_position.position;
    let (doc, path) = service.document_path(ctx, &params.text_document_position.text_document.uri)?;
    doc.check_position(position)?;

    let reader = service.path_reader();
    let decoder = Decoder::new(&reader, ctx.decoder_context());

    let Some(targets) =
        decoder.innermost_reference_targets_at_pos(&path, &doc.filename, position)?
    else {
        debug!(
            file = %doc.filename,
            line = position.line,
            character = position.character,
            "position is not addressable"
        );
        return Ok(None);
    };

    debug!(
        targets = %targets.iter().map(|t| t.addr.to_string()).join(", "),
        "finding origins for inner-most targets"
    );

    let declarations = params
        .context
        .include_declaration
        .then(|| {
            targets
                .iter()
                .filter_map(|t| t.navigation_range())
                .filter_map(|range| to_location(&doc.dir, range))
                .collect_vec()
        })
        .unwrap_or_default();

    let origins = decoder
        .reference_origins_targeting(&doc.dir, &targets)
        .into_iter()
        .filter_map(|(dir, origin)| to_location(&dir, &origin.range));

    Ok(Some(declarations.into_iter().chain(origins).collect()))
}
