//! The state shared by request handlers.

use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use crate::config::Settings;
use crate::context::{RequestContext, RequestError};
use crate::decoder::{LangPath, StorePathReader};
use crate::document::{Document, DocumentStore};
use crate::schema::SchemaStore;
use crate::state::ModuleStore;

pub struct Service {
    pub modules: Arc<ModuleStore>,
    pub schemas: Arc<SchemaStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub settings: Settings,
}

impl Service {
    /// A path reader pinned to the current store snapshot.
    pub fn path_reader(&self) -> StorePathReader {
        StorePathReader::new(&self.modules, self.schemas.clone())
    }

    /// The document a request is about and the path it is served under.
    pub fn document_path(
        &self,
        ctx: &RequestContext,
        uri: &Url,
    ) -> Result<(Arc<Document>, LangPath), RequestError> {
        let doc = self.documents.get(uri)?;
        let language = ctx.require_language_id()?;
        let path = LangPath::new(doc.dir.clone(), language);
        Ok((doc, path))
    }

    /// Whether definition results may be `LocationLink`s. The request's own
    /// capabilities win over the configured default.
    pub fn link_support(&self, ctx: &RequestContext) -> bool {
        match ctx.capabilities {
            Some(_) => ctx.definition_link_support(),
            None => self.settings.link_support,
        }
    }
}
