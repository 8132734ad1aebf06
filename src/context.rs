//! Request-scoped context.
//!
//! Everything a request handler needs to know about the client and the
//! document being served is carried in an explicit [`RequestContext`] value.
//! Missing values are errors at the point of use, never silent defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{ClientCapabilities, Position, Url};

use crate::decoder::DecoderError;

pub const UTM_SOURCE: &str = "modstore";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("missing context: {0}")]
    MissingContext(&'static str),
    #[error("document not found: {0}")]
    UnknownDocument(Url),
    #[error("position {line}:{character} is outside of {uri}")]
    InvalidPosition {
        uri: Url,
        line: u32,
        character: u32,
    },
    #[error(transparent)]
    Decoder(#[from] DecoderError),
}

impl RequestError {
    pub fn invalid_position(uri: &Url, position: Position) -> RequestError {
        RequestError::InvalidPosition {
            uri: uri.clone(),
            line: position.line,
            character: position.character,
        }
    }
}

/// The language a document is served as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanguageId {
    #[serde(rename = "terraform")]
    Module,
    #[serde(rename = "terraform-vars")]
    Vars,
}

impl LanguageId {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageId::Module => "terraform",
            LanguageId::Vars => "terraform-vars",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unsupported language id {0:?}")]
pub struct UnknownLanguageId(pub String);

impl FromStr for LanguageId {
    type Err = UnknownLanguageId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terraform" => Ok(LanguageId::Module),
            "terraform-vars" => Ok(LanguageId::Vars),
            other => Err(UnknownLanguageId(other.to_string())),
        }
    }
}

/// Settings the decoder uses to build documentation links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderContext {
    pub utm_source: String,
    pub utm_medium: Option<String>,
    pub use_utm_content: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client_name: Option<String>,
    pub language_id: Option<LanguageId>,
    pub capabilities: Option<ClientCapabilities>,
}

impl RequestContext {
    pub fn new() -> RequestContext {
        RequestContext::default()
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn with_language_id(mut self, language_id: LanguageId) -> Self {
        self.language_id = Some(language_id);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn require_language_id(&self) -> Result<LanguageId, RequestError> {
        self.language_id
            .ok_or(RequestError::MissingContext("language id"))
    }

    pub fn require_capabilities(&self) -> Result<&ClientCapabilities, RequestError> {
        self.capabilities
            .as_ref()
            .ok_or(RequestError::MissingContext("client capabilities"))
    }

    /// Whether the client accepts `LocationLink` results for definitions.
    pub fn definition_link_support(&self) -> bool {
        self.capabilities
            .as_ref()
            .and_then(|c| c.text_document.as_ref())
            .and_then(|t| t.definition.as_ref())
            .and_then(|d| d.link_support)
            .unwrap_or(false)
    }

    pub fn decoder_context(&self) -> DecoderContext {
        DecoderContext {
            utm_source: UTM_SOURCE.to_string(),
            utm_medium: self.client_name.clone(),
            use_utm_content: true,
        }
    }
}
