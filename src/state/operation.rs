//! Lifecycle tracking for asynchronously produced module artifacts.
//!
//! Every artifact attached to a [`Module`](super::Module) is wrapped in an
//! [`Artifact`], which pairs the payload with the error captured by the last
//! computation attempt and an [`OpState`].
//!
//! `Loaded` says nothing about the payload being present: `Loaded` together
//! with an error means the attempt finished but failed, and the payload may be
//! stale or empty.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Lifecycle of one artifact computation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OpState {
    #[default]
    Unknown,
    Loading,
    Loaded,
}

impl OpState {
    pub fn is_loaded(self) -> bool {
        self == OpState::Loaded
    }
}

impl fmt::Display for OpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpState::Unknown => "unknown",
            OpState::Loading => "loading",
            OpState::Loaded => "loaded",
        };
        f.write_str(s)
    }
}

/// A captured artifact computation error.
///
/// Cheap to clone so that copying a module never has to re-create errors.
#[derive(Clone)]
pub struct OpError(Arc<anyhow::Error>);

impl OpError {
    pub fn new(err: anyhow::Error) -> Self {
        OpError(Arc::new(err))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for OpError {
    fn from(err: anyhow::Error) -> Self {
        OpError::new(err)
    }
}

impl fmt::Debug for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpError({:#})", self.0)
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

/// Errors compare by identity: two modules carry "the same" error only when
/// one was copied from the other.
impl PartialEq for OpError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One independently lifecycled piece of derived data on a module.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Artifact<T> {
    pub payload: T,
    pub err: Option<OpError>,
    pub state: OpState,
}

impl<T> Artifact<T> {
    /// Replaces payload and error and marks the artifact loaded.
    pub(crate) fn finish(&mut self, payload: T, err: Option<anyhow::Error>) {
        self.payload = payload;
        self.err = err.map(OpError::new);
        self.state = OpState::Loaded;
    }

    /// Transitions the state only. The captured error is left in place.
    pub(crate) fn set_state(&mut self, state: OpState) {
        self.state = state;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    pub fn has_error(&self) -> bool {
        self.err.is_some()
    }
}

/// Names of the artifact kinds, used for logging and state lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ArtifactKind {
    Manifest,
    ToolVersion,
    ProviderSchema,
    ModuleParsing,
    VarsParsing,
    Meta,
    ReferenceTargets,
    ReferenceOrigins,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::Manifest,
        ArtifactKind::ToolVersion,
        ArtifactKind::ProviderSchema,
        ArtifactKind::ModuleParsing,
        ArtifactKind::VarsParsing,
        ArtifactKind::Meta,
        ArtifactKind::ReferenceTargets,
        ArtifactKind::ReferenceOrigins,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Manifest => "manifest",
            ArtifactKind::ToolVersion => "tool_version",
            ArtifactKind::ProviderSchema => "provider_schema",
            ArtifactKind::ModuleParsing => "module_parsing",
            ArtifactKind::VarsParsing => "vars_parsing",
            ArtifactKind::Meta => "meta",
            ArtifactKind::ReferenceTargets => "reference_targets",
            ArtifactKind::ReferenceOrigins => "reference_origins",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_artifact_is_unknown() {
        let artifact: Artifact<Vec<u8>> = Artifact::default();
        assert_eq!(artifact.state, OpState::Unknown);
        assert!(artifact.err.is_none());
        assert!(artifact.payload.is_empty());
    }

    #[test]
    fn test_finish_marks_loaded_with_payload() {
        let mut artifact: Artifact<Vec<u8>> = Artifact::default();
        artifact.set_state(OpState::Loading);
        artifact.finish(vec![1, 2], None);

        assert_eq!(artifact.state, OpState::Loaded);
        assert_eq!(artifact.payload, vec![1, 2]);
        assert!(!artifact.has_error());
    }

    #[test]
    fn test_loaded_with_error_is_valid() {
        let mut artifact: Artifact<Option<String>> = Artifact::default();
        artifact.finish(None, Some(anyhow::anyhow!("parse failed")));

        assert!(artifact.is_loaded());
        assert!(artifact.payload.is_none());
        assert_eq!(artifact.err.unwrap().to_string(), "parse failed");
    }

    #[test]
    fn test_set_state_keeps_error() {
        let mut artifact: Artifact<()> = Artifact::default();
        artifact.finish((), Some(anyhow::anyhow!("boom")));
        artifact.set_state(OpState::Loading);
        artifact.set_state(OpState::Loaded);

        assert!(artifact.has_error(), "state transitions must not drop the error");
    }

    #[test]
    fn test_op_error_identity() {
        let err = OpError::new(anyhow::anyhow!("x"));
        let copy = err.clone();
        let other = OpError::new(anyhow::anyhow!("x"));

        assert_eq!(err, copy);
        assert_ne!(err, other);
    }
}
