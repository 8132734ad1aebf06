use std::path::PathBuf;

/// Structural store failures. Artifact computation errors are never reported
/// through this type; they are stored on the module instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("module not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("module already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}
