//! Module state: the per-directory record of analysis artifacts and the store
//! that holds them.
//!
//! Background workers produce artifacts (parsed files, versions, metadata,
//! reference origins and targets, diagnostics) and report them through the
//! typed `update_*` operations of [`ModuleStore`]. Each update commits a new
//! immutable snapshot; readers take a [`StoreSnapshot`] and see a consistent
//! view regardless of concurrent writers.
//!
//! ```ignore
//! let store = ModuleStore::new();
//! store.add(Path::new("/ws/app"))?;
//! store.set_meta_state(Path::new("/ws/app"), OpState::Loading)?;
//! store.update_metadata(Path::new("/ws/app"), meta, None)?;
//! assert!(store.module_by_path(Path::new("/ws/app"))?.meta.is_loaded());
//! ```

mod errors;
mod index;
mod module;
pub mod operation;
mod store;


pub use errors::StoreError;
pub use module::{Module, ModuleMetadata, ToolVersion};
pub use operation::{Artifact, ArtifactKind, OpError, OpState};
pub use store::{ModuleStore, StoreSnapshot};
