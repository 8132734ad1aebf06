//! modstore: module state and an incremental reference graph for a
//! configuration-language server
//!
//! This crate keeps, per module directory, every artifact background
//! analysis produces (manifest, tool version, parsed files, metadata,
//! reference origins and targets, diagnostics) and answers reference
//! queries across module boundaries from consistent snapshots of that state.
//!
//! # Overview
//!
//! - **Module Store**: transactional, snapshot-isolated storage of module
//!   artifacts with a module-call index
//! - **Schemas**: core schemas by version, provider schemas merged per module
//! - **Reference Graph**: go-to-definition and find-references across modules,
//!   including `module.<name>.<output>` into called modules
//! - **Symbols**: fuzzy workspace symbol search and document outlines
//!
//! # Architecture
//!
//! - [`state`]: the module store and its snapshots
//! - [`schema`]: body schemas and the provider schema store
//! - [`decoder`]: path contexts and reference resolution
//! - [`gotodef`], [`references`], [`symbol`], [`codeactions`]: request handlers
//! - [`config`]: configuration management and settings
//!
//! # Usage
//!
//! ```ignore
//! use modstore::config::Settings;
//! use modstore::indexer::index_workspace;
//! use modstore::state::ModuleStore;
//!
//! let store = ModuleStore::new();
//! index_workspace(&store, &Settings::default(), &root_dir)?;
//! for module in store.list() {
//!     println!("{}", module.path.display());
//! }
//! ```

// State and analysis
pub mod ast;
pub mod datadir;
pub mod decoder;
pub mod lang;
pub mod module_meta;
pub mod schema;
pub mod state;

// LSP feature modules
pub mod codeactions;
pub mod context;
pub mod document;
pub mod gotodef;
pub mod references;
pub mod service;
pub mod symbol;

// Configuration and workspace discovery
pub mod config;
pub mod indexer;

// Utilities
pub mod cli;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
