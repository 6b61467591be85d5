//! docfold - fold a project's documentation into one versioned PDF
//!
//! Resolves the latest release of a documentation source through a
//! freshness-aware metadata cache, fetches its markdown tree, merges it and
//! renders it. Every artifact is named after the resolved version.

pub mod artifact;
pub mod atomic;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod ui;
pub mod version;

pub use error::{DocfoldError, DocfoldResult};
