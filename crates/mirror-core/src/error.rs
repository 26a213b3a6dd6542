//! Error type shared across the collaborator boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote source error: {0}")]
    Source(String),

    #[error("mirror service error: {0}")]
    Mirror(String),

    #[error("snapshot store error: {0}")]
    Store(String),

    /// Scope setup failed (container resolution, list lookup). Aborts only
    /// the scope it occurred in; other scopes still run.
    #[error("scope setup failed: {0}")]
    Scope(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
