// ABOUTME: Public library API for the Yuque exporter
// ABOUTME: Re-exports core modules for external use

pub mod api;
pub mod assets;
pub mod auth;
pub mod cli;
pub mod error;
pub mod export;
pub mod filter;
pub mod git;
pub mod logging;
pub mod model;
pub mod storage;
pub mod util;
pub mod watermark;

pub use error::{Error, Result};
pub use model::{
    Credential, DocumentContent, DocumentSummary, Envelope, Frontmatter, ImageReference,
    RepositoryHandle,
};
