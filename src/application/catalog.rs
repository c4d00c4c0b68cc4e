//! Read access to the photo library, abstracted for testability.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced while listing a category directory.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid category name `{0}`")]
    InvalidCategory(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Directory listing seam between the rotation logic and the filesystem.
///
/// The gallery only ever asks for the filenames inside one category; matching
/// and selection stay in the domain layer.
#[async_trait]
pub trait PhotoCatalog: Send + Sync {
    async fn list_category(&self, category: &str) -> Result<Vec<String>, CatalogError>;
}
