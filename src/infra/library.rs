//! Read-only photo library rooted on the local filesystem.
//!
//! One subdirectory per category; the rotation decides which filenames are
//! servable, so this layer only lists directories and reads files, refusing
//! anything that would escape the root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs;

use crate::application::catalog::{CatalogError, PhotoCatalog};

/// Errors that can occur while reading from the photo library.
#[derive(Debug, Error)]
pub enum PhotoLibraryError {
    #[error("photo library root `{0}` is not a directory")]
    MissingRoot(PathBuf),
    #[error("invalid photo path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed photo library.
///
/// Unlike writable storage this never creates its root: a missing library is
/// a deployment mistake and fails startup.
#[derive(Debug)]
pub struct PhotoLibrary {
    root: PathBuf,
}

impl PhotoLibrary {
    pub fn new(root: PathBuf) -> Result<Self, PhotoLibraryError> {
        if !root.is_dir() {
            return Err(PhotoLibraryError::MissingRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read one photo into memory. Daily photos are small enough that
    /// streaming buys nothing.
    pub async fn read(&self, category: &str, filename: &str) -> Result<Bytes, PhotoLibraryError> {
        let absolute = self.resolve(category, filename)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Cheap readiness probe for the health endpoint.
    pub async fn health_check(&self) -> Result<(), PhotoLibraryError> {
        let metadata = fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(PhotoLibraryError::MissingRoot(self.root.clone()));
        }
        Ok(())
    }

    fn resolve(&self, category: &str, filename: &str) -> Result<PathBuf, PhotoLibraryError> {
        let relative = Path::new(category).join(filename);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(PhotoLibraryError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PhotoCatalog for PhotoLibrary {
    async fn list_category(&self, category: &str) -> Result<Vec<String>, CatalogError> {
        if !is_plain_name(category) {
            return Err(CatalogError::InvalidCategory(category.to_string()));
        }

        let mut entries = fs::read_dir(self.root.join(category)).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

/// A category must be a single path segment; anything else could address
/// directories outside the library.
fn is_plain_name(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn seeded_library() -> (TempDir, PhotoLibrary) {
        let dir = TempDir::new().expect("temp dir");
        let category = dir.path().join("category1");
        std::fs::create_dir(&category).expect("category dir");
        std::fs::write(category.join("pic1(cat1-pic1).jpg"), b"jpeg bytes").expect("photo file");
        std::fs::create_dir(category.join("nested")).expect("nested dir");
        let library = PhotoLibrary::new(dir.path().to_path_buf()).expect("library");
        (dir, library)
    }

    #[test]
    fn missing_root_is_rejected_at_construction() {
        let result = PhotoLibrary::new(PathBuf::from("/nonexistent/scatto-library"));
        assert!(matches!(result, Err(PhotoLibraryError::MissingRoot(_))));
    }

    #[tokio::test]
    async fn listing_returns_files_and_skips_directories() {
        let (_dir, library) = seeded_library();
        let names = library.list_category("category1").await.expect("listing");
        assert_eq!(names, ["pic1(cat1-pic1).jpg"]);
    }

    #[tokio::test]
    async fn listing_rejects_compound_category_names() {
        let (_dir, library) = seeded_library();
        let result = library.list_category("../etc").await;
        assert!(matches!(result, Err(CatalogError::InvalidCategory(_))));
    }

    #[tokio::test]
    async fn listing_missing_category_is_an_io_error() {
        let (_dir, library) = seeded_library();
        let result = library.list_category("category9").await;
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }

    #[tokio::test]
    async fn read_returns_the_stored_bytes() {
        let (_dir, library) = seeded_library();
        let bytes = library
            .read("category1", "pic1(cat1-pic1).jpg")
            .await
            .expect("photo bytes");
        assert_eq!(bytes.as_ref(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn read_refuses_parent_components() {
        let (_dir, library) = seeded_library();
        let result = library.read("category1", "../../etc/passwd").await;
        assert!(matches!(result, Err(PhotoLibraryError::InvalidPath)));
    }

    #[tokio::test]
    async fn read_refuses_absolute_filenames() {
        let (_dir, library) = seeded_library();
        let result = library.read("category1", "/etc/passwd").await;
        assert!(matches!(result, Err(PhotoLibraryError::InvalidPath)));
    }

    #[tokio::test]
    async fn health_check_passes_for_a_real_root() {
        let (_dir, library) = seeded_library();
        library.health_check().await.expect("healthy");
    }
}
