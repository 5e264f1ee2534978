//! Artifact retrieval.
//!
//! [`ArtifactFetcher`] is the seam the task variants download through.
//! [`LocalArtifactFetcher`] serves artifacts from a store directory laid out as:
//!
//! ```text
//! <store>/models/<model-id>/...                 model files
//! <store>/projects/<project-id>/meta.json       optional project metadata
//! <store>/projects/<project-id>/<dataset-id>/   dataset files
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dockrun_core::{DatasetRef, ModelRef, ProjectRef};
use futures::future::try_join_all;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::FetchError;

const PROJECT_META_FILE: &str = "meta.json";

/// Materializes model and project artifacts on local disk.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch a model into `dest_dir`, verifying its content hash.
    async fn fetch_model(&self, model: &ModelRef, dest_dir: &Path) -> Result<(), FetchError>;

    /// Fetch the given datasets of a project into `dest_dir/<project title>/`.
    async fn fetch_project(
        &self,
        dest_dir: &Path,
        project: &ProjectRef,
        datasets: &[DatasetRef],
    ) -> Result<(), FetchError>;
}

#[async_trait]
impl<F: ArtifactFetcher + ?Sized> ArtifactFetcher for Arc<F> {
    async fn fetch_model(&self, model: &ModelRef, dest_dir: &Path) -> Result<(), FetchError> {
        (**self).fetch_model(model, dest_dir).await
    }

    async fn fetch_project(
        &self,
        dest_dir: &Path,
        project: &ProjectRef,
        datasets: &[DatasetRef],
    ) -> Result<(), FetchError> {
        (**self).fetch_project(dest_dir, project, datasets).await
    }
}

/// Fetcher backed by a local (or network-mounted) artifact store.
#[derive(Debug, Clone)]
pub struct LocalArtifactFetcher {
    store: PathBuf,
}

impl LocalArtifactFetcher {
    /// Create a fetcher serving from the given store root.
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
        }
    }

    fn model_dir(&self, model: &ModelRef) -> PathBuf {
        self.store.join("models").join(model.id.to_string())
    }

    fn project_dir(&self, project: &ProjectRef) -> PathBuf {
        self.store.join("projects").join(project.id.to_string())
    }

    async fn fetch_dataset(
        &self,
        project: &ProjectRef,
        dataset: &DatasetRef,
        project_dest: &Path,
    ) -> Result<(), FetchError> {
        let src = self.project_dir(project).join(dataset.id.to_string());
        if !src.is_dir() {
            return Err(FetchError::DatasetNotFound {
                project: project.id,
                dataset: dataset.id,
            });
        }
        let dest = project_dest.join(safe_component(&dataset.title)?);

        debug!(
            project = %project.title,
            dataset = %dataset.title,
            dest = %dest.display(),
            "Fetching dataset"
        );
        blocking(move || copy_tree(&src, &dest)).await
    }
}

#[async_trait]
impl ArtifactFetcher for LocalArtifactFetcher {
    async fn fetch_model(&self, model: &ModelRef, dest_dir: &Path) -> Result<(), FetchError> {
        let src = self.model_dir(model);
        if !src.is_dir() {
            return Err(FetchError::ModelNotFound(model.id));
        }

        let hash_src = src.clone();
        let actual = blocking(move || content_hash(&hash_src)).await?;
        if !actual.eq_ignore_ascii_case(&model.hash) {
            return Err(FetchError::HashMismatch {
                id: model.id,
                expected: model.hash.clone(),
                actual,
            });
        }

        let dest = dest_dir.to_path_buf();
        blocking(move || copy_tree(&src, &dest)).await?;

        info!(model = %model.title, model_id = %model.id, "Model fetched");
        Ok(())
    }

    async fn fetch_project(
        &self,
        dest_dir: &Path,
        project: &ProjectRef,
        datasets: &[DatasetRef],
    ) -> Result<(), FetchError> {
        let project_src = self.project_dir(project);
        let project_dest = dest_dir.join(safe_component(&project.title)?);

        let meta = project_src.join(PROJECT_META_FILE);
        let meta_dest = project_dest.clone();
        blocking(move || {
            fs::create_dir_all(&meta_dest).map_err(|e| FetchError::io(&meta_dest, e))?;
            if meta.is_file() {
                let target = meta_dest.join(PROJECT_META_FILE);
                fs::copy(&meta, &target).map_err(|e| FetchError::io(&target, e))?;
            }
            Ok(())
        })
        .await?;

        try_join_all(
            datasets
                .iter()
                .map(|dataset| self.fetch_dataset(project, dataset, &project_dest)),
        )
        .await?;

        info!(
            project = %project.title,
            project_id = %project.id,
            datasets = datasets.len(),
            "Project fetched"
        );
        Ok(())
    }
}

/// Content hash of an artifact directory.
///
/// Lowercase hex SHA-256 over every regular file, visited in byte order of
/// its `/`-joined relative path; each file contributes that path, a NUL
/// byte, then its bytes.
pub fn content_hash(root: &Path) -> Result<String, FetchError> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

    let mut hasher = Sha256::new();
    for (relative, path) in files {
        let bytes = fs::read(&path).map_err(|e| FetchError::io(&path, e))?;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Collect `(relative path, absolute path)` for every regular file under `dir`.
fn collect_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<(), FetchError> {
    for entry in fs::read_dir(dir).map_err(|e| FetchError::io(dir, e))? {
        let entry = entry.map_err(|e| FetchError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| FetchError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            let relative = relative_key(root, &path)?;
            out.push((relative, path));
        }
    }
    Ok(())
}

/// Platform-independent hash key: UTF-8 components joined with `/`.
fn relative_key(root: &Path, path: &Path) -> Result<String, FetchError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| FetchError::InvalidName(path.display().to_string()))?;
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| FetchError::InvalidName(path.display().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), FetchError> {
    fs::create_dir_all(dest).map_err(|e| FetchError::io(dest, e))?;
    for entry in fs::read_dir(src).map_err(|e| FetchError::io(src, e))? {
        let entry = entry.map_err(|e| FetchError::io(src, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| FetchError::io(&from, e))?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to).map_err(|e| FetchError::io(&to, e))?;
        }
    }
    Ok(())
}

/// Titles become directory names; reject anything that is not a single
/// normal path component.
fn safe_component(title: &str) -> Result<&str, FetchError> {
    let mut components = Path::new(title).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(title),
        _ => Err(FetchError::InvalidName(title.to_string())),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, FetchError>
where
    F: FnOnce() -> Result<T, FetchError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FetchError::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn store_with_model(id: u64) -> (TempDir, String) {
        let store = TempDir::new().unwrap();
        let model = store.path().join("models").join(id.to_string());
        write(&model.join("model.pt"), b"weights");
        write(&model.join("config.json"), b"{}");
        let hash = content_hash(&model).unwrap();
        (store, hash)
    }

    #[test]
    fn test_content_hash_is_order_independent_and_content_sensitive() {
        let a = TempDir::new().unwrap();
        write(&a.path().join("b.txt"), b"2");
        write(&a.path().join("a.txt"), b"1");

        let b = TempDir::new().unwrap();
        write(&b.path().join("a.txt"), b"1");
        write(&b.path().join("b.txt"), b"2");
        assert_eq!(content_hash(a.path()).unwrap(), content_hash(b.path()).unwrap());

        write(&b.path().join("b.txt"), b"3");
        assert_ne!(content_hash(a.path()).unwrap(), content_hash(b.path()).unwrap());
    }

    #[test]
    fn test_content_hash_uses_slash_joined_byte_order() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("a/x"), b"2");
        write(&dir.path().join("a-b/x"), b"1");

        // '-' sorts before '/', so "a-b/x" is hashed first even though the
        // component "a" sorts before "a-b".
        let mut hasher = Sha256::new();
        hasher.update(b"a-b/x\01");
        hasher.update(b"a/x\02");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(content_hash(dir.path()).unwrap(), expected);
    }

    #[test]
    fn test_content_hash_format() {
        let dir = TempDir::new().unwrap();
        let hash = content_hash(dir.path()).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_safe_component() {
        assert!(safe_component("p1").is_ok());
        assert!(safe_component("..").is_err());
        assert!(safe_component("a/b").is_err());
        assert!(safe_component("").is_err());
        assert!(safe_component("/abs").is_err());
    }

    #[tokio::test]
    async fn test_fetch_model_copies_files() {
        let (store, hash) = store_with_model(42);
        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());

        fetcher
            .fetch_model(&ModelRef::new("m1", 42, hash.to_uppercase()), dest.path())
            .await
            .unwrap();

        assert_eq!(fs::read(dest.path().join("model.pt")).unwrap(), b"weights");
        assert!(dest.path().join("config.json").is_file());
    }

    #[tokio::test]
    async fn test_fetch_model_hash_mismatch_copies_nothing() {
        let (store, _) = store_with_model(42);
        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());

        let result = fetcher
            .fetch_model(&ModelRef::new("m1", 42, "abc"), dest.path())
            .await;

        assert!(matches!(result, Err(FetchError::HashMismatch { .. })));
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_missing_model() {
        let store = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());

        let result = fetcher
            .fetch_model(&ModelRef::new("m9", 9, "x"), dest.path())
            .await;
        assert!(matches!(result, Err(FetchError::ModelNotFound(id)) if id.get() == 9));
    }

    #[tokio::test]
    async fn test_fetch_project_layout() {
        let store = TempDir::new().unwrap();
        let project = store.path().join("projects/7");
        write(&project.join("meta.json"), br#"{"classes":[]}"#);
        write(&project.join("1/img/a.jpg"), b"a");
        write(&project.join("2/img/b.jpg"), b"b");

        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());
        let project_ref = ProjectRef::new(7, "p1")
            .with_dataset(DatasetRef::new(1, "d1"))
            .with_dataset(DatasetRef::new(2, "d2"));

        fetcher
            .fetch_project(dest.path(), &project_ref, &project_ref.datasets)
            .await
            .unwrap();

        assert!(dest.path().join("p1/meta.json").is_file());
        assert_eq!(fs::read(dest.path().join("p1/d1/img/a.jpg")).unwrap(), b"a");
        assert_eq!(fs::read(dest.path().join("p1/d2/img/b.jpg")).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_fetch_project_without_meta_creates_project_dir() {
        let store = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());
        let project_ref = ProjectRef::new(7, "p1");

        fetcher
            .fetch_project(dest.path(), &project_ref, &[])
            .await
            .unwrap();

        assert!(dest.path().join("p1").is_dir());
        assert!(!dest.path().join("p1/meta.json").exists());
    }

    #[tokio::test]
    async fn test_fetch_project_missing_dataset() {
        let store = TempDir::new().unwrap();
        write(&store.path().join("projects/7/1/a.txt"), b"a");

        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());
        let project_ref = ProjectRef::new(7, "p1").with_dataset(DatasetRef::new(3, "d3"));

        let result = fetcher
            .fetch_project(dest.path(), &project_ref, &project_ref.datasets)
            .await;
        assert!(matches!(result, Err(FetchError::DatasetNotFound { .. })));
    }

    #[tokio::test]
    async fn test_fetch_project_rejects_traversal_title() {
        let store = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let fetcher = LocalArtifactFetcher::new(store.path());
        let project_ref = ProjectRef::new(7, "../escape");

        let result = fetcher.fetch_project(dest.path(), &project_ref, &[]).await;
        assert!(matches!(result, Err(FetchError::InvalidName(_))));
    }
}
