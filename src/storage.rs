use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

/// Destination for validated profile images. The entity only ever stores the
/// filename; the bytes live behind this trait.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<()>;
    async fn remove(&self, filename: &str) -> anyhow::Result<()>;
}

/// Writes images into the configured profile-image directory.
#[derive(Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub async fn new(root: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("create image dir {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn resolve(&self, filename: &str) -> anyhow::Result<PathBuf> {
        // Generated names are flat hex; anything with a separator never came
        // from this service.
        anyhow::ensure!(
            !filename.contains('/') && !filename.contains('\\') && !filename.starts_with('.'),
            "invalid image filename {filename:?}"
        );
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.resolve(filename)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write image {}", path.display()))?;
        Ok(())
    }

    async fn remove(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.resolve(filename)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove image {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store used by `AppState::fake()` so tests never touch the disk.
#[derive(Default)]
pub struct MemoryImageStore {
    objects: std::sync::Mutex<std::collections::HashMap<String, Bytes>>,
}

impl MemoryImageStore {
    pub fn stored_names(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.keys().cloned().collect()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.insert(filename.to_string(), body);
        Ok(())
    }

    async fn remove(&self, filename: &str) -> anyhow::Result<()> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .remove(filename)
            .with_context(|| format!("no such image {filename}"))?;
        Ok(())
    }
}
