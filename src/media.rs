use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::{distributions::Alphanumeric, Rng};

use crate::data_formats::UploadedImage;

const POST_IMAGE_DIR: &str = "posts";

/// Stores uploaded post images on disk. Posts keep only the path relative to the root.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image under `posts/` with a random prefix and returns its relative path.
    pub async fn save_post_image(&self, image: &UploadedImage) -> Result<String> {
        let dir = self.root.join(POST_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media dir {}", dir.display()))?;

        let prefix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let file_name = format!("{}_{}", prefix, sanitize_file_name(&image.file_name));
        tokio::fs::write(dir.join(&file_name), &image.bytes)
            .await
            .context("Failed to write image")?;

        Ok(format!("{}/{}", POST_IMAGE_DIR, file_name))
    }

    /// Best-effort removal of a stored image whose post was never saved.
    pub async fn discard(&self, relative_path: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative_path)).await {
            tracing::warn!("Failed to discard {}: {}", relative_path, e);
        }
    }
}

/// Keeps the final path component and replaces anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_owned()
    } else {
        cleaned.to_owned()
    }
}
