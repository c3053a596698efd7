use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// URL prefix stored in `users.avatar_path` and served by the uploads route.
pub const PUBLIC_PREFIX: &str = "/uploads/";

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Flat directory of uploaded avatar images.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl AvatarStore {
    pub fn new(dir: PathBuf, max_bytes: usize) -> Self {
        Self { dir, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store `data` under a fresh name. Returns the public path.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> AppResult<String> {
        let ext = image_extension(original_name)
            .ok_or_else(|| AppError::BadRequest("Only image files are allowed!".into()))?;
        if data.is_empty() {
            return Err(AppError::BadRequest("No file uploaded".into()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "File too large (max {} bytes)",
                self.max_bytes
            )));
        }

        let name = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::now_v7().simple(),
            ext
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("create uploads dir: {}", e)))?;
        tokio::fs::write(self.dir.join(&name), data)
            .await
            .map_err(|e| AppError::Internal(format!("write upload {}: {}", name, e)))?;

        Ok(format!("{}{}", PUBLIC_PREFIX, name))
    }

    /// Best-effort removal of a previously stored file.
    pub async fn remove(&self, public_path: &str) {
        let Some(path) = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|name| self.resolve(name))
        else {
            return;
        };

        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove old avatar {}: {}", path.display(), e);
            }
        }
    }

    /// Map a stored file name to its location on disk. Anything that could
    /// escape the uploads directory resolves to `None`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let is_plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && Path::new(name).components().count() == 1;
        is_plain.then(|| self.dir.join(name))
    }
}

/// Lower-cased extension if the file name looks like a supported image.
fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
