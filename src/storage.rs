// src/storage.rs - Uploaded image storage
use crate::config::StorageConfig;
use crate::print_job::{JobId, PrintJobError, StoredImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Empty file received.")]
    Empty,
    #[error("File too large ({size} bytes). Maximum size is {max} bytes.")]
    TooLarge { size: usize, max: usize },
    #[error("Unsupported file extension '{0}'.")]
    UnsupportedExtension(String),
    #[error("Invalid image format. Only JPG, PNG, GIF are supported.")]
    UnrecognizedFormat,
    #[error("No stored image for job {0}")]
    NotFound(JobId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for PrintJobError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => PrintJobError::NotFound(id.to_string()),
            StorageError::Io(e) => PrintJobError::Storage(e.to_string()),
            other => PrintJobError::Validation(other.to_string()),
        }
    }
}

/// Image container formats the printer accepts, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else {
            None
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
        }
    }
}

/// Writes uploaded images to a single directory as `<job id>.<ext>`.
///
/// Paths are indexed by job id as they are written, so lookups and removal
/// never have to guess the extension.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
    allowed_extensions: Vec<String>,
    index: Arc<RwLock<HashMap<JobId, PathBuf>>>,
}

impl ImageStore {
    /// Open the upload directory, creating it if needed, and make sure it is
    /// writable before any upload arrives.
    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let root = config.upload_dir.clone();
        fs::create_dir_all(&root).await?;
        let probe = root.join(".write-probe");
        if let Err(e) = fs::write(&probe, b"").await {
            tracing::error!("Upload directory '{}' is not writable: {}", root.display(), e);
            return Err(StorageError::Io(e));
        }
        fs::remove_file(&probe).await?;
        tracing::info!("Storing uploads in {}", root.display());
        Ok(Self {
            root,
            max_bytes: config.max_upload_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            index: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and persist an upload under a fresh job id.
    pub async fn store(&self, bytes: &[u8], declared_filename: &str) -> Result<StoredImage, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge { size: bytes.len(), max: self.max_bytes });
        }
        let filename = sanitize_filename(declared_filename);
        let extension = extension_of(&filename)
            .filter(|ext| self.allowed_extensions.iter().any(|allowed| allowed == ext))
            .ok_or_else(|| StorageError::UnsupportedExtension(extension_of(&filename).unwrap_or_default()))?;
        if ImageFormat::sniff(bytes).is_none() {
            return Err(StorageError::UnrecognizedFormat);
        }

        let job_id = JobId::new();
        let path = self.root.join(format!("{}.{}", job_id, extension));
        fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!("Failed to write upload '{}': {}", path.display(), e);
            StorageError::Io(e)
        })?;
        tracing::info!("Stored {} ({} bytes) as {}", filename, bytes.len(), path.display());
        self.index.write().await.insert(job_id, path.clone());
        Ok(StoredImage {
            job_id,
            path,
            filename,
            size: bytes.len() as u64,
        })
    }

    /// Location of the stored image for `job_id`.
    pub async fn path(&self, job_id: &JobId) -> Result<PathBuf, StorageError> {
        let path = self
            .index
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or(StorageError::NotFound(*job_id))?;
        if fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(StorageError::NotFound(*job_id))
        }
    }

    /// Delete the image stored for `job_id`. An image that is already gone
    /// is not an error.
    pub async fn remove(&self, job_id: &JobId) -> Result<(), StorageError> {
        let Some(path) = self.index.write().await.remove(job_id) else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Keep only the final path component of a client supplied filename.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("").trim();
    if base.is_empty() {
        "image".to_string()
    } else {
        base.to_string()
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
