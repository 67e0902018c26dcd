//! Attachment staging: durable blob writes ahead of message persistence,
//! with compensating rollback.

use std::path::{Path, PathBuf};

use courier_config::StorageConfig;
use courier_database::{MessagingError, MessagingResult};
use tracing::{debug, warn};

use crate::types::UploadedFile;

/// Stages uploaded binaries into blob storage and reverses them on failure.
pub struct StagingService {
    root: PathBuf,
    public_base_url: String,
    max_attachments: usize,
}

impl StagingService {
    /// Create a new staging service instance
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.attachments_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_attachments: config.max_attachments,
        }
    }

    /// Persist each uploaded blob under a generated name and return its
    /// public retrieval URL, order preserved.
    ///
    /// The attachment limit is checked again here even though the request
    /// boundary enforces it first. If any write fails, files already staged
    /// by this call are removed before the error is returned.
    pub async fn stage(&self, files: &[UploadedFile]) -> MessagingResult<Vec<String>> {
        if files.len() > self.max_attachments {
            return Err(MessagingError::TooManyAttachments {
                given: files.len(),
                limit: self.max_attachments,
            });
        }

        if files.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        let mut urls = Vec::with_capacity(files.len());

        for file in files {
            let stored_name = storage_name(&file.filename);
            let path = self.root.join(&stored_name);

            if let Err(e) = tokio::fs::write(&path, &file.data).await {
                self.rollback(&urls).await;
                return Err(MessagingError::StorageError(e.to_string()));
            }

            debug!(
                filename = %file.filename,
                stored_name = %stored_name,
                size = file.data.len(),
                "staged attachment"
            );

            urls.push(format!(
                "{}/static/attachments/{}",
                self.public_base_url, stored_name
            ));
        }

        Ok(urls)
    }

    /// Best-effort deletion of previously staged files.
    ///
    /// Idempotent: files already absent are skipped silently, and failures
    /// are logged rather than returned so rollback never masks the error
    /// that triggered it.
    pub async fn rollback(&self, urls: &[String]) {
        for url in urls {
            let Some(stored_name) = url.rsplit('/').next() else {
                continue;
            };
            let path = self.root.join(stored_name);

            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(stored_name = %stored_name, "rolled back staged attachment"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(stored_name = %stored_name, error = %e, "failed to roll back staged attachment")
                }
            }
        }
    }

    /// Filesystem path a staged URL resolves to. Test and boundary helper.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        url.rsplit('/').next().map(|name| self.root.join(name))
    }
}

/// Content-opaque stored name: generated id plus the original extension.
fn storage_name(filename: &str) -> String {
    let id = cuid2::cuid();
    match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{id}.{ext}"),
        _ => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn test_service(temp_dir: &TempDir, max_attachments: usize) -> StagingService {
        StagingService::new(&StorageConfig {
            attachments_dir: temp_dir.path().join("attachments").display().to_string(),
            public_base_url: "http://127.0.0.1:7080/".to_string(),
            max_attachments,
        })
    }

    fn upload(name: &str, contents: &str) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            data: Bytes::from(contents.to_string().into_bytes()),
        }
    }

    #[tokio::test]
    async fn test_stage_writes_files_and_builds_urls() {
        let temp_dir = TempDir::new().unwrap();
        let service = test_service(&temp_dir, 10);

        let urls = service
            .stage(&[upload("photo.png", "png-bytes"), upload("notes", "text")])
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("http://127.0.0.1:7080/static/attachments/"));
        assert!(urls[0].ends_with(".png"));

        for url in &urls {
            let path = service.path_for_url(url).unwrap();
            assert!(path.exists());
        }
    }

    #[tokio::test]
    async fn test_stage_rejects_too_many_files() {
        let temp_dir = TempDir::new().unwrap();
        let service = test_service(&temp_dir, 1);

        let err = service
            .stage(&[upload("a.txt", "a"), upload("b.txt", "b")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MessagingError::TooManyAttachments { given: 2, limit: 1 }
        ));
    }

    #[tokio::test]
    async fn test_rollback_removes_files_and_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let service = test_service(&temp_dir, 10);

        let urls = service
            .stage(&[upload("a.txt", "a"), upload("b.txt", "b")])
            .await
            .unwrap();

        service.rollback(&urls).await;
        for url in &urls {
            assert!(!service.path_for_url(url).unwrap().exists());
        }

        // Second rollback over the same urls must be harmless.
        service.rollback(&urls).await;
    }

    #[tokio::test]
    async fn test_stage_empty_list_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let service = test_service(&temp_dir, 10);

        let urls = service.stage(&[]).await.unwrap();
        assert!(urls.is_empty());
    }
}
