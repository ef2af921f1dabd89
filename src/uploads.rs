//! Storage for files uploaded through the settings page.
//!
//! Images land in `{root}/images` and are served from `/uploads/images`; CVs land in
//! `{root}/documents` and are only handed out through the CV download route.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::Utc;

use crate::errors::{Error, Result};
use crate::forms::FieldErrors;

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024; // 10MB
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

pub const IMAGES_DIR: &str = "images";
pub const DOCUMENTS_DIR: &str = "documents";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfileImage,
    Cv,
}

impl UploadKind {
    /// Form field the file arrives in.
    pub fn field(self) -> &'static str {
        match self {
            UploadKind::ProfileImage => "profile_image",
            UploadKind::Cv => "cv_file",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "profile_image" => Some(UploadKind::ProfileImage),
            "cv_file" => Some(UploadKind::Cv),
            _ => None,
        }
    }

    fn dir(self) -> &'static str {
        match self {
            UploadKind::ProfileImage => IMAGES_DIR,
            UploadKind::Cv => DOCUMENTS_DIR,
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::ProfileImage => IMAGE_EXTENSIONS,
            UploadKind::Cv => DOCUMENT_EXTENSIONS,
        }
    }

    fn max_size(self) -> usize {
        match self {
            UploadKind::ProfileImage => MAX_IMAGE_SIZE,
            UploadKind::Cv => MAX_DOCUMENT_SIZE,
        }
    }

    fn content_matches(self, bytes: &[u8]) -> bool {
        match self {
            UploadKind::ProfileImage => image_mime_type(bytes).is_some(),
            UploadKind::Cv => bytes.starts_with(b"%PDF"),
        }
    }

    fn unsupported(self) -> Error {
        Error::UnsupportedFileType {
            field: self.field(),
            allowed: self.extensions().join(", "),
        }
    }
}

/// A file part received from a multipart form, not yet validated.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub kind: UploadKind,
    pub file_name: String,
    pub bytes: Bytes,
}

/// Where a stored upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Name on disk, timestamp prefix included
    pub file_name: String,
    /// Value recorded in the settings row
    pub recorded_as: String,
}

fn image_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`.
///
/// Path separators and whitespace become `_`, anything else outside the set is dropped,
/// and leading or trailing dots and underscores are stripped. An empty result becomes
/// `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let trimmed = mapped.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(IMAGES_DIR)).await?;
        tokio::fs::create_dir_all(self.root.join(DOCUMENTS_DIR)).await
    }

    /// Check extension, size and content of an upload without touching the disk.
    pub fn check(&self, upload: &PendingUpload) -> Result<()> {
        let kind = upload.kind;
        let name = sanitize_filename(&upload.file_name);
        match extension(&name) {
            Some(ext) if kind.extensions().contains(&ext.as_str()) => {}
            _ => return Err(kind.unsupported()),
        }

        if upload.bytes.len() > kind.max_size() {
            let mut errors = FieldErrors::new();
            errors.add(
                kind.field(),
                format!(
                    "File too large. Maximum size is {}MB.",
                    kind.max_size() / (1024 * 1024)
                ),
            );
            return Err(Error::Validation(errors));
        }

        if !kind.content_matches(&upload.bytes) {
            return Err(kind.unsupported());
        }
        Ok(())
    }

    /// Validate and write an upload, returning its stored name.
    pub async fn save(&self, upload: &PendingUpload) -> Result<StoredUpload> {
        self.check(upload)?;

        let kind = upload.kind;
        let file_name = format!(
            "{}_{}",
            Utc::now().timestamp(),
            sanitize_filename(&upload.file_name)
        );
        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            tracing::error!("Failed to create upload directory {}: {}", dir.display(), e);
            Error::internal("create upload directory")
        })?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
            tracing::error!("Failed to write upload file: {}", e);
            Error::internal("save uploaded file")
        })?;

        tracing::info!(
            field = kind.field(),
            file = %file_name,
            size = upload.bytes.len(),
            "Upload stored"
        );

        let recorded_as = match kind {
            UploadKind::ProfileImage => format!("/uploads/{}/{}", IMAGES_DIR, file_name),
            UploadKind::Cv => file_name.clone(),
        };
        Ok(StoredUpload {
            file_name,
            recorded_as,
        })
    }

    /// Locate a stored CV, falling back to the bundled static documents.
    pub async fn find_document(&self, static_dir: &Path, name: &str) -> Option<PathBuf> {
        let name = sanitize_filename(name);
        let candidates = [
            self.root.join(DOCUMENTS_DIR).join(&name),
            static_dir.join(DOCUMENTS_DIR).join(&name),
        ];
        for candidate in candidates {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Component;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn upload(kind: UploadKind, name: &str, bytes: &[u8]) -> PendingUpload {
        PendingUpload {
            kind,
            file_name: name.to_string(),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../evil.png"), "evil.png");
        assert_eq!(sanitize_filename("my cv (final).pdf"), "my_cv_final.pdf");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.jpg"), "C_Users_me_pic.jpg");
        assert_eq!(sanitize_filename("...."), "upload");
        assert_eq!(sanitize_filename("résumé.pdf"), "rsum.pdf");
    }

    #[test]
    fn test_check_rejects_disallowed_extension() {
        let store = UploadStore::new("unused");
        let err = store
            .check(&upload(UploadKind::ProfileImage, "shell.php", PNG))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedFileType {
                field: "profile_image",
                ..
            }
        ));
    }

    #[test]
    fn test_check_rejects_mismatched_content() {
        let store = UploadStore::new("unused");
        let err = store
            .check(&upload(UploadKind::Cv, "cv.pdf", b"not a pdf at all"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType { field: "cv_file", .. }));
    }

    #[test]
    fn test_check_rejects_oversized_image() {
        let store = UploadStore::new("unused");
        let mut bytes = PNG.to_vec();
        bytes.resize(MAX_IMAGE_SIZE + 1, 0);
        let err = store
            .check(&upload(UploadKind::ProfileImage, "big.png", &bytes))
            .unwrap_err();
        match err {
            Error::Validation(errors) => assert_eq!(errors.field_names(), vec!["profile_image"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_stays_inside_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let stored = store
            .save(&upload(UploadKind::ProfileImage, "../../evil.png", PNG))
            .await
            .unwrap();

        assert!(stored.file_name.ends_with("_evil.png"));
        assert!(stored.recorded_as.starts_with("/uploads/images/"));

        let path = dir.path().join(IMAGES_DIR).join(&stored.file_name);
        assert!(path.exists());
        let relative = path.strip_prefix(dir.path()).unwrap();
        assert!(relative
            .components()
            .all(|c| matches!(c, Component::Normal(_))));
    }

    #[tokio::test]
    async fn test_cv_is_recorded_by_bare_name_and_found_again() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let stored = store
            .save(&upload(UploadKind::Cv, "CV.pdf", b"%PDF-1.7\n"))
            .await
            .unwrap();
        assert_eq!(stored.recorded_as, stored.file_name);

        let found = store
            .find_document(static_dir.path(), &stored.recorded_as)
            .await
            .unwrap();
        assert!(found.starts_with(dir.path()));
        assert!(store
            .find_document(static_dir.path(), "missing.pdf")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_find_document_falls_back_to_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(static_dir.path().join(DOCUMENTS_DIR)).unwrap();
        std::fs::write(static_dir.path().join(DOCUMENTS_DIR).join("cv.pdf"), b"%PDF").unwrap();

        let store = UploadStore::new(dir.path());
        let found = store.find_document(static_dir.path(), "cv.pdf").await.unwrap();
        assert!(found.starts_with(static_dir.path()));
    }
}
