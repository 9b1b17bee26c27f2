//! Filesystem storage areas
//!
//! A [`StorageArea`] is a directory plus the [`FilenamePolicy`] that guards it.
//! [`StorageArea::path_for`] is the only place a name is joined onto the root;
//! it re-checks that the joined path is a direct child of the root.
//!
//! Writes go to a hidden temporary file and are renamed into place, so a
//! concurrent reader sees either the previous asset or the new one. Two uploads
//! racing on the same name resolve as last-rename-wins.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::filename::{AudioFormat, FilenamePolicy, FilenameRejection, SanitizedFilename};
use crate::{Error, Result};

/// Outcome of [`StorageArea::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
    /// An asset with the same name existed and was overwritten
    pub replaced: bool,
}

/// An audio file accepted from a client and written to the uploads area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Filename exactly as the client sent it
    pub original_name: String,
    pub name: SanitizedFilename,
    pub format: AudioFormat,
    pub stored: StoredFile,
}

/// One directory acting as the holding area for a pipeline stage
#[derive(Debug, Clone)]
pub struct StorageArea {
    root: PathBuf,
    policy: FilenamePolicy,
}

impl StorageArea {
    pub fn new(root: impl Into<PathBuf>, policy: FilenamePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &FilenamePolicy {
        &self.policy
    }

    /// Create the directory (and parents) if missing
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            debug!("Created storage directory: {}", self.root.display());
        }
        Ok(())
    }

    /// Validate an untrusted name against this area's policy
    pub fn validate(&self, raw: &str) -> Result<SanitizedFilename> {
        Ok(self.policy.validate(raw)?)
    }

    /// Join a sanitized name onto the root
    ///
    /// Fails unless the name is a single normal path component and the result
    /// stays directly inside the root.
    pub fn path_for(&self, name: &SanitizedFilename) -> Result<PathBuf> {
        let mut components = Path::new(name.as_str()).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        let path = self.root.join(name.as_str());
        if !single_normal || path.parent() != Some(self.root.as_path()) {
            return Err(FilenameRejection::UnsafePath(name.to_string()).into());
        }
        Ok(path)
    }

    /// Validate and join in one step
    pub fn resolve(&self, raw: &str) -> Result<(SanitizedFilename, PathBuf)> {
        let name = self.validate(raw)?;
        let path = self.path_for(&name)?;
        Ok((name, path))
    }

    /// Like [`Self::resolve`] but the file must already exist
    pub async fn resolve_existing(&self, raw: &str) -> Result<(SanitizedFilename, PathBuf)> {
        let (name, path) = self.resolve(raw)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok((name, path)),
            Ok(_) => Err(Error::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store bytes under `name`, replacing any previous file atomically
    pub async fn write(&self, name: &SanitizedFilename, bytes: &[u8]) -> Result<StoredFile> {
        let path = self.path_for(name)?;
        let replaced = tokio::fs::try_exists(&path).await?;

        let temp = self
            .root
            .join(format!(".{}.{}.part", name.as_str(), Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(
            "Stored {} bytes at {} (replaced: {})",
            bytes.len(),
            path.display(),
            replaced
        );

        Ok(StoredFile {
            path,
            size: bytes.len() as u64,
            replaced,
        })
    }

    /// Write an upload whose sanitized name maps to an [`AudioFormat`]
    pub async fn store_upload(
        &self,
        original_name: &str,
        name: SanitizedFilename,
        bytes: &[u8],
    ) -> Result<UploadedAsset> {
        let format = name
            .audio_format()
            .ok_or_else(|| FilenameRejection::DisallowedExtension(name.extension().to_string()))?;
        let stored = self.write(&name, bytes).await?;
        Ok(UploadedAsset {
            original_name: original_name.to_string(),
            name,
            format,
            stored,
        })
    }
}

/// The two storage areas of the pipeline
#[derive(Debug, Clone)]
pub struct Storage {
    pub uploads: StorageArea,
    pub results: StorageArea,
}

impl Storage {
    /// `<static_root>/uploads` guarded by `upload_policy`, `<static_root>/results` for PNGs
    pub fn new(static_root: impl AsRef<Path>, upload_policy: FilenamePolicy) -> Self {
        let static_root = static_root.as_ref();
        Self {
            uploads: StorageArea::new(static_root.join("uploads"), upload_policy),
            results: StorageArea::new(
                static_root.join("results"),
                FilenamePolicy::rendered_images(),
            ),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.static_root, config.upload_policy())
    }

    pub fn ensure_exists(&self) -> Result<()> {
        self.uploads.ensure_exists()?;
        self.results.ensure_exists()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path(), FilenamePolicy::audio_uploads());
        storage.ensure_exists().unwrap();
        (dir, storage)
    }

    #[test]
    fn test_layout() {
        let (dir, storage) = storage();
        assert_eq!(storage.uploads.root(), dir.path().join("uploads"));
        assert_eq!(storage.results.root(), dir.path().join("results"));
        assert!(storage.uploads.root().is_dir());
        assert!(storage.results.root().is_dir());
    }

    #[test]
    fn test_resolve_stays_inside_root() {
        let (_dir, storage) = storage();
        let (name, path) = storage.uploads.resolve("clip.wav").unwrap();
        assert_eq!(name.as_str(), "clip.wav");
        assert_eq!(path.parent(), Some(storage.uploads.root()));

        for raw in ["../../etc/passwd.wav", "/abs/clip.wav", "sub\\clip.mp3"] {
            let err = storage.uploads.resolve(raw).unwrap_err();
            assert!(
                matches!(err, Error::InvalidFilename(FilenameRejection::UnsafePath(_))),
                "{raw}: {err:?}"
            );
        }
    }

    #[test]
    fn test_results_policy_is_png_only() {
        let (_dir, storage) = storage();
        assert!(storage.results.resolve("clip.wav.png").is_ok());
        assert!(matches!(
            storage.results.resolve("clip.wav"),
            Err(Error::InvalidFilename(FilenameRejection::DisallowedExtension(_)))
        ));
    }

    #[tokio::test]
    async fn test_write_then_resolve_existing() {
        let (_dir, storage) = storage();
        let name = storage.uploads.validate("clip.wav").unwrap();

        let stored = storage.uploads.write(&name, b"RIFF1234").await.unwrap();
        assert!(!stored.replaced);
        assert_eq!(stored.size, 8);

        let (_, path) = storage.uploads.resolve_existing("clip.wav").await.unwrap();
        assert_eq!(path, stored.path);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"RIFF1234");
    }

    #[tokio::test]
    async fn test_longest_names_fit_temp_files() {
        let (_dir, storage) = storage();
        let raw = format!("{}.wav", "a".repeat(crate::filename::MAX_UPLOAD_NAME_LEN - 4));

        let name = storage.uploads.validate(&raw).unwrap();
        storage.uploads.write(&name, b"RIFF").await.unwrap();

        let artifact = storage.results.validate(&name.artifact_name()).unwrap();
        let stored = storage.results.write(&artifact, b"PNG").await.unwrap();
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"PNG");

        let err = storage.uploads.validate(&format!("a{raw}")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidFilename(FilenameRejection::TooLong { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_overwrites_same_name() {
        let (_dir, storage) = storage();
        let name = storage.uploads.validate("clip.wav").unwrap();

        storage.uploads.write(&name, b"first").await.unwrap();
        let stored = storage.uploads.write(&name, b"second").await.unwrap();
        assert!(stored.replaced);
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"second");

        // No temporary files left behind
        let entries: Vec<_> = std::fs::read_dir(storage.uploads.root())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_store_upload_records_format() {
        let (_dir, storage) = storage();
        let name = storage.uploads.validate("my song.MP3").unwrap();

        let asset = storage
            .uploads
            .store_upload("my song.MP3", name, b"ID3")
            .await
            .unwrap();
        assert_eq!(asset.original_name, "my song.MP3");
        assert_eq!(asset.name.as_str(), "my_song.MP3");
        assert_eq!(asset.format, AudioFormat::Mp3);
        assert_eq!(asset.stored.path, storage.uploads.root().join("my_song.MP3"));

        // Images are not audio uploads
        let png = storage.results.validate("clip.wav.png").unwrap();
        let err = storage
            .results
            .store_upload("clip.wav.png", png, b"PNG")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidFilename(FilenameRejection::DisallowedExtension(ref ext)) if ext == "png"
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_dir, storage) = storage();
        let err = storage.uploads.resolve_existing("missing.wav").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref name) if name == "missing.wav"));
    }
}
