//! Filename validation and sanitization
//!
//! Every name that is joined onto a storage root must first pass through
//! [`FilenamePolicy::validate`]. The resulting [`SanitizedFilename`] contains only
//! ASCII alphanumerics, `.`, `-` and `_`, never starts with a dot, and always ends
//! in one of the policy's allowed extensions.
//!
//! Checks run in this order:
//! 1. Non-empty name
//! 2. Extension present (text after the last `.`)
//! 3. Lowercased extension is a member of the allowed set (exact match)
//! 4. No separators, drive prefixes, control characters or `..` sequences
//! 5. Character filtering; the filtered name must keep its stem and extension
//! 6. The filtered name fits the policy's length limit

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Longest single path component common filesystems accept (`NAME_MAX`)
pub const NAME_MAX: usize = 255;

/// Bytes a storage area adds around a name for its temporary file:
/// `.` + name + `.` + hyphenated UUID (36) + `.part`
pub const TEMP_NAME_OVERHEAD: usize = 1 + 1 + 36 + 5;

/// Suffix appended to an upload's name to form its artifact name
pub const ARTIFACT_SUFFIX: &str = ".png";

/// Longest stored name for which the temporary name still fits `NAME_MAX`
pub const MAX_STORED_NAME_LEN: usize = NAME_MAX - TEMP_NAME_OVERHEAD;

/// Longest upload name whose artifact can still be stored
pub const MAX_UPLOAD_NAME_LEN: usize = MAX_STORED_NAME_LEN - ARTIFACT_SUFFIX.len();

/// Audio container formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Map a lowercased extension onto a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

/// Reason a filename was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilenameRejection {
    #[error("filename is empty")]
    Empty,

    #[error("filename has no extension")]
    MissingExtension,

    #[error("extension '{0}' is not allowed")]
    DisallowedExtension(String),

    #[error("filename '{0}' is not safe to store")]
    UnsafePath(String),

    #[error("filename is {len} bytes long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

impl FilenameRejection {
    /// True for rejections caused by the name's extension
    pub fn is_unsupported_format(&self) -> bool {
        matches!(
            self,
            Self::Empty | Self::MissingExtension | Self::DisallowedExtension(_)
        )
    }
}

/// A filename that is safe to join onto a storage root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SanitizedFilename {
    name: String,
    extension: String,
}

impl SanitizedFilename {
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn audio_format(&self) -> Option<AudioFormat> {
        AudioFormat::from_extension(&self.extension)
    }

    /// Name of the rendered artifact derived from this asset (`clip.wav` -> `clip.wav.png`)
    pub fn artifact_name(&self) -> String {
        format!("{}{}", self.name, ARTIFACT_SUFFIX)
    }
}

impl fmt::Display for SanitizedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for SanitizedFilename {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Set of extensions a storage area accepts, plus a name length limit in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePolicy {
    allowed: BTreeSet<String>,
    max_len: usize,
}

impl FilenamePolicy {
    /// Build a policy from extensions; leading dots and case are ignored
    ///
    /// The length limit defaults to [`MAX_UPLOAD_NAME_LEN`].
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            allowed,
            max_len: MAX_UPLOAD_NAME_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Upload policy: `wav` and `mp3`
    pub fn audio_uploads() -> Self {
        Self::new([AudioFormat::Wav.extension(), AudioFormat::Mp3.extension()])
    }

    /// Results policy: rendered `png` images
    pub fn rendered_images() -> Self {
        Self::new(["png"]).with_max_len(MAX_STORED_NAME_LEN)
    }

    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Extension-only check: the name contains a `.` and its lowercased suffix is allowed
    pub fn has_allowed_extension(&self, raw: &str) -> bool {
        self.allowed_extension(raw).is_ok()
    }

    /// Validate an untrusted name and produce its sanitized form
    pub fn validate(&self, raw: &str) -> Result<SanitizedFilename, FilenameRejection> {
        let extension = self.allowed_extension(raw)?;

        if could_escape_root(raw) {
            return Err(FilenameRejection::UnsafePath(raw.to_string()));
        }

        let name = filter_characters(raw);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.to_ascii_lowercase() == extension => {}
            _ => return Err(FilenameRejection::UnsafePath(raw.to_string())),
        }
        if name.len() > self.max_len {
            return Err(FilenameRejection::TooLong {
                len: name.len(),
                max: self.max_len,
            });
        }

        Ok(SanitizedFilename { name, extension })
    }

    fn allowed_extension(&self, raw: &str) -> Result<String, FilenameRejection> {
        if raw.is_empty() {
            return Err(FilenameRejection::Empty);
        }
        let (_, ext) = raw
            .rsplit_once('.')
            .ok_or(FilenameRejection::MissingExtension)?;
        let ext = ext.to_lowercase();
        if self.allowed.contains(&ext) {
            Ok(ext)
        } else {
            Err(FilenameRejection::DisallowedExtension(ext))
        }
    }
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self::audio_uploads()
    }
}

/// Separators, drive prefixes, control characters and parent references
fn could_escape_root(raw: &str) -> bool {
    raw.contains("..")
        || raw
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}

/// Whitespace becomes `_`, anything outside `[A-Za-z0-9._-]` is dropped,
/// leading dots and underscores are stripped
fn filter_characters(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    filtered.trim_start_matches(['.', '_']).to_string()
}
