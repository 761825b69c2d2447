//! Stores uploaded post images under the media root

use anyhow::Result;
use rand::{distr::Alphanumeric, Rng};
use std::path::PathBuf;
use tracing::info;

/// Directory (relative to the media root) post images are written to.
pub const POST_IMAGE_DIR: &str = "posts";

/// Longest stored file name, so `posts/<name>_XXXXXXX.<ext>` stays well inside
/// both the filesystem limit and the `image` column.
const MAX_FILE_NAME_BYTES: usize = 100;

/// Longer "extensions" are treated as part of the stem.
const MAX_EXTENSION_BYTES: usize = 16;

pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// URL prefix stored names are served under, without a trailing slash.
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Writes the upload and returns its stored name, `posts/<file>`.
    /// An existing file is never overwritten.
    pub async fn save_post_image(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let dir = self.root.join(POST_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = sanitize_file_name(original_name);
        let mut candidate = file_name.clone();
        while tokio::fs::try_exists(dir.join(&candidate)).await? {
            candidate = with_random_suffix(&file_name);
        }

        tokio::fs::write(dir.join(&candidate), data).await?;
        let stored = format!("{}/{}", POST_IMAGE_DIR, candidate);
        info!("Stored upload {} ({} bytes)", stored, data.len());

        Ok(stored)
    }
}

/// Whether the bytes sniff as an image file.
pub fn is_image(data: &[u8]) -> bool {
    infer::is_image(data)
}

/// Keeps the base name, turns spaces into underscores and drops anything
/// that is not alphanumeric, `-`, `_` or `.`. Long names are cut down to
/// `MAX_FILE_NAME_BYTES`, keeping the extension.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        truncate_file_name(cleaned)
    }
}

fn truncate_file_name(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_BYTES {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= MAX_EXTENSION_BYTES => {
            (stem, Some(ext))
        }
        _ => (name, None),
    };

    let budget = MAX_FILE_NAME_BYTES - ext.map_or(0, |e| e.len() + 1);
    let mut end = budget.min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    match ext {
        Some(ext) => format!("{}.{}", &stem[..end], ext),
        None => stem[..end].to_string(),
    }
}

fn with_random_suffix(file_name: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();

    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", file_name, suffix),
    }
}

#[cfg(test)]
pub(crate) const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("small.gif"), "small.gif");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_file_name("we<ird>.jpg"), "weird.jpg");
        assert_eq!(sanitize_file_name("..."), "upload");
    }

    #[test]
    fn test_sniffing() {
        assert!(is_image(SMALL_GIF));
        assert!(!is_image(b"plain text, not an image"));
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/");

        let first = storage.save_post_image("small.gif", SMALL_GIF).await.unwrap();
        let second = storage.save_post_image("small.gif", SMALL_GIF).await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));
        assert!(dir.path().join(&second).exists());
        assert_eq!(storage.url_prefix(), "/media");
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = format!("{}.gif", "a".repeat(300));
        let name = sanitize_file_name(&long);
        assert_eq!(name.len(), MAX_FILE_NAME_BYTES);
        assert!(name.ends_with("aaa.gif"));

        // multi-byte characters are never split
        let cyrillic = format!("{}.png", "ж".repeat(120));
        let name = sanitize_file_name(&cyrillic);
        assert!(name.len() <= MAX_FILE_NAME_BYTES);
        assert!(name.ends_with("ж.png"));

        assert_eq!(sanitize_file_name(&"b".repeat(150)).len(), MAX_FILE_NAME_BYTES);
    }

    #[tokio::test]
    async fn test_long_name_suffix_fits_column() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media");
        let long = format!("{}.gif", "c".repeat(400));

        let first = storage.save_post_image(&long, SMALL_GIF).await.unwrap();
        let second = storage.save_post_image(&long, SMALL_GIF).await.unwrap();

        assert_ne!(first, second);
        assert!(second.len() < 255);
        assert!(dir.path().join(&second).exists());
    }
}
