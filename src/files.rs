//! Checks applied to referenced files before they are sent upstream

use crate::error::{RelayError, Result};
use std::path::Path;

/// MIME type guessed from a file extension
///
/// Unknown extensions map to `application/octet-stream`.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "rb" | "php" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "go" => "text/x-go",
        "py" => "text/x-python",
        "java" => "text/x-java",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "hpp" => "text/x-c++",
        "rs" => "text/x-rust",
        "yaml" | "yml" => "text/x-yaml",
        "toml" => "text/x-toml",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Format a byte count as `512 B`, `1.5 KB`, `10.0 MB`
pub fn human_readable_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}

/// Size and type limits for referenced files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePolicy {
    pub max_file_size: u64,
    /// Permitted MIME types; empty allows every type
    pub allowed_types: Vec<String>,
}

impl FilePolicy {
    pub fn new(max_file_size: u64, allowed_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_types,
        }
    }

    /// Check that `path` is an existing regular file within the limits
    pub async fn check(&self, path: &str) -> Result<()> {
        let rejected = |reason: String| RelayError::FileRejected {
            path: path.to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| rejected(format!("file not found or not accessible: {}", e)))?;

        if metadata.is_dir() {
            return Err(rejected("path is a directory, not a file".to_string()));
        }

        if metadata.len() > self.max_file_size {
            return Err(rejected(format!(
                "file is too large ({}, limit {})",
                human_readable_size(metadata.len()),
                human_readable_size(self.max_file_size)
            )));
        }

        if !self.allowed_types.is_empty() {
            let mime = mime_type_for(Path::new(path));
            if !self.allowed_types.iter().any(|t| t == mime) {
                return Err(rejected(format!("file type not allowed: {}", mime)));
            }
        }

        Ok(())
    }

    /// Check every path, stopping at the first rejection
    pub async fn check_all(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            self.check(path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("notes.TXT")), "text/plain");
        assert_eq!(mime_type_for(Path::new("src/lib.rs")), "text/x-rust");
        assert_eq!(mime_type_for(Path::new("Cargo.toml")), "text/x-toml");
        assert_eq!(mime_type_for(Path::new("/bin/ls")), "application/octet-stream");
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(512), "512 B");
        assert_eq!(human_readable_size(1536), "1.5 KB");
        assert_eq!(human_readable_size(10 * 1024 * 1024), "10.0 MB");
    }

    #[tokio::test]
    async fn test_check_accepts_allowed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("review.md");
        std::fs::write(&path, "# notes").unwrap();

        let policy = FilePolicy::new(1024, vec!["text/markdown".to_string()]);
        policy.check(path.to_str().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_rejects_oversized_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'x'; 2048]).unwrap();

        let policy = FilePolicy::new(1024, Vec::new());
        let err = policy.check(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, RelayError::FileRejected { .. }));
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_check_rejects_disallowed_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let policy = FilePolicy::new(1024, vec!["text/plain".to_string()]);
        let err = policy.check(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_check_rejects_missing_and_directory() {
        let dir = tempdir().unwrap();
        let policy = FilePolicy::new(1024, Vec::new());

        let missing = dir.path().join("missing.txt");
        assert!(policy.check(missing.to_str().unwrap()).await.is_err());

        let err = policy.check(dir.path().to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("directory"));
    }
}
