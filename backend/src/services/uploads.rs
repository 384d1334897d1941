//! Customer and staff document uploads

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "pdf"];

/// Public route uploads are served under
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Name suffixes tried before giving up on a crowded millisecond
const MAX_NAME_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadedFile {
    pub id: String,
    pub filename: String,
    pub ext: String,
    pub url: String,
}

/// Reduce a client file name to a safe, flat ASCII name. Path separators
/// become spaces, runs of whitespace become `_`, and leading dots and
/// underscores are dropped. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let flattened: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .filter(char::is_ascii)
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).trim_end_matches(['.', '_']).to_string()
}

/// `name` with `_{n}` inserted before the extension; attempt 0 is `name`
fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, attempt, ext),
        None => format!("{}_{}", name, attempt),
    }
}

/// Lowercased extension when it is one we accept
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Debug, Clone)]
pub struct UploadService {
    dir: PathBuf,
}

impl UploadService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store one uploaded file under a millisecond-timestamped name
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<UploadedFile> {
        let Some(ext) = allowed_extension(original_name) else {
            return Err(AppError::ValidationError(format!(
                "Unsupported file type: {}",
                original_name
            )));
        };
        let safe = secure_filename(original_name);
        let safe = if safe.is_empty() || allowed_extension(&safe).is_none() {
            format!("upload.{}", ext)
        } else {
            safe
        };
        let unique_name = format!("{}_{}", Utc::now().timestamp_millis(), safe);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;
        let (unique_name, mut file) = self.create_unique(&unique_name).await?;
        file.write_all(bytes)
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        tracing::info!("Stored upload {} ({} bytes)", unique_name, bytes.len());

        Ok(UploadedFile {
            url: format!("{}/{}", UPLOADS_ROUTE, unique_name),
            id: unique_name.clone(),
            filename: unique_name,
            ext,
        })
    }

    /// Create a file that did not exist before, numbering the name when two
    /// uploads land on the same one.
    async fn create_unique(&self, name: &str) -> AppResult<(String, File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = numbered_name(name, attempt);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&candidate))
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(AppError::StorageError(e.to_string())),
            }
        }
        Err(AppError::StorageError(format!("No free upload name for {}", name)))
    }

    /// Map upload ids back to files inside the upload directory. Ids are
    /// sanitized first, so they cannot point outside it.
    pub async fn resolve(&self, ids: &[String]) -> AppResult<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(ids.len());
        for id in ids {
            let name = secure_filename(id);
            let path = self.dir.join(&name);
            let is_file = !name.is_empty()
                && tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false);
            if !is_file {
                return Err(AppError::ValidationError(format!("File not found: {}", id)));
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Plan (v2).pdf"), "My_Plan_v2.pdf");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("..\\secret.png"), "secret.png");
        assert_eq!(secure_filename("résumé.jpg"), "rsum.jpg");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("site.JPG"), Some("jpg".to_string()));
        assert_eq!(allowed_extension("bill.pdf"), Some("pdf".to_string()));
        assert_eq!(allowed_extension("script.sh"), None);
        assert_eq!(allowed_extension("noext"), None);
    }

    #[tokio::test]
    async fn test_save_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(dir.path());

        let saved = service.save("Floor Plan.PNG", b"png-bytes").await.unwrap();
        assert!(saved.id.ends_with("_Floor_Plan.PNG"));
        assert_eq!(saved.ext, "png");
        assert_eq!(saved.url, format!("/uploads/{}", saved.id));

        let paths = service.resolve(&[saved.id.clone()]).await.unwrap();
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"png-bytes");

        let err = service.resolve(&["missing.png".to_string()]).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let escape = service.resolve(&["../Cargo.toml".to_string()]).await;
        assert!(escape.is_err());
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("1_plan.pdf", 0), "1_plan.pdf");
        assert_eq!(numbered_name("1_plan.pdf", 2), "1_plan_2.pdf");
        assert_eq!(numbered_name("1_a.b.png", 1), "1_a.b_1.png");
    }

    #[tokio::test]
    async fn test_same_name_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(dir.path());

        let (first, second) = tokio::join!(
            service.save("receipt.jpg", b"first"),
            service.save("receipt.jpg", b"second"),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first.id, second.id);

        let paths = service.resolve(&[first.id, second.id]).await.unwrap();
        let mut contents: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        contents.sort();
        assert_eq!(contents, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_existing_name_gets_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(dir.path());
        std::fs::write(dir.path().join("9_bill.pdf"), b"old").unwrap();

        let (name, _) = service.create_unique("9_bill.pdf").await.unwrap();
        assert_eq!(name, "9_bill_1.pdf");
        assert_eq!(std::fs::read(dir.path().join("9_bill.pdf")).unwrap(), b"old");
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(dir.path());
        let result = tokio_test::block_on(service.save("notes.txt", b"x"));
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
