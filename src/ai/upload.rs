//! Local files headed for provider storage.

use super::mime::detect_media_mime;
use crate::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Wraps in-memory bytes, sniffing the content type from magic bytes.
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: detect_media_mime(&bytes).to_string(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidRequest(format!("Invalid upload path: {}", path.display()))
            })?
            .to_string();
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "Refusing to upload empty file: {}",
                path.display()
            )));
        }
        Ok(Self::from_bytes(&file_name, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_path_reads_name_and_sniffs_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portrait.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]).unwrap();

        let upload = UploadFile::from_path(&path).unwrap();
        assert_eq!(upload.file_name, "portrait.png");
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.bytes.len(), 6);
    }

    #[test]
    fn test_from_path_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::File::create(&path).unwrap();

        let err = UploadFile::from_path(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let err = UploadFile::from_path(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
