//! Staged cover files and their inline previews.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file selected for upload. Bytes are read lazily.
#[derive(Debug, Clone)]
pub struct AttachedFile {
    file_name: String,
    mime_type: Option<String>,
    source: FileSource,
}

impl AttachedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self {
            file_name,
            mime_type: None,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            source: FileSource::Memory(Arc::from(bytes.into())),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Explicit type if one was given, otherwise guessed from the file name.
    pub fn mime_type(&self) -> String {
        match &self.mime_type {
            Some(mime_type) => mime_type.clone(),
            None => mime_guess::from_path(Path::new(&self.file_name))
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Path(path) => tokio::fs::read(path).await,
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

pub async fn read_preview(file: &AttachedFile) -> io::Result<String> {
    let bytes = file.read().await?;
    Ok(data_uri(&file.mime_type(), &bytes))
}

/// Path under which the service serves a stored cover image.
pub fn stored_cover_path(upload_route_prefix: &str, cover_file_name: &str) -> String {
    format!(
        "{}/{}",
        upload_route_prefix.trim_end_matches('/'),
        cover_file_name.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_is_guessed_from_extension() {
        assert_eq!(AttachedFile::from_bytes("cover.png", vec![]).mime_type(), "image/png");
        assert_eq!(
            AttachedFile::from_bytes("cover", vec![]).mime_type(),
            "application/octet-stream"
        );
        assert_eq!(
            AttachedFile::from_bytes("cover", vec![])
                .with_mime_type("image/webp")
                .mime_type(),
            "image/webp"
        );
    }

    #[test]
    fn data_uri_is_base64_encoded() {
        assert_eq!(data_uri("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn stored_cover_path_joins_prefix() {
        assert_eq!(stored_cover_path("/Upload/", "dune.jpg"), "/Upload/dune.jpg");
        assert_eq!(stored_cover_path("/Upload", "dune.jpg"), "/Upload/dune.jpg");
    }

    #[tokio::test]
    async fn reads_preview_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "bookcart_preview_{}.jpg",
            std::process::id()
        ));
        tokio::fs::write(&path, b"jpeg").await.expect("write");

        let file = AttachedFile::from_path(&path);
        assert!(file.file_name().ends_with(".jpg"));
        let preview = read_preview(&file).await.expect("preview");
        assert_eq!(preview, "data:image/jpeg;base64,anBlZw==");

        tokio::fs::remove_file(path).await.expect("cleanup");
    }
}
