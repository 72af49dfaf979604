//! Upload wire format shared by the admin client and the book service.
//!
//! A submission is a multipart payload with one part per attached file,
//! named `file0`, `file1`, ..., followed by a single JSON text part named
//! `bookFormData` carrying the form fields.

use serde::{Deserialize, Serialize};

use crate::domain::{BookId, Price};

pub const FILE_PART_PREFIX: &str = "file";
pub const FORM_DATA_PART: &str = "bookFormData";

/// Field mapping serialized into the `bookFormData` part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFormData {
    #[serde(default, skip_serializing_if = "BookId::is_unsaved")]
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Files plus serialized form fields for one create or update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBuffer {
    files: Vec<FilePart>,
    form_data: String,
}

impl UploadBuffer {
    pub fn new(form: &BookFormData) -> serde_json::Result<Self> {
        Ok(Self {
            files: Vec::new(),
            form_data: serde_json::to_string(form)?,
        })
    }

    /// Appends a file under the next indexed part name.
    pub fn push_file(
        &mut self,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> &FilePart {
        let name = format!("{FILE_PART_PREFIX}{}", self.files.len());
        self.files.push(FilePart {
            name,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        });
        &self.files[self.files.len() - 1]
    }

    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    pub fn form_data(&self) -> &str {
        &self.form_data
    }

    pub fn form(&self) -> serde_json::Result<BookFormData> {
        serde_json::from_str(&self.form_data)
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.files
            .iter()
            .map(|part| part.name.as_str())
            .chain(std::iter::once(FORM_DATA_PART))
            .collect()
    }

    pub fn total_file_bytes(&self) -> usize {
        self.files.iter().map(|part| part.bytes.len()).sum()
    }

    pub fn into_parts(self) -> (Vec<FilePart>, String) {
        (self.files, self.form_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> BookFormData {
        BookFormData {
            book_id: BookId(0),
            title: "Dune".into(),
            author: "Herbert".into(),
            category: "Sci-Fi".into(),
            price: Price::from_cents(1500),
        }
    }

    #[test]
    fn unsaved_book_id_is_left_out_of_form_data() {
        let buffer = UploadBuffer::new(&dune()).expect("buffer");
        let value: serde_json::Value = serde_json::from_str(buffer.form_data()).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Dune",
                "author": "Herbert",
                "category": "Sci-Fi",
                "price": 15
            })
        );
    }

    #[test]
    fn saved_book_id_is_sent() {
        let mut form = dune();
        form.book_id = BookId(42);
        let buffer = UploadBuffer::new(&form).expect("buffer");
        assert_eq!(buffer.form().expect("decode").book_id, BookId(42));
        assert!(buffer.form_data().contains("\"bookId\":42"));
    }

    #[test]
    fn files_get_indexed_part_names() {
        let mut buffer = UploadBuffer::new(&dune()).expect("buffer");
        buffer.push_file("front.png", "image/png", vec![1, 2, 3]);
        buffer.push_file("back.png", "image/png", vec![4]);

        assert_eq!(buffer.part_names(), vec!["file0", "file1", FORM_DATA_PART]);
        assert_eq!(buffer.total_file_bytes(), 4);
    }
}
