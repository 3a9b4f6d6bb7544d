//! The uploaded payload and its content identity.

use sha2::{Digest, Sha256};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Filename used when the multipart part does not declare one.
pub const DEFAULT_FILE_NAME: &str = "upload";

/// Raw upload as received by `/api/verify`.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    file_name: String,
    data: Vec<u8>,
    hash: String,
}

impl UploadedDocument {
    pub fn new(file_name: Option<&str>, data: Vec<u8>) -> Self {
        let file_name = file_name
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let hash = sha256_hex(&data);
        Self {
            file_name,
            data,
            hash,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Lowercase hex SHA-256 of the raw bytes.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// PDF if the name says so or the bytes start with the PDF signature.
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".pdf") || self.data.starts_with(PDF_MAGIC)
    }
}

/// SHA-256 of `data` as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
