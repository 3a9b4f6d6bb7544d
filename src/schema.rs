//! Response types for the verification API.

use serde::{Deserialize, Serialize};

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n---PAGE---\n\n";

/// Verdict returned by `POST /api/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub file_name: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub file_hash: String,
    pub page_count: usize,
    pub full_text: String,
    pub extracted_text_snippet: String,
    pub word_count: usize,
    pub detected_issuers: Vec<String>,
    pub has_dates: bool,
    /// Mean of the per-page confidences that exist; `null` when none do.
    pub avg_ocr_confidence: Option<f64>,
    pub trust_score: u8,
}

/// Liveness plus which external tools were found at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub ocr_available: bool,
    pub pdf_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_confidence_serializes_as_null() {
        let result = VerificationResult {
            file_name: "a.png".to_string(),
            file_hash: "00".to_string(),
            page_count: 1,
            full_text: String::new(),
            extracted_text_snippet: String::new(),
            word_count: 0,
            detected_issuers: vec![],
            has_dates: false,
            avg_ocr_confidence: None,
            trust_score: 30,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["avg_ocr_confidence"].is_null());
        assert_eq!(json["trust_score"], 30);
        assert_eq!(json.as_object().unwrap().len(), 10);
    }
}
