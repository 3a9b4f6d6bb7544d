//! Verification pipeline: pages -> normalize -> OCR -> heuristics.
//!
//! Synchronous by construction; the HTTP layer runs it on a blocking worker.
//! Pages are processed one after another.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::config::HeuristicConfig;
use crate::document::UploadedDocument;
use crate::error::{error_chain, VerifyError};
use crate::ocr::{self, PageRecognition, TextRecognizer};
use crate::pdf::{PdfRasterizer, RasterizeError};
use crate::preprocess;
use crate::schema::{VerificationResult, PAGE_SEPARATOR};
use crate::scoring;

/// Everything a request needs, built once at startup.
pub struct Verifier {
    recognizer: TextRecognizer,
    rasterizer: Option<Arc<dyn PdfRasterizer>>,
    heuristics: HeuristicConfig,
    pdf_dpi: u32,
}

impl Verifier {
    pub fn new(
        recognizer: TextRecognizer,
        rasterizer: Option<Arc<dyn PdfRasterizer>>,
        heuristics: HeuristicConfig,
        pdf_dpi: u32,
    ) -> Self {
        Self {
            recognizer,
            rasterizer,
            heuristics,
            pdf_dpi,
        }
    }

    pub fn ocr_available(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn pdf_available(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Run the whole pipeline for one upload.
    pub fn verify(&self, doc: &UploadedDocument) -> Result<VerificationResult, VerifyError> {
        let _span = tracing::info_span!("verify", file = %doc.file_name()).entered();
        let started = Instant::now();
        let is_pdf = doc.is_pdf();

        let pages = self.extract_pages(doc, is_pdf)?;
        let engine = self
            .recognizer
            .engine()
            .ok_or(VerifyError::RecognizerUnavailable)?;

        let page_total = pages.len();
        let mut recognitions = Vec::with_capacity(page_total);
        for (index, page) in pages.into_iter().enumerate() {
            let page_started = Instant::now();
            let normalized = preprocess::normalize(&page);
            drop(page);

            let recognition = match ocr::recognize_page(engine, &normalized) {
                Ok(recognition) => recognition,
                // Single images have nothing to fall back on.
                Err(e) if !is_pdf => return Err(VerifyError::Ocr(e)),
                Err(e) => PageRecognition::Failed {
                    reason: error_chain(&e),
                },
            };
            match &recognition {
                PageRecognition::Failed { reason } => {
                    warn!("OCR failed on page {}/{}: {}", index + 1, page_total, reason)
                }
                PageRecognition::Recognized { text, .. } => debug!(
                    "Page {}/{} recognized by {} in {:?} ({} chars)",
                    index + 1,
                    page_total,
                    engine.name(),
                    page_started.elapsed(),
                    text.chars().count()
                ),
            }
            recognitions.push(recognition);
        }

        let result = build_result(doc, &recognitions, &self.heuristics);
        info!(
            "Verified {} ({} pages, {} words, score {}) in {:?}",
            result.file_name,
            result.page_count,
            result.word_count,
            result.trust_score,
            started.elapsed()
        );
        Ok(result)
    }

    /// One bitmap per PDF page, or the single decoded image.
    fn extract_pages(
        &self,
        doc: &UploadedDocument,
        is_pdf: bool,
    ) -> Result<Vec<DynamicImage>, VerifyError> {
        if !is_pdf {
            let image = image::load_from_memory(doc.data()).map_err(VerifyError::ImageDecode)?;
            return Ok(vec![DynamicImage::ImageRgb8(image.to_rgb8())]);
        }

        let rasterizer = self
            .rasterizer
            .as_ref()
            .ok_or(VerifyError::RasterizerMissing)?;
        let pages = rasterizer
            .rasterize(doc.data(), self.pdf_dpi)
            .map_err(VerifyError::PdfConversion)?;
        if pages.is_empty() {
            return Err(VerifyError::PdfConversion(RasterizeError::NoPages));
        }
        debug!("Rasterized {} pages at {} dpi", pages.len(), self.pdf_dpi);
        Ok(pages)
    }
}

/// Join page texts, score them and assemble the response.
pub fn build_result(
    doc: &UploadedDocument,
    recognitions: &[PageRecognition],
    heuristics: &HeuristicConfig,
) -> VerificationResult {
    let full_text = recognitions
        .iter()
        .map(PageRecognition::text)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
        .trim()
        .to_string();

    let confidences: Vec<f64> = recognitions
        .iter()
        .filter_map(PageRecognition::confidence)
        .collect();

    let assessment = scoring::assess(&full_text, heuristics);

    VerificationResult {
        file_name: doc.file_name().to_string(),
        file_hash: doc.hash().to_string(),
        page_count: recognitions.len(),
        extracted_text_snippet: scoring::snippet(&full_text, heuristics.snippet_chars),
        full_text,
        word_count: assessment.word_count,
        detected_issuers: assessment.detected_issuers,
        has_dates: assessment.has_dates,
        avg_ocr_confidence: ocr::mean(&confidences),
        trust_score: assessment.trust_score,
    }
}

#[cfg(test)]
pub mod testing {
    //! Stub rasterizers and fixtures shared by pipeline and handler tests.

    use super::*;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    /// Renders a fixed number of blank pages.
    pub struct BlankPages(pub usize);

    impl PdfRasterizer for BlankPages {
        fn rasterize(&self, _pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError> {
            Ok((0..self.0)
                .map(|_| DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([255]))))
                .collect())
        }
    }

    /// Always fails like a crashed pdftoppm.
    pub struct BrokenRasterizer;

    impl PdfRasterizer for BrokenRasterizer {
        fn rasterize(&self, _pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError> {
            Err(RasterizeError::Failed("Syntax Error: Couldn't read xref table".to_string()))
        }
    }

    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, _| Luma([(x % 256) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    pub fn pdf_bytes() -> Vec<u8> {
        b"%PDF-1.4\n% fake document for tests\n".to_vec()
    }
}
