//! Text recognition over normalized page bitmaps.
//!
//! Defines the [`OcrEngine`] trait so the recognizer can be driven by the
//! tesseract CLI in production and by scripted engines in tests, plus the
//! per-page outcome type [`PageRecognition`].

pub mod tesseract;

use std::sync::Arc;

use image::GrayImage;

/// One text region reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub text: String,
    /// Engine confidence in [0, 1], if it reported one.
    pub confidence: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("failed to prepare page image")]
    Scratch(#[from] std::io::Error),
    #[error("failed to encode page image")]
    Encode(#[from] image::ImageError),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Anything that can find text in a grayscale page.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    /// Detections in the engine's native order.
    fn detect(&self, page: &GrayImage) -> Result<Vec<Detection>, OcrError>;
}

/// Outcome of recognizing a single page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageRecognition {
    Recognized {
        text: String,
        confidence: Option<f64>,
    },
    /// The engine failed on this page. Counts as empty text.
    Failed { reason: String },
}

impl PageRecognition {
    pub fn text(&self) -> &str {
        match self {
            Self::Recognized { text, .. } => text,
            Self::Failed { .. } => "",
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Recognized { confidence, .. } => *confidence,
            Self::Failed { .. } => None,
        }
    }
}

/// Process-wide recognizer. The engine is constructed once at startup; `None`
/// means it could not be initialized.
#[derive(Clone)]
pub struct TextRecognizer {
    engine: Option<Arc<dyn OcrEngine>>,
}

impl TextRecognizer {
    pub fn new(engine: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { engine }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&dyn OcrEngine> {
        self.engine.as_deref()
    }
}

/// Run `engine` over one page and fold its detections into page text.
pub fn recognize_page(
    engine: &dyn OcrEngine,
    page: &GrayImage,
) -> Result<PageRecognition, OcrError> {
    let detections = engine.detect(page)?;
    Ok(summarize(&detections))
}

fn summarize(detections: &[Detection]) -> PageRecognition {
    let text = detections
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let confidences: Vec<f64> = detections
        .iter()
        .filter_map(|d| d.confidence)
        .filter(|c| c.is_finite())
        .collect();
    PageRecognition::Recognized {
        text,
        confidence: mean(&confidences),
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted engines for exercising the pipeline without tesseract.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays one scripted result per call, repeating the last one.
    pub struct ScriptedEngine {
        script: Vec<Result<Vec<Detection>, String>>,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        pub fn new(script: Vec<Result<Vec<Detection>, String>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        /// Every page yields the same single line of text.
        pub fn text(text: &str, confidence: Option<f64>) -> Self {
            Self::new(vec![Ok(vec![Detection {
                text: text.to_string(),
                confidence,
            }])])
        }

        pub fn failing(reason: &str) -> Self {
            Self::new(vec![Err(reason.to_string())])
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn detect(&self, _page: &GrayImage) -> Result<Vec<Detection>, OcrError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .script
                .get(call)
                .or_else(|| self.script.last())
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()));
            step.map_err(OcrError::Engine)
        }
    }
}
