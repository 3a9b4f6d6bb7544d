//! Tesseract CLI engine.
//!
//! Each page is written to a scratch PNG and passed to `tesseract ... tsv`.
//! Word rows are grouped back into lines, which become the detections.

use std::process::Command;

use image::GrayImage;
use tracing::{info, warn};

use super::{mean, Detection, OcrEngine, OcrError};

/// TSV `level` column value for a single word.
const WORD_LEVEL: u32 = 5;

#[derive(Debug)]
pub struct TesseractEngine {
    bin: String,
    lang: String,
}

impl TesseractEngine {
    /// Probe the binary and check that `lang` is installed.
    pub fn initialize(bin: &str, lang: &str) -> Result<Self, OcrError> {
        let output = Command::new(bin)
            .arg("--list-langs")
            .output()
            .map_err(|e| {
                OcrError::Engine(format!("failed to run {} (is it installed?): {}", bin, e))
            })?;
        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "{} --list-langs failed: {}",
                bin,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // tesseract prints the list on stdout in recent versions, stderr in old ones
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let installed: Vec<&str> = listing.lines().map(str::trim).collect();
        for wanted in lang.split('+') {
            if !installed.contains(&wanted) {
                return Err(OcrError::Engine(format!(
                    "tesseract language '{}' is not installed",
                    wanted
                )));
            }
        }

        info!("Tesseract engine ready: {} (lang={})", bin, lang);
        Ok(Self {
            bin: bin.to_string(),
            lang: lang.to_string(),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn detect(&self, page: &GrayImage) -> Result<Vec<Detection>, OcrError> {
        let scratch = tempfile::Builder::new().suffix(".png").tempfile()?;
        page.save_with_format(scratch.path(), image::ImageFormat::Png)?;

        let output = Command::new(&self.bin)
            .arg(scratch.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("tsv")
            .output()
            .map_err(|e| OcrError::Engine(format!("failed to run {}: {}", self.bin, e)))?;

        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Group word rows into lines, keeping the order lines first appear in.
fn parse_tsv(tsv: &str) -> Vec<Detection> {
    // (page, block, paragraph, line) -> words with confidence 0..100
    let mut lines: Vec<((u32, u32, u32, u32), Vec<(String, f64)>)> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        if cols[0].parse::<u32>().ok() != Some(WORD_LEVEL) {
            continue;
        }
        let conf: f64 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        match lines.iter_mut().find(|(k, _)| *k == key) {
            Some((_, words)) => words.push((text.to_string(), conf)),
            None => lines.push((key, vec![(text.to_string(), conf)])),
        }
    }

    lines
        .into_iter()
        .map(|(_, words)| {
            let confs: Vec<f64> = words.iter().map(|(_, c)| c / 100.0).collect();
            Detection {
                text: words
                    .iter()
                    .map(|(w, _)| w.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                confidence: mean(&confs).map(|c| c.clamp(0.0, 1.0)),
            }
        })
        .collect()
}

/// Log and swallow an initialization failure; callers treat `None` as unavailable.
pub fn try_initialize(bin: &str, lang: &str) -> Option<TesseractEngine> {
    match TesseractEngine::initialize(bin, lang) {
        Ok(engine) => Some(engine),
        Err(e) => {
            warn!("OCR engine unavailable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn words_are_grouped_into_lines() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t90\tCertificate",
            "5\t1\t1\t1\t1\t2\t70\t10\t20\t20\t80\tof",
            "5\t1\t1\t1\t2\t1\t10\t40\t50\t20\t70\tCompletion",
        ]);
        let detections = parse_tsv(&input);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "Certificate of");
        assert!((detections[0].confidence.unwrap() - 0.85).abs() < 1e-9);
        assert_eq!(detections[1].text, "Completion");
        assert!((detections[1].confidence.unwrap() - 0.70).abs() < 1e-9);
    }

    #[test]
    fn line_order_follows_first_appearance() {
        let input = tsv(&[
            "5\t1\t2\t1\t1\t1\t0\t0\t1\t1\t50\tsecond-block",
            "5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t50\tfirst-block",
        ]);
        let texts: Vec<String> = parse_tsv(&input).into_iter().map(|d| d.text).collect();
        assert_eq!(texts, vec!["second-block", "first-block"]);
    }

    #[test]
    fn rows_without_confidence_or_text_are_skipped() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t-1\tghost",
            "5\t1\t1\t1\t1\t2\t0\t0\t1\t1\t95\t ",
            "5\t1\t1\t1\t1\t3",
        ]);
        assert!(parse_tsv(&input).is_empty());
    }

    #[test]
    fn missing_binary_fails_initialization() {
        assert!(TesseractEngine::initialize("/nonexistent/tesseract-binary", "eng").is_err());
        assert!(try_initialize("/nonexistent/tesseract-binary", "eng").is_none());
    }
}
