//! PDF rasterization through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tracing::{debug, info, warn};

const OUTPUT_PREFIX: &str = "page";

#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("failed to prepare scratch files")]
    Scratch(#[from] std::io::Error),
    #[error("failed to run {bin}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("pdftoppm failed: {0}")]
    Failed(String),
    #[error("rendered page {page} is not a readable image")]
    Decode {
        page: u32,
        #[source]
        source: image::ImageError,
    },
    #[error("document rendered to zero pages")]
    NoPages,
}

/// Turns PDF bytes into one bitmap per page, in page order.
pub trait PdfRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError>;
}

/// Renders pages with the `pdftoppm` binary from poppler-utils.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    bin: String,
}

impl PopplerRasterizer {
    /// Returns `None` when the binary cannot be executed.
    pub fn detect(bin: &str) -> Option<Self> {
        match Command::new(bin).arg("-v").output() {
            Ok(_) => {
                info!("PDF rasterizer available: {}", bin);
                Some(Self {
                    bin: bin.to_string(),
                })
            }
            Err(e) => {
                warn!("PDF rasterizer {} not usable: {}", bin, e);
                None
            }
        }
    }
}

impl PdfRasterizer for PopplerRasterizer {
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError> {
        let scratch = tempfile::tempdir()?;
        let pdf_path = scratch.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf)?;

        let output = Command::new(&self.bin)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(&pdf_path)
            .arg(scratch.path().join(OUTPUT_PREFIX))
            .output()
            .map_err(|source| RasterizeError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RasterizeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let rendered = collect_rendered_pages(scratch.path())?;
        debug!("pdftoppm rendered {} pages at {} dpi", rendered.len(), dpi);
        if rendered.is_empty() {
            return Err(RasterizeError::NoPages);
        }

        rendered
            .into_iter()
            .map(|(page, path)| {
                image::open(&path).map_err(|source| RasterizeError::Decode { page, source })
            })
            .collect()
    }
}

/// Find `page-N.png` files (N may be zero padded) sorted by page number.
fn collect_rendered_pages(dir: &Path) -> std::io::Result<Vec<(u32, PathBuf)>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(page) = rendered_page_number(&path) {
            pages.push((page, path));
        }
    }
    pages.sort_by_key(|(page, _)| *page);
    Ok(pages)
}

fn rendered_page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(OUTPUT_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}
