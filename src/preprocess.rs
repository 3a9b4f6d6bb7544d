//! Page normalization ahead of OCR: grayscale, upscale, autocontrast.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

/// Pages whose longer side is below this are upscaled.
pub const MIN_DIMENSION: u32 = 1200;

/// Grayscale, upscale small pages by an integer factor, stretch contrast.
pub fn normalize(page: &DynamicImage) -> GrayImage {
    autocontrast(upscale(to_gray(page), MIN_DIMENSION))
}

/// ITU-R 601-2 luma in 16-bit fixed point, `L = 0.299 R + 0.587 G + 0.114 B`.
/// `to_luma8` uses Rec.709 weights instead.
fn to_gray(page: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = page {
        return gray.clone();
    }
    let rgb = page.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([luma as u8])
    })
}

/// Integer upscale so the longer side reaches at least `min_dim`.
fn upscale(gray: GrayImage, min_dim: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let longer = w.max(h);
    if longer == 0 || longer >= min_dim {
        return gray;
    }
    let factor = min_dim / longer + 1;
    imageops::resize(&gray, w * factor, h * factor, FilterType::CatmullRom)
}

/// Remap intensities so the darkest pixel is 0 and the brightest 255.
fn autocontrast(mut gray: GrayImage) -> GrayImage {
    let Some((min_px, max_px)) = gray
        .pixels()
        .map(|p| p[0])
        .fold(None, |acc: Option<(u8, u8)>, v| match acc {
            None => Some((v, v)),
            Some((mn, mx)) => Some((mn.min(v), mx.max(v))),
        })
    else {
        return gray;
    };

    if max_px == min_px {
        // Uniform image, nothing to stretch.
        return gray;
    }

    let range = (max_px - min_px) as u32;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let v = (v as u32).clamp(min_px as u32, max_px as u32);
        *slot = ((v - min_px as u32) * 255 / range) as u8;
    }
    for p in gray.pixels_mut() {
        p[0] = lut[p[0] as usize];
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    fn gray_gradient(width: u32, height: u32, lo: u8, hi: u8) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, _| {
            let span = (hi - lo) as u32;
            Luma([lo + (x * span / (width - 1).max(1)) as u8])
        })
    }

    #[test]
    fn small_page_is_upscaled_by_integer_factor() {
        // longer side 500 -> factor 1200 / 500 + 1 = 3
        let page = DynamicImage::ImageRgb8(RgbImage::from_pixel(500, 300, Rgb([10, 20, 30])));
        let out = normalize(&page);
        assert_eq!(out.dimensions(), (1500, 900));
    }

    #[test]
    fn exact_divisor_still_adds_one() {
        // 1200 / 600 = 2, plus one
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(600, 100, Luma([0])));
        assert_eq!(normalize(&page).dimensions(), (1800, 300));
    }

    #[test]
    fn large_page_keeps_its_size() {
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(1200, 40, Luma([7])));
        assert_eq!(normalize(&page).dimensions(), (1200, 40));
    }

    #[test]
    fn color_is_weighted_like_rec601() {
        let mut rgb = RgbImage::new(4, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 0, 255]));
        rgb.put_pixel(3, 0, Rgb([200, 200, 200]));
        let gray = to_gray(&DynamicImage::ImageRgb8(rgb));
        let values: Vec<u8> = gray.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![76, 150, 29, 200]);
    }

    #[test]
    fn autocontrast_stretches_to_full_range() {
        let out = autocontrast(gray_gradient(256, 2, 60, 180));
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn uniform_page_is_left_alone() {
        let out = autocontrast(GrayImage::from_pixel(8, 8, Luma([128])));
        assert!(out.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn empty_page_does_not_panic() {
        let page = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert_eq!(normalize(&page).dimensions(), (0, 0));
    }
}
