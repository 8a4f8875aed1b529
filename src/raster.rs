use crate::error::CodeSheetError;
use barcoders::sym::code128::Code128;
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use rayon::prelude::*;

const DARK: Luma<u8> = Luma([0u8]);
const LIGHT: Luma<u8> = Luma([255u8]);

/// Which kind of scannable code a sheet renders. The mode also selects the
/// placement strategy: matrix codes flow through the single grid, linear codes
/// through the paired grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeMode {
    Matrix,
    Linear,
}

impl CodeMode {
    pub fn from_wire(value: &str) -> Option<CodeMode> {
        match value {
            "qrcode" => Some(CodeMode::Matrix),
            "barcode" => Some(CodeMode::Linear),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            CodeMode::Matrix => "qrcode",
            CodeMode::Linear => "barcode",
        }
    }

    pub fn download_filename(self) -> &'static str {
        match self {
            CodeMode::Matrix => "qrcode_codes.pdf",
            CodeMode::Linear => "barcode_codes.pdf",
        }
    }
}

/// A token together with its rasterized code. The raster is an exclusive
/// 8-bit grayscale buffer; layout never reads the pixels, only the writer does.
#[derive(Debug, Clone)]
pub struct CodeArtifact {
    pub token: String,
    pub image: GrayImage,
}

/// Pixel-level tuning for the rasterizers. Logical placement sizes live in
/// `SheetGeometry`; these only control the embedded image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Approximate edge length of the matrix raster in pixels.
    pub qr_target_px: u32,
    /// Pixels per linear module.
    pub bar_module_px: u32,
    /// Height of the linear raster in pixels.
    pub bar_height_px: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            qr_target_px: 120,
            bar_module_px: 3,
            bar_height_px: 60,
        }
    }
}

pub trait CodeRasterizer: Sync {
    fn rasterize(&self, token: &str) -> Result<GrayImage, CodeSheetError>;
}

/// QR rasterizer: error correction level M, one-module quiet zone, scaled up
/// to roughly the target pixel width.
pub struct QrRasterizer {
    target_px: u32,
}

impl QrRasterizer {
    pub fn new(target_px: u32) -> Self {
        Self {
            target_px: target_px.max(1),
        }
    }

    pub fn from_options(options: &RasterOptions) -> Self {
        Self::new(options.qr_target_px)
    }
}

impl CodeRasterizer for QrRasterizer {
    fn rasterize(&self, token: &str) -> Result<GrayImage, CodeSheetError> {
        let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::M)
            .map_err(|err| CodeSheetError::Render(format!("qr encode {:?}: {}", token, err)))?;
        let modules = code.to_colors();
        let width = code.width();
        // One quiet module on every side.
        let quiet = 1u32;
        let total = width as u32 + 2 * quiet;
        let scale = (self.target_px / total).max(1);
        let edge = total * scale;
        let mut image = GrayImage::from_pixel(edge, edge, LIGHT);
        for my in 0..width {
            for mx in 0..width {
                if modules[my * width + mx] == qrcode::Color::Dark {
                    let px0 = (mx as u32 + quiet) * scale;
                    let py0 = (my as u32 + quiet) * scale;
                    for py in py0..py0 + scale {
                        for px in px0..px0 + scale {
                            image.put_pixel(px, py, DARK);
                        }
                    }
                }
            }
        }
        Ok(image)
    }
}

/// Code 128 rasterizer using charset B, which covers the full printable ASCII
/// range.
pub struct Code128Rasterizer {
    module_px: u32,
    height_px: u32,
}

impl Code128Rasterizer {
    pub fn new(module_px: u32, height_px: u32) -> Self {
        Self {
            module_px: module_px.max(1),
            height_px: height_px.max(1),
        }
    }

    pub fn from_options(options: &RasterOptions) -> Self {
        Self::new(options.bar_module_px, options.bar_height_px)
    }
}

impl CodeRasterizer for Code128Rasterizer {
    fn rasterize(&self, token: &str) -> Result<GrayImage, CodeSheetError> {
        // The leading character selects charset B.
        let code = Code128::new(format!("\u{0181}{}", token))
            .map_err(|err| CodeSheetError::Render(format!("code128 encode {:?}: {}", token, err)))?;
        let bars = code.encode();
        let width = bars.len() as u32 * self.module_px;
        let mut image = GrayImage::from_pixel(width, self.height_px, LIGHT);
        for (index, bar) in bars.iter().enumerate() {
            if *bar == 1 {
                let px0 = index as u32 * self.module_px;
                for px in px0..px0 + self.module_px {
                    for py in 0..self.height_px {
                        image.put_pixel(px, py, DARK);
                    }
                }
            }
        }
        Ok(image)
    }
}

/// Rasterizes every token in parallel. Results are index-aligned with the
/// input order, and any single failure aborts the whole batch.
pub fn rasterize_batch(
    tokens: &[String],
    mode: CodeMode,
    options: &RasterOptions,
) -> Result<Vec<CodeArtifact>, CodeSheetError> {
    let rasterizer: Box<dyn CodeRasterizer> = match mode {
        CodeMode::Matrix => Box::new(QrRasterizer::from_options(options)),
        CodeMode::Linear => Box::new(Code128Rasterizer::from_options(options)),
    };
    tokens
        .par_iter()
        .map(|token| {
            let image = rasterizer.rasterize(token)?;
            Ok(CodeArtifact {
                token: token.clone(),
                image,
            })
        })
        .collect()
}
