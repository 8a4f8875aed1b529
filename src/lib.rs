mod canvas;
mod error;
mod geometry;
mod input;
mod layout;
mod pdf;
mod pdfinspect;
mod raster;
mod types;

#[cfg(feature = "server")]
pub mod http;

pub use canvas::{Canvas, Command, Document, Page};
pub use error::CodeSheetError;
pub use geometry::{GridGeometry, PairedGeometry, SheetGeometry};
pub use input::{normalize, require_code128, require_digits};
pub use layout::{layout, resource_id};
pub use pdf::document_to_pdf;
pub use pdfinspect::{PdfInspectError, PdfInspectReport, inspect_pdf_bytes};
pub use raster::{
    Code128Rasterizer, CodeArtifact, CodeMode, CodeRasterizer, QrRasterizer, RasterOptions,
    rasterize_batch,
};
pub use types::{Margins, Pt, Size};

/// A validated sheet generator. Construct through [`CodeSheet::builder`];
/// `generate` runs the whole normalize, rasterize, layout, write pipeline.
#[derive(Debug)]
pub struct CodeSheet {
    mode: CodeMode,
    geometry: SheetGeometry,
    raster: RasterOptions,
    digits_only: bool,
}

pub struct CodeSheetBuilder {
    mode: CodeMode,
    geometry: SheetGeometry,
    raster: RasterOptions,
    digits_only: bool,
}

impl CodeSheet {
    pub fn builder() -> CodeSheetBuilder {
        CodeSheetBuilder::new()
    }

    pub fn mode(&self) -> CodeMode {
        self.mode
    }

    /// Runs the pipeline up to layout and returns the recorded document with
    /// its artifacts, for callers that replay into their own sink.
    pub fn generate_document(
        &self,
        raw: &str,
    ) -> Result<(Document, Vec<CodeArtifact>), CodeSheetError> {
        let tokens = input::normalize(raw)?;
        if self.digits_only {
            input::require_digits(&tokens)?;
        }
        if self.mode == CodeMode::Linear {
            input::require_code128(&tokens)?;
        }
        tracing::debug!(
            tokens = tokens.len(),
            mode = self.mode.as_wire(),
            "rasterizing batch"
        );
        let artifacts = raster::rasterize_batch(&tokens, self.mode, &self.raster)?;
        let document = layout::layout(&artifacts, self.mode, &self.geometry);
        Ok((document, artifacts))
    }

    pub fn generate(&self, raw: &str) -> Result<Vec<u8>, CodeSheetError> {
        let (document, artifacts) = self.generate_document(raw)?;
        let bytes = pdf::document_to_pdf(&document, &artifacts)?;
        tracing::info!(
            mode = self.mode.as_wire(),
            pages = document.pages.len(),
            bytes = bytes.len(),
            "document assembled"
        );
        Ok(bytes)
    }
}

impl CodeSheetBuilder {
    pub fn new() -> Self {
        Self {
            mode: CodeMode::Matrix,
            geometry: SheetGeometry::v1(),
            raster: RasterOptions::default(),
            digits_only: false,
        }
    }

    pub fn mode(mut self, mode: CodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn geometry(mut self, geometry: SheetGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn raster_options(mut self, options: RasterOptions) -> Self {
        self.raster = options;
        self
    }

    /// Reject tokens containing anything but ASCII digits. Off by default.
    pub fn digits_only(mut self, enabled: bool) -> Self {
        self.digits_only = enabled;
        self
    }

    pub fn build(self) -> Result<CodeSheet, CodeSheetError> {
        self.geometry.validate()?;
        Ok(CodeSheet {
            mode: self.mode,
            geometry: self.geometry,
            raster: self.raster,
            digits_only: self.digits_only,
        })
    }
}

impl Default for CodeSheetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_invalid_geometry() {
        let mut geometry = SheetGeometry::v1();
        geometry.grid.columns = 0;
        let err = CodeSheet::builder()
            .geometry(geometry)
            .build()
            .expect_err("must fail");
        assert!(matches!(err, CodeSheetError::InvalidGeometry(_)));
    }

    #[test]
    fn empty_input_fails_before_rasterization() {
        let sheet = CodeSheet::builder().build().expect("sheet");
        let err = sheet.generate(" \n \n").expect_err("must fail");
        assert!(matches!(err, CodeSheetError::Validation(_)));
    }

    #[test]
    fn matrix_pipeline_produces_a_parsable_pdf() {
        let sheet = CodeSheet::builder().build().expect("sheet");
        let bytes = sheet.generate("100\n200\n\n300").expect("pdf bytes");
        assert!(bytes.starts_with(b"%PDF"));
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn matrix_pipeline_paginates_past_a_full_page() {
        // Six columns by eight rows fit per default page.
        let sheet = CodeSheet::builder().build().expect("sheet");
        let full: String = (0..48).map(|n| format!("{n}\n")).collect();
        let report = inspect_pdf_bytes(&sheet.generate(&full).expect("pdf")).expect("inspect");
        assert_eq!(report.page_count, 1);
        let overflow: String = (0..49).map(|n| format!("{n}\n")).collect();
        let report = inspect_pdf_bytes(&sheet.generate(&overflow).expect("pdf")).expect("inspect");
        assert_eq!(report.page_count, 2);
    }

    #[test]
    fn linear_pipeline_handles_odd_counts() {
        let sheet = CodeSheet::builder()
            .mode(CodeMode::Linear)
            .build()
            .expect("sheet");
        let bytes = sheet.generate("A1\nB2\nC3").expect("pdf bytes");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn digits_only_rejects_mixed_tokens() {
        let sheet = CodeSheet::builder()
            .digits_only(true)
            .build()
            .expect("sheet");
        let err = sheet.generate("123\n12a").expect_err("must fail");
        assert!(matches!(err, CodeSheetError::Validation(_)));
        assert!(sheet.generate("123\n456").is_ok());
    }

    #[test]
    fn generation_is_deterministic_end_to_end() {
        let sheet = CodeSheet::builder().build().expect("sheet");
        let first = sheet.generate("100\n200\n300").expect("pdf bytes");
        let second = sheet.generate("100\n200\n300").expect("pdf bytes");
        assert_eq!(first, second);
    }
}
