use crate::error::CodeSheetError;
use crate::types::{Margins, Pt, Size};

/// Layout parameters for the single-grid (matrix code) strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Side length of the square code cell.
    pub cell: Pt,
    /// Horizontal and vertical spacing between cells.
    pub gap: Pt,
    pub columns: u32,
    /// Vertical space consumed below each cell for its label row.
    pub label_advance: Pt,
    /// Distance from the cell bottom to the label top.
    pub label_offset: Pt,
    pub label_font: Pt,
    /// Border rect inflation around the cell.
    pub border_pad: Pt,
}

/// Layout parameters for the paired-grid (linear code) strategy. Each row
/// holds up to two code/label pairs in four proportional bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedGeometry {
    /// Fractions of the usable width for code, label, code, label.
    pub bands: [f32; 4],
    pub bar_height: Pt,
    /// Vertical spacing between rows.
    pub gap_y: Pt,
    pub max_rows: u32,
    pub label_font: Pt,
    /// Distance from the row top to the label baseline anchor.
    pub label_offset: Pt,
    pub border_pad: Pt,
}

/// Versioned page geometry. All tunables are explicit; `v1` carries the
/// production defaults. Construct, adjust fields, then let the builder
/// validate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetGeometry {
    pub page_size: Size,
    pub margins: Margins,
    pub grid: GridGeometry,
    pub paired: PairedGeometry,
}

impl SheetGeometry {
    pub fn v1() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all(20.0),
            grid: GridGeometry {
                cell: Pt::from_i32(70),
                gap: Pt::from_i32(20),
                columns: 6,
                label_advance: Pt::from_i32(30),
                label_offset: Pt::from_i32(5),
                label_font: Pt::from_i32(8),
                border_pad: Pt::from_i32(2),
            },
            paired: PairedGeometry {
                bands: [0.3, 0.2, 0.3, 0.2],
                bar_height: Pt::from_i32(40),
                gap_y: Pt::from_i32(20),
                max_rows: 13,
                label_font: Pt::from_i32(10),
                label_offset: Pt::from_i32(12),
                border_pad: Pt::from_i32(2),
            },
        }
    }

    pub fn usable_width(&self) -> Pt {
        self.page_size.width - self.margins.left - self.margins.right
    }

    pub fn usable_height(&self) -> Pt {
        self.page_size.height - self.margins.top - self.margins.bottom
    }

    /// Checks every structural invariant once, at build time. Violations are
    /// configuration defects, never per-request errors.
    pub fn validate(&self) -> Result<(), CodeSheetError> {
        if self.usable_width() <= Pt::ZERO || self.usable_height() <= Pt::ZERO {
            return Err(CodeSheetError::InvalidGeometry(
                "margins leave no usable page area".to_string(),
            ));
        }
        if self.grid.columns < 1 {
            return Err(CodeSheetError::InvalidGeometry(
                "grid requires at least one column".to_string(),
            ));
        }
        if self.grid.cell <= Pt::ZERO {
            return Err(CodeSheetError::InvalidGeometry(
                "grid cell size must be positive".to_string(),
            ));
        }
        let row_width = (self.grid.cell + self.grid.gap) * (self.grid.columns as i32)
            - self.grid.gap;
        if row_width > self.usable_width() {
            return Err(CodeSheetError::InvalidGeometry(format!(
                "{} columns of {}pt cells exceed the usable width",
                self.grid.columns,
                self.grid.cell.to_f32()
            )));
        }
        if self.paired.max_rows < 1 {
            return Err(CodeSheetError::InvalidGeometry(
                "paired layout requires at least one row per page".to_string(),
            ));
        }
        if self.paired.bar_height <= Pt::ZERO {
            return Err(CodeSheetError::InvalidGeometry(
                "bar height must be positive".to_string(),
            ));
        }
        let mut band_sum = 0.0f32;
        for band in self.paired.bands {
            if !(band > 0.0) {
                return Err(CodeSheetError::InvalidGeometry(
                    "band fractions must be strictly positive".to_string(),
                ));
            }
            band_sum += band;
        }
        if band_sum > 1.0 + 1e-6 {
            return Err(CodeSheetError::InvalidGeometry(
                "band fractions exceed the usable width".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SheetGeometry {
    fn default() -> Self {
        Self::v1()
    }
}
