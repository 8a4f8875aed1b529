use crate::canvas::{Canvas, Document};
use crate::geometry::SheetGeometry;
use crate::raster::{CodeArtifact, CodeMode};
use crate::types::Pt;

/// Content-stream name of the image embedded for the artifact at `index`.
/// Shared with the writer so placement records and resources line up.
pub fn resource_id(index: usize) -> String {
    format!("code_{}", index)
}

/// Places every artifact on a paginated sheet. Pure and deterministic: the
/// same artifacts and geometry always produce the same command stream. The
/// caller is expected to hold a validated geometry.
pub fn layout(artifacts: &[CodeArtifact], mode: CodeMode, geometry: &SheetGeometry) -> Document {
    let mut canvas = Canvas::new(geometry.page_size);
    match mode {
        CodeMode::Matrix => layout_single_grid(&mut canvas, artifacts, geometry),
        CodeMode::Linear => layout_paired_grid(&mut canvas, artifacts, geometry),
    }
    canvas.finish()
}

struct Cursor {
    x: Pt,
    y: Pt,
    col: u32,
}

fn layout_single_grid(canvas: &mut Canvas, artifacts: &[CodeArtifact], geometry: &SheetGeometry) {
    let grid = &geometry.grid;
    let columns = grid.columns as i32;
    let row_width = (grid.cell + grid.gap) * columns - grid.gap;
    let x_start = geometry.margins.left + (geometry.usable_width() - row_width) / 2;
    let y_limit = geometry.page_size.height - geometry.margins.bottom;
    let pad = grid.border_pad;

    let mut cursor = Cursor {
        x: x_start,
        y: geometry.margins.top,
        col: 0,
    };

    for (index, artifact) in artifacts.iter().enumerate() {
        let overflows = cursor.y + grid.cell + grid.label_advance > y_limit;
        // A cell that cannot fit even a fresh page is still placed rather
        // than looping on page breaks.
        if overflows && !canvas.is_current_empty() {
            canvas.show_page();
            cursor = Cursor {
                x: x_start,
                y: geometry.margins.top,
                col: 0,
            };
        }

        canvas.stroke_rect(
            cursor.x - pad,
            cursor.y - pad,
            grid.cell + pad * 2,
            grid.cell + pad * 2,
        );
        canvas.draw_image(cursor.x, cursor.y, grid.cell, grid.cell, resource_id(index));
        canvas.set_font_size(grid.label_font);
        canvas.draw_label(
            cursor.x,
            cursor.y + grid.cell + grid.label_offset,
            grid.cell,
            artifact.token.clone(),
        );

        cursor.col += 1;
        if cursor.col >= grid.columns {
            cursor.col = 0;
            cursor.x = x_start;
            cursor.y += grid.cell + grid.label_advance;
        } else {
            cursor.x += grid.cell + grid.gap;
        }
    }
}

fn layout_paired_grid(canvas: &mut Canvas, artifacts: &[CodeArtifact], geometry: &SheetGeometry) {
    let paired = &geometry.paired;
    let usable = geometry.usable_width();
    let code_band_left = usable * paired.bands[0];
    let label_band_left = usable * paired.bands[1];
    let code_band_right = usable * paired.bands[2];
    let label_band_right = usable * paired.bands[3];
    let pad = paired.border_pad;

    let mut y = geometry.margins.top;
    let mut row = 1u32;

    for (pair_index, pair) in artifacts.chunks(2).enumerate() {
        if row > paired.max_rows {
            canvas.show_page();
            y = geometry.margins.top;
            row = 1;
        }

        let left_index = pair_index * 2;
        let x_left = geometry.margins.left;
        canvas.stroke_rect(
            x_left - pad,
            y - pad,
            code_band_left + pad * 2,
            paired.bar_height + pad * 2,
        );
        canvas.draw_image(
            x_left,
            y,
            code_band_left,
            paired.bar_height,
            resource_id(left_index),
        );
        canvas.set_font_size(paired.label_font);
        canvas.draw_label(
            x_left + code_band_left,
            y + paired.label_offset,
            label_band_left,
            pair[0].token.clone(),
        );

        // An odd tail leaves the right slot empty.
        if let Some(right) = pair.get(1) {
            let x_right = geometry.margins.left + code_band_left + label_band_left;
            canvas.stroke_rect(
                x_right - pad,
                y - pad,
                code_band_right + pad * 2,
                paired.bar_height + pad * 2,
            );
            canvas.draw_image(
                x_right,
                y,
                code_band_right,
                paired.bar_height,
                resource_id(left_index + 1),
            );
            canvas.set_font_size(paired.label_font);
            canvas.draw_label(
                x_right + code_band_right,
                y + paired.label_offset,
                label_band_right,
                right.token.clone(),
            );
        }

        y += paired.bar_height + paired.gap_y;
        row += 1;
    }
}
