use crate::canvas::{Command, Document, Page};
use crate::error::CodeSheetError;
use crate::layout::resource_id;
use crate::raster::CodeArtifact;
use crate::types::{Pt, Size};
use image::GrayImage;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const PDF_FONT_ID: usize = 4;

const LABEL_FONT_RESOURCE: &str = "F1";
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Replays a recorded `Document` into PDF bytes. Single shared resources
/// dictionary, Helvetica labels, grayscale Flate image XObjects deduplicated
/// by content. Output is fully deterministic for identical inputs.
pub fn document_to_pdf(
    document: &Document,
    artifacts: &[CodeArtifact],
) -> Result<Vec<u8>, CodeSheetError> {
    let mut images: HashMap<String, &GrayImage> = HashMap::new();
    for (index, artifact) in artifacts.iter().enumerate() {
        images.insert(resource_id(index), &artifact.image);
    }
    let mut writer = PdfStreamWriter::new(document.page_size, images)?;
    for page in &document.pages {
        writer.add_page(page)?;
    }
    writer.finish()
}

struct PdfStreamWriter<'a> {
    out: Vec<u8>,
    offsets: Vec<usize>, // index by object id; 0 is the free object.
    next_id: usize,
    page_size: Size,
    images: HashMap<String, &'a GrayImage>,
    image_resources: Vec<(String, usize)>,
    image_name_map: HashMap<String, String>,
    image_content_map: HashMap<u64, String>,
    next_image_index: usize,
    page_ids: Vec<usize>,
}

impl<'a> PdfStreamWriter<'a> {
    fn new(page_size: Size, images: HashMap<String, &'a GrayImage>) -> Result<Self, CodeSheetError> {
        let mut s = Self {
            out: Vec::new(),
            offsets: vec![0; PDF_FONT_ID + 1],
            next_id: PDF_FONT_ID + 1,
            page_size,
            images,
            image_resources: Vec::new(),
            image_name_map: HashMap::new(),
            image_content_map: HashMap::new(),
            next_image_index: 1,
            page_ids: Vec::new(),
        };
        s.write_bytes(b"%PDF-1.7\n")?;
        s.write_bytes(b"%\xE2\xE3\xCF\xD3\n")?;
        s.write_object(
            PDF_FONT_ID,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        )?;
        Ok(s)
    }

    fn add_page(&mut self, page: &Page) -> Result<(), CodeSheetError> {
        let content_stream = self.render_commands(&page.commands)?;
        let content_id = self.alloc_id();
        self.write_object(content_id, &stream_object(&content_stream))?;
        let page_id = self.alloc_id();
        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(self.page_size.width),
            fmt_pt(self.page_size.height),
            PDF_RESOURCES_ID,
            content_id
        );
        self.write_object(page_id, &page_obj)?;
        self.page_ids.push(page_id);
        Ok(())
    }

    fn render_commands(&mut self, commands: &[Command]) -> Result<String, CodeSheetError> {
        let page_height = self.page_size.height;
        let mut current_font_size = Pt::from_f32(DEFAULT_FONT_SIZE);
        let mut out = String::new();
        for command in commands {
            match command {
                Command::SetFontSize(size) => {
                    current_font_size = *size;
                }
                Command::StrokeRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    let draw_y = page_height - *y - *height;
                    out.push_str(&format!(
                        "{} {} {} {} re\nS\n",
                        fmt_pt(*x),
                        fmt_pt(draw_y),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource_id,
                } => {
                    let name = self.ensure_image(resource_id)?;
                    let draw_y = page_height - *y - *height;
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(draw_y)
                    ));
                    out.push_str(&format!("/{} Do\n", name));
                    out.push_str("Q\n");
                }
                Command::DrawLabel { x, y, width, text } => {
                    let text_width = helvetica_text_width(text, current_font_size);
                    let tx = *x + (*width - text_width) / 2;
                    let ty = page_height - *y - current_font_size;
                    out.push_str("BT\n");
                    out.push_str(&format!(
                        "/{} {} Tf\n",
                        LABEL_FONT_RESOURCE,
                        fmt_pt(current_font_size)
                    ));
                    out.push_str(&format!("{} {} Td\n", fmt_pt(tx), fmt_pt(ty)));
                    out.push_str(&format!("({}) Tj\n", encode_pdf_text(text)));
                    out.push_str("ET\n");
                }
            }
        }
        Ok(out)
    }

    /// Writes the image XObject for this placement if its pixels have not
    /// been embedded yet, and returns the content-stream resource name.
    /// Identical rasters share one object regardless of placement id.
    fn ensure_image(&mut self, resource_id: &str) -> Result<String, CodeSheetError> {
        if let Some(name) = self.image_name_map.get(resource_id) {
            return Ok(name.clone());
        }
        let image = self.images.get(resource_id).copied().ok_or_else(|| {
            CodeSheetError::Assembly(format!("no raster registered for {}", resource_id))
        })?;
        let content_hash = hash_bytes(image.as_raw());
        if let Some(name) = self.image_content_map.get(&content_hash) {
            let name = name.clone();
            self.image_name_map
                .insert(resource_id.to_string(), name.clone());
            return Ok(name);
        }
        let name = format!("Im{}", self.next_image_index);
        self.next_image_index += 1;
        let obj_id = self.alloc_id();
        self.write_object(obj_id, &gray_image_object(image))?;
        self.image_resources.push((name.clone(), obj_id));
        self.image_name_map
            .insert(resource_id.to_string(), name.clone());
        self.image_content_map.insert(content_hash, name.clone());
        Ok(name)
    }

    fn finish(mut self) -> Result<Vec<u8>, CodeSheetError> {
        // Shared resources, page tree, catalog.
        let mut resources = format!("<< /Font << /{} {} 0 R >>", LABEL_FONT_RESOURCE, PDF_FONT_ID);
        if !self.image_resources.is_empty() {
            let entries = self
                .image_resources
                .iter()
                .map(|(name, id)| format!("/{} {} 0 R", name, id))
                .collect::<Vec<_>>()
                .join(" ");
            resources.push_str(&format!(" /XObject << {} >>", entries));
        }
        resources.push_str(" >>");
        self.write_object(PDF_RESOURCES_ID, &resources)?;

        let kids = self
            .page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        self.write_object(
            PDF_PAGES_ID,
            &format!(
                "<< /Type /Pages /Count {} /Kids [{}] >>",
                self.page_ids.len(),
                kids
            ),
        )?;
        self.write_object(
            PDF_CATALOG_ID,
            &format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID),
        )?;

        // XRef + trailer. The document id is a hash of everything written so
        // far, which keeps identical inputs byte-identical.
        let total_objects = self.next_id - 1;
        let xref_start = self.out.len();
        let mut tail = format!("xref\n0 {}\n", total_objects + 1);
        tail.push_str("0000000000 65535 f \n");
        for id in 1..=total_objects {
            let obj_offset = self.offsets.get(id).copied().unwrap_or(0);
            tail.push_str(&format!("{:010} 00000 n \n", obj_offset));
        }
        self.write_bytes(tail.as_bytes())?;

        let digest = Sha256::digest(&self.out);
        let id_hex: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
        let trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R /ID [<{}> <{}>] >>\nstartxref\n{}\n%%EOF",
            total_objects + 1,
            PDF_CATALOG_ID,
            id_hex,
            id_hex,
            xref_start
        );
        self.write_bytes(trailer.as_bytes())?;
        Ok(self.out)
    }

    fn alloc_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        if self.offsets.len() < self.next_id {
            self.offsets.resize(self.next_id, 0);
        }
        id
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> Result<(), CodeSheetError> {
        if let Some(slot) = self.offsets.get_mut(obj_id) {
            *slot = self.out.len();
        }
        self.write_bytes(format!("{} 0 obj\n", obj_id).as_bytes())?;
        self.write_bytes(body.as_bytes())?;
        self.write_bytes(b"\nendobj\n")?;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), CodeSheetError> {
        self.out.write_all(data)?;
        Ok(())
    }
}

fn stream_object(content: &str) -> String {
    let length = content.as_bytes().len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn gray_image_object(image: &GrayImage) -> String {
    let compressed = flate_compress(image.as_raw());
    let stream_data = encode_stream_data(&compressed);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>
stream
{}
endstream",
        image.width(),
        image.height(),
        stream_data.as_bytes().len(),
        stream_data
    )
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = String::with_capacity(data.len() * 2 + 1);
    for byte in data {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex.push('>');
    hex
}

fn hash_bytes(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// Standard Helvetica advance widths in thousandths of the font size, for
/// the printable ASCII range 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20..
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30..
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40..
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50..
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60..
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70..0x7E
];

fn helvetica_char_width(ch: char) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        HELVETICA_WIDTHS[(code - 0x20) as usize]
    } else {
        // Out-of-range characters render as '?'.
        HELVETICA_WIDTHS[('?' as u32 - 0x20) as usize]
    }
}

fn helvetica_text_width(text: &str, font_size: Pt) -> Pt {
    let mut total_millis: i64 = 0;
    for ch in text.chars() {
        total_millis += helvetica_char_width(ch) as i64;
    }
    // widths are per-mille of the font size
    Pt::from_milli_i64((font_size.to_milli_i64() * total_millis + 500) / 1000)
}

fn encode_pdf_text(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        let code = ch as u32;
        let ch = if (0x20..=0x7e).contains(&code) { ch } else { '?' };
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            _ => out.push(ch),
        }
    }
    out
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use image::Luma;

    fn checker(seed: u8) -> GrayImage {
        GrayImage::from_fn(4, 4, |x, y| {
            if (x + y as u32 + seed as u32) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    fn one_image_document() -> (Document, Vec<CodeArtifact>) {
        let mut canvas = Canvas::new(Size::a4());
        canvas.stroke_rect(
            Pt::from_i32(18),
            Pt::from_i32(18),
            Pt::from_i32(74),
            Pt::from_i32(74),
        );
        canvas.draw_image(
            Pt::from_i32(20),
            Pt::from_i32(20),
            Pt::from_i32(70),
            Pt::from_i32(70),
            resource_id(0),
        );
        canvas.set_font_size(Pt::from_i32(8));
        canvas.draw_label(
            Pt::from_i32(20),
            Pt::from_i32(95),
            Pt::from_i32(70),
            "100".to_string(),
        );
        let artifacts = vec![CodeArtifact {
            token: "100".to_string(),
            image: checker(0),
        }];
        (canvas.finish(), artifacts)
    }

    #[test]
    fn produces_pdf_magic_and_structure() {
        let (doc, artifacts) = one_image_document();
        let bytes = document_to_pdf(&doc, &artifacts).expect("pdf bytes");
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Image"));
        assert!(text.contains("/ColorSpace /DeviceGray"));
        assert!(text.contains("FlateDecode"));
        assert!(text.contains("(100) Tj"));
        assert!(text.contains("re\nS"));
        assert!(text.ends_with("%%EOF"));
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let (doc, artifacts) = one_image_document();
        let first = document_to_pdf(&doc, &artifacts).expect("pdf bytes");
        let second = document_to_pdf(&doc, &artifacts).expect("pdf bytes");
        assert_eq!(first, second);
    }

    #[test]
    fn identical_rasters_share_one_xobject() {
        let mut canvas = Canvas::new(Size::a4());
        for index in 0..2 {
            canvas.draw_image(
                Pt::from_i32(20 + index * 90),
                Pt::from_i32(20),
                Pt::from_i32(70),
                Pt::from_i32(70),
                resource_id(index as usize),
            );
        }
        let doc = canvas.finish();
        let artifacts = vec![
            CodeArtifact {
                token: "a".to_string(),
                image: checker(0),
            },
            CodeArtifact {
                token: "a".to_string(),
                image: checker(0),
            },
        ];
        let bytes = document_to_pdf(&doc, &artifacts).expect("pdf bytes");
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Image").count(), 1);
        assert_eq!(text.matches("/Im1 Do").count(), 2);
    }

    #[test]
    fn distinct_rasters_get_distinct_xobjects() {
        let mut canvas = Canvas::new(Size::a4());
        for index in 0..2 {
            canvas.draw_image(
                Pt::from_i32(20 + index * 90),
                Pt::from_i32(20),
                Pt::from_i32(70),
                Pt::from_i32(70),
                resource_id(index as usize),
            );
        }
        let doc = canvas.finish();
        let artifacts = vec![
            CodeArtifact {
                token: "a".to_string(),
                image: checker(0),
            },
            CodeArtifact {
                token: "b".to_string(),
                image: checker(1),
            },
        ];
        let bytes = document_to_pdf(&doc, &artifacts).expect("pdf bytes");
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Image").count(), 2);
    }

    #[test]
    fn missing_raster_is_an_assembly_error() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_image(
            Pt::from_i32(20),
            Pt::from_i32(20),
            Pt::from_i32(70),
            Pt::from_i32(70),
            resource_id(7),
        );
        let doc = canvas.finish();
        let err = document_to_pdf(&doc, &[]).expect_err("must fail");
        assert!(matches!(err, CodeSheetError::Assembly(_)));
    }

    #[test]
    fn helvetica_width_of_digits() {
        let width = helvetica_text_width("100", Pt::from_i32(8));
        assert_eq!(width.to_milli_i64(), 13_344);
    }

    #[test]
    fn pdf_text_escapes_delimiters_and_replaces_non_ascii() {
        assert_eq!(encode_pdf_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(encode_pdf_text("caf\u{e9}"), "caf?");
    }

    #[test]
    fn milli_formatting_trims_trailing_zeros() {
        assert_eq!(fmt_pt(Pt::from_f32(595.28)), "595.28");
        assert_eq!(fmt_pt(Pt::from_i32(20)), "20");
        assert_eq!(fmt_pt(Pt::from_f32(-1.5)), "-1.5");
        assert_eq!(fmt_pt(Pt::ZERO), "0");
    }
}
