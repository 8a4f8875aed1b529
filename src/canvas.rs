use crate::types::{Pt, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFontSize(Pt),
    StrokeRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
    /// Text centered within a box of the given width at the current font size.
    DrawLabel {
        x: Pt,
        y: Pt,
        width: Pt,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

/// Records drawing commands into pages. The layout engine only ever talks to
/// this recorder; writers replay the finished `Document`.
pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    current_font: Option<Pt>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            current_font: None,
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn is_current_empty(&self) -> bool {
        self.current.commands.is_empty()
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_font == Some(size) {
            return;
        }
        self.current_font = Some(size);
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn stroke_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::StrokeRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn draw_image(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, resource_id: String) {
        self.current.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource_id,
        });
    }

    pub fn draw_label(&mut self, x: Pt, y: Pt, width: Pt, text: String) {
        self.current.commands.push(Command::DrawLabel { x, y, width, text });
    }

    /// Closes the current page and opens a fresh one. The font-size state does
    /// not carry across pages, so each page re-emits it.
    pub fn show_page(&mut self) {
        let page = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(page);
        self.current_font = None;
    }

    /// Finishes recording. A trailing non-empty page is closed; a trailing
    /// empty page is dropped unless the document would otherwise have none.
    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            let page = std::mem::replace(&mut self.current, Page::new());
            self.pages.push(page);
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}
