//! Page layout for report PDFs.
//!
//! Everything here is plain arithmetic in millimetres with the origin at the
//! top-left of the page; the renderer flips to PDF coordinates.

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
pub const HEADER_HEIGHT_MM: f32 = 22.0;
pub const FOOTER_HEIGHT_MM: f32 = 12.0;

pub const SECTION_TITLE_PT: f32 = 13.0;
pub const BODY_PT: f32 = 10.0;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.35;
/// Helvetica averages roughly half an em per glyph.
const AVG_GLYPH_EM: f32 = 0.5;

pub const PHOTO_MAX_HEIGHT_MM: f32 = 95.0;
const BLOCK_GAP_MM: f32 = 4.0;
const SECTION_GAP_MM: f32 = 8.0;

pub fn content_width() -> f32 {
    PAGE_WIDTH_MM - 2.0 * MARGIN_MM
}

pub fn content_top() -> f32 {
    MARGIN_MM + HEADER_HEIGHT_MM
}

pub fn content_bottom() -> f32 {
    PAGE_HEIGHT_MM - MARGIN_MM - FOOTER_HEIGHT_MM
}

pub fn line_height(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM * LINE_SPACING
}

/// Characters that fit on one line of `width_mm` at `size_pt`.
pub fn chars_per_line(width_mm: f32, size_pt: f32) -> usize {
    let glyph = size_pt * PT_TO_MM * AVG_GLYPH_EM;
    ((width_mm / glyph).floor() as usize).max(1)
}

/// Greedy word wrap. Words longer than a line are split hard. Blank lines in
/// the input are kept as paragraph breaks.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

/// Scales `(width_px, height_px)` into the box, preserving aspect ratio.
/// Images are never enlarged beyond one pixel per 0.25 mm.
pub fn fit_within(width_px: u32, height_px: u32, max_w_mm: f32, max_h_mm: f32) -> (f32, f32) {
    if width_px == 0 || height_px == 0 {
        return (0.0, 0.0);
    }
    let natural_w = width_px as f32 * 0.25;
    let natural_h = height_px as f32 * 0.25;
    let scale = (max_w_mm / natural_w).min(max_h_mm / natural_h).min(1.0);
    (natural_w * scale, natural_h * scale)
}

/// One report section as the layout sees it: text plus decoded photo sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionInput {
    pub title: String,
    pub description: Option<String>,
    /// Pixel dimensions of each photo that decoded successfully.
    pub photos: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    SectionTitle(String),
    TextLine(String),
    /// `section` and `photo` index into the inputs.
    Photo { section: usize, photo: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    pub x_mm: f32,
    /// Distance from the top edge of the page to the top of the block.
    pub top_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub blocks: Vec<PlacedBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<PageLayout>,
}

struct Cursor {
    pages: Vec<PageLayout>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: content_top(),
        }
    }

    fn remaining(&self) -> f32 {
        content_bottom() - self.y
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().map(|p| p.blocks.is_empty()).unwrap_or(true)
    }

    fn break_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = content_top();
    }

    /// Places a block, breaking first when it does not fit. A block taller
    /// than a whole page is placed on a fresh page anyway.
    fn place(&mut self, kind: BlockKind, width: f32, height: f32, gap_after: f32) {
        if height > self.remaining() && !self.page_is_empty() {
            self.break_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(PlacedBlock {
                kind,
                x_mm: MARGIN_MM,
                top_mm: self.y,
                width_mm: width,
                height_mm: height,
            });
        }
        self.y += height + gap_after;
    }
}

impl ReportLayout {
    pub fn compute(sections: &[SectionInput]) -> Self {
        let width = content_width();
        let title_h = line_height(SECTION_TITLE_PT);
        let body_h = line_height(BODY_PT);
        let body_chars = chars_per_line(width, BODY_PT);

        let mut cursor = Cursor::new();
        for (index, section) in sections.iter().enumerate() {
            let lines = section
                .description
                .as_deref()
                .map(|d| wrap_text(d, body_chars))
                .unwrap_or_default();

            // Keep a heading with at least its first line of text.
            let first_line = if lines.is_empty() { 0.0 } else { body_h };
            if title_h + first_line > cursor.remaining() && !cursor.page_is_empty() {
                cursor.break_page();
            }
            cursor.place(BlockKind::SectionTitle(section.title.clone()), width, title_h, 1.5);

            for line in lines {
                cursor.place(BlockKind::TextLine(line), width, body_h, 0.0);
            }

            for (photo, &(w, h)) in section.photos.iter().enumerate() {
                let (pw, ph) = fit_within(w, h, width, PHOTO_MAX_HEIGHT_MM);
                if ph <= 0.0 {
                    continue;
                }
                cursor.y += BLOCK_GAP_MM;
                cursor.place(BlockKind::Photo { section: index, photo }, pw, ph, 0.0);
            }

            cursor.y += SECTION_GAP_MM;
        }

        ReportLayout {
            pages: cursor.pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn section(desc: &str, photos: Vec<(u32, u32)>) -> SectionInput {
        SectionInput {
            title: "Kitchen joinery".into(),
            description: Some(desc.into()),
            photos,
        }
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn hard_splits_long_words() {
        let lines = wrap_text("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn keeps_paragraph_breaks() {
        let lines = wrap_text("first\n\nsecond", 40);
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let (w, h) = fit_within(4000, 3000, 180.0, 95.0);
        assert!((w / h - 4.0 / 3.0).abs() < 1e-3);
        assert!(w <= 180.0 + 1e-3 && h <= 95.0 + 1e-3);
    }

    #[test]
    fn small_images_are_not_enlarged() {
        assert_eq!(fit_within(100, 50, 180.0, 95.0), (25.0, 12.5));
        assert_eq!(fit_within(0, 50, 180.0, 95.0), (0.0, 0.0));
    }

    #[test]
    fn single_short_section_fits_on_one_page() {
        let layout = ReportLayout::compute(&[section("All carcasses delivered.", vec![])]);
        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.pages[0].blocks.len(), 2);
    }

    #[test]
    fn photos_that_do_not_fit_move_to_next_page() {
        let photos = vec![(800, 600); 4];
        let layout = ReportLayout::compute(&[section("Site photos", photos)]);
        assert!(layout.page_count() >= 2);
        let first_photo_on_second_page = layout.pages[1]
            .blocks
            .iter()
            .find(|b| matches!(b.kind, BlockKind::Photo { .. }));
        assert_eq!(first_photo_on_second_page.map(|b| b.top_mm), Some(content_top()));
    }

    proptest! {
        #[test]
        fn blocks_stay_inside_content_area(
            words in prop::collection::vec("[a-z]{1,12}", 0..400),
            photos in prop::collection::vec((1u32..5000, 1u32..5000), 0..6),
            sections in 1usize..5,
        ) {
            let description = words.join(" ");
            let inputs: Vec<SectionInput> = (0..sections)
                .map(|_| section(&description, photos.clone()))
                .collect();
            let layout = ReportLayout::compute(&inputs);
            for page in &layout.pages {
                for block in &page.blocks {
                    prop_assert!(block.top_mm >= content_top() - 1e-3);
                    prop_assert!(block.top_mm + block.height_mm <= content_bottom() + 1e-3);
                    prop_assert!(block.width_mm <= content_width() + 1e-3);
                }
            }
        }
    }
}
