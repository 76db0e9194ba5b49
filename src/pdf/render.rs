//! Draws a computed [`ReportLayout`] with printpdf.

use image::DynamicImage;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference,
};

use super::layout::{
    BlockKind, PageLayout, ReportLayout, BODY_PT, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, SECTION_TITLE_PT,
};
use super::ReportDocument;
use crate::errors::ServiceError;

const HEADER_TITLE_PT: f32 = 16.0;
const HEADER_SUB_PT: f32 = 9.0;
const FOOTER_PT: f32 = 8.0;
const LAYER: &str = "content";

fn render_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::RenderError(e.to_string())
}

/// PDF y axis grows upwards from the bottom edge.
fn from_top(top_mm: f32) -> Mm {
    Mm(PAGE_HEIGHT_MM - top_mm)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, doc: &ReportDocument) {
    layer.use_text(
        doc.title.as_str(),
        HEADER_TITLE_PT,
        Mm(MARGIN_MM),
        from_top(MARGIN_MM + 6.0),
        &fonts.bold,
    );
    let subtitle = match &doc.published_on {
        Some(date) => format!(
            "{} | {} ({}) | {}",
            doc.type_label, doc.project_name, doc.project_code, date
        ),
        None => format!("{} | {} ({})", doc.type_label, doc.project_name, doc.project_code),
    };
    layer.use_text(
        subtitle,
        HEADER_SUB_PT,
        Mm(MARGIN_MM),
        from_top(MARGIN_MM + 13.0),
        &fonts.regular,
    );
}

fn draw_footer(layer: &PdfLayerReference, fonts: &Fonts, page: usize, total: usize) {
    let y = Mm(MARGIN_MM);
    layer.use_text(
        format!("Page {} / {}", page, total),
        FOOTER_PT,
        Mm(PAGE_WIDTH_MM - MARGIN_MM - 22.0),
        y,
        &fonts.regular,
    );
}

/// `photos[section][photo]` must line up with the indices used when the layout was computed.
pub fn draw(
    doc: &ReportDocument,
    layout: &ReportLayout,
    photos: &[Vec<DynamicImage>],
) -> Result<Vec<u8>, ServiceError> {
    let (pdf, first_page, first_layer) =
        PdfDocument::new(doc.title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
    let fonts = Fonts {
        regular: pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?,
    };

    let total = layout.page_count().max(1);
    let empty = PageLayout::default();
    for index in 0..total {
        let layer = if index == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = pdf.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
            pdf.get_page(page).get_layer(layer)
        };

        draw_header(&layer, &fonts, doc);
        draw_footer(&layer, &fonts, index + 1, total);

        let page = layout.pages.get(index).unwrap_or(&empty);
        for block in &page.blocks {
            match &block.kind {
                BlockKind::SectionTitle(text) => layer.use_text(
                    text.as_str(),
                    SECTION_TITLE_PT,
                    Mm(block.x_mm),
                    from_top(block.top_mm + block.height_mm * 0.8),
                    &fonts.bold,
                ),
                BlockKind::TextLine(text) => layer.use_text(
                    text.as_str(),
                    BODY_PT,
                    Mm(block.x_mm),
                    from_top(block.top_mm + block.height_mm * 0.8),
                    &fonts.regular,
                ),
                BlockKind::Photo { section, photo } => {
                    let Some(img) = photos.get(*section).and_then(|s| s.get(*photo)) else {
                        continue;
                    };
                    if block.width_mm <= 0.0 {
                        continue;
                    }
                    // Choosing the DPI sizes the image exactly to the block.
                    let dpi = img.width() as f32 * 25.4 / block.width_mm;
                    Image::from_dynamic_image(img).add_to_layer(
                        layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(block.x_mm)),
                            translate_y: Some(from_top(block.top_mm + block.height_mm)),
                            dpi: Some(dpi),
                            ..Default::default()
                        },
                    );
                }
            }
        }
    }

    pdf.save_to_bytes().map_err(render_error)
}
