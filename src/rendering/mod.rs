//! Rendering for the RFEngine backend: layout, display list, raster.

pub mod layout;
pub mod paint;
pub mod raster;

use scraper::Html;

pub use layout::PageLayout;

use crate::surface::Surface;
use crate::RenderHints;

/// Lay out an HTML document at `layout_width` CSS pixels.
pub fn layout_html(html: &str, layout_width: u32) -> PageLayout {
    let document = Html::parse_document(html);
    layout::layout_document(&document, layout_width)
}

/// Paint a laid-out page onto `surface` at `zoom`.
pub fn paint_layout(layout: &PageLayout, surface: &mut Surface, zoom: f64, hints: RenderHints) {
    let size = surface.size();
    let canvas = (
        (size.width as f64 / zoom).ceil() as u32,
        (size.height as f64 / zoom).ceil() as u32,
    );
    let commands = paint::build_display_list(layout, canvas);
    raster::rasterize(&commands, surface, zoom as f32, hints);
}
