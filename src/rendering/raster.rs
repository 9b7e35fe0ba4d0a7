//! Rasterizer: executes paint commands onto a [`Surface`]

use image::Rgba;

use crate::rendering::layout::{CHAR_WIDTH, LINE_HEIGHT};
use crate::rendering::paint::PaintCommand;
use crate::surface::{RectF, Surface};
use crate::RenderHints;

/// Draw `commands` scaled by `zoom`. Text is greeked: every word becomes a
/// bar the height of a lowercase letter.
pub fn rasterize(commands: &[PaintCommand], surface: &mut Surface, zoom: f32, hints: RenderHints) {
    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                rgba,
            } => surface.fill_rect(
                RectF::new(
                    *x as f32 * zoom,
                    *y as f32 * zoom,
                    *width as f32 * zoom,
                    *height as f32 * zoom,
                ),
                Rgba(*rgba),
                hints.antialiasing,
            ),
            PaintCommand::Text {
                x,
                y,
                text,
                scale,
                rgba,
            } => greek_text(surface, (*x, *y), text, *scale, Rgba(*rgba), zoom, hints),
        }
    }
}

fn greek_text(
    surface: &mut Surface,
    origin: (i32, i32),
    text: &str,
    scale: u32,
    color: Rgba<u8>,
    zoom: f32,
    hints: RenderHints,
) {
    let unit = scale as f32;
    let cell = (CHAR_WIDTH * scale) as f32;
    let line_h = (LINE_HEIGHT * scale) as f32;

    for (row, line) in text.lines().enumerate() {
        let top = origin.1 as f32 + row as f32 * line_h + unit;
        let mut word_start = None;
        for (col, ch) in line.chars().chain(std::iter::once(' ')).enumerate() {
            match (ch.is_whitespace(), word_start) {
                (false, None) => word_start = Some(col),
                (true, Some(start)) => {
                    let left = origin.0 as f32 + start as f32 * cell;
                    let width = (col - start) as f32 * cell - unit;
                    surface.fill_rect(
                        RectF::new(left * zoom, top * zoom, width * zoom, (line_h - 2.0 * unit) * zoom),
                        color,
                        hints.text_antialiasing,
                    );
                    word_start = None;
                }
                _ => {}
            }
        }
    }
}
