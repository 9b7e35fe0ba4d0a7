//! Paint command set and display list construction

use crate::rendering::layout::{ElementType, PageLayout};

pub const PAGE_BACKGROUND: [u8; 4] = [255, 255, 255, 255];

const HEADING_BAND: [u8; 4] = [238, 238, 238, 255];
const PRE_BACKGROUND: [u8; 4] = [245, 245, 245, 255];
const QUOTE_RULE: [u8; 4] = [200, 200, 200, 255];
const TEXT_COLOR: [u8; 4] = [51, 51, 51, 255];
const HEADING_COLOR: [u8; 4] = [17, 17, 17, 255];

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: [u8; 4],
    },
    /// Lines of text, drawn greeked
    Text {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        rgba: [u8; 4],
    },
}

/// Turn a layout into paint commands, back to front.
///
/// `canvas` is the painted area in CSS pixels; the page background covers
/// whichever is larger of it and the layout.
pub fn build_display_list(layout: &PageLayout, canvas: (u32, u32)) -> Vec<PaintCommand> {
    let mut cmds = vec![PaintCommand::SolidRect {
        x: 0,
        y: 0,
        width: layout.width.max(canvas.0),
        height: layout.height.max(canvas.1),
        rgba: layout.background.unwrap_or(PAGE_BACKGROUND),
    }];

    for node in &layout.nodes {
        let rect = &node.lb.rect;
        let pad = node.lb.box_model.padding as i32;
        let mut text_x = rect.x + pad;
        let mut color = TEXT_COLOR;

        match node.elem_type {
            ElementType::Title | ElementType::Heading(1) => {
                cmds.push(PaintCommand::SolidRect {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    rgba: HEADING_BAND,
                });
                color = HEADING_COLOR;
            }
            ElementType::Heading(_) => color = HEADING_COLOR,
            ElementType::Preformatted => cmds.push(PaintCommand::SolidRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                rgba: PRE_BACKGROUND,
            }),
            ElementType::Quote => {
                cmds.push(PaintCommand::SolidRect {
                    x: rect.x + pad,
                    y: rect.y,
                    width: 4,
                    height: rect.height,
                    rgba: QUOTE_RULE,
                });
                text_x += 16;
            }
            ElementType::ListItem => {
                cmds.push(PaintCommand::SolidRect {
                    x: rect.x + pad + 4,
                    y: rect.y + pad + 2,
                    width: 4,
                    height: 4,
                    rgba: TEXT_COLOR,
                });
                text_x += 16;
            }
            ElementType::Paragraph => {}
        }

        cmds.push(PaintCommand::Text {
            x: text_x,
            y: rect.y + pad,
            text: node.text.clone(),
            scale: node.scale,
            rgba: color,
        });
    }
    cmds
}

/// Parse the handful of CSS colors pages commonly set on `<body>`:
/// `#rgb`, `#rrggbb` and a few names.
pub fn parse_css_color(s: &str) -> Option<[u8; 4]> {
    let s = s.trim().trim_end_matches(';').trim();
    if let Some(hex) = s.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        return match digits.as_slice() {
            [r, g, b] => Some([r * 17, g * 17, b * 17, 255]),
            [r1, r0, g1, g0, b1, b0] => Some([r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, 255]),
            _ => None,
        };
    }
    Some(match s.to_ascii_lowercase().as_str() {
        "white" => [255, 255, 255, 255],
        "black" => [0, 0, 0, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "lime" => [0, 255, 0, 255],
        "blue" => [0, 0, 255, 255],
        "navy" => [0, 0, 128, 255],
        "yellow" => [255, 255, 0, 255],
        "silver" => [192, 192, 192, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        "transparent" => [0, 0, 0, 0],
        _ => return None,
    })
}
