//! Block layout for the RFEngine backend.
//!
//! Blocks stack vertically with fixed margins; text wraps at a fixed
//! character width. Coordinates are CSS pixels before zoom.

use scraper::{ElementRef, Html, Selector};

use crate::rendering::paint::parse_css_color;

/// Horizontal advance of one character at scale 1
pub const CHAR_WIDTH: u32 = 8;
/// Line height at scale 1
pub const LINE_HEIGHT: u32 = 8;

const PAGE_MARGIN: u32 = 8;

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, blockquote";

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxModel {
    pub margin: u32,
    pub border: u32,
    pub padding: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_width(&self) -> u32 {
        let total = self.box_model.border + self.box_model.padding;
        self.rect.width.saturating_sub(total * 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// `<title>` standing in for a missing `<h1>`
    Title,
    Heading(u8),
    Paragraph,
    ListItem,
    Preformatted,
    Quote,
}

impl ElementType {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "h1" => ElementType::Heading(1),
            "h2" => ElementType::Heading(2),
            "h3" => ElementType::Heading(3),
            "h4" => ElementType::Heading(4),
            "h5" => ElementType::Heading(5),
            "h6" => ElementType::Heading(6),
            "p" => ElementType::Paragraph,
            "li" => ElementType::ListItem,
            "pre" => ElementType::Preformatted,
            "blockquote" => ElementType::Quote,
            _ => return None,
        })
    }

    /// Text scale factor
    fn scale(self) -> u32 {
        match self {
            ElementType::Title | ElementType::Heading(1) | ElementType::Heading(2) => 2,
            _ => 1,
        }
    }

    fn padding(self) -> u32 {
        match self {
            ElementType::Title | ElementType::Heading(_) => 8,
            _ => 6,
        }
    }

    /// Left indent inside the block
    fn indent(self) -> u32 {
        match self {
            ElementType::ListItem | ElementType::Quote => 16,
            _ => 0,
        }
    }
}

/// A layout node couples a `LayoutBox` with its wrapped text.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub lb: LayoutBox,
    /// Wrapped lines joined with `\n`
    pub text: String,
    pub elem_type: ElementType,
    pub scale: u32,
}

impl LayoutNode {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Result of laying out a document
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub nodes: Vec<LayoutNode>,
    pub width: u32,
    pub height: u32,
    /// Page background from `<body bgcolor>` or its inline style
    pub background: Option<[u8; 4]>,
}

/// Compute a block layout for `document` at `page_width` CSS pixels.
pub fn layout_document(document: &Html, page_width: u32) -> PageLayout {
    let mut y = PAGE_MARGIN;
    let block_width = page_width.saturating_sub(PAGE_MARGIN * 2);
    let mut nodes = Vec::new();

    // <title> stands in for the heading when there is no <h1>
    let h1_sel = Selector::parse("h1").unwrap();
    if document.select(&h1_sel).next().is_none() {
        let title_sel = Selector::parse("title").unwrap();
        let title = document
            .select(&title_sel)
            .next()
            .map(|n| n.text().collect::<String>())
            .unwrap_or_default();
        if !title.trim().is_empty() {
            let node = layout_block(&title, ElementType::Title, y, block_width);
            y += node.lb.rect.height + node.lb.box_model.margin;
            nodes.push(node);
        }
    }

    let block_sel = Selector::parse(BLOCK_SELECTOR).unwrap();
    for el in document.select(&block_sel) {
        if has_block_ancestor(&el) {
            continue;
        }
        let Some(elem_type) = ElementType::from_tag(el.value().name()) else {
            continue;
        };
        let text = el.text().collect::<String>();
        if text.trim().is_empty() {
            continue;
        }
        let node = layout_block(&text, elem_type, y, block_width);
        y += node.lb.rect.height + node.lb.box_model.margin;
        nodes.push(node);
    }

    PageLayout {
        nodes,
        width: page_width,
        height: y + PAGE_MARGIN,
        background: body_background(document),
    }
}

fn layout_block(raw: &str, elem_type: ElementType, y: u32, block_width: u32) -> LayoutNode {
    let scale = elem_type.scale();
    let padding = elem_type.padding();
    let content_w = block_width.saturating_sub(padding * 2 + elem_type.indent());
    let chars_per_line = (content_w / (CHAR_WIDTH * scale)).max(1) as usize;

    let lines: Vec<String> = if elem_type == ElementType::Preformatted {
        raw.trim_matches('\n').lines().map(|l| l.trim_end().to_string()).collect()
    } else {
        wrap(raw, chars_per_line)
    };
    let text = lines.join("\n");
    let line_count = (lines.len() as u32).max(1);
    let box_h = line_count * LINE_HEIGHT * scale + padding * 2;

    LayoutNode {
        lb: LayoutBox {
            rect: Rect {
                x: PAGE_MARGIN as i32,
                y: y as i32,
                width: block_width,
                height: box_h,
            },
            box_model: BoxModel {
                margin: padding,
                border: 0,
                padding,
            },
        },
        text,
        elem_type,
        scale,
    }
}

/// Greedy word wrap; words longer than a line get a line of their own.
fn wrap(text: &str, chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.chars().count() + word.chars().count() + 1 > chars_per_line {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn has_block_ancestor(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| ElementType::from_tag(a.value().name()).is_some())
}

fn body_background(document: &Html) -> Option<[u8; 4]> {
    let body_sel = Selector::parse("body").unwrap();
    let body = document.select(&body_sel).next()?;
    if let Some(color) = body.value().attr("bgcolor").and_then(parse_css_color) {
        return Some(color);
    }
    let style = body.value().attr("style")?;
    style.split(';').find_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        match prop.trim().to_ascii_lowercase().as_str() {
            "background" | "background-color" => value.split_whitespace().find_map(parse_css_color),
            _ => None,
        }
    })
}
