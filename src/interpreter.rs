//! L5: the content-stream interpreter (§4.6). Parses the operator stream
//! inside a page's `/Contents`, maintaining a graphics-state stack (CTM,
//! text matrix, current font/size, fill color) to reconstruct positioned
//! text elements and placed images, then groups text elements into
//! `TextBlock`s by the line/block heuristic in §4.6.
//!
//! Shares `Lexer` with the writer's serializer and the reader's object
//! parser (§4.4 "the same tokenizer is reused").

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::color::Color;
use crate::error::{Error, FormatError};
use crate::font::cmap::ToUnicodeCMap;
use crate::font::encoding::winansi_to_unicode;
use crate::image::ImageFormat;
use crate::lexer::{Lexer, Token};
use crate::matrix::Matrix;
use crate::object::{Dictionary, Object, ObjectId};
use crate::reader::Reader;

/// A single positioned run of text, decoded to Unicode (§3.3 `TextElement`).
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_name: String,
    pub font_size: f32,
}

/// A contiguous grouping of `TextElement`s with a bounding rectangle and a
/// representative font/size/color (§3.3 `TextBlock`, §4.6 grouping
/// heuristic).
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub elements: Vec<TextElement>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_name: String,
    pub font_size: f32,
    pub color: Color,
}

/// A decoded-enough image read back off a page's `/XObject` resources
/// (§3.3 `ImageInfo`).
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_space: String,
    pub bits_per_component: u8,
    pub filter: String,
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// An `ImageInfo` together with its concrete placement in page space
/// (§3.3 `ImageBlock`, §4.6 "image extraction rules").
#[derive(Debug, Clone)]
pub struct ImageBlock {
    pub info: ImageInfo,
    pub x: f32,
    pub y: f32,
    pub placed_width: f32,
    pub placed_height: f32,
}

/// The union of text blocks and image blocks making up one page's layout
/// (§3.3 "a page layout is the union of").
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub text_blocks: Vec<TextBlock>,
    pub image_blocks: Vec<ImageBlock>,
}

/// A single text-showing run before grouping, carrying the fill color
/// active when it was drawn (dropped once blocks are built; not part of
/// the public `TextElement` shape in §3.3).
struct RawRun {
    element: TextElement,
    color: Color,
}

/// A content-stream operand: either a scalar pushed before an operator
/// keyword, or a compound array/string (`TJ`'s array, `Tj`'s string).
#[derive(Debug, Clone)]
enum Operand {
    Number(f64),
    Name(String),
    Str(Vec<u8>),
    Array(Vec<Operand>),
}

impl Operand {
    fn as_f32(&self) -> f32 {
        match self {
            Operand::Number(n) => *n as f32,
            _ => 0.0,
        }
    }
}

/// Tokenizes a content stream into `(operands, operator)` pairs, the
/// read-side counterpart of the write path's `Op` enum in `content.rs`.
struct ContentParser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ContentParser<'a> {
    fn new(buf: &'a [u8]) -> Self {
        ContentParser { lexer: Lexer::new(buf) }
    }

    /// Returns the next `(operands, operator keyword)` pair, or `None` at
    /// end of stream. Malformed operands are tolerated by skipping the
    /// offending token — the interpreter favors partial extraction over a
    /// hard failure on any one broken operator.
    fn next_operation(&mut self) -> Result<Option<(Vec<Operand>, String)>, Error> {
        let mut operands = Vec::new();
        loop {
            let Some(tok) = self.lexer.next_token()? else {
                return Ok(if operands.is_empty() { None } else { Some((operands, String::new())) });
            };
            match tok {
                Token::Integer(n) => operands.push(Operand::Number(n as f64)),
                Token::Real(r) => operands.push(Operand::Number(r)),
                Token::Name(n) => operands.push(Operand::Name(n)),
                Token::StringLiteral(bytes) | Token::HexString(bytes) => operands.push(Operand::Str(bytes)),
                Token::ArrayStart => operands.push(Operand::Array(self.parse_array()?)),
                Token::DictStart => {
                    self.skip_dict()?;
                }
                Token::ArrayEnd | Token::DictEnd => {
                    // Unbalanced; ignore rather than abort the whole page.
                }
                Token::Keyword(kw) => {
                    if kw == "true" || kw == "false" || kw == "null" {
                        continue;
                    }
                    return Ok(Some((operands, kw)));
                }
            }
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Operand>, Error> {
        let mut items = Vec::new();
        loop {
            let Some(tok) = self.lexer.next_token()? else {
                return Err(FormatError::UnbalancedDelimiter.into());
            };
            match tok {
                Token::ArrayEnd => return Ok(items),
                Token::Integer(n) => items.push(Operand::Number(n as f64)),
                Token::Real(r) => items.push(Operand::Number(r)),
                Token::Name(n) => items.push(Operand::Name(n)),
                Token::StringLiteral(bytes) | Token::HexString(bytes) => items.push(Operand::Str(bytes)),
                Token::ArrayStart => items.push(Operand::Array(self.parse_array()?)),
                Token::DictStart => self.skip_dict()?,
                _ => {}
            }
        }
    }

    /// Discards a marked-content operand dictionary (e.g. `BDC`'s
    /// `<</ActualText ...>>`), tolerating nested dictionaries.
    fn skip_dict(&mut self) -> Result<(), Error> {
        let mut depth = 1i32;
        while depth > 0 {
            let Some(tok) = self.lexer.next_token()? else {
                return Err(FormatError::UnbalancedDelimiter.into());
            };
            match tok {
                Token::DictStart => depth += 1,
                Token::DictEnd => depth -= 1,
                Token::ArrayStart => {
                    self.parse_array()?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Which decoding strategy a font's bytes need: WinAnsiEncoding for a
/// simple Type1 font, or a ToUnicode CMap lookup over 2-byte codes for a
/// composite Type0 font (§4.6 "text extraction rules").
struct ResolvedFont {
    composite: bool,
    cmap: Option<ToUnicodeCMap>,
}

fn resolve_name_in_subdict(resources: &Dictionary, sub: &str, name: &str) -> Option<ObjectId> {
    resources.get(sub)?.as_dict()?.get(name)?.as_reference()
}

fn resolve_font(reader: &Reader, resources: &Dictionary, name: &str, cache: &mut BTreeMap<String, ResolvedFont>) -> Option<()> {
    if cache.contains_key(name) {
        return Some(());
    }
    let id = resolve_name_in_subdict(resources, "Font", name)?;
    let dict = reader.get(id).ok()?.as_dict()?.clone();
    let is_composite = dict.get("Subtype").and_then(Object::as_name) == Some("Type0");
    let cmap = if is_composite {
        dict.get("ToUnicode")
            .and_then(Object::as_reference)
            .and_then(|id| reader.stream_bytes(id).ok())
            .map(|(_, bytes)| ToUnicodeCMap::parse(&String::from_utf8_lossy(&bytes)))
    } else {
        None
    };
    cache.insert(name.to_string(), ResolvedFont { composite: is_composite, cmap });
    Some(())
}

/// Decodes a shown string's raw bytes to Unicode text, per the resolved
/// font's encoding (§4.6 "for a composite font, decoding uses the
/// ToUnicode CMap... for simple fonts, WinAnsiEncoding is applied").
fn decode_text(bytes: &[u8], font: Option<&ResolvedFont>) -> String {
    match font {
        Some(ResolvedFont { composite: true, cmap }) => bytes
            .chunks(2)
            .map(|pair| {
                let code = u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]) as u32;
                cmap.as_ref()
                    .and_then(|c| c.mappings.get(&code))
                    .and_then(|&cp| char::from_u32(cp))
                    .unwrap_or('\u{FFFD}')
            })
            .collect(),
        _ => bytes.iter().map(|&b| winansi_to_unicode(b)).collect(),
    }
}

/// Interprets a page's decoded content-stream bytes against its
/// `/Resources` dictionary, returning the full page layout (§4.6).
pub fn extract_page_layout(reader: &Reader, content: &[u8], resources: &Dictionary) -> Result<PageLayout, Error> {
    let mut runs: Vec<RawRun> = Vec::new();
    let mut images: Vec<ImageBlock> = Vec::new();
    let mut font_cache: BTreeMap<String, ResolvedFont> = BTreeMap::new();

    let mut ctm = Matrix::identity();
    let mut ctm_stack: Vec<Matrix> = Vec::new();
    let mut tm = Matrix::identity();
    let mut tlm = Matrix::identity();
    let mut font: Option<(String, f32)> = None;
    let mut fill_color = Color::Greyscale { g: 0.0 };

    let mut parser = ContentParser::new(content);
    while let Some((operands, op)) = parser.next_operation()? {
        match op.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(m) = ctm_stack.pop() {
                    ctm = m;
                }
            }
            "cm" => {
                if operands.len() == 6 {
                    let m = Matrix([
                        operands[0].as_f32(),
                        operands[1].as_f32(),
                        operands[2].as_f32(),
                        operands[3].as_f32(),
                        operands[4].as_f32(),
                        operands[5].as_f32(),
                    ]);
                    ctm = m.combine(&ctm);
                }
            }
            "BT" => {
                tm = Matrix::identity();
                tlm = Matrix::identity();
            }
            "ET" => {}
            "Tf" => {
                if let [Operand::Name(name), size] = operands.as_slice() {
                    font = Some((name.clone(), size.as_f32()));
                    resolve_font(reader, resources, name, &mut font_cache);
                }
            }
            "Td" | "TD" => {
                if operands.len() == 2 {
                    let t = Matrix::translate(operands[0].as_f32(), operands[1].as_f32());
                    tlm = t.combine(&tlm);
                    tm = tlm;
                }
            }
            "T*" => {
                tm = tlm;
            }
            "Tm" => {
                if operands.len() == 6 {
                    let m = Matrix([
                        operands[0].as_f32(),
                        operands[1].as_f32(),
                        operands[2].as_f32(),
                        operands[3].as_f32(),
                        operands[4].as_f32(),
                        operands[5].as_f32(),
                    ]);
                    tm = m;
                    tlm = m;
                }
            }
            "Tj" => {
                if let [Operand::Str(bytes)] = operands.as_slice() {
                    show_text(bytes, &font, &font_cache, &ctm, &mut tm, fill_color, &mut runs);
                }
            }
            "TJ" => {
                if let [Operand::Array(items)] = operands.as_slice() {
                    for item in items {
                        match item {
                            Operand::Str(bytes) => show_text(bytes, &font, &font_cache, &ctm, &mut tm, fill_color, &mut runs),
                            Operand::Number(adjust) => {
                                if let Some((_, size)) = font {
                                    let dx = -(*adjust as f32) / 1000.0 * size;
                                    tm = Matrix::translate(dx, 0.0).combine(&tm);
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            "rg" => {
                if let [r, g, b] = operands.as_slice() {
                    fill_color = Color::Rgb { r: r.as_f32(), g: g.as_f32(), b: b.as_f32() };
                }
            }
            "g" => {
                if let [g] = operands.as_slice() {
                    fill_color = Color::Greyscale { g: g.as_f32() };
                }
            }
            "k" => {
                if let [c, m, y, k] = operands.as_slice() {
                    fill_color = Color::Cmyk { c: c.as_f32(), m: m.as_f32(), y: y.as_f32(), k: k.as_f32() };
                }
            }
            "Do" => {
                if let [Operand::Name(name)] = operands.as_slice() {
                    if let Some(block) = place_xobject(reader, resources, name, &ctm)? {
                        images.push(block);
                    }
                }
            }
            _ => {}
        }
    }

    let text_blocks = group_into_blocks(&runs, &images);
    Ok(PageLayout { text_blocks, image_blocks: images })
}

/// Computes the page-space start position of a shown string as
/// `CTM · Tm · (0, 0)` (§4.6), estimates its width as
/// `charCount · size · 0.6` (the fixed multiplier per spec §9 Open
/// Questions), and advances `Tm` by that width for the next run.
fn show_text(
    bytes: &[u8],
    font: &Option<(String, f32)>,
    cache: &BTreeMap<String, ResolvedFont>,
    ctm: &Matrix,
    tm: &mut Matrix,
    color: Color,
    out: &mut Vec<RawRun>,
) {
    let Some((font_name, size)) = font else { return };
    let resolved = cache.get(font_name);
    let text = decode_text(bytes, resolved);
    if text.is_empty() {
        return;
    }
    // Tm maps text space into user space, CTM maps user space into
    // device/page space: apply Tm first, then CTM (ISO 32000-1 §9.4.4).
    let combined = tm.combine(ctm);
    let (x, y) = combined.apply(0.0, 0.0);
    let width = text.chars().count() as f32 * size * 0.6;
    out.push(RawRun {
        element: TextElement { text, x, y, width, height: *size, font_name: font_name.clone(), font_size: *size },
        color,
    });
    *tm = Matrix::translate(width, 0.0).combine(tm);
}

/// Resolves `name` in `/XObject`, reading width/height/placement off the
/// current CTM per the standard image-placement convention (§4.6 "image
/// extraction rules"). Returns `None` if the XObject isn't an image (e.g.
/// a Form XObject, out of scope per spec §1).
fn place_xobject(reader: &Reader, resources: &Dictionary, name: &str, ctm: &Matrix) -> Result<Option<ImageBlock>, Error> {
    let Some(id) = resolve_name_in_subdict(resources, "XObject", name) else {
        return Ok(None);
    };
    let Object::Stream(stream) = reader.get(id)? else {
        return Ok(None);
    };
    if stream.dict.get("Subtype").and_then(Object::as_name) != Some("Image") {
        return Ok(None);
    }
    let (dict, data) = reader.stream_bytes(id)?;
    let width = dict.get("Width").and_then(Object::as_integer).unwrap_or(0) as u32;
    let height = dict.get("Height").and_then(Object::as_integer).unwrap_or(0) as u32;
    let color_space = dict.get("ColorSpace").and_then(Object::as_name).unwrap_or("DeviceRGB").to_string();
    let bits_per_component = dict.get("BitsPerComponent").and_then(Object::as_integer).unwrap_or(8) as u8;
    let filter = dict.get("Filter").and_then(Object::as_name).unwrap_or("").to_string();
    let format = match filter.as_str() {
        "DCTDecode" | "DCT" => ImageFormat::Jpeg,
        "FlateDecode" | "Fl" => ImageFormat::Png,
        _ => ImageFormat::Unknown,
    };
    let [a, _, _, d, e, f] = ctm.as_array();
    Ok(Some(ImageBlock {
        info: ImageInfo { name: name.to_string(), width, height, color_space, bits_per_component, filter, data, format },
        x: e,
        y: f,
        placed_width: a,
        placed_height: d,
    }))
}

/// Groups raw text runs into `TextBlock`s by the line/block heuristic of
/// §4.6: sort top-to-bottom then left-to-right, cluster into lines by
/// `y` proximity, then merge adjacent lines into blocks unless an image
/// sits strictly between them.
fn group_into_blocks(runs: &[RawRun], images: &[ImageBlock]) -> Vec<TextBlock> {
    if runs.is_empty() {
        return Vec::new();
    }
    let avg_size = runs.iter().map(|r| r.element.font_size).sum::<f32>() / runs.len() as f32;
    let avg_size = if avg_size > 0.0 { avg_size } else { 1.0 };

    let mut order: Vec<&RawRun> = runs.iter().collect();
    order.sort_by(|a, b| {
        b.element
            .y
            .partial_cmp(&a.element.y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.element.x.partial_cmp(&b.element.x).unwrap_or(Ordering::Equal))
    });

    struct Line<'a> {
        runs: Vec<&'a RawRun>,
        y: f32,
        left_x: f32,
    }

    let mut lines: Vec<Line> = Vec::new();
    for run in order {
        if let Some(last) = lines.last_mut() {
            if (last.y - run.element.y).abs() < 0.5 * avg_size {
                last.runs.push(run);
                last.left_x = last.left_x.min(run.element.x);
                continue;
            }
        }
        lines.push(Line { y: run.element.y, left_x: run.element.x, runs: vec![run] });
    }

    let mut blocks: Vec<Vec<Line>> = Vec::new();
    for line in lines {
        let merges = blocks.last().and_then(|block: &Vec<Line>| {
            let prev = block.last()?;
            let gap = prev.y - line.y;
            let left_diff = (prev.left_x - line.left_x).abs();
            let image_between = images.iter().any(|img| {
                let lo = line.y.min(prev.y);
                let hi = line.y.max(prev.y);
                let img_lo = img.y;
                let img_hi = img.y + img.placed_height;
                img_hi > lo && img_lo < hi
            });
            Some(gap >= 0.0 && gap <= 1.5 * avg_size && left_diff <= 50.0 && !image_between)
        });
        if merges.unwrap_or(false) {
            blocks.last_mut().unwrap().push(line);
        } else {
            blocks.push(vec![line]);
        }
    }

    blocks
        .into_iter()
        .map(|block_lines| {
            let mut elements = Vec::new();
            let mut text_lines = Vec::new();
            let mut color = Color::Greyscale { g: 0.0 };
            let mut font_name = String::new();
            let mut font_size = 0.0f32;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
            for (i, line) in block_lines.iter().enumerate() {
                let mut line_text = String::new();
                for (j, run) in line.runs.iter().enumerate() {
                    let el = &run.element;
                    if j > 0 {
                        let prev = line.runs[j - 1].element.clone();
                        let gap = el.x - (prev.x + prev.width);
                        if gap > 0.35 * prev.font_size {
                            line_text.push(' ');
                        }
                    }
                    line_text.push_str(&el.text);
                    min_x = min_x.min(el.x);
                    min_y = min_y.min(el.y);
                    max_x = max_x.max(el.x + el.width);
                    max_y = max_y.max(el.y + el.height);
                    if i == 0 && j == 0 {
                        color = run.color;
                        font_name = el.font_name.clone();
                        font_size = el.font_size;
                    }
                    elements.push(el.clone());
                }
                text_lines.push(line_text);
            }
            TextBlock {
                text: text_lines.join("\n"),
                elements,
                x: min_x,
                y: min_y,
                width: (max_x - min_x).max(0.0),
                height: (max_y - min_y).max(0.0),
                font_name,
                font_size,
                color,
            }
        })
        .collect()
}

/// Resolves every font/XObject in `resources` that the content stream
/// draws with, used by `Reader::extract_images` to answer without
/// building the full layout.
pub fn extract_images(reader: &Reader, content: &[u8], resources: &Dictionary) -> Result<Vec<ImageInfo>, Error> {
    Ok(extract_page_layout(reader, content, resources)?.image_blocks.into_iter().map(|b| b.info).collect())
}

/// Flattens a page's text blocks back into a single string, in the order
/// the grouping heuristic assembled them.
pub fn page_text(layout: &PageLayout) -> String {
    layout.text_blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Flattens a page's text blocks back into their underlying elements, in
/// reading order.
pub fn page_text_elements(layout: &PageLayout) -> Vec<TextElement> {
    layout.text_blocks.iter().flat_map(|b| b.elements.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, WriteOptions};
    use crate::font::StandardFont;
    use crate::page_size::{Orientation, PageSize};
    use crate::reader::{ReadOptions, Reader};
    use time::macros::datetime;

    fn write_and_read(doc: &Document) -> Reader {
        let mut buf = Vec::new();
        let opts = WriteOptions { compress: false };
        let now = datetime!(2024-01-01 00:00:00 UTC);
        doc.write_to(&mut buf, &opts, &now).unwrap();
        Reader::open(buf, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn extracts_single_text_element() {
        let mut doc = Document::new();
        let page = doc.add_page(PageSize::A4, Orientation::Portrait);
        let font = doc.add_standard_font(StandardFont::Helvetica);
        doc.set_font(page, font, 12.0).unwrap();
        doc.draw_text(page, "Hello, World!", 100.0, 700.0).unwrap();
        let reader = write_and_read(&doc);

        let pages = reader.page_ids().unwrap();
        let page_dict = reader.page_dict(pages[0]).unwrap();
        let content = reader.page_content_bytes(&page_dict).unwrap();
        let resources = page_dict.get("Resources").and_then(Object::as_dict).cloned().unwrap();
        let layout = extract_page_layout(&reader, &content, &resources).unwrap();

        assert_eq!(layout.text_blocks.len(), 1);
        assert_eq!(layout.text_blocks[0].text, "Hello, World!");
        assert!((layout.text_blocks[0].x - 100.0).abs() < 1.0);
        assert!((layout.text_blocks[0].y - 700.0).abs() < 1.0);
    }

    #[test]
    fn three_vertically_separated_draws_yield_three_descending_blocks() {
        let mut doc = Document::new();
        let page = doc.add_page(PageSize::A4, Orientation::Portrait);
        let font = doc.add_standard_font(StandardFont::Helvetica);
        doc.set_font(page, font, 12.0).unwrap();
        doc.draw_text(page, "Top", 100.0, 750.0).unwrap();
        doc.draw_text(page, "Middle", 100.0, 400.0).unwrap();
        doc.draw_text(page, "Bottom", 100.0, 100.0).unwrap();
        let reader = write_and_read(&doc);

        let pages = reader.page_ids().unwrap();
        let page_dict = reader.page_dict(pages[0]).unwrap();
        let content = reader.page_content_bytes(&page_dict).unwrap();
        let resources = page_dict.get("Resources").and_then(Object::as_dict).cloned().unwrap();
        let layout = extract_page_layout(&reader, &content, &resources).unwrap();

        assert_eq!(layout.text_blocks.len(), 3);
        assert!(layout.text_blocks[0].y > layout.text_blocks[1].y);
        assert!(layout.text_blocks[1].y > layout.text_blocks[2].y);
    }

    #[test]
    fn extracts_placed_jpeg_image() {
        let mut doc = Document::new();
        let page = doc.add_page(PageSize::A4, Orientation::Portrait);
        let mut data = vec![0xFF, 0xD8];
        let mut sof = vec![0xFFu8, 0xC0, 0x00, 0x0B, 0x08];
        sof.extend_from_slice(&10u16.to_be_bytes());
        sof.extend_from_slice(&10u16.to_be_bytes());
        sof.push(1);
        sof.extend_from_slice(&[1, 0x11, 0]);
        data.extend_from_slice(&sof);
        data.extend_from_slice(&[0xFF, 0xD9]);
        let image = doc.add_jpeg_image(data).unwrap();
        doc.draw_image(page, image, 50.0, 60.0, 200.0, 150.0).unwrap();
        let reader = write_and_read(&doc);

        let pages = reader.page_ids().unwrap();
        let page_dict = reader.page_dict(pages[0]).unwrap();
        let content = reader.page_content_bytes(&page_dict).unwrap();
        let resources = page_dict.get("Resources").and_then(Object::as_dict).cloned().unwrap();
        let layout = extract_page_layout(&reader, &content, &resources).unwrap();

        assert_eq!(layout.image_blocks.len(), 1);
        let block = &layout.image_blocks[0];
        assert_eq!(block.x, 50.0);
        assert_eq!(block.y, 60.0);
        assert_eq!(block.placed_width, 200.0);
        assert_eq!(block.placed_height, 150.0);
        assert_eq!(block.info.format, ImageFormat::Jpeg);
    }

    #[test]
    fn composite_font_roundtrips_through_tounicode_cmap() {
        // A minimal valid TrueType font: head/maxp/hhea/hmtx/cmap tables
        // mapping 'A' (U+0041) to GID 3.
        let font_bytes = build_minimal_ttf();
        let mut doc = Document::new();
        let page = doc.add_page(PageSize::A4, Orientation::Portrait);
        let font = doc.add_ttf_font("TestFont", font_bytes).unwrap();
        doc.set_font(page, font, 24.0).unwrap();
        doc.draw_text(page, "A", 10.0, 10.0).unwrap();
        let reader = write_and_read(&doc);

        let pages = reader.page_ids().unwrap();
        let page_dict = reader.page_dict(pages[0]).unwrap();
        let content = reader.page_content_bytes(&page_dict).unwrap();
        let resources = page_dict.get("Resources").and_then(Object::as_dict).cloned().unwrap();
        let layout = extract_page_layout(&reader, &content, &resources).unwrap();

        assert_eq!(layout.text_blocks.len(), 1);
        assert_eq!(layout.text_blocks[0].text, "A");
    }

    /// Builds the smallest TrueType byte blob `ParsedTrueTypeFont::parse`
    /// accepts, with a format-4 `cmap` mapping U+0041 -> GID 3.
    fn build_minimal_ttf() -> Vec<u8> {
        fn pad4(buf: &mut Vec<u8>) {
            while buf.len() % 4 != 0 {
                buf.push(0);
            }
        }

        let mut head = vec![0u8; 54];
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());
        head[36..38].copy_from_slice(&0i16.to_be_bytes());
        head[38..40].copy_from_slice(&0i16.to_be_bytes());
        head[40..42].copy_from_slice(&1000i16.to_be_bytes());
        head[42..44].copy_from_slice(&1000i16.to_be_bytes());

        let mut maxp = vec![0u8; 6];
        maxp[4..6].copy_from_slice(&10u16.to_be_bytes());

        let mut hhea = vec![0u8; 36];
        hhea[4..6].copy_from_slice(&900i16.to_be_bytes());
        hhea[6..8].copy_from_slice(&(-200i16).to_be_bytes());
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());

        let mut hmtx = Vec::new();
        hmtx.extend_from_slice(&600u16.to_be_bytes());
        hmtx.extend_from_slice(&0i16.to_be_bytes());

        // cmap format 4: one segment covering 0x0041..=0x0041 -> gid 3 via idDelta.
        let mut cmap = Vec::new();
        cmap.extend_from_slice(&0u16.to_be_bytes()); // version
        cmap.extend_from_slice(&1u16.to_be_bytes()); // numTables
        cmap.extend_from_slice(&3u16.to_be_bytes()); // platformID
        cmap.extend_from_slice(&1u16.to_be_bytes()); // encodingID
        cmap.extend_from_slice(&12u32.to_be_bytes()); // offset to subtable
        let sub_start = cmap.len();
        cmap.extend_from_slice(&4u16.to_be_bytes()); // format
        cmap.extend_from_slice(&24u16.to_be_bytes()); // length (placeholder, fixed below)
        cmap.extend_from_slice(&0u16.to_be_bytes()); // language
        cmap.extend_from_slice(&4u16.to_be_bytes()); // segCountX2 (1 seg + terminator = 2 segs)
        cmap.extend_from_slice(&2u16.to_be_bytes()); // searchRange
        cmap.extend_from_slice(&0u16.to_be_bytes()); // entrySelector
        cmap.extend_from_slice(&2u16.to_be_bytes()); // rangeShift
        cmap.extend_from_slice(&0x0041u16.to_be_bytes()); // endCode[0]
        cmap.extend_from_slice(&0xFFFFu16.to_be_bytes()); // endCode[1]
        cmap.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
        cmap.extend_from_slice(&0x0041u16.to_be_bytes()); // startCode[0]
        cmap.extend_from_slice(&0xFFFFu16.to_be_bytes()); // startCode[1]
        cmap.extend_from_slice(&(3i16 - 0x0041i16).to_be_bytes()); // idDelta[0]
        cmap.extend_from_slice(&1i16.to_be_bytes()); // idDelta[1]
        cmap.extend_from_slice(&0u16.to_be_bytes()); // idRangeOffset[0]
        cmap.extend_from_slice(&0u16.to_be_bytes()); // idRangeOffset[1]
        let sub_len = (cmap.len() - sub_start) as u16;
        cmap[sub_start + 2..sub_start + 4].copy_from_slice(&sub_len.to_be_bytes());

        let tables: Vec<(&[u8; 4], Vec<u8>)> =
            vec![(b"head", head), (b"maxp", maxp), (b"hhea", hhea), (b"hmtx", hmtx), (b"cmap", cmap)];

        let num_tables = tables.len() as u16;
        let mut out = vec![0u8; 12 + 16 * tables.len()];
        out[0..4].copy_from_slice(&0x00010000u32.to_be_bytes());
        out[4..6].copy_from_slice(&num_tables.to_be_bytes());

        let mut body = Vec::new();
        for (i, (tag, data)) in tables.iter().enumerate() {
            let offset = out.len() + body.len();
            let rec = 12 + i * 16;
            out[rec..rec + 4].copy_from_slice(*tag);
            out[rec + 4..rec + 8].copy_from_slice(&0u32.to_be_bytes()); // checksum, unused by parser
            out[rec + 8..rec + 12].copy_from_slice(&(offset as u32).to_be_bytes());
            out[rec + 12..rec + 16].copy_from_slice(&(data.len() as u32).to_be_bytes());
            body.extend_from_slice(data);
            pad4(&mut body);
        }
        out.extend_from_slice(&body);
        out
    }
}
