//! L3: the document assembler — the write path (§4.2). Builds the Catalog,
//! Pages tree, Page dictionaries, content streams, and Font/XObject tables,
//! then serializes the whole graph in a single forward pass with no
//! back-patching (object numbers for fonts, images, and the Pages root are
//! all pre-computed before any page content is written).

use std::io::Write as IoWrite;
use std::sync::Arc;

use crate::color::Color;
use crate::content::{circle_ops, Op};
use crate::date::OffsetDateTime;
use crate::error::{Error, UsageError};
use crate::filters::deflate;
use crate::font::{build_embedded_font_objects, EmbeddedFont, EmbeddedFontIds, Font, StandardFont};
use crate::image::Image;
use crate::matrix::Matrix;
use crate::metadata::Metadata;
use crate::object::{hex_string, Dictionary, Name, Object, ObjectId, Stream, StringFormat};
use crate::page_size::{Orientation, PageSize};
use crate::resources::Resources;
use crate::security::{EncryptionOptions, SecurityHandler};
use crate::units::Pt;

/// Index of a font in the document's font table (§9 "arena + integer
/// indices").
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FontIndex(pub(crate) usize);

/// Index of an image in the document's image table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageIndex(pub(crate) usize);

/// Index of a page in the document's page arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageIndex(pub(crate) usize);

/// Options controlling how a document is serialized (§4.12, ambient).
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Whether page content streams are Flate-compressed. Defaults to
    /// `true` in release builds and `false` in debug builds, so tests get
    /// inspectable, uncompressed content streams while release consumers
    /// get compact output.
    pub compress: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions { compress: !cfg!(debug_assertions) }
    }
}

/// One page's growing content-stream buffer and the document-level
/// fonts/images it has referenced so far (§3.3, §4.3).
#[derive(Debug, Clone)]
pub struct Page {
    pub width: Pt,
    pub height: Pt,
    ops: Vec<Op>,
    used_fonts: Vec<usize>,
    used_images: Vec<usize>,
    current_font: Option<(usize, f32)>,
}

impl Page {
    fn new(width: Pt, height: Pt) -> Self {
        Page { width, height, ops: Vec::new(), used_fonts: Vec::new(), used_images: Vec::new(), current_font: None }
    }

    fn use_font(&mut self, idx: usize) {
        if !self.used_fonts.contains(&idx) {
            self.used_fonts.push(idx);
        }
    }

    fn use_image(&mut self, idx: usize) {
        if !self.used_images.contains(&idx) {
            self.used_images.push(idx);
        }
    }

    fn render(&self, opts: &WriteOptions) -> Vec<u8> {
        let mut buf = Vec::new();
        for op in &self.ops {
            op.write(&mut buf);
        }
        if opts.compress {
            deflate(&buf)
        } else {
            buf
        }
    }
}

fn font_resource_name(idx: usize) -> Name {
    Name(format!("F{}", idx + 1))
}

fn image_resource_name(idx: usize) -> Name {
    Name(format!("Im{}", idx + 1))
}

/// A complete PDF document under construction (§3.2, §6.3 `new_document`).
pub struct Document {
    pages: Vec<Page>,
    fonts: Vec<Font>,
    images: Vec<Image>,
    metadata: Metadata,
    encryption: Option<EncryptionOptions>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document { pages: Vec::new(), fonts: Vec::new(), images: Vec::new(), metadata: Metadata::new(), encryption: None }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_page(&mut self, size: PageSize, orientation: Orientation) -> PageIndex {
        let (w, h) = size.dimensions(orientation);
        self.pages.push(Page::new(w, h));
        PageIndex(self.pages.len() - 1)
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    pub fn set_encryption(&mut self, opts: EncryptionOptions) -> Result<(), Error> {
        self.encryption = Some(opts);
        Ok(())
    }

    /// Registers a standard (base-14) font, deduplicating by name.
    pub fn add_standard_font(&mut self, font: StandardFont) -> FontIndex {
        if let Some(i) = self.fonts.iter().position(|f| matches!(f, Font::Standard(existing) if *existing == font)) {
            return FontIndex(i);
        }
        self.fonts.push(Font::Standard(font));
        FontIndex(self.fonts.len() - 1)
    }

    /// Embeds a TrueType font's raw bytes, wrapped as a composite
    /// Type0/CIDFontType2 font at write time (§4.7).
    pub fn add_ttf_font(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<FontIndex, Error> {
        let font = EmbeddedFont::parse(name, bytes)?;
        self.fonts.push(Font::Embedded(Arc::new(font)));
        Ok(FontIndex(self.fonts.len() - 1))
    }

    pub fn add_jpeg_image(&mut self, bytes: Vec<u8>) -> Result<ImageIndex, Error> {
        self.images.push(Image::from_jpeg_bytes(bytes)?);
        Ok(ImageIndex(self.images.len() - 1))
    }

    pub fn add_png_image(&mut self, bytes: Vec<u8>) -> Result<ImageIndex, Error> {
        self.images.push(Image::from_png_bytes(bytes)?);
        Ok(ImageIndex(self.images.len() - 1))
    }

    fn page_mut(&mut self, page: PageIndex) -> Result<&mut Page, Error> {
        self.pages.get_mut(page.0).ok_or(UsageError::InvalidPageIndex(page.0).into())
    }

    // ---- graphics state -------------------------------------------------

    pub fn set_line_width(&mut self, page: PageIndex, width: f32) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::SetLineWidth(width));
        Ok(())
    }

    pub fn set_stroke_color(&mut self, page: PageIndex, color: Color) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::SetStrokeColor(color));
        Ok(())
    }

    pub fn set_fill_color(&mut self, page: PageIndex, color: Color) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::SetFillColor(color));
        Ok(())
    }

    pub fn set_line_cap(&mut self, page: PageIndex, cap: u8) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::SetLineCap(cap));
        Ok(())
    }

    pub fn set_line_join(&mut self, page: PageIndex, join: u8) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::SetLineJoin(join));
        Ok(())
    }

    pub fn save_state(&mut self, page: PageIndex) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::SaveState);
        Ok(())
    }

    pub fn restore_state(&mut self, page: PageIndex) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::RestoreState);
        Ok(())
    }

    // ---- paths ------------------------------------------------------

    pub fn move_to(&mut self, page: PageIndex, x: f32, y: f32) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::MoveTo(x, y));
        Ok(())
    }

    pub fn line_to(&mut self, page: PageIndex, x: f32, y: f32) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::LineTo(x, y));
        Ok(())
    }

    pub fn curve_to(&mut self, page: PageIndex, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::CurveTo(x1, y1, x2, y2, x3, y3));
        Ok(())
    }

    pub fn rect(&mut self, page: PageIndex, x: f32, y: f32, w: f32, h: f32) -> Result<(), Error> {
        if w < 0.0 || h < 0.0 {
            return Err(UsageError::NegativeDimensions.into());
        }
        self.page_mut(page)?.ops.push(Op::Rect(x, y, w, h));
        Ok(())
    }

    /// Approximates a circle with four cubic Béziers (§4.3, κ ≈ 0.5522847498).
    pub fn circle(&mut self, page: PageIndex, cx: f32, cy: f32, r: f32) -> Result<(), Error> {
        let ops = circle_ops(cx, cy, r);
        self.page_mut(page)?.ops.extend(ops);
        Ok(())
    }

    pub fn stroke(&mut self, page: PageIndex) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::Stroke);
        Ok(())
    }

    pub fn fill(&mut self, page: PageIndex) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::Fill);
        Ok(())
    }

    pub fn fill_stroke(&mut self, page: PageIndex) -> Result<(), Error> {
        self.page_mut(page)?.ops.push(Op::FillStroke);
        Ok(())
    }

    // ---- text ---------------------------------------------------------

    /// Sets the current font and size used by subsequent `draw_text` calls
    /// on this page (§6.3 "Page operations mirror §4.3").
    pub fn set_font(&mut self, page: PageIndex, font: FontIndex, size: f32) -> Result<(), Error> {
        if font.0 >= self.fonts.len() {
            return Err(UsageError::UnknownFontName(format!("font index {}", font.0)).into());
        }
        let p = self.page_mut(page)?;
        p.use_font(font.0);
        p.current_font = Some((font.0, size));
        Ok(())
    }

    /// Draws `text` at `(x, y)` with the page's current font (§4.3 `BT` /
    /// `Tf` / `Td` / `Tj` / `ET`). Encodes through WinAnsiEncoding for a
    /// standard font or Identity-H GIDs (tracked for the ToUnicode CMap)
    /// for an embedded TrueType font.
    pub fn draw_text(&mut self, page: PageIndex, text: &str, x: f32, y: f32) -> Result<(), Error> {
        let Some((font_idx, size)) = self.pages.get(page.0).and_then(|p| p.current_font) else {
            return Err(UsageError::NoFontSet.into());
        };
        let (bytes, format) = self.encode_text(font_idx, text);
        let name = font_resource_name(font_idx);
        let p = self.page_mut(page)?;
        p.ops.push(Op::BeginText);
        p.ops.push(Op::SetFont(name, size));
        p.ops.push(Op::TextPosition(x, y));
        p.ops.push(Op::ShowText(bytes, format));
        p.ops.push(Op::EndText);
        Ok(())
    }

    /// Draws `text` invisibly (`Tr 3`) wrapped in a `/Span <</ActualText
    /// ...>> BDC ... EMC` marked-content block, the minimal annotation this
    /// core supports: an OCR-backed invisible text layer over a scanned
    /// image (§1 "invisible text layers").
    pub fn draw_ocr_text_layer(&mut self, page: PageIndex, text: &str, x: f32, y: f32) -> Result<(), Error> {
        let Some((font_idx, size)) = self.pages.get(page.0).and_then(|p| p.current_font) else {
            return Err(UsageError::NoFontSet.into());
        };
        let (bytes, format) = self.encode_text(font_idx, text);
        let name = font_resource_name(font_idx);
        let p = self.page_mut(page)?;
        p.ops.push(Op::BeginText);
        p.ops.push(Op::SetFont(name, size));
        p.ops.push(Op::SetTextRenderMode(3));
        p.ops.push(Op::BeginMarkedContentActualText(text.to_string()));
        p.ops.push(Op::TextPosition(x, y));
        p.ops.push(Op::ShowText(bytes, format));
        p.ops.push(Op::EndMarkedContent);
        p.ops.push(Op::EndText);
        Ok(())
    }

    fn encode_text(&self, font_idx: usize, text: &str) -> (Vec<u8>, StringFormat) {
        match &self.fonts[font_idx] {
            Font::Standard(sf) if sf.has_builtin_encoding() => (text.as_bytes().to_vec(), StringFormat::Literal),
            Font::Standard(_) => (crate::font::encoding::encode_winansi(text), StringFormat::Literal),
            Font::Embedded(ef) => (ef.encode_and_track(text), StringFormat::Hex),
        }
    }

    // ---- images ---------------------------------------------------------

    /// Places `image` so its unit square maps to `(x, y, width, height)` in
    /// page space (§4.6 "standard image-placement convention"): `cm`
    /// receives `[width 0 0 height x y]`, then `Do` draws it.
    pub fn draw_image(&mut self, page: PageIndex, image: ImageIndex, x: f32, y: f32, width: f32, height: f32) -> Result<(), Error> {
        if width < 0.0 || height < 0.0 {
            return Err(UsageError::NegativeDimensions.into());
        }
        let name = image_resource_name(image.0);
        let p = self.page_mut(page)?;
        p.use_image(image.0);
        p.ops.push(Op::SaveState);
        p.ops.push(Op::ConcatMatrix(Matrix([width, 0.0, 0.0, height, x, y])));
        p.ops.push(Op::DrawXObject(name));
        p.ops.push(Op::RestoreState);
        Ok(())
    }

    // ---- serialization --------------------------------------------------

    pub fn write_to(&self, sink: &mut dyn IoWrite, opts: &WriteOptions, now: &OffsetDateTime) -> Result<(), Error> {
        let layout = self.plan_layout();
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.7\n");
        // Binary marker so naive byte-oriented tools treat this as binary.
        out.extend_from_slice(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n']);

        let mut xref_offsets: Vec<(u32, usize)> = Vec::new();

        let file_id = self.compute_file_id(now);
        let security = self.encryption.as_ref().map(|opts| SecurityHandler::new(opts, file_id.clone()));

        let mut emit = |out: &mut Vec<u8>, id: ObjectId, obj: Object, encrypt: bool| {
            xref_offsets.push((id.0, out.len()));
            let obj = if encrypt {
                if let Some(handler) = &security {
                    encrypt_object(&obj, id, handler)
                } else {
                    obj
                }
            } else {
                obj
            };
            crate::serializer::write_indirect_object(out, id, &obj);
        };

        for (idx, font) in self.fonts.iter().enumerate() {
            match font {
                Font::Standard(sf) => {
                    emit(&mut out, layout.font_ids[idx][0], Object::Dictionary(sf.to_dictionary()), true);
                }
                Font::Embedded(ef) => {
                    let ids = EmbeddedFontIds {
                        font_file: layout.font_ids[idx][0],
                        descriptor: layout.font_ids[idx][1],
                        cid_font: layout.font_ids[idx][2],
                        to_unicode: layout.font_ids[idx][3],
                        type0: layout.font_ids[idx][4],
                    };
                    for (id, obj) in build_embedded_font_objects(ef, &ids) {
                        emit(&mut out, id, obj, true);
                    }
                }
            }
        }

        for (idx, image) in self.images.iter().enumerate() {
            let smask_id = layout.image_smask_ids[idx];
            if let (Some(smask_id), Some(smask)) = (smask_id, &image.smask) {
                emit(&mut out, smask_id, Object::Stream(smask.to_xobject_stream(None)), true);
            }
            emit(&mut out, layout.image_ids[idx], Object::Stream(image.to_xobject_stream(smask_id)), true);
        }

        for (idx, page) in self.pages.iter().enumerate() {
            let content_bytes = page.render(opts);
            let mut content_dict = Dictionary::new();
            if opts.compress {
                content_dict.set("Filter", "FlateDecode");
            }
            let content = Stream::new(content_dict, content_bytes);
            emit(&mut out, layout.content_ids[idx], Object::Stream(content), true);

            let mut resources = Resources::new();
            for &fidx in &page.used_fonts {
                resources.use_font(font_resource_name(fidx), layout.font_ids[fidx][layout.font_ids[fidx].len() - 1]);
            }
            for &iidx in &page.used_images {
                resources.use_xobject(image_resource_name(iidx), layout.image_ids[iidx]);
            }

            let mut page_dict = Dictionary::new();
            page_dict.set("Type", "Page");
            page_dict.set("Parent", layout.pages_root_id);
            page_dict.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width.0 as f64),
                    Object::Real(page.height.0 as f64),
                ]),
            );
            page_dict.set("Contents", layout.content_ids[idx]);
            page_dict.set("Resources", resources.to_dictionary());
            emit(&mut out, layout.page_ids[idx], Object::Dictionary(page_dict), false);
        }

        let mut pages_root = Dictionary::new();
        pages_root.set("Type", "Pages");
        pages_root.set("Kids", Object::Array(layout.page_ids.iter().map(|id| Object::Reference(*id)).collect()));
        pages_root.set("Count", self.pages.len() as i64);
        emit(&mut out, layout.pages_root_id, Object::Dictionary(pages_root), false);

        let mut catalog = Dictionary::new();
        catalog.set("Type", "Catalog");
        catalog.set("Pages", layout.pages_root_id);
        emit(&mut out, layout.catalog_id, Object::Dictionary(catalog), false);

        if let Some(info_id) = layout.info_id {
            let info_dict = self.metadata.to_dictionary(now);
            emit(&mut out, info_id, Object::Dictionary(info_dict), true);
        }

        if let (Some(encrypt_id), Some(handler)) = (layout.encrypt_id, &security) {
            let mut encrypt_dict = Dictionary::new();
            encrypt_dict.set("Filter", "Standard");
            encrypt_dict.set("V", handler.key_length.v());
            encrypt_dict.set("R", handler.key_length.r());
            if handler.key_length.v() >= 2 {
                encrypt_dict.set("Length", (handler.encryption_key.len() * 8) as i64);
            }
            encrypt_dict.set("O", hex_string(handler.o.to_vec()));
            encrypt_dict.set("U", hex_string(handler.u.to_vec()));
            encrypt_dict.set("P", handler.permissions_raw as i64);
            // Encrypt dict strings are never themselves encrypted.
            emit(&mut out, encrypt_id, Object::Dictionary(encrypt_dict), false);
        }

        let xref_start = out.len();
        write_xref_and_trailer(&mut out, &xref_offsets, &layout, &file_id);
        out.extend_from_slice(format!("startxref\n{xref_start}\n%%EOF\n").as_bytes());

        sink.write_all(&out).map_err(Error::from)
    }

    fn compute_file_id(&self, now: &OffsetDateTime) -> Vec<u8> {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(crate::date::to_pdf_date_string(now).as_bytes());
        hasher.update(self.pages.len().to_le_bytes());
        hasher.update(self.fonts.len().to_le_bytes());
        let digest: [u8; 16] = hasher.finalize().into();
        digest.to_vec()
    }

    fn plan_layout(&self) -> Layout {
        let mut next = 1u32;
        let mut alloc = |count: u32| {
            let start = next;
            next += count;
            start
        };

        let font_ids: Vec<Vec<ObjectId>> = self
            .fonts
            .iter()
            .map(|f| {
                let n = match f {
                    Font::Standard(_) => 1,
                    Font::Embedded(_) => 5,
                };
                let start = alloc(n);
                (0..n).map(|i| ObjectId(start + i, 0)).collect()
            })
            .collect();

        let mut image_ids = Vec::with_capacity(self.images.len());
        let mut image_smask_ids = Vec::with_capacity(self.images.len());
        for image in &self.images {
            let smask_id = if image.smask.is_some() { Some(ObjectId(alloc(1), 0)) } else { None };
            image_smask_ids.push(smask_id);
            image_ids.push(ObjectId(alloc(1), 0));
        }

        let content_ids: Vec<ObjectId> = self.pages.iter().map(|_| ObjectId(alloc(1), 0)).collect();
        let page_ids: Vec<ObjectId> = self.pages.iter().map(|_| ObjectId(alloc(1), 0)).collect();
        let pages_root_id = ObjectId(alloc(1), 0);
        let catalog_id = ObjectId(alloc(1), 0);
        let info_id = Some(ObjectId(alloc(1), 0));
        let encrypt_id = self.encryption.as_ref().map(|_| ObjectId(alloc(1), 0));

        Layout { font_ids, image_ids, image_smask_ids, content_ids, page_ids, pages_root_id, catalog_id, info_id, encrypt_id }
    }
}

struct Layout {
    font_ids: Vec<Vec<ObjectId>>,
    image_ids: Vec<ObjectId>,
    image_smask_ids: Vec<Option<ObjectId>>,
    content_ids: Vec<ObjectId>,
    page_ids: Vec<ObjectId>,
    pages_root_id: ObjectId,
    catalog_id: ObjectId,
    info_id: Option<ObjectId>,
    encrypt_id: Option<ObjectId>,
}

/// Recursively rewrites every String and Stream payload in `obj` through
/// the per-object RC4 key for `(id.0, id.1)`, leaving Names, numbers, and
/// dictionary structure untouched (§4.10 "Every string and stream payload
/// is RC4-encrypted... at write time").
fn encrypt_object(obj: &Object, id: ObjectId, handler: &SecurityHandler) -> Object {
    match obj {
        Object::String(bytes, format) => Object::String(handler.crypt(id.0, id.1, bytes), *format),
        Object::Array(items) => Object::Array(items.iter().map(|o| encrypt_object(o, id, handler)).collect()),
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), encrypt_object(value, id, handler));
            }
            Object::Dictionary(new_dict)
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), encrypt_object(value, id, handler));
            }
            let data = handler.crypt(id.0, id.1, &stream.data);
            new_dict.set("Length", data.len() as i64);
            Object::Stream(Stream { dict: new_dict, data })
        }
        other => other.clone(),
    }
}

fn write_xref_and_trailer(out: &mut Vec<u8>, offsets: &[(u32, usize)], layout: &Layout, file_id: &[u8]) {
    let size = offsets.len() as u32 + 1;
    out.extend_from_slice(b"xref\n");
    out.extend_from_slice(format!("0 {size}\n").as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    let mut sorted = offsets.to_vec();
    sorted.sort_by_key(|(num, _)| *num);
    for (_, offset) in &sorted {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }

    out.extend_from_slice(b"trailer\n");
    let mut trailer = Dictionary::new();
    trailer.set("Size", size as i64);
    trailer.set("Root", layout.catalog_id);
    if let Some(info_id) = layout.info_id {
        trailer.set("Info", info_id);
    }
    if let Some(encrypt_id) = layout.encrypt_id {
        trailer.set("Encrypt", encrypt_id);
    }
    trailer.set(
        "ID",
        Object::Array(vec![hex_string(file_id.to_vec()), hex_string(file_id.to_vec())]),
    );
    crate::serializer::write_object(out, &Object::Dictionary(trailer));
    out.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_size::{Orientation, PageSize};
    use time::macros::datetime;

    fn write_doc(doc: &Document) -> Vec<u8> {
        let mut buf = Vec::new();
        let opts = WriteOptions { compress: false };
        let now = datetime!(2024-01-01 00:00:00 UTC);
        doc.write_to(&mut buf, &opts, &now).unwrap();
        buf
    }

    #[test]
    fn empty_document_is_well_formed() {
        let doc = Document::new();
        let bytes = write_doc(&doc);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.7\n"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("/Count 0"));
        assert!(text.contains("startxref"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn hello_world_contains_expected_operators() {
        let mut doc = Document::new();
        let page = doc.add_page(PageSize::A4, Orientation::Portrait);
        let font = doc.add_standard_font(StandardFont::Helvetica);
        doc.set_font(page, font, 12.0).unwrap();
        doc.draw_text(page, "Hello, World!", 100.0, 700.0).unwrap();
        let bytes = write_doc(&doc);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("BT"));
        assert!(text.contains("/F1 12.00 Tf"));
        assert!(text.contains("100.00 700.00 Td"));
        assert!(text.contains("(Hello, World!) Tj"));
        assert!(text.contains("ET"));
    }

    fn tiny_jpeg() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8]; // SOI
        let components: u8 = 3;
        let mut sof = vec![0xFFu8, 0xC0];
        let seg_len = 8 + 3 * components as usize;
        sof.extend_from_slice(&(seg_len as u16).to_be_bytes());
        sof.push(8); // precision
        sof.extend_from_slice(&10u16.to_be_bytes()); // height
        sof.extend_from_slice(&10u16.to_be_bytes()); // width
        sof.push(components);
        for i in 0..components {
            sof.extend_from_slice(&[i + 1, 0x11, 0]);
        }
        data.extend_from_slice(&sof);
        data.extend_from_slice(&[0xFF, 0xD9]); // EOI
        data
    }

    #[test]
    fn repeated_image_draw_reuses_one_xobject() {
        let mut doc = Document::new();
        let page1 = doc.add_page(PageSize::A4, Orientation::Portrait);
        let page2 = doc.add_page(PageSize::A4, Orientation::Portrait);
        let jpeg = tiny_jpeg();
        let image = doc.add_jpeg_image(jpeg).unwrap();
        doc.draw_image(page1, image, 0.0, 0.0, 100.0, 100.0).unwrap();
        doc.draw_image(page1, image, 50.0, 50.0, 100.0, 100.0).unwrap();
        doc.draw_image(page2, image, 0.0, 0.0, 100.0, 100.0).unwrap();
        let bytes = write_doc(&doc);
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Filter /DCTDecode").count(), 1);
        assert_eq!(text.matches(" Do\n").count(), 3);
    }

    #[test]
    fn xref_offsets_match_object_positions() {
        let mut doc = Document::new();
        doc.add_page(PageSize::A4, Orientation::Portrait);
        let bytes = write_doc(&doc);
        let text = String::from_utf8(bytes).unwrap();
        let xref_pos = text.find("\nxref\n").unwrap() + 1;
        let xref_section = &text[xref_pos..];
        for line in xref_section.lines().skip(2) {
            if !line.ends_with('n') && !line.ends_with("n ") {
                break;
            }
            let offset: usize = line[..10].parse().unwrap();
            assert!(text[offset..].starts_with(|c: char| c.is_ascii_digit()));
        }
    }
}
