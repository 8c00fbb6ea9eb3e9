//! L3/L4: the font subsystem (§4.7). Two font kinds:
//!
//!   - `StandardFont`: one of the 14 base-14 PostScript fonts. No payload;
//!     the viewer supplies glyphs. Encoded with WinAnsiEncoding (Symbol and
//!     ZapfDingbats keep their built-in encoding).
//!   - `EmbeddedFont`: a composite Type0/CIDFontType2 font wrapping a raw
//!     TrueType payload, drawn with Identity-H 2-byte codes. Owns the live
//!     `ParsedTrueTypeFont` and the per-document set of glyph indices the
//!     document has actually drawn, which feeds the ToUnicode CMap at
//!     write time (§3.4).

pub mod cmap;
pub mod encoding;
pub mod truetype;

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Error, ResourceError};
use crate::font::truetype::ParsedTrueTypeFont;
use crate::object::{Dictionary, Name, Object, ObjectId, Stream};

/// One of the 14 built-in PostScript fonts every PDF viewer supplies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StandardFont {
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub fn base_name(self) -> &'static str {
        use StandardFont::*;
        match self {
            TimesRoman => "Times-Roman",
            TimesBold => "Times-Bold",
            TimesItalic => "Times-Italic",
            TimesBoldItalic => "Times-BoldItalic",
            Helvetica => "Helvetica",
            HelveticaBold => "Helvetica-Bold",
            HelveticaOblique => "Helvetica-Oblique",
            HelveticaBoldOblique => "Helvetica-BoldOblique",
            Courier => "Courier",
            CourierBold => "Courier-Bold",
            CourierOblique => "Courier-Oblique",
            CourierBoldOblique => "Courier-BoldOblique",
            Symbol => "Symbol",
            ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Symbol and ZapfDingbats carry their own built-in encoding; every
    /// other standard font is drawn with WinAnsiEncoding (§4.7).
    pub fn has_builtin_encoding(self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    pub fn from_base_name(name: &str) -> Option<Self> {
        use StandardFont::*;
        Some(match name {
            "Times-Roman" => TimesRoman,
            "Times-Bold" => TimesBold,
            "Times-Italic" => TimesItalic,
            "Times-BoldItalic" => TimesBoldItalic,
            "Helvetica" => Helvetica,
            "Helvetica-Bold" => HelveticaBold,
            "Helvetica-Oblique" => HelveticaOblique,
            "Helvetica-BoldOblique" => HelveticaBoldOblique,
            "Courier" => Courier,
            "Courier-Bold" => CourierBold,
            "Courier-Oblique" => CourierOblique,
            "Courier-BoldOblique" => CourierBoldOblique,
            "Symbol" => Symbol,
            "ZapfDingbats" => ZapfDingbats,
            _ => return None,
        })
    }

    /// The simple font dictionary written to the PDF (§4.2 step 3).
    pub fn to_dictionary(self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", "Font");
        dict.set("Subtype", "Type1");
        dict.set("BaseFont", self.base_name());
        if !self.has_builtin_encoding() {
            dict.set("Encoding", "WinAnsiEncoding");
        }
        dict
    }
}

/// An embedded TrueType font, wrapped as a composite Type0/CIDFontType2
/// font (Identity-H). Shared (document-wide) used-glyph tracking is guarded
/// by a mutex per the concurrency model in spec §5.
#[derive(Debug)]
pub struct EmbeddedFont {
    pub name: String,
    pub bytes: Vec<u8>,
    pub parsed: ParsedTrueTypeFont,
    /// GID -> Unicode code point, accumulated as text is drawn.
    used_glyphs: Mutex<BTreeMap<u16, u32>>,
}

impl EmbeddedFont {
    pub fn parse(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Error> {
        let parsed = ParsedTrueTypeFont::parse(&bytes)?;
        Ok(EmbeddedFont { name: name.into(), bytes, parsed, used_glyphs: Mutex::new(BTreeMap::new()) })
    }

    /// Converts UTF-8 text to a sequence of 2-byte GIDs (Identity-H
    /// encoding), recording each GID's originating code point for the
    /// eventual ToUnicode CMap. Code points with no glyph in the font's
    /// `cmap` are silently skipped (mirroring the "best effort" behavior
    /// of the documented source).
    pub fn encode_and_track(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * 2);
        let mut used = self.used_glyphs.lock().unwrap_or_else(|e| e.into_inner());
        for c in text.chars() {
            let Some(gid) = self.parsed.lookup_glyph_index(c as u32) else {
                continue;
            };
            out.extend_from_slice(&gid.to_be_bytes());
            used.entry(gid).or_insert(c as u32);
        }
        out
    }

    pub fn used_glyphs_snapshot(&self) -> BTreeMap<u16, u32> {
        self.used_glyphs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Advance width of `gid`, scaled into PDF's 1000-unit glyph space.
    pub fn width_1000(&self, gid: u16) -> i32 {
        self.parsed.scale_to_1000(self.parsed.advance_width(gid) as i32)
    }

    fn descriptor_flags(&self) -> i64 {
        32 // symbolic; the core embeds arbitrary glyph sets, not a named script
    }
}

/// A font usable on a page: either a built-in PostScript font or an
/// embedded TrueType font wrapped as a composite Type0 font.
#[derive(Debug, Clone)]
pub enum Font {
    Standard(StandardFont),
    Embedded(std::sync::Arc<EmbeddedFont>),
}

impl Font {
    pub fn is_composite(&self) -> bool {
        matches!(self, Font::Embedded(_))
    }
}

/// Object numbers for the five-object chain an embedded font emits
/// (§4.7): FontFile2, FontDescriptor, CIDFont, ToUnicode, Type0.
pub struct EmbeddedFontIds {
    pub font_file: ObjectId,
    pub descriptor: ObjectId,
    pub cid_font: ObjectId,
    pub to_unicode: ObjectId,
    pub type0: ObjectId,
}

/// Builds the five indirect objects for an embedded font chain, returning
/// them in write order (FontFile2, FontDescriptor, CIDFont, ToUnicode,
/// Type0 — the Type0 dict is the one referenced from `/Font` resources).
pub fn build_embedded_font_objects(font: &EmbeddedFont, ids: &EmbeddedFontIds) -> Vec<(ObjectId, Object)> {
    let mut objects = Vec::with_capacity(5);

    let mut font_file_dict = Dictionary::new();
    font_file_dict.set("Length1", font.bytes.len() as i64);
    let font_file_stream = Stream::new(font_file_dict, font.bytes.clone());
    objects.push((ids.font_file, Object::Stream(font_file_stream)));

    let bbox = font.parsed.bbox;
    let to_1000 = |v: i16| font.parsed.scale_to_1000(v as i32);
    let mut descriptor = Dictionary::new();
    descriptor.set("Type", "FontDescriptor");
    descriptor.set("FontName", font.name.as_str());
    descriptor.set("Flags", font.descriptor_flags());
    descriptor.set(
        "FontBBox",
        Object::Array(vec![
            Object::Integer(to_1000(bbox.x_min) as i64),
            Object::Integer(to_1000(bbox.y_min) as i64),
            Object::Integer(to_1000(bbox.x_max) as i64),
            Object::Integer(to_1000(bbox.y_max) as i64),
        ]),
    );
    descriptor.set("ItalicAngle", font.parsed.italic_angle as f64);
    descriptor.set("Ascent", to_1000(font.parsed.ascent) as i64);
    descriptor.set("Descent", to_1000(font.parsed.descent) as i64);
    descriptor.set("CapHeight", to_1000(font.parsed.cap_height) as i64);
    descriptor.set("StemV", 80i64);
    descriptor.set("FontFile2", ids.font_file);
    objects.push((ids.descriptor, Object::Dictionary(descriptor)));

    let used = font.used_glyphs_snapshot();
    let mut cid_font = Dictionary::new();
    cid_font.set("Type", "Font");
    cid_font.set("Subtype", "CIDFontType2");
    cid_font.set("BaseFont", font.name.as_str());
    let mut cid_system_info = Dictionary::new();
    cid_system_info.set("Registry", crate::object::literal_string(b"Adobe".to_vec()));
    cid_system_info.set("Ordering", crate::object::literal_string(b"Identity".to_vec()));
    cid_system_info.set("Supplement", 0i64);
    cid_font.set("CIDSystemInfo", cid_system_info);
    cid_font.set("FontDescriptor", ids.descriptor);
    cid_font.set("DW", 1000i64);
    cid_font.set("CIDToGIDMap", "Identity");
    if !used.is_empty() {
        cid_font.set("W", widths_array(font, &used));
    }
    objects.push((ids.cid_font, Object::Dictionary(cid_font)));

    let mut to_unicode_map = cmap::ToUnicodeCMap::new();
    to_unicode_map.mappings = used.iter().map(|(gid, cp)| (*gid as u32, *cp)).collect();
    let to_unicode_stream = Stream::new(Dictionary::new(), to_unicode_map.to_stream_body());
    objects.push((ids.to_unicode, Object::Stream(to_unicode_stream)));

    let mut type0 = Dictionary::new();
    type0.set("Type", "Font");
    type0.set("Subtype", "Type0");
    type0.set("BaseFont", font.name.as_str());
    type0.set("Encoding", "Identity-H");
    type0.set("DescendantFonts", Object::Array(vec![Object::Reference(ids.cid_font)]));
    type0.set("ToUnicode", ids.to_unicode);
    objects.push((ids.type0, Object::Dictionary(type0)));

    objects
}

/// A `/W` widths array of the form `[gid [w]]` per used glyph, skipping
/// the `DW` default (1000) where the TTF's own width already matches it.
fn widths_array(font: &EmbeddedFont, used: &BTreeMap<u16, u32>) -> Object {
    let mut entries = Vec::new();
    for gid in used.keys() {
        let w = font.width_1000(*gid);
        entries.push(Object::Integer(*gid as i64));
        entries.push(Object::Array(vec![Object::Integer(w as i64)]));
    }
    Object::Array(entries)
}

pub fn malformed(msg: impl Into<String>) -> Error {
    ResourceError::MalformedFont(msg.into()).into()
}
