//! A minimal, from-scratch TrueType table reader (§4.7 supplement).
//!
//! No glyph-outline rendering is needed (the core never rasterizes), so
//! only the tables required to embed the font and describe it to a PDF
//! viewer are parsed: `head`, `maxp`, `hhea`, `hmtx`, `cmap` (formats 4
//! and 12), and `OS/2` (for cap-height / ascent / descent when present).

use crate::error::{Error, ResourceError};

fn malformed(msg: impl Into<String>) -> Error {
    ResourceError::MalformedFont(msg.into()).into()
}

fn u16_at(buf: &[u8], off: usize) -> Result<u16, Error> {
    let b = buf.get(off..off + 2).ok_or_else(|| malformed("truncated table"))?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

fn i16_at(buf: &[u8], off: usize) -> Result<i16, Error> {
    Ok(u16_at(buf, off)? as i16)
}

fn u32_at(buf: &[u8], off: usize) -> Result<u32, Error> {
    let b = buf.get(off..off + 4).ok_or_else(|| malformed("truncated table"))?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Byte ranges of the tables this parser cares about, found by walking
/// the `sfnt` table directory once at parse time.
#[derive(Debug, Default)]
struct TableDirectory {
    head: Option<(usize, usize)>,
    maxp: Option<(usize, usize)>,
    hhea: Option<(usize, usize)>,
    hmtx: Option<(usize, usize)>,
    cmap: Option<(usize, usize)>,
    os2: Option<(usize, usize)>,
}

fn read_directory(data: &[u8]) -> Result<TableDirectory, Error> {
    let num_tables = u16_at(data, 4)?;
    let mut dir = TableDirectory::default();
    for i in 0..num_tables as usize {
        let rec_off = 12 + i * 16;
        let tag = data.get(rec_off..rec_off + 4).ok_or_else(|| malformed("truncated directory"))?;
        let offset = u32_at(data, rec_off + 8)? as usize;
        let length = u32_at(data, rec_off + 12)? as usize;
        let entry = Some((offset, length));
        match tag {
            b"head" => dir.head = entry,
            b"maxp" => dir.maxp = entry,
            b"hhea" => dir.hhea = entry,
            b"hmtx" => dir.hmtx = entry,
            b"cmap" => dir.cmap = entry,
            b"OS/2" => dir.os2 = entry,
            _ => {}
        }
    }
    Ok(dir)
}

#[derive(Debug, Clone, Copy)]
pub struct FontBBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

#[derive(Debug, Clone)]
pub struct ParsedTrueTypeFont {
    pub units_per_em: u16,
    pub bbox: FontBBox,
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    pub italic_angle: f32,
    num_glyphs: u16,
    advance_widths: Vec<u16>,
    cmap_pairs: Vec<(u32, u16)>, // sorted by codepoint
}

impl ParsedTrueTypeFont {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 12 {
            return Err(malformed("file too small to be a TrueType font"));
        }
        let dir = read_directory(data)?;

        let (head_off, _) = dir.head.ok_or_else(|| malformed("missing head table"))?;
        let units_per_em = u16_at(data, head_off + 18)?;
        let x_min = i16_at(data, head_off + 36)?;
        let y_min = i16_at(data, head_off + 38)?;
        let x_max = i16_at(data, head_off + 40)?;
        let y_max = i16_at(data, head_off + 42)?;

        let (maxp_off, _) = dir.maxp.ok_or_else(|| malformed("missing maxp table"))?;
        let num_glyphs = u16_at(data, maxp_off + 4)?;

        let (hhea_off, _) = dir.hhea.ok_or_else(|| malformed("missing hhea table"))?;
        let ascent = i16_at(data, hhea_off + 4)?;
        let descent = i16_at(data, hhea_off + 6)?;
        let num_h_metrics = u16_at(data, hhea_off + 34)?;

        let (hmtx_off, _) = dir.hmtx.ok_or_else(|| malformed("missing hmtx table"))?;
        let mut advance_widths = Vec::with_capacity(num_glyphs as usize);
        let mut last_width = 0u16;
        for i in 0..num_h_metrics as usize {
            let rec = hmtx_off + i * 4;
            last_width = u16_at(data, rec)?;
            advance_widths.push(last_width);
        }
        while advance_widths.len() < num_glyphs as usize {
            advance_widths.push(last_width);
        }

        let (cap_height, italic_angle) = if let Some((os2_off, len)) = dir.os2 {
            let cap_height = if len >= 90 { i16_at(data, os2_off + 88).unwrap_or(ascent) } else { ascent };
            (cap_height, 0.0)
        } else {
            (ascent, 0.0)
        };

        let cmap_pairs = dir.cmap.map(|(off, _)| parse_cmap(data, off)).transpose()?.unwrap_or_default();

        Ok(ParsedTrueTypeFont {
            units_per_em: if units_per_em == 0 { 1000 } else { units_per_em },
            bbox: FontBBox { x_min, y_min, x_max, y_max },
            ascent,
            descent,
            cap_height,
            italic_angle,
            num_glyphs,
            advance_widths,
            cmap_pairs,
        })
    }

    /// Unicode code point -> glyph index, via the parsed `cmap` subtable.
    pub fn lookup_glyph_index(&self, codepoint: u32) -> Option<u16> {
        self.cmap_pairs
            .binary_search_by_key(&codepoint, |(cp, _)| *cp)
            .ok()
            .map(|i| self.cmap_pairs[i].1)
    }

    /// Advance width of `gid` in font units (`hmtx`).
    pub fn advance_width(&self, gid: u16) -> u16 {
        self.advance_widths.get(gid as usize).copied().unwrap_or_else(|| {
            self.advance_widths.last().copied().unwrap_or(self.units_per_em / 2)
        })
    }

    pub fn scale_to_1000(&self, font_units: i32) -> i32 {
        (font_units * 1000) / self.units_per_em as i32
    }

    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }
}

/// Parses the `cmap` table, preferring a (3,1) or (0,x) Unicode BMP
/// subtable in format 4, falling back to a format 12 full-Unicode
/// subtable if present.
fn parse_cmap(data: &[u8], cmap_off: usize) -> Result<Vec<(u32, u16)>, Error> {
    let num_subtables = u16_at(data, cmap_off + 2)?;
    let mut best: Option<(u16, u16, usize)> = None; // (platform, encoding, offset)
    for i in 0..num_subtables as usize {
        let rec = cmap_off + 4 + i * 8;
        let platform_id = u16_at(data, rec)?;
        let encoding_id = u16_at(data, rec + 2)?;
        let offset = u32_at(data, rec + 4)? as usize;
        let rank = match (platform_id, encoding_id) {
            (3, 10) => 3,
            (0, 4) | (0, 6) => 3,
            (3, 1) => 2,
            (0, _) => 2,
            (1, 0) => 1,
            _ => 0,
        };
        let cur_rank = best.map(|(p, e, _)| match (p, e) {
            (3, 10) => 3,
            (0, 4) | (0, 6) => 3,
            (3, 1) => 2,
            (0, _) => 2,
            (1, 0) => 1,
            _ => 0,
        });
        if cur_rank.map(|r| rank > r).unwrap_or(true) {
            best = Some((platform_id, encoding_id, cmap_off + offset));
        }
    }
    let Some((_, _, sub_off)) = best else {
        return Ok(Vec::new());
    };
    let format = u16_at(data, sub_off)?;
    let mut pairs = match format {
        4 => parse_cmap_format4(data, sub_off)?,
        12 => parse_cmap_format12(data, sub_off)?,
        _ => Vec::new(),
    };
    pairs.sort_by_key(|(cp, _)| *cp);
    pairs.dedup_by_key(|(cp, _)| *cp);
    Ok(pairs)
}

fn parse_cmap_format4(data: &[u8], off: usize) -> Result<Vec<(u32, u16)>, Error> {
    let seg_count_x2 = u16_at(data, off + 6)?;
    let seg_count = (seg_count_x2 / 2) as usize;
    let end_codes_off = off + 14;
    let start_codes_off = end_codes_off + seg_count_x2 as usize + 2;
    let id_delta_off = start_codes_off + seg_count_x2 as usize;
    let id_range_off = id_delta_off + seg_count_x2 as usize;

    let mut pairs = Vec::new();
    for seg in 0..seg_count {
        let end_code = u16_at(data, end_codes_off + seg * 2)?;
        let start_code = u16_at(data, start_codes_off + seg * 2)?;
        let id_delta = i16_at(data, id_delta_off + seg * 2)?;
        let id_range_offset = u16_at(data, id_range_off + seg * 2)?;
        if start_code == 0xFFFF && end_code == 0xFFFF {
            continue;
        }
        for codepoint in start_code..=end_code {
            let gid = if id_range_offset == 0 {
                (codepoint as i32 + id_delta as i32) as u16
            } else {
                let glyph_index_addr = id_range_off
                    + seg * 2
                    + id_range_offset as usize
                    + 2 * (codepoint - start_code) as usize;
                let raw = u16_at(data, glyph_index_addr)?;
                if raw == 0 {
                    0
                } else {
                    (raw as i32 + id_delta as i32) as u16
                }
            };
            if gid != 0 {
                pairs.push((codepoint as u32, gid));
            }
        }
    }
    Ok(pairs)
}

fn parse_cmap_format12(data: &[u8], off: usize) -> Result<Vec<(u32, u16)>, Error> {
    let num_groups = u32_at(data, off + 12)?;
    let mut pairs = Vec::new();
    for i in 0..num_groups as usize {
        let rec = off + 16 + i * 12;
        let start_char = u32_at(data, rec)?;
        let end_char = u32_at(data, rec + 4)?;
        let start_gid = u32_at(data, rec + 8)?;
        for (offset, codepoint) in (start_char..=end_char).enumerate() {
            pairs.push((codepoint, (start_gid as usize + offset) as u16));
        }
    }
    Ok(pairs)
}
