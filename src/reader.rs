//! L4: the document reader (§4.5). Locates `startxref`, parses the
//! classical cross-reference table and trailer, follows the `/Prev` chain
//! (capped by `ReadOptions::max_prev_chain`), and resolves indirect
//! references lazily with memoization. Falls back to a linear scan of
//! `N G obj` headers when the xref table is missing or malformed.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{Error, FormatError, SecurityError, UsageError};
use crate::filters::{decode_stream, is_image_passthrough_filter};
use crate::interpreter::{self, ImageInfo, PageLayout, TextElement};
use crate::lexer::{Lexer, Token};
use crate::metadata::Metadata;
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::parser::ObjectParser;
use crate::security::SecurityHandler;

/// Options controlling how a document is read back (§4.12, ambient).
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Maximum number of `/Prev` hops followed before giving up, guarding
    /// against a cyclic or pathologically long update chain.
    pub max_prev_chain: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { max_prev_chain: 32 }
    }
}

#[derive(Debug, Clone, Copy)]
enum XrefEntry {
    InUse { offset: usize, generation: u16 },
    Free,
}

/// A loaded PDF file, ready for random-access object lookup (§3.2 "the
/// reader owns the raw bytes and a lazily-populated object cache").
pub struct Reader {
    buf: Vec<u8>,
    xref: BTreeMap<u32, XrefEntry>,
    trailer: Dictionary,
    security: Option<SecurityHandler>,
    cache: RefCell<BTreeMap<ObjectId, Object>>,
}

impl Reader {
    pub fn open(buf: Vec<u8>, opts: &ReadOptions) -> Result<Self, Error> {
        let (xref, trailer) = match Self::load_xref_chain(&buf, opts) {
            Ok(pair) => pair,
            Err(_) => Self::linear_scan(&buf),
        };
        Ok(Reader { buf, xref, trailer, security: None, cache: RefCell::new(BTreeMap::new()) })
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.get("Encrypt").is_some()
    }

    /// Tries `password` as either the user or owner password. On success,
    /// wires up the security handler used by every subsequent `get` call
    /// and invalidates any objects already cached unencrypted.
    pub fn authenticate(&mut self, password: &str) -> Result<bool, Error> {
        let Some(encrypt_ref) = self.trailer.get("Encrypt").and_then(Object::as_reference) else {
            return Err(SecurityError::NotEncrypted.into());
        };
        let encrypt_obj = self.fetch_raw(encrypt_ref)?;
        let dict = encrypt_obj.as_dict().ok_or(FormatError::UnrecognizedObject)?.clone();
        let v = dict.get("V").and_then(Object::as_integer).unwrap_or(1);
        let r = dict.get("R").and_then(Object::as_integer).unwrap_or(2);
        let o = to_array32(&string_bytes(dict.get("O"))?)?;
        let u = to_array32(&string_bytes(dict.get("U"))?)?;
        let permissions_raw = dict.get("P").and_then(Object::as_integer).unwrap_or(-1) as i32;
        let file_id = self.file_id();

        let mut handler = SecurityHandler::from_parts(v, r, o, u, permissions_raw, file_id, Vec::new())?;
        let key = handler.try_user_password(password).or_else(|| handler.try_owner_password(password));
        let Some(key) = key else {
            return Ok(false);
        };
        handler.encryption_key = key;
        self.security = Some(handler);
        self.cache.borrow_mut().clear();
        Ok(true)
    }

    fn file_id(&self) -> Vec<u8> {
        match self.trailer.get("ID").and_then(Object::as_array).and_then(|a| a.first()) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            _ => Vec::new(),
        }
    }

    /// Parses the object at `id`'s xref offset without decrypting it.
    fn fetch_raw(&self, id: ObjectId) -> Result<Object, Error> {
        let entry = self.xref.get(&id.0).copied().ok_or(FormatError::MalformedXref)?;
        let XrefEntry::InUse { offset, .. } = entry else {
            return Err(FormatError::MalformedXref.into());
        };
        let body_off = object_body_offset(&self.buf, offset)?;
        let mut parser = ObjectParser::new(&self.buf, body_off);
        parser.parse_object()
    }

    /// Resolves an indirect reference to its underlying object, decrypting
    /// string/stream payloads when the document is encrypted, memoizing
    /// the result for later lookups.
    pub fn get(&self, id: ObjectId) -> Result<Object, Error> {
        if let Some(obj) = self.cache.borrow().get(&id) {
            return Ok(obj.clone());
        }
        let raw = self.fetch_raw(id)?;
        let obj = match &self.security {
            Some(handler) => decrypt_object(&raw, id, handler),
            None => raw,
        };
        self.cache.borrow_mut().insert(id, obj.clone());
        Ok(obj)
    }

    /// Resolves `obj` if it's a reference, otherwise clones it in place.
    pub fn resolve(&self, obj: &Object) -> Result<Object, Error> {
        match obj {
            Object::Reference(id) => self.get(*id),
            other => Ok(other.clone()),
        }
    }

    pub fn catalog(&self) -> Result<Dictionary, Error> {
        let root = self.trailer.get("Root").ok_or(FormatError::MalformedXref)?.clone();
        let obj = self.resolve(&root)?;
        obj.as_dict().cloned().ok_or_else(|| FormatError::UnrecognizedObject.into())
    }

    /// Reads `/Info`, defaulting to empty metadata if absent or malformed.
    pub fn metadata(&self) -> Metadata {
        let Some(info) = self.trailer.get("Info").cloned() else {
            return Metadata::new();
        };
        match self.resolve(&info) {
            Ok(obj) => obj.as_dict().map(Metadata::from_dictionary).unwrap_or_default(),
            Err(_) => Metadata::new(),
        }
    }

    /// Number of leaf pages in the document.
    pub fn page_count(&self) -> Result<usize, Error> {
        Ok(self.page_ids()?.len())
    }

    /// Walks the page tree from the catalog's `/Pages` root, returning leaf
    /// page object ids in document order (§4.5 "page tree traversal").
    pub fn page_ids(&self) -> Result<Vec<ObjectId>, Error> {
        let catalog = self.catalog()?;
        let pages_ref = catalog.get("Pages").and_then(Object::as_reference).ok_or(FormatError::MalformedXref)?;
        let mut out = Vec::new();
        self.collect_pages(pages_ref, &mut out, 0)?;
        Ok(out)
    }

    fn collect_pages(&self, id: ObjectId, out: &mut Vec<ObjectId>, depth: usize) -> Result<(), Error> {
        if depth > 64 {
            return Err(FormatError::MalformedXref.into());
        }
        let obj = self.get(id)?;
        let dict = obj.as_dict().ok_or(FormatError::UnrecognizedObject)?;
        if dict.get("Type").and_then(Object::as_name) == Some("Page") {
            out.push(id);
            return Ok(());
        }
        let kids = dict.get("Kids").and_then(Object::as_array).ok_or(FormatError::MalformedXref)?;
        for kid in kids {
            let kid_id = kid.as_reference().ok_or(FormatError::MalformedXref)?;
            self.collect_pages(kid_id, out, depth + 1)?;
        }
        Ok(())
    }

    pub fn page_dict(&self, id: ObjectId) -> Result<Dictionary, Error> {
        self.get(id)?.as_dict().cloned().ok_or_else(|| FormatError::UnrecognizedObject.into())
    }

    /// Concatenates and filter-decodes a page's `/Contents` (a single
    /// stream or an array of streams, per §4.5).
    pub fn page_content_bytes(&self, page: &Dictionary) -> Result<Vec<u8>, Error> {
        let Some(contents) = page.get("Contents") else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        match contents {
            Object::Array(items) => {
                for item in items {
                    if let Object::Stream(stream) = self.resolve(item)? {
                        out.extend(decode_stream(&stream.dict, &stream.data)?);
                        out.push(b'\n');
                    }
                }
            }
            other => {
                if let Object::Stream(stream) = self.resolve(other)? {
                    out.extend(decode_stream(&stream.dict, &stream.data)?);
                }
            }
        }
        Ok(out)
    }

    /// Resolves and filter-decodes an arbitrary stream object, e.g. an
    /// image XObject referenced from `/Resources`. `/DCTDecode` payloads
    /// are returned untouched (still-encoded JPEG bytes).
    pub fn stream_bytes(&self, id: ObjectId) -> Result<(Dictionary, Vec<u8>), Error> {
        let Object::Stream(stream) = self.get(id)? else {
            return Err(FormatError::UnrecognizedObject.into());
        };
        if is_image_passthrough_filter(&stream.dict) {
            return Ok((stream.dict, stream.data));
        }
        let decoded = decode_stream(&stream.dict, &stream.data)?;
        Ok((stream.dict, decoded))
    }

    /// Interprets a page's content stream against its own `/Resources`,
    /// reconstructing the text and image layout (§4.6, §6.3
    /// `extract_page_layout`).
    pub fn extract_page_layout(&self, index: usize) -> Result<PageLayout, Error> {
        let (content, resources) = self.page_content_and_resources(index)?;
        interpreter::extract_page_layout(self, &content, &resources)
    }

    /// Flattens `extract_page_layout`'s text blocks into one string, in
    /// reading order (§6.3 `extract_page_text`).
    pub fn extract_page_text(&self, index: usize) -> Result<String, Error> {
        let layout = self.extract_page_layout(index)?;
        Ok(interpreter::page_text(&layout))
    }

    /// Flattens `extract_page_layout`'s text blocks back into their
    /// underlying positioned runs (§6.3 `extract_page_text_elements`).
    pub fn extract_page_text_elements(&self, index: usize) -> Result<Vec<TextElement>, Error> {
        let layout = self.extract_page_layout(index)?;
        Ok(interpreter::page_text_elements(&layout))
    }

    /// Reads every image XObject a page's content stream actually draws
    /// with (§6.3 `extract_images`).
    pub fn extract_images(&self, index: usize) -> Result<Vec<ImageInfo>, Error> {
        let (content, resources) = self.page_content_and_resources(index)?;
        interpreter::extract_images(self, &content, &resources)
    }

    fn page_content_and_resources(&self, index: usize) -> Result<(Vec<u8>, Dictionary), Error> {
        let ids = self.page_ids()?;
        let id = *ids.get(index).ok_or(UsageError::InvalidPageIndex(index))?;
        let page = self.page_dict(id)?;
        let content = self.page_content_bytes(&page)?;
        let resources = page.get("Resources").and_then(Object::as_dict).cloned().unwrap_or_default();
        Ok((content, resources))
    }

    fn load_xref_chain(buf: &[u8], opts: &ReadOptions) -> Result<(BTreeMap<u32, XrefEntry>, Dictionary), Error> {
        let start = find_startxref(buf)?;
        let mut xref = BTreeMap::new();
        let mut trailer: Option<Dictionary> = None;
        let mut next = Some(start);
        let mut hops = 0;
        while let Some(offset) = next {
            if hops > opts.max_prev_chain {
                break;
            }
            hops += 1;
            let (section, section_trailer) = parse_xref_section(buf, offset)?;
            for (num, entry) in section {
                xref.entry(num).or_insert(entry);
            }
            next = section_trailer.get("Prev").and_then(Object::as_integer).map(|n| n as usize);
            if trailer.is_none() {
                trailer = Some(section_trailer);
            }
        }
        let trailer = trailer.ok_or(FormatError::MissingStartXref)?;
        Ok((xref, trailer))
    }

    /// Scans the whole file for `N G obj` headers and recovers a trailer
    /// from the last `trailer` keyword found, or else by locating the
    /// Catalog object directly (§4.5 "malformed xref fallback").
    fn linear_scan(buf: &[u8]) -> (BTreeMap<u32, XrefEntry>, Dictionary) {
        let mut xref = BTreeMap::new();
        let mut pos = 0;
        while pos < buf.len() {
            match try_parse_object_header(buf, pos) {
                Some((num, generation, header_end)) => {
                    xref.insert(num, XrefEntry::InUse { offset: pos, generation });
                    pos = header_end;
                }
                None => pos += 1,
            }
        }
        let trailer = find_last_trailer(buf).unwrap_or_else(|| synthesize_trailer(buf, &xref));
        (xref, trailer)
    }
}

fn string_bytes(obj: Option<&Object>) -> Result<Vec<u8>, Error> {
    match obj {
        Some(Object::String(bytes, _)) => Ok(bytes.clone()),
        _ => Err(FormatError::UnrecognizedObject.into()),
    }
}

fn to_array32(bytes: &[u8]) -> Result<[u8; 32], Error> {
    if bytes.len() < 32 {
        return Err(FormatError::UnrecognizedObject.into());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[..32]);
    Ok(out)
}

fn decrypt_object(obj: &Object, id: ObjectId, handler: &SecurityHandler) -> Object {
    match obj {
        Object::String(bytes, format) => Object::String(handler.crypt(id.0, id.1, bytes), *format),
        Object::Array(items) => Object::Array(items.iter().map(|o| decrypt_object(o, id, handler)).collect()),
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), decrypt_object(value, id, handler));
            }
            Object::Dictionary(new_dict)
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), decrypt_object(value, id, handler));
            }
            let data = handler.crypt(id.0, id.1, &stream.data);
            new_dict.set("Length", data.len() as i64);
            Object::Stream(Stream { dict: new_dict, data })
        }
        other => other.clone(),
    }
}

fn find_startxref(buf: &[u8]) -> Result<usize, Error> {
    let needle = b"startxref";
    if buf.len() < needle.len() {
        return Err(FormatError::MissingStartXref.into());
    }
    let idx = buf.windows(needle.len()).rposition(|w| w == needle).ok_or(FormatError::MissingStartXref)?;
    let mut pos = idx + needle.len();
    while pos < buf.len() && buf[pos].is_ascii_whitespace() {
        pos += 1;
    }
    let start = pos;
    while pos < buf.len() && buf[pos].is_ascii_digit() {
        pos += 1;
    }
    std::str::from_utf8(&buf[start..pos])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| FormatError::MissingStartXref.into())
}

fn object_body_offset(buf: &[u8], header_offset: usize) -> Result<usize, Error> {
    let mut lexer = Lexer::at(buf, header_offset);
    let Some(Token::Integer(_)) = lexer.next_token()? else {
        return Err(FormatError::MalformedXref.into());
    };
    let Some(Token::Integer(_)) = lexer.next_token()? else {
        return Err(FormatError::MalformedXref.into());
    };
    let Some(Token::Keyword(kw)) = lexer.next_token()? else {
        return Err(FormatError::MalformedXref.into());
    };
    if kw != "obj" {
        return Err(FormatError::MalformedXref.into());
    }
    Ok(lexer.pos)
}

fn try_parse_object_header(buf: &[u8], pos: usize) -> Option<(u32, u16, usize)> {
    if !buf[pos].is_ascii_digit() || (pos > 0 && buf[pos - 1].is_ascii_digit()) {
        return None;
    }
    let mut lexer = Lexer::at(buf, pos);
    let Ok(Some(Token::Integer(num))) = lexer.next_token() else {
        return None;
    };
    let Ok(Some(Token::Integer(generation))) = lexer.next_token() else {
        return None;
    };
    let Ok(Some(Token::Keyword(kw))) = lexer.next_token() else {
        return None;
    };
    if kw != "obj" || num < 0 || generation < 0 {
        return None;
    }
    Some((num as u32, generation as u16, lexer.pos))
}

/// Parses one classic cross-reference table starting at `offset`:
/// `xref`, one or more `start count` subsections of fixed-form entries,
/// then the `trailer` dictionary.
fn parse_xref_section(buf: &[u8], offset: usize) -> Result<(BTreeMap<u32, XrefEntry>, Dictionary), Error> {
    let mut lexer = Lexer::at(buf, offset);
    match lexer.next_token()? {
        Some(Token::Keyword(kw)) if kw == "xref" => {}
        _ => return Err(FormatError::MalformedXref.into()),
    }
    let mut entries = BTreeMap::new();
    loop {
        match lexer.next_token()? {
            Some(Token::Integer(start)) => {
                let Some(Token::Integer(count)) = lexer.next_token()? else {
                    return Err(FormatError::MalformedXref.into());
                };
                for i in 0..count {
                    let Some(Token::Integer(off)) = lexer.next_token()? else {
                        return Err(FormatError::MalformedXref.into());
                    };
                    let Some(Token::Integer(gen)) = lexer.next_token()? else {
                        return Err(FormatError::MalformedXref.into());
                    };
                    let Some(Token::Keyword(flag)) = lexer.next_token()? else {
                        return Err(FormatError::MalformedXref.into());
                    };
                    let num = (start + i) as u32;
                    let entry = if flag == "n" {
                        XrefEntry::InUse { offset: off as usize, generation: gen as u16 }
                    } else {
                        XrefEntry::Free
                    };
                    entries.insert(num, entry);
                }
            }
            Some(Token::Keyword(kw)) if kw == "trailer" => {
                let mut parser = ObjectParser::new(buf, lexer.pos);
                let trailer_obj = parser.parse_object()?;
                let trailer = trailer_obj.as_dict().cloned().ok_or(FormatError::MalformedXref)?;
                return Ok((entries, trailer));
            }
            _ => return Err(FormatError::MalformedXref.into()),
        }
    }
}

fn find_last_trailer(buf: &[u8]) -> Option<Dictionary> {
    let needle = b"trailer";
    let idx = buf.windows(needle.len()).rposition(|w| w == needle)?;
    let mut parser = ObjectParser::new(buf, idx + needle.len());
    parser.parse_object().ok()?.as_dict().cloned()
}

fn synthesize_trailer(buf: &[u8], xref: &BTreeMap<u32, XrefEntry>) -> Dictionary {
    let mut trailer = Dictionary::new();
    let max_num = xref.keys().max().copied().unwrap_or(0);
    trailer.set("Size", (max_num + 1) as i64);
    for (&num, entry) in xref.iter() {
        let XrefEntry::InUse { offset, generation } = *entry else { continue };
        let Ok(body_off) = object_body_offset(buf, offset) else { continue };
        let mut parser = ObjectParser::new(buf, body_off);
        let Ok(obj) = parser.parse_object() else { continue };
        let Some(dict) = obj.as_dict() else { continue };
        if dict.get("Type").and_then(Object::as_name) == Some("Catalog") {
            trailer.set("Root", ObjectId(num, generation));
            break;
        }
    }
    trailer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::document::WriteOptions;
    use crate::metadata::Metadata;
    use crate::page_size::{Orientation, PageSize};
    use crate::security::{EncryptionOptions, KeyLength, Permissions};
    use time::macros::datetime;

    fn write_doc(doc: &Document) -> Vec<u8> {
        let mut buf = Vec::new();
        let opts = WriteOptions { compress: false };
        let now = datetime!(2024-01-01 00:00:00 UTC);
        doc.write_to(&mut buf, &opts, &now).unwrap();
        buf
    }

    #[test]
    fn reads_back_empty_document() {
        let doc = Document::new();
        let bytes = write_doc(&doc);
        let reader = Reader::open(bytes, &ReadOptions::default()).unwrap();
        assert!(!reader.is_encrypted());
        let pages = reader.page_ids().unwrap();
        assert_eq!(pages.len(), 0);
    }

    #[test]
    fn reads_back_hello_world_text() {
        let mut doc = Document::new();
        let page = doc.add_page(PageSize::A4, Orientation::Portrait);
        let font = doc.add_standard_font(crate::font::StandardFont::Helvetica);
        doc.set_font(page, font, 12.0).unwrap();
        doc.draw_text(page, "Hello, World!", 100.0, 700.0).unwrap();
        let bytes = write_doc(&doc);

        let reader = Reader::open(bytes, &ReadOptions::default()).unwrap();
        let pages = reader.page_ids().unwrap();
        assert_eq!(pages.len(), 1);
        let page_dict = reader.page_dict(pages[0]).unwrap();
        let content = reader.page_content_bytes(&page_dict).unwrap();
        let text = String::from_utf8(content).unwrap();
        assert!(text.contains("(Hello, World!) Tj"));
    }

    #[test]
    fn reads_back_non_ascii_metadata() {
        let mut doc = Document::new();
        doc.add_page(PageSize::A4, Orientation::Portrait);
        let mut meta = Metadata::new();
        meta.title = Some("日本語".to_string());
        meta.author = Some("田中太郎".to_string());
        doc.set_metadata(meta);
        let bytes = write_doc(&doc);

        let reader = Reader::open(bytes, &ReadOptions::default()).unwrap();
        let metadata = reader.metadata();
        assert_eq!(metadata.title, Some("日本語".to_string()));
        assert_eq!(metadata.author, Some("田中太郎".to_string()));
    }

    #[test]
    fn encrypted_document_requires_authentication() {
        let mut doc = Document::new();
        doc.add_page(PageSize::A4, Orientation::Portrait);
        doc.set_encryption(EncryptionOptions {
            user_password: "user123".to_string(),
            owner_password: "owner123".to_string(),
            key_length: KeyLength::Bits128,
            permissions: Permissions::default(),
        })
        .unwrap();
        let bytes = write_doc(&doc);

        let mut reader = Reader::open(bytes, &ReadOptions::default()).unwrap();
        assert!(reader.is_encrypted());
        assert!(!reader.authenticate("wrong").unwrap());
        assert!(reader.authenticate("user123").unwrap());
        let pages = reader.page_ids().unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn malformed_xref_falls_back_to_linear_scan() {
        let mut doc = Document::new();
        doc.add_page(PageSize::A4, Orientation::Portrait);
        let mut bytes = write_doc(&doc);
        if let Some(idx) = bytes.windows(4).position(|w| w == b"xref") {
            bytes[idx] = b'X';
        }
        let reader = Reader::open(bytes, &ReadOptions::default()).unwrap();
        let pages = reader.page_ids().unwrap();
        assert_eq!(pages.len(), 1);
    }
}
