//! §4.9 metadata: the Info dictionary and its string-encoding rules.

use std::collections::BTreeMap;

use crate::date::{parse_pdf_date_string, to_pdf_date_string, OffsetDateTime};
use crate::object::{hex_string, literal_string, Dictionary, Object, StringFormat};

/// Document metadata: the well-known Info dictionary keys plus arbitrary
/// string-valued custom keys.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<OffsetDateTime>,
    pub mod_date: Option<OffsetDateTime>,
    pub custom: BTreeMap<String, String>,
}

/// The producer string written when the caller hasn't set one (§4.9
/// "Producer defaults to the library's identifier when unset").
pub const DEFAULT_PRODUCER: &str = "pdforge";

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the `/Info` dictionary object, defaulting `Producer` and
    /// `CreationDate` to the library identifier / wall-clock time.
    pub fn to_dictionary(&self, now: &OffsetDateTime) -> Dictionary {
        let mut dict = Dictionary::new();
        let mut set_str = |dict: &mut Dictionary, key: &str, value: &str| {
            dict.set(key, encode_pdf_string(value));
        };
        if let Some(v) = &self.title {
            set_str(&mut dict, "Title", v);
        }
        if let Some(v) = &self.author {
            set_str(&mut dict, "Author", v);
        }
        if let Some(v) = &self.subject {
            set_str(&mut dict, "Subject", v);
        }
        if let Some(v) = &self.keywords {
            set_str(&mut dict, "Keywords", v);
        }
        if let Some(v) = &self.creator {
            set_str(&mut dict, "Creator", v);
        }
        let producer = self.producer.clone().unwrap_or_else(|| DEFAULT_PRODUCER.to_string());
        set_str(&mut dict, "Producer", &producer);
        let creation_date = self.creation_date.unwrap_or(*now);
        dict.set("CreationDate", literal_string(to_pdf_date_string(&creation_date).into_bytes()));
        let mod_date = self.mod_date.unwrap_or(creation_date);
        dict.set("ModDate", literal_string(to_pdf_date_string(&mod_date).into_bytes()));
        for (key, value) in &self.custom {
            set_str(&mut dict, key, value);
        }
        dict
    }

    /// Parses an `/Info` dictionary back into `Metadata` (reader side).
    pub fn from_dictionary(dict: &Dictionary) -> Self {
        let get_str = |key: &str| dict.get(key).and_then(decode_pdf_string);
        let known = ["Title", "Author", "Subject", "Keywords", "Creator", "Producer", "CreationDate", "ModDate"];
        let mut custom = BTreeMap::new();
        for (name, value) in dict.iter() {
            if known.contains(&name.0.as_str()) {
                continue;
            }
            if let Some(s) = decode_pdf_string(value) {
                custom.insert(name.0.clone(), s);
            }
        }
        Metadata {
            title: get_str("Title"),
            author: get_str("Author"),
            subject: get_str("Subject"),
            keywords: get_str("Keywords"),
            creator: get_str("Creator"),
            producer: get_str("Producer"),
            creation_date: get_str("CreationDate").and_then(|s| parse_pdf_date_string(&s)),
            mod_date: get_str("ModDate").and_then(|s| parse_pdf_date_string(&s)),
            custom,
        }
    }
}

/// ASCII-only strings are written as `(...)` literals; anything else is
/// written as a UTF-16BE hex string with a leading `<FEFF>` BOM, with
/// surrogate pairs for non-BMP characters (§4.9 "String encoding").
pub fn encode_pdf_string(value: &str) -> Object {
    if value.is_ascii() {
        return literal_string(value.as_bytes().to_vec());
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    hex_string(bytes)
}

fn decode_pdf_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, StringFormat::Hex) if bytes.starts_with(&[0xFE, 0xFF]) => {
            let units: Vec<u16> = bytes[2..].chunks(2).map(|c| u16::from_be_bytes([c[0], c.get(1).copied().unwrap_or(0)])).collect();
            String::from_utf16(&units).ok()
        }
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn ascii_metadata_roundtrips_as_literal() {
        let mut meta = Metadata::new();
        meta.title = Some("Hello".to_string());
        let now = datetime!(2024-01-01 00:00:00 UTC);
        let dict = meta.to_dictionary(&now);
        assert!(matches!(dict.get("Title"), Some(Object::String(_, StringFormat::Literal))));
        let back = Metadata::from_dictionary(&dict);
        assert_eq!(back.title, Some("Hello".to_string()));
    }

    #[test]
    fn non_ascii_metadata_roundtrips_as_utf16be_hex() {
        let mut meta = Metadata::new();
        meta.title = Some("日本語".to_string());
        meta.author = Some("田中太郎".to_string());
        let now = datetime!(2024-01-01 00:00:00 UTC);
        let dict = meta.to_dictionary(&now);
        assert!(matches!(dict.get("Title"), Some(Object::String(_, StringFormat::Hex))));
        let back = Metadata::from_dictionary(&dict);
        assert_eq!(back.title, Some("日本語".to_string()));
        assert_eq!(back.author, Some("田中太郎".to_string()));
    }

    #[test]
    fn defaults_producer_and_creation_date() {
        let meta = Metadata::new();
        let now = datetime!(2024-06-15 12:00:00 UTC);
        let dict = meta.to_dictionary(&now);
        let back = Metadata::from_dictionary(&dict);
        assert_eq!(back.producer, Some(DEFAULT_PRODUCER.to_string()));
        assert_eq!(back.creation_date, Some(now));
    }
}
