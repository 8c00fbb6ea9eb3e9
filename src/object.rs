//! L1: the core PDF value universe (§3.1).
//!
//! A PDF object is exactly one of the variants below. Only `Reference` has
//! identity; everything else is structural. `Dictionary` preserves
//! insertion order for the owner's convenience but the serializer always
//! re-sorts keys lexicographically on write (§4.1).

use std::collections::BTreeMap;

/// A PDF name, e.g. `/Type`. Stored without the leading slash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(pub String);

impl Name {
    pub fn new(s: impl Into<String>) -> Self {
        Name(s.into())
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_string())
    }
}

/// The (object number, generation number) identity of an indirect object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32, pub u16);

/// A dictionary from `Name` to `Object`. Keys are unique; a `BTreeMap`
/// keeps them naturally sorted, which happens to match the serializer's
/// required lexicographic output order and keeps diffs stable even before
/// serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(pub BTreeMap<Name, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(BTreeMap::new())
    }

    pub fn set(&mut self, key: impl Into<Name>, value: impl Into<Object>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.0.get(&Name(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.0.iter()
    }
}

impl FromIterator<(Name, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Name, Object)>>(iter: T) -> Self {
        Dictionary(iter.into_iter().collect())
    }
}

/// A stream object: a dictionary header plus a filtered byte payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub data: Vec<u8>,
}

impl Stream {
    /// Constructs a stream, setting `/Length` to the payload's length.
    pub fn new(mut dict: Dictionary, data: Vec<u8>) -> Self {
        dict.set("Length", Object::Integer(data.len() as i64));
        Stream { dict, data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>, StringFormat),
    Name(Name),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

/// How a `String` variant should be serialized: literal `(...)` form or
/// pre-encoded hex `<...>` form (used for UTF-16BE metadata strings and for
/// CID-encoded `Tj` operands).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hex,
}

impl Object {
    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            Object::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(&n.0),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Boolean(v)
    }
}
impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}
impl From<f32> for Object {
    fn from(v: f32) -> Self {
        Object::Real(v as f64)
    }
}
impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v)
    }
}
impl From<Name> for Object {
    fn from(v: Name) -> Self {
        Object::Name(v)
    }
}
impl From<&str> for Object {
    fn from(v: &str) -> Self {
        Object::Name(Name::from(v))
    }
}
impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}
impl From<Stream> for Object {
    fn from(v: Stream) -> Self {
        Object::Stream(v)
    }
}
impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}
impl From<ObjectId> for Object {
    fn from(v: ObjectId) -> Self {
        Object::Reference(v)
    }
}

/// A PDF string literal, to be serialized with `(...)` escaping.
pub fn literal_string(bytes: impl Into<Vec<u8>>) -> Object {
    Object::String(bytes.into(), StringFormat::Literal)
}

/// A pre-encoded hex string, emitted verbatim as `<...>`.
pub fn hex_string(bytes: impl Into<Vec<u8>>) -> Object {
    Object::String(bytes.into(), StringFormat::Hex)
}
