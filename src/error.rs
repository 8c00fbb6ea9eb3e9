//! Error types for pdforge.
//!
//! error_chain and similar crates are overengineered for this use-case:
//! neither allow good localization and `From` conversions get hairy fast.
//! Plain enums plus `From` impls are simpler to reason about and to match
//! on, so that's what's used here.

use std::fmt;
use std::io::Error as IoError;

macro_rules! impl_from {
    ($from:ty, $to:ident::$variant:ident) => {
        impl From<$from> for $to {
            fn from(err: $from) -> Self {
                $to::$variant(err)
            }
        }
    };
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Truncated file, missing `startxref`, unrecognized object type,
    /// invalid stream length, malformed xref.
    Format(FormatError),
    /// Invalid UTF-8 in metadata, unsupported filter, unknown color space.
    Encoding(EncodingError),
    /// Wrong password, unsupported V/R, invalid key length.
    Security(SecurityError),
    /// Malformed font file, JPEG without SOF marker, PNG decode failure.
    Resource(ResourceError),
    /// Drawing without a font set, unknown font name, negative dimensions.
    Usage(UsageError),
    /// Underlying I/O failure.
    Io(IoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    TruncatedFile,
    MissingStartXref,
    UnrecognizedObject,
    InvalidStreamLength,
    MalformedXref,
    UnexpectedToken(String),
    UnbalancedDelimiter,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatError::TruncatedFile => write!(f, "truncated PDF file"),
            FormatError::MissingStartXref => write!(f, "missing startxref keyword"),
            FormatError::UnrecognizedObject => write!(f, "unrecognized object type"),
            FormatError::InvalidStreamLength => write!(f, "stream /Length does not match payload"),
            FormatError::MalformedXref => write!(f, "malformed cross-reference table"),
            FormatError::UnexpectedToken(s) => write!(f, "unexpected token: {s}"),
            FormatError::UnbalancedDelimiter => write!(f, "unbalanced string or dictionary delimiter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    InvalidUtf8,
    UnsupportedFilter(String),
    UnknownColorSpace(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodingError::InvalidUtf8 => write!(f, "invalid UTF-8 in metadata string"),
            EncodingError::UnsupportedFilter(name) => write!(f, "unsupported stream filter: {name}"),
            EncodingError::UnknownColorSpace(name) => write!(f, "unknown color space: {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    WrongPassword,
    UnsupportedVersion(i64, i64),
    InvalidKeyLength(usize),
    NotEncrypted,
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SecurityError::WrongPassword => write!(f, "incorrect password"),
            SecurityError::UnsupportedVersion(v, r) => {
                write!(f, "unsupported encryption V={v} R={r}")
            }
            SecurityError::InvalidKeyLength(len) => write!(f, "invalid encryption key length: {len} bits"),
            SecurityError::NotEncrypted => write!(f, "document is not encrypted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    MalformedFont(String),
    JpegMissingSof,
    PngDecodeFailure(String),
    MissingResource(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResourceError::MalformedFont(msg) => write!(f, "malformed font file: {msg}"),
            ResourceError::JpegMissingSof => write!(f, "JPEG stream has no SOF marker"),
            ResourceError::PngDecodeFailure(msg) => write!(f, "PNG decode failure: {msg}"),
            ResourceError::MissingResource(name) => write!(f, "missing resource: {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    NoFontSet,
    UnknownFontName(String),
    NegativeDimensions,
    WriteAfterClose,
    InvalidPageIndex(usize),
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UsageError::NoFontSet => write!(f, "drawing text without a font set"),
            UsageError::UnknownFontName(name) => write!(f, "unknown font name in resources: {name}"),
            UsageError::NegativeDimensions => write!(f, "negative dimensions are not allowed"),
            UsageError::WriteAfterClose => write!(f, "write attempted after document was closed"),
            UsageError::InvalidPageIndex(i) => write!(f, "page index out of bounds: {i}"),
        }
    }
}

impl_from!(FormatError, Error::Format);
impl_from!(EncodingError, Error::Encoding);
impl_from!(SecurityError, Error::Security);
impl_from!(ResourceError, Error::Resource);
impl_from!(UsageError, Error::Usage);
impl_from!(IoError, Error::Io);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Format(e) => write!(f, "{e}"),
            Error::Encoding(e) => write!(f, "{e}"),
            Error::Security(e) => write!(f, "{e}"),
            Error::Resource(e) => write!(f, "{e}"),
            Error::Usage(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}
