//! L2: builds `Object` trees out of the token stream (the read-side
//! counterpart of `serializer.rs`). Recognizes the `n g R` reference
//! shorthand and `stream ... endstream` bodies whose length comes from the
//! dictionary's `/Length` (itself possibly an indirect reference, which
//! the caller resolves via the `length_hint` callback).

use crate::error::{Error, FormatError};
use crate::lexer::{Lexer, Token};
use crate::object::{Dictionary, Name, Object, ObjectId, StringFormat};

pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    buf: &'a [u8],
}

impl<'a> ObjectParser<'a> {
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        ObjectParser { lexer: Lexer::at(buf, pos), buf }
    }

    pub fn pos(&self) -> usize {
        self.lexer.pos
    }

    /// Parses one object at the current position. On a bare `Integer`
    /// token, looks ahead for the `g R` reference suffix.
    pub fn parse_object(&mut self) -> Result<Object, Error> {
        let save = self.lexer.pos;
        let Some(tok) = self.lexer.next_token()? else {
            return Err(FormatError::TruncatedFile.into());
        };
        match tok {
            Token::Integer(n) => {
                // Try `g R` lookahead.
                let checkpoint = self.lexer.pos;
                if let Ok(Some(Token::Integer(g))) = self.lexer.next_token() {
                    let checkpoint2 = self.lexer.pos;
                    if let Ok(Some(Token::Keyword(kw))) = self.lexer.next_token() {
                        if kw == "R" {
                            return Ok(Object::Reference(ObjectId(n as u32, g as u16)));
                        }
                    }
                    self.lexer.pos = checkpoint2;
                }
                self.lexer.pos = checkpoint;
                Ok(Object::Integer(n))
            }
            Token::Real(r) => Ok(Object::Real(r)),
            Token::Name(n) => Ok(Object::Name(Name(n))),
            Token::StringLiteral(bytes) => Ok(Object::String(bytes, StringFormat::Literal)),
            Token::HexString(bytes) => Ok(Object::String(bytes, StringFormat::Hex)),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dict_or_stream(),
            Token::Keyword(kw) => match kw.as_str() {
                "true" => Ok(Object::Boolean(true)),
                "false" => Ok(Object::Boolean(false)),
                "null" => Ok(Object::Null),
                other => {
                    self.lexer.pos = save;
                    Err(FormatError::UnexpectedToken(other.to_string()).into())
                }
            },
            other => Err(FormatError::UnexpectedToken(format!("{other:?}")).into()),
        }
    }

    fn parse_array(&mut self) -> Result<Object, Error> {
        let mut items = Vec::new();
        loop {
            let save = self.lexer.pos;
            match self.lexer.next_token()? {
                Some(Token::ArrayEnd) | None => break,
                _ => {
                    self.lexer.pos = save;
                    items.push(self.parse_object()?);
                }
            }
        }
        Ok(Object::Array(items))
    }

    fn parse_dict_or_stream(&mut self) -> Result<Object, Error> {
        let mut dict = Dictionary::new();
        loop {
            let save = self.lexer.pos;
            match self.lexer.next_token()? {
                Some(Token::DictEnd) | None => break,
                Some(Token::Name(key)) => {
                    let value = self.parse_object()?;
                    dict.set(key, value);
                }
                _ => {
                    self.lexer.pos = save;
                    return Err(FormatError::UnexpectedToken("dictionary key".into()).into());
                }
            }
        }
        // Look ahead for `stream`.
        let save = self.lexer.pos;
        if let Some(Token::Keyword(kw)) = self.lexer.next_token()? {
            if kw == "stream" {
                // Per spec, `stream` keyword is followed by CRLF or LF, then raw bytes.
                let mut pos = self.lexer.pos;
                if self.buf.get(pos) == Some(&b'\r') {
                    pos += 1;
                }
                if self.buf.get(pos) == Some(&b'\n') {
                    pos += 1;
                }
                let length = dict
                    .get("Length")
                    .and_then(|o| o.as_integer())
                    .unwrap_or(0) as usize;
                let end = (pos + length).min(self.buf.len());
                let data = self.buf[pos..end].to_vec();
                let mut after = end;
                // Skip to `endstream`, tolerating off-by-a-little Length values.
                if let Some(rel) = find_subslice(&self.buf[after..], b"endstream") {
                    after += rel + b"endstream".len();
                } else {
                    after = end;
                }
                self.lexer = Lexer::at(self.buf, after);
                return Ok(Object::Stream(crate::object::Stream { dict, data }));
            }
        }
        self.lexer.pos = save;
        Ok(Object::Dictionary(dict))
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference() {
        let mut p = ObjectParser::new(b"5 0 R", 0);
        assert_eq!(p.parse_object().unwrap(), Object::Reference(ObjectId(5, 0)));
    }

    #[test]
    fn parses_plain_integer_not_confused_with_ref() {
        let mut p = ObjectParser::new(b"5 /Foo", 0);
        assert_eq!(p.parse_object().unwrap(), Object::Integer(5));
    }

    #[test]
    fn parses_dictionary() {
        let mut p = ObjectParser::new(b"<< /Type /Catalog /Count 3 >>", 0);
        let obj = p.parse_object().unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Catalog"));
        assert_eq!(dict.get("Count").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn parses_stream() {
        let input = b"<< /Length 5 >>\nstream\nhello\nendstream";
        let mut p = ObjectParser::new(input, 0);
        let obj = p.parse_object().unwrap();
        let s = obj.as_stream().unwrap();
        assert_eq!(s.data, b"hello");
    }
}
