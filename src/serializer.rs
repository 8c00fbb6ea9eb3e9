//! L1/L2: serializes the object model to PDF's textual representation
//! (§4.1). Bit-exact rules: integers are decimal, reals drop trailing
//! zeros and the decimal point when integer-valued, strings escape `(`,
//! `)`, `\` unless already hex-encoded, dictionary keys are emitted in
//! lexicographic order.

use crate::object::{Dictionary, Name, Object, ObjectId, StringFormat};

/// Appends the textual form of `obj` to `out`. Free function rather than a
/// trait object so the write path stays a single growable buffer with no
/// extra allocation beyond what `Vec::extend_from_slice` needs.
pub fn write_object(out: &mut Vec<u8>, obj: &Object) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(true) => out.extend_from_slice(b"true"),
        Object::Boolean(false) => out.extend_from_slice(b"false"),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => write_real(out, *r),
        Object::String(bytes, StringFormat::Literal) => write_literal_string(out, bytes),
        Object::String(bytes, StringFormat::Hex) => write_hex_string(out, bytes),
        Object::Name(name) => write_name(out, name),
        Object::Array(items) => {
            out.extend_from_slice(b"[ ");
            for item in items {
                write_object(out, item);
                out.push(b' ');
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => {
            write_dictionary(out, &stream.dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.data);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(ObjectId(num, gen)) => {
            out.extend_from_slice(num.to_string().as_bytes());
            out.push(b' ');
            out.extend_from_slice(gen.to_string().as_bytes());
            out.extend_from_slice(b" R");
        }
    }
}

fn write_real(out: &mut Vec<u8>, value: f64) {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        out.extend_from_slice((value as i64).to_string().as_bytes());
        return;
    }
    // Shortest round-tripping decimal, then trim trailing zeros.
    let mut s = format!("{value}");
    if s.contains('e') || s.contains('E') {
        s = format!("{value:.6}");
    }
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    out.extend_from_slice(s.as_bytes());
}

fn write_name(out: &mut Vec<u8>, name: &Name) {
    out.push(b'/');
    for &b in name.0.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            out.push(b);
        } else {
            out.push(b'#');
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
    }
}

fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

fn write_hex_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'<');
    for &b in bytes {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<< ");
    // BTreeMap already iterates in lexicographic key order.
    for (key, value) in dict.iter() {
        write_name(out, key);
        out.push(b' ');
        write_object(out, value);
        out.push(b' ');
    }
    out.extend_from_slice(b">>");
}

/// Writes a complete indirect-object definition: `n g obj\n<body>\nendobj\n`.
pub fn write_indirect_object(out: &mut Vec<u8>, id: ObjectId, obj: &Object) {
    out.extend_from_slice(id.0.to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(id.1.to_string().as_bytes());
    out.extend_from_slice(b" obj\n");
    write_object(out, obj);
    out.extend_from_slice(b"\nendobj\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{hex_string, literal_string};

    fn to_string(obj: &Object) -> String {
        let mut buf = Vec::new();
        write_object(&mut buf, obj);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn serializes_scalars() {
        assert_eq!(to_string(&Object::Null), "null");
        assert_eq!(to_string(&Object::Boolean(true)), "true");
        assert_eq!(to_string(&Object::Integer(42)), "42");
        assert_eq!(to_string(&Object::Real(3.0)), "3");
        assert_eq!(to_string(&Object::Real(3.140)), "3.14");
    }

    #[test]
    fn serializes_strings() {
        assert_eq!(to_string(&literal_string(b"a(b)c\\d".to_vec())), r"(a\(b\)c\\d)");
        assert_eq!(to_string(&hex_string(vec![0xAB, 0x01])), "<AB01>");
    }

    #[test]
    fn serializes_array() {
        let arr = Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)]);
        assert_eq!(to_string(&arr), "[ 1 2 3 ]");
    }

    #[test]
    fn serializes_dictionary_keys_sorted() {
        let mut d = Dictionary::new();
        d.set("Zebra", 1i64);
        d.set("Apple", 2i64);
        assert_eq!(to_string(&Object::Dictionary(d)), "<< /Apple 2 /Zebra 1 >>");
    }

    #[test]
    fn serializes_reference() {
        assert_eq!(to_string(&Object::Reference(ObjectId(5, 0))), "5 0 R");
    }
}
