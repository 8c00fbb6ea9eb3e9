//! Stream filters understood on the read path (§4.5): `/FlateDecode` (with
//! optional PNG-predictor post-pass), `/DCTDecode` (passed through
//! untouched), `/ASCIIHexDecode`, `/ASCII85Decode`. Filters are applied in
//! order if `/Filter` is an array.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::error::{EncodingError, Error};
use crate::object::{Dictionary, Object};

/// Decodes `data` per the stream dictionary's `/Filter` (and
/// `/DecodeParms`), returning the fully decoded bytes. `/DCTDecode` is
/// left untouched (the caller treats it as an opaque JPEG payload per
/// spec §4.5).
pub fn decode_stream(dict: &Dictionary, data: &[u8]) -> Result<Vec<u8>, Error> {
    let filters = filter_names(dict);
    let parms = decode_parms(dict, filters.len());
    let mut bytes = data.to_vec();
    for (filter, parm) in filters.iter().zip(parms.iter()) {
        bytes = match filter.as_str() {
            "FlateDecode" | "Fl" => {
                let decoded = inflate(&bytes)?;
                apply_predictor(decoded, parm)?
            }
            "ASCIIHexDecode" | "AHx" => ascii_hex_decode(&bytes)?,
            "ASCII85Decode" | "A85" => ascii85_decode(&bytes)?,
            "DCTDecode" | "DCT" | "JPXDecode" => bytes,
            other => return Err(EncodingError::UnsupportedFilter(other.to_string()).into()),
        };
    }
    Ok(bytes)
}

/// True if the stream's outermost filter is `/DCTDecode` (or there is no
/// filter list to further decode past it) — used by the reader to decide
/// whether "decoded bytes" is the JPEG payload itself.
pub fn is_image_passthrough_filter(dict: &Dictionary) -> bool {
    filter_names(dict).last().map(|f| f == "DCTDecode" || f == "DCT" || f == "JPXDecode").unwrap_or(false)
}

fn filter_names(dict: &Dictionary) -> Vec<String> {
    match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.0.clone()],
        Some(Object::Array(items)) => items.iter().filter_map(|o| o.as_name().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

fn decode_parms(dict: &Dictionary, count: usize) -> Vec<Option<Dictionary>> {
    let single = |o: &Object| o.as_dict().cloned();
    match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(Object::Dictionary(d)) => {
            let mut v = vec![Some(d.clone())];
            v.resize(count, None);
            v
        }
        Some(Object::Array(items)) => {
            let mut v: Vec<Option<Dictionary>> = items.iter().map(single).collect();
            v.resize(count, None);
            v
        }
        _ => vec![None; count],
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| EncodingError::UnsupportedFilter(format!("zlib: {e}")))?;
    Ok(out)
}

/// PNG predictor post-pass (`/Predictor` 2 = TIFF, 10-15 = PNG per-row).
fn apply_predictor(data: Vec<u8>, parms: &Option<Dictionary>) -> Result<Vec<u8>, Error> {
    let Some(parms) = parms else { return Ok(data) };
    let predictor = parms.get("Predictor").and_then(|o| o.as_integer()).unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }
    let colors = parms.get("Colors").and_then(|o| o.as_integer()).unwrap_or(1) as usize;
    let bpc = parms.get("BitsPerComponent").and_then(|o| o.as_integer()).unwrap_or(8) as usize;
    let columns = parms.get("Columns").and_then(|o| o.as_integer()).unwrap_or(1) as usize;
    let bytes_per_pixel = ((colors * bpc) as f64 / 8.0).ceil().max(1.0) as usize;
    let row_bytes = ((colors * bpc * columns) as f64 / 8.0).ceil() as usize;

    if predictor == 2 {
        return Ok(tiff_predictor(data, row_bytes, bytes_per_pixel));
    }

    // PNG predictors: each row is prefixed with a 1-byte filter-type tag.
    let mut out = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];
    let mut pos = 0;
    while pos + 1 + row_bytes <= data.len() {
        let tag = data[pos];
        let row = &data[pos + 1..pos + 1 + row_bytes];
        let mut cur = vec![0u8; row_bytes];
        for i in 0..row_bytes {
            let a = if i >= bytes_per_pixel { cur[i - bytes_per_pixel] as i32 } else { 0 };
            let b = prev_row[i] as i32;
            let c = if i >= bytes_per_pixel { prev_row[i - bytes_per_pixel] as i32 } else { 0 };
            let x = row[i] as i32;
            let value = match tag {
                0 => x,
                1 => x + a,
                2 => x + b,
                3 => x + (a + b) / 2,
                4 => x + paeth(a, b, c),
                _ => x,
            };
            cur[i] = value as u8;
        }
        out.extend_from_slice(&cur);
        prev_row = cur;
        pos += 1 + row_bytes;
    }
    Ok(out)
}

fn paeth(a: i32, b: i32, c: i32) -> i32 {
    let p = a + b - c;
    let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn tiff_predictor(mut data: Vec<u8>, row_bytes: usize, bytes_per_pixel: usize) -> Vec<u8> {
    for row in data.chunks_mut(row_bytes) {
        for i in bytes_per_pixel..row.len() {
            row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
        }
    }
    data
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut nibbles = Vec::new();
    for &b in data {
        if b == b'>' {
            break;
        }
        if b.is_ascii_hexdigit() {
            nibbles.push(b);
        }
    }
    if nibbles.len() % 2 == 1 {
        nibbles.push(b'0');
    }
    let mut out = Vec::with_capacity(nibbles.len() / 2);
    for pair in nibbles.chunks(2) {
        let hi = (pair[0] as char).to_digit(16).unwrap_or(0);
        let lo = (pair[1] as char).to_digit(16).unwrap_or(0);
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut n = 0;
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        i += 1;
        if b == b'~' {
            break;
        }
        if b == b'z' && n == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            continue;
        }
        group[n] = b - b'!';
        n += 1;
        if n == 5 {
            let value = group.iter().fold(0u32, |acc, &d| acc.wrapping_mul(85).wrapping_add(d as u32));
            out.extend_from_slice(&value.to_be_bytes());
            n = 0;
        }
    }
    if n > 0 {
        for slot in group.iter_mut().skip(n) {
            *slot = 84;
        }
        let value = group.iter().fold(0u32, |acc, &d| acc.wrapping_mul(85).wrapping_add(d as u32));
        let bytes = value.to_be_bytes();
        out.extend_from_slice(&bytes[..n - 1]);
    }
    Ok(out)
}

/// Flate-compresses `data` for the write path (the inverse of `inflate`).
pub fn deflate(data: &[u8]) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to an in-memory Vec cannot fail");
    encoder.finish().expect("finishing an in-memory Vec encoder cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flate_roundtrip() {
        let mut dict = Dictionary::new();
        dict.set("Filter", "FlateDecode");
        let original = b"hello world, hello world, hello world".to_vec();
        let compressed = deflate(&original);
        let decoded = decode_stream(&dict, &compressed).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn ascii_hex_roundtrip() {
        let mut dict = Dictionary::new();
        dict.set("Filter", "ASCIIHexDecode");
        let decoded = decode_stream(&dict, b"48656C6C6F>").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn ascii85_roundtrip() {
        let original = b"Hello, world! This is a roundtrip test.".to_vec();
        let mut encoded = Vec::new();
        for chunk in original.chunks(4) {
            if chunk.len() == 4 {
                let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                if value == 0 {
                    encoded.push(b'z');
                    continue;
                }
                let mut digits = [0u8; 5];
                let mut v = value;
                for d in digits.iter_mut().rev() {
                    *d = (v % 85) as u8;
                    v /= 85;
                }
                encoded.extend(digits.iter().map(|d| d + b'!'));
            } else {
                let mut padded = [0u8; 4];
                padded[..chunk.len()].copy_from_slice(chunk);
                let value = u32::from_be_bytes(padded);
                let mut digits = [0u8; 5];
                let mut v = value;
                for d in digits.iter_mut().rev() {
                    *d = (v % 85) as u8;
                    v /= 85;
                }
                encoded.extend(digits.iter().take(chunk.len() + 1).map(|d| d + b'!'));
            }
        }
        encoded.extend_from_slice(b"~>");

        let mut dict = Dictionary::new();
        dict.set("Filter", "ASCII85Decode");
        let decoded = decode_stream(&dict, &encoded).unwrap();
        assert_eq!(decoded, original);
    }
}
