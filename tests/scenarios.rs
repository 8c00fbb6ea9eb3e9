//! Whole-document integration tests exercising the public API the way a
//! consumer would: through `pdforge::new_document` / `pdforge::open_reader`
//! rather than module internals. Covers the concrete end-to-end scenarios
//! a caller is expected to rely on.

use pdforge::document::WriteOptions;
use pdforge::font::StandardFont;
use pdforge::metadata::Metadata;
use pdforge::page_size::{Orientation, PageSize};
use pdforge::security::{EncryptionOptions, KeyLength, Permissions};
use pdforge::{new_document, open_reader, Document};
use time::macros::datetime;

fn write(doc: &Document, compress: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    let opts = WriteOptions { compress };
    let now = datetime!(2024-06-15 12:00:00 UTC);
    doc.write_to(&mut buf, &opts, &now).unwrap();
    buf
}

/// S1: an empty document still produces a well-formed, readable file.
#[test]
fn empty_document_roundtrips() {
    let doc = new_document();
    let bytes = write(&doc, false);

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("%PDF-1.7\n"));
    assert!(text.trim_end().ends_with("%%EOF"));

    let reader = open_reader(bytes).unwrap();
    assert!(!reader.is_encrypted());
    assert_eq!(reader.page_count().unwrap(), 0);
    assert_eq!(doc.page_count(), 0);
}

/// S2: a one-line "Hello, World!" document contains the expected operators
/// and reads back with the same text.
#[test]
fn hello_world_roundtrips_through_reader() {
    let mut doc = new_document();
    let page = doc.add_page(PageSize::A4, Orientation::Portrait);
    let font = doc.add_standard_font(StandardFont::Helvetica);
    doc.set_font(page, font, 12.0).unwrap();
    doc.draw_text(page, "Hello, World!", 100.0, 700.0).unwrap();
    let bytes = write(&doc, false);

    let reader = open_reader(bytes).unwrap();
    assert_eq!(reader.page_count().unwrap(), 1);
    let text = reader.extract_page_text(0).unwrap();
    assert!(text.contains("Hello, World!"));
}

/// S3: the same image drawn three times across two pages costs exactly one
/// XObject, referenced three times.
#[test]
fn repeated_image_is_deduplicated_across_pages() {
    let mut doc = new_document();
    let page1 = doc.add_page(PageSize::A4, Orientation::Portrait);
    let page2 = doc.add_page(PageSize::A4, Orientation::Portrait);
    let jpeg = tiny_jpeg();
    let image = doc.add_jpeg_image(jpeg).unwrap();
    doc.draw_image(page1, image, 0.0, 0.0, 100.0, 100.0).unwrap();
    doc.draw_image(page1, image, 50.0, 50.0, 100.0, 100.0).unwrap();
    doc.draw_image(page2, image, 0.0, 0.0, 100.0, 100.0).unwrap();
    let bytes = write(&doc, false);

    let text = String::from_utf8_lossy(&bytes);
    assert_eq!(text.matches("/Filter /DCTDecode").count(), 1);
    assert_eq!(text.matches(" Do\n").count(), 3);

    let reader = open_reader(bytes).unwrap();
    let images_p1 = reader.extract_images(0).unwrap();
    let images_p2 = reader.extract_images(1).unwrap();
    assert_eq!(images_p1.len(), 1);
    assert_eq!(images_p2.len(), 1);
}

/// S4: 40-bit encryption; the user password, the owner password, and an
/// unrelated password each behave as the Standard Security Handler
/// requires. Authentication is re-checked from a fresh `Reader` per
/// password since a failed attempt must not poison a later one.
#[test]
fn forty_bit_encryption_authenticates_both_passwords() {
    let mut doc = new_document();
    doc.add_page(PageSize::A4, Orientation::Portrait);
    doc.set_encryption(EncryptionOptions {
        user_password: "user123".to_string(),
        owner_password: "owner123".to_string(),
        key_length: KeyLength::Bits40,
        permissions: Permissions::default(),
    })
    .unwrap();
    let bytes = write(&doc, false);

    let mut wrong = open_reader(bytes.clone()).unwrap();
    assert!(wrong.is_encrypted());
    assert!(!wrong.authenticate("").unwrap());

    let mut as_user = open_reader(bytes.clone()).unwrap();
    assert!(as_user.authenticate("user123").unwrap());
    assert_eq!(as_user.page_count().unwrap(), 1);

    let mut as_owner = open_reader(bytes).unwrap();
    assert!(as_owner.authenticate("owner123").unwrap());
    assert_eq!(as_owner.page_count().unwrap(), 1);
}

/// S4 continued: the owner password alone must also authenticate a
/// 128-bit (V2/R3) document.
#[test]
fn owner_password_authenticates_128_bit() {
    let mut doc = new_document();
    doc.add_page(PageSize::A4, Orientation::Portrait);
    doc.set_encryption(EncryptionOptions {
        user_password: "user123".to_string(),
        owner_password: "owner123".to_string(),
        key_length: KeyLength::Bits128,
        permissions: Permissions::default(),
    })
    .unwrap();
    let bytes = write(&doc, false);

    let mut reader = open_reader(bytes).unwrap();
    assert!(reader.authenticate("owner123").unwrap());
    assert_eq!(reader.page_count().unwrap(), 1);
}

/// S5: non-ASCII metadata survives a write/read roundtrip through the
/// UTF-16BE hex-string encoding path.
#[test]
fn non_ascii_metadata_roundtrips() {
    let mut doc = new_document();
    doc.add_page(PageSize::A4, Orientation::Portrait);
    let mut meta = Metadata::new();
    meta.title = Some("日本語".to_string());
    meta.author = Some("田中太郎".to_string());
    doc.set_metadata(meta);
    let bytes = write(&doc, false);

    let reader = open_reader(bytes).unwrap();
    let metadata = reader.metadata();
    assert_eq!(metadata.title.as_deref(), Some("日本語"));
    assert_eq!(metadata.author.as_deref(), Some("田中太郎"));
}

/// S6: three text draws at well-separated heights produce three distinct,
/// strictly-descending text blocks once extracted.
#[test]
fn layout_extraction_yields_descending_blocks() {
    let mut doc = new_document();
    let page = doc.add_page(PageSize::A4, Orientation::Portrait);
    let font = doc.add_standard_font(StandardFont::Helvetica);
    doc.set_font(page, font, 12.0).unwrap();
    doc.draw_text(page, "top", 100.0, 750.0).unwrap();
    doc.draw_text(page, "middle", 100.0, 400.0).unwrap();
    doc.draw_text(page, "bottom", 100.0, 100.0).unwrap();
    let bytes = write(&doc, false);

    let reader = open_reader(bytes).unwrap();
    let layout = reader.extract_page_layout(0).unwrap();
    assert_eq!(layout.text_blocks.len(), 3);
    assert!(layout.text_blocks[0].y > layout.text_blocks[1].y);
    assert!(layout.text_blocks[1].y > layout.text_blocks[2].y);
}

/// Boundary: a page with no drawing still produces a well-formed, empty
/// content stream that reads back as an empty string.
#[test]
fn blank_page_reads_back_as_empty_text() {
    let mut doc = new_document();
    doc.add_page(PageSize::A4, Orientation::Portrait);
    let bytes = write(&doc, false);

    let reader = open_reader(bytes).unwrap();
    let text = reader.extract_page_text(0).unwrap();
    assert!(text.trim().is_empty());
}

/// Compressed output round-trips identically to uncompressed output.
#[test]
fn compressed_document_roundtrips() {
    let mut doc = new_document();
    let page = doc.add_page(PageSize::Letter, Orientation::Landscape);
    let font = doc.add_standard_font(StandardFont::TimesRoman);
    doc.set_font(page, font, 18.0).unwrap();
    doc.draw_text(page, "Compressed content stream", 50.0, 50.0).unwrap();
    let bytes = write(&doc, true);

    let reader = open_reader(bytes).unwrap();
    let text = reader.extract_page_text(0).unwrap();
    assert!(text.contains("Compressed content stream"));
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
