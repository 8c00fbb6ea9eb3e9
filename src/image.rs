//! The image subsystem (§4.8). JPEG ingest keeps the encoded payload as-is
//! and is packaged with `/Filter /DCTDecode`; PNG ingest decodes pixels,
//! splits the alpha channel into a soft mask, and Flate-compresses the
//! color plane. Pixel decoding itself is delegated to the `image` crate
//! (the spec-permitted "standard image decoder"); everything PDF-specific
//! (XObject dictionary shape, SMask wiring, re-compression) is ours.

use image::{DynamicImage, GenericImageView};

use crate::color::ColorSpace;
use crate::error::{Error, ResourceError};
use crate::filters::deflate;
use crate::object::{Dictionary, Object, Stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Unknown,
}

/// A decoded-enough image ready to be packaged as a PDF XObject, or one
/// read back off a page's `/XObject` resources (§3.3 `ImageInfo`).
#[derive(Debug, Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub bits_per_component: u8,
    pub format: ImageFormat,
    /// The bytes that go directly into the stream payload: already
    /// Flate-compressed for PNG ingest, the original JPEG bytes for JPEG
    /// ingest (DCTDecode payload is never re-encoded).
    pub data: Vec<u8>,
    pub filter: &'static str,
    pub smask: Option<Box<Image>>,
}

impl Image {
    /// Ingests a JPEG file: reads just enough of the marker segments to
    /// find SOF0/SOF2, width, height, and component count, then retains
    /// the entire payload unchanged (§4.8 "JPEG ingest").
    pub fn from_jpeg_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let (width, height, components) = read_jpeg_sof(&bytes)?;
        let color_space = match components {
            1 => ColorSpace::Greyscale,
            4 => ColorSpace::Cmyk,
            _ => ColorSpace::Rgb,
        };
        Ok(Image {
            width,
            height,
            color_space,
            bits_per_component: 8,
            format: ImageFormat::Jpeg,
            data: bytes,
            filter: "DCTDecode",
            smask: None,
        })
    }

    /// Ingests a PNG file: decodes to raw pixel rows via the `image` crate
    /// (applying PNG filters and de-interlacing), separates any alpha
    /// channel into an auxiliary DeviceGray soft-mask image, and
    /// Flate-compresses the remaining color plane (§4.8 "PNG ingest").
    pub fn from_png_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .map_err(|e| ResourceError::PngDecodeFailure(e.to_string()))?;
        Self::from_dynamic_image(decoded, ImageFormat::Png)
    }

    fn from_dynamic_image(decoded: DynamicImage, format: ImageFormat) -> Result<Self, Error> {
        let (width, height) = decoded.dimensions();
        let has_alpha = decoded.color().has_alpha();

        let smask = if has_alpha {
            let rgba = decoded.to_rgba8();
            let alpha: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
            Some(Box::new(Image {
                width,
                height,
                color_space: ColorSpace::Greyscale,
                bits_per_component: 8,
                format,
                data: deflate(&alpha),
                filter: "FlateDecode",
                smask: None,
            }))
        } else {
            None
        };

        let (color_space, plane) = if has_alpha {
            let rgb = decoded.to_rgb8();
            (ColorSpace::Rgb, rgb.into_raw())
        } else {
            match &decoded {
                DynamicImage::ImageLuma8(g) => (ColorSpace::Greyscale, g.clone().into_raw()),
                DynamicImage::ImageLumaA8(_) => (ColorSpace::Greyscale, decoded.to_luma8().into_raw()),
                _ => (ColorSpace::Rgb, decoded.to_rgb8().into_raw()),
            }
        };

        Ok(Image {
            width,
            height,
            color_space,
            bits_per_component: 8,
            format,
            data: deflate(&plane),
            filter: "FlateDecode",
            smask,
        })
    }

    /// Packages this image as an XObject stream dictionary + payload
    /// (§4.2 step 4). `smask_ref` is the already-written object id of the
    /// `smask` field, if any.
    pub fn to_xobject_stream(&self, smask_ref: Option<crate::object::ObjectId>) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", "XObject");
        dict.set("Subtype", "Image");
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set("ColorSpace", self.color_space.as_pdf_name());
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", self.filter);
        if let Some(id) = smask_ref {
            dict.set("SMask", Object::Reference(id));
        }
        Stream::new(dict, self.data.clone())
    }
}

/// Reads just the SOI marker and segment headers of a JPEG file up to the
/// first SOF0 (baseline) or SOF2 (progressive) marker, returning
/// (width, height, component_count).
fn read_jpeg_sof(data: &[u8]) -> Result<(u32, u32, u8), Error> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(ResourceError::JpegMissingSof.into());
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        // Markers with no payload length.
        if marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            pos += 2;
            continue;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let is_sof = matches!(marker, 0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof {
            let payload = pos + 4;
            if payload + 5 > data.len() {
                return Err(ResourceError::JpegMissingSof.into());
            }
            let height = u16::from_be_bytes([data[payload + 1], data[payload + 2]]) as u32;
            let width = u16::from_be_bytes([data[payload + 3], data[payload + 4]]) as u32;
            let components = data[payload + 5];
            return Ok((width, height, components));
        }
        pos += 2 + seg_len;
    }
    Err(ResourceError::JpegMissingSof.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_baseline_jpeg_header(width: u16, height: u16, components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8]; // SOI
        // SOF0 segment: length, precision, height, width, components, then one component spec.
        let mut sof = vec![0xFFu8, 0xC0];
        let seg_len = 8 + 3 * components as usize;
        sof.extend_from_slice(&(seg_len as u16).to_be_bytes());
        sof.push(8); // precision
        sof.extend_from_slice(&height.to_be_bytes());
        sof.extend_from_slice(&width.to_be_bytes());
        sof.push(components);
        for i in 0..components {
            sof.extend_from_slice(&[i + 1, 0x11, 0]);
        }
        data.extend_from_slice(&sof);
        data.extend_from_slice(&[0xFF, 0xD9]); // EOI
        data
    }

    #[test]
    fn reads_jpeg_dimensions_from_sof0() {
        let bytes = make_baseline_jpeg_header(640, 480, 3);
        let image = Image::from_jpeg_bytes(bytes).unwrap();
        assert_eq!(image.width, 640);
        assert_eq!(image.height, 480);
        assert_eq!(image.color_space, ColorSpace::Rgb);
        assert_eq!(image.filter, "DCTDecode");
    }

    #[test]
    fn grayscale_jpeg_maps_to_devicegray() {
        let bytes = make_baseline_jpeg_header(10, 10, 1);
        let image = Image::from_jpeg_bytes(bytes).unwrap();
        assert_eq!(image.color_space, ColorSpace::Greyscale);
    }

    #[test]
    fn truncated_jpeg_is_an_error() {
        let result = Image::from_jpeg_bytes(vec![0xFF, 0xD8]);
        assert!(result.is_err());
    }

    #[test]
    fn png_with_alpha_produces_smask() {
        use image::{ImageBuffer, Rgba};
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(4, 4, |x, y| {
            Rgba([x as u8 * 10, y as u8 * 10, 100, if (x + y) % 2 == 0 { 255 } else { 0 }])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img).write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        let image = Image::from_png_bytes(bytes).unwrap();
        assert!(image.smask.is_some());
        assert_eq!(image.color_space, ColorSpace::Rgb);
    }

    #[test]
    fn opaque_png_has_no_smask() {
        use image::{ImageBuffer, Rgb};
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img).write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        let image = Image::from_png_bytes(bytes).unwrap();
        assert!(image.smask.is_none());
    }
}
