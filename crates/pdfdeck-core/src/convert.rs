//! Image to PDF conversion
//!
//! Builds one page per input image, sized to the image at 72 DPI. JPEG
//! data is embedded as-is behind a DCTDecode filter; PNG is decoded with
//! the `png` crate, alpha is dropped, and the raw samples are stored for
//! the writer's stream compression to handle.

use lopdf::{Dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};

use crate::error::DeckError;

/// Supported input image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect a format from magic bytes.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else {
        None
    }
}

struct EmbeddedImage {
    width: u32,
    height: u32,
    color_space: &'static [u8],
    bits_per_component: u8,
    filter: Option<&'static [u8]>,
    data: Vec<u8>,
}

/// Convert a sequence of images into a single PDF, one page per image.
pub fn images_to_pdf(images: &[Vec<u8>]) -> Result<Vec<u8>, DeckError> {
    if images.is_empty() {
        return Err(DeckError::InvalidInput("No images supplied".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::with_capacity(images.len());

    for (i, bytes) in images.iter().enumerate() {
        let format = detect_format(bytes).ok_or_else(|| {
            DeckError::InvalidInput(format!(
                "Image {} is neither JPEG nor PNG",
                i + 1
            ))
        })?;

        let image = match format {
            ImageFormat::Jpeg => embed_jpeg(bytes)?,
            ImageFormat::Png => embed_png(bytes)?,
        };

        let page_id = add_image_page(&mut doc, pages_id, image);
        page_ids.push(page_id);
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Build the image XObject, content stream and page dictionary for one image.
fn add_image_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    image: EmbeddedImage,
) -> lopdf::ObjectId {
    let mut xobject_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(image.width as i64)),
        ("Height", Object::Integer(image.height as i64)),
        ("ColorSpace", Object::Name(image.color_space.to_vec())),
        (
            "BitsPerComponent",
            Object::Integer(image.bits_per_component as i64),
        ),
    ]);
    if let Some(filter) = image.filter {
        xobject_dict.set("Filter", Object::Name(filter.to_vec()));
    }
    let xobject_id = doc.add_object(Stream::new(xobject_dict, image.data).with_compression(false));

    // Page size equals image size in points
    let (w, h) = (image.width as i64, image.height as i64);
    let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", w, h);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let xobjects = Dictionary::from_iter(vec![("Im0", Object::Reference(xobject_id))]);
    let resources = Dictionary::from_iter(vec![("XObject", Object::Dictionary(xobjects))]);

    let page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(w),
                Object::Integer(h),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]);
    doc.add_object(page)
}

/// JPEG is embedded untouched; only the SOF header is read for geometry.
fn embed_jpeg(bytes: &[u8]) -> Result<EmbeddedImage, DeckError> {
    let (width, height, components) = jpeg_dimensions(bytes)?;

    let color_space: &'static [u8] = match components {
        1 => b"DeviceGray",
        3 => b"DeviceRGB",
        4 => b"DeviceCMYK",
        n => {
            return Err(DeckError::InvalidInput(format!(
                "Unsupported JPEG component count: {}",
                n
            )))
        }
    };

    Ok(EmbeddedImage {
        width,
        height,
        color_space,
        bits_per_component: 8,
        filter: Some(b"DCTDecode"),
        data: bytes.to_vec(),
    })
}

/// Scan JPEG markers for the first SOF segment.
fn jpeg_dimensions(bytes: &[u8]) -> Result<(u32, u32, u8), DeckError> {
    let bad = || DeckError::InvalidInput("Malformed JPEG data".into());

    let mut pos = 2; // past SOI
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(bad());
        }
        let marker = bytes[pos + 1];
        // SOF0..SOF15 minus DHT/JPG/DAC carry frame geometry
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            if pos + 10 > bytes.len() {
                return Err(bad());
            }
            let height = u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]) as u32;
            let width = u16::from_be_bytes([bytes[pos + 7], bytes[pos + 8]]) as u32;
            let components = bytes[pos + 9];
            if width == 0 || height == 0 {
                return Err(bad());
            }
            return Ok((width, height, components));
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 {
            return Err(bad());
        }
        pos += 2 + len;
    }
    Err(bad())
}

/// PNG is decoded to 8-bit samples; alpha channels are dropped.
fn embed_png(bytes: &[u8]) -> Result<EmbeddedImage, DeckError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::normalize_to_color8());

    let mut reader = decoder
        .read_info()
        .map_err(|e| DeckError::InvalidInput(format!("Failed to decode PNG: {}", e)))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| DeckError::InvalidInput(format!("Failed to decode PNG: {}", e)))?;
    buf.truncate(info.buffer_size());

    let (color_space, data): (&'static [u8], Vec<u8>) = match info.color_type {
        png::ColorType::Grayscale => (b"DeviceGray", buf),
        png::ColorType::Rgb => (b"DeviceRGB", buf),
        png::ColorType::GrayscaleAlpha => (
            b"DeviceGray",
            buf.chunks_exact(2).map(|px| px[0]).collect(),
        ),
        png::ColorType::Rgba => (
            b"DeviceRGB",
            buf.chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        ),
        png::ColorType::Indexed => {
            return Err(DeckError::InvalidInput(
                "Indexed PNG did not expand during decode".into(),
            ))
        }
    };

    Ok(EmbeddedImage {
        width: info.width,
        height: info.height,
        color_space,
        bits_per_component: 8,
        filter: None,
        data,
    })
}
