//! Image extraction: write every embedded raster image of a PDF to disk.
//!
//! Pages are walked in page-number order. Within a page, image XObjects are
//! taken in the order the page's `/Resources /XObject` dictionary lists them,
//! descending into form XObjects where they appear. An image reached twice on
//! the same page is written once. Each image becomes
//! `{stem}_p{page}_{index}.{ext}` in the image directory, with `page` 1-based
//! and `index` 0-based. The Markdown references appended later quote these
//! names verbatim.
//!
//! ## Formats
//!
//! Streams whose last filter is `DCTDecode` or `JPXDecode` are unwrapped from
//! any leading filters and written as `jpeg` / `jpx`. Everything else is
//! decoded to samples and re-encoded as PNG when the colour space is one we
//! understand (gray, RGB, CMYK, single-colorant separation, or an indexed
//! palette over those) at 1, 2, 4, 8 or 16 bits per component. Anything else
//! is skipped with a warning; the index still advances so the names of the
//! other images on that page do not shift.

use crate::error::Pdf2MdError;
use crate::pipeline::input::document_stem;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Upper bound on the `/Parent` chain walked when looking up inherited resources.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Upper bound on form XObjects nested inside one another.
const MAX_FORM_DEPTH: usize = 16;

/// One decoded image, written to disk before the next one is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// 1-based page number.
    pub page_number: u32,
    /// 0-based position among the page's images.
    pub index: usize,
    /// File extension without the dot: `jpeg`, `jpx` or `png`.
    pub ext: &'static str,
    pub bytes: Vec<u8>,
}

impl ExtractedImage {
    pub fn file_name(&self, stem: &str) -> String {
        image_file_name(stem, self.page_number, self.index, self.ext)
    }
}

/// `{stem}_p{page}_{index}.{ext}`.
pub fn image_file_name(stem: &str, page_number: u32, index: usize, ext: &str) -> String {
    format!("{stem}_p{page_number}_{index}.{ext}")
}

/// Extract all images of `pdf_path` into `image_dir`.
///
/// Returns the generated file names in page-then-index order; empty when the
/// document has no images. Existing files with the same names are replaced.
/// Each image is written as soon as it is decoded.
///
/// # Errors
/// [`Pdf2MdError::CorruptPdf`] when the document cannot be opened,
/// [`Pdf2MdError::ImageWriteFailed`] when a file cannot be written.
pub fn extract_images(pdf_path: &Path, image_dir: &Path) -> Result<Vec<String>, Pdf2MdError> {
    info!("Extracting images: {}", pdf_path.display());

    let document = Document::load(pdf_path).map_err(|e| Pdf2MdError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let stem = document_stem(pdf_path);

    let mut saved = Vec::new();
    for (page_number, page_id) in document.get_pages() {
        for (index, stream) in page_image_streams(&document, page_id).into_iter().enumerate() {
            let image = match decode_image(&document, stream) {
                Ok((ext, bytes)) => ExtractedImage {
                    page_number,
                    index,
                    ext,
                    bytes,
                },
                Err(reason) => {
                    warn!("Skipping image {} on page {}: {}", index, page_number, reason);
                    continue;
                }
            };
            let name = image.file_name(&stem);
            let path = image_dir.join(&name);
            fs::write(&path, &image.bytes).map_err(|source| Pdf2MdError::ImageWriteFailed { path, source })?;
            debug!("Wrote {} ({} bytes)", name, image.bytes.len());
            saved.push(name);
        }
    }

    info!("Extracted {} image(s) from {}", saved.len(), pdf_path.display());
    Ok(saved)
}

// ── Page walk ────────────────────────────────────────────────────────────────

/// Image XObject streams of one page, in resource-dictionary order.
fn page_image_streams(document: &Document, page_id: ObjectId) -> Vec<&Stream> {
    let mut found = Vec::new();
    if let Some(resources) = page_resources(document, page_id) {
        let mut seen = HashSet::new();
        collect_xobject_images(document, resources, 0, &mut seen, &mut found);
    }
    found
}

fn collect_xobject_images<'a>(
    document: &'a Document,
    resources: &'a Dictionary,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    found: &mut Vec<&'a Stream>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| as_dictionary(document, obj))
    else {
        return;
    };

    for (_name, obj) in xobjects.iter() {
        if let Object::Reference(id) = obj {
            if !seen.insert(*id) {
                continue;
            }
        }
        let Object::Stream(stream) = resolve(document, obj) else {
            continue;
        };
        if is_subtype(stream, b"Image") {
            found.push(stream);
        } else if is_subtype(stream, b"Form") {
            if depth >= MAX_FORM_DEPTH {
                warn!("Form XObjects nested deeper than {}; not descending", MAX_FORM_DEPTH);
                continue;
            }
            if let Some(inner) = stream
                .dict
                .get(b"Resources")
                .ok()
                .and_then(|obj| as_dictionary(document, obj))
            {
                collect_xobject_images(document, inner, depth + 1, seen, found);
            }
        }
    }
}

/// The page's own `/Resources`, or the nearest ancestor's.
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return as_dictionary(document, resources);
        }
        let parent = match node.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

fn is_subtype(stream: &Stream, subtype: &[u8]) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == subtype)
}

fn resolve<'a>(document: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => document.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn as_dictionary<'a>(document: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(document, obj) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Turn an image stream into `(extension, file bytes)`.
fn decode_image(document: &Document, stream: &Stream) -> Result<(&'static str, Vec<u8>), String> {
    let filters = filter_names(&stream.dict);
    let params = decode_parms(document, &stream.dict, filters.len());

    let (encoded_as, leading) = match filters.split_last() {
        Some((last, leading)) if last == b"DCTDecode" || last == b"DCT" => (Some("jpeg"), leading),
        Some((last, leading)) if last == b"JPXDecode" => (Some("jpx"), leading),
        _ => (None, filters.as_slice()),
    };
    if let Some(opaque) = leading.iter().find(|f| is_opaque_filter(f)) {
        return Err(format!(
            "unsupported image filter {}",
            String::from_utf8_lossy(opaque)
        ));
    }

    let data = apply_filters(&stream.content, leading, &params)?;
    if let Some(ext) = encoded_as {
        return Ok((ext, data));
    }

    let width = dict_u32(&stream.dict, b"Width").ok_or("missing /Width")?;
    let height = dict_u32(&stream.dict, b"Height").ok_or("missing /Height")?;
    let is_mask = matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let (bits, colour) = if is_mask {
        (1, ColourSpace::Gray)
    } else {
        let colour_space = stream
            .dict
            .get(b"ColorSpace")
            .map_err(|_| "missing /ColorSpace".to_string())?;
        (
            dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8),
            parse_colour_space(document, colour_space)?,
        )
    };

    let image = build_image(width, height, bits, &colour, &data)?;
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(("png", png))
}

/// `/Filter` as a list of names (a single name becomes a one-element list).
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `/DecodeParms` aligned with the filter list.
///
/// A single dictionary applies to every filter; an array is positional with
/// `null` meaning no parameters.
fn decode_parms<'a>(document: &'a Document, dict: &'a Dictionary, count: usize) -> Vec<Option<&'a Dictionary>> {
    match dict.get(b"DecodeParms").map(|obj| resolve(document, obj)) {
        Ok(Object::Dictionary(params)) => vec![Some(params); count],
        Ok(Object::Array(items)) => (0..count)
            .map(|i| items.get(i).and_then(|obj| as_dictionary(document, obj)))
            .collect(),
        _ => vec![None; count],
    }
}

/// Filters whose output is still an encoded image rather than raw samples.
fn is_opaque_filter(name: &[u8]) -> bool {
    matches!(
        name,
        b"DCTDecode" | b"DCT" | b"JPXDecode" | b"CCITTFaxDecode" | b"CCF" | b"JBIG2Decode"
    )
}

/// Run `content` through `filters` in decoding order.
fn apply_filters(content: &[u8], filters: &[Vec<u8>], params: &[Option<&Dictionary>]) -> Result<Vec<u8>, String> {
    let mut data = content.to_vec();
    for (i, filter) in filters.iter().enumerate() {
        let name = String::from_utf8_lossy(filter);
        data = match filter.as_slice() {
            b"FlateDecode" | b"Fl" => inflate(data, "FlateDecode", params.get(i).copied().flatten())?,
            b"LZWDecode" | b"LZW" => inflate(data, "LZWDecode", params.get(i).copied().flatten())?,
            b"ASCIIHexDecode" | b"AHx" => decode_ascii_hex(&data)?,
            b"ASCII85Decode" | b"A85" => decode_ascii85(&data)?,
            b"RunLengthDecode" | b"RL" => decode_run_length(&data)?,
            _ => return Err(format!("unsupported filter {name}")),
        };
    }
    Ok(data)
}

/// Flate and LZW through lopdf. lopdf will not decode a stream whose
/// `/Subtype` is `/Image`, so the data goes through a bare stream.
fn inflate(data: Vec<u8>, filter: &str, params: Option<&Dictionary>) -> Result<Vec<u8>, String> {
    let mut stream = Stream::new(dictionary! { "Filter" => filter }, data);
    if let Some(params) = params {
        stream.dict.set("DecodeParms", Object::Dictionary(params.clone()));
    }
    stream
        .decompressed_content()
        .map_err(|e| format!("cannot decode {filter} data: {e}"))
}

fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut digits = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            b'>' => break,
            b if b.is_ascii_whitespace() => {}
            b => digits.push(
                (b as char)
                    .to_digit(16)
                    .ok_or_else(|| format!("invalid ASCIIHex digit {:?}", b as char))? as u8,
            ),
        }
    }
    // An odd final digit is followed by an implicit 0.
    Ok(digits
        .chunks(2)
        .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
        .collect())
}

fn decode_ascii85(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut filled = 0;
    let body = data.strip_prefix(b"<~").unwrap_or(data);

    for &byte in body {
        match byte {
            b'~' => break,
            b'z' if filled == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[filled] = byte - b'!';
                filled += 1;
                if filled == 5 {
                    out.extend_from_slice(&ascii85_word(&group)?);
                    filled = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            b => return Err(format!("invalid ASCII85 character {:?}", b as char)),
        }
    }
    if filled == 1 {
        return Err("truncated ASCII85 group".to_string());
    }
    if filled > 1 {
        // Pad a partial group with 'u' and keep only the bytes it carries.
        group[filled..].fill(b'u' - b'!');
        out.extend_from_slice(&ascii85_word(&group)?[..filled - 1]);
    }
    Ok(out)
}

fn ascii85_word(group: &[u8; 5]) -> Result<[u8; 4], String> {
    let value = group
        .iter()
        .try_fold(0u32, |acc, &digit| acc.checked_mul(85)?.checked_add(digit as u32))
        .ok_or("ASCII85 group out of range")?;
    Ok(value.to_be_bytes())
}

fn decode_run_length(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let length = data[i] as usize;
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let run = data
                    .get(i..i + length + 1)
                    .ok_or("truncated RunLength literal")?;
                out.extend_from_slice(run);
                i += length + 1;
            }
            _ => {
                let byte = *data.get(i).ok_or("truncated RunLength run")?;
                out.extend(std::iter::repeat(byte).take(257 - length));
                i += 1;
            }
        }
    }
    Ok(out)
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key).ok()? {
        Object::Integer(v) => u32::try_from(*v).ok(),
        Object::Real(v) if *v >= 0.0 => Some(*v as u32),
        _ => None,
    }
}

// ── Colour ───────────────────────────────────────────────────────────────────

/// Colour spaces that can be turned into gray or RGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ColourSpace {
    Gray,
    Rgb,
    Cmyk,
    /// One colorant; a tint of 1 is full ink, shown as black.
    Separation,
    /// Palette entries already converted to RGB.
    Indexed(Vec<[u8; 3]>),
}

impl ColourSpace {
    fn components(&self) -> usize {
        match self {
            ColourSpace::Gray | ColourSpace::Separation | ColourSpace::Indexed(_) => 1,
            ColourSpace::Rgb => 3,
            ColourSpace::Cmyk => 4,
        }
    }
}

fn parse_colour_space(document: &Document, obj: &Object) -> Result<ColourSpace, String> {
    match resolve(document, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColourSpace::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColourSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColourSpace::Cmyk),
            other => Err(format!(
                "unsupported colour space {}",
                String::from_utf8_lossy(other)
            )),
        },
        Object::Array(items) => {
            let Some(Object::Name(family)) = items.first() else {
                return Err("malformed colour space array".to_string());
            };
            match family.as_slice() {
                b"CalGray" => Ok(ColourSpace::Gray),
                b"CalRGB" => Ok(ColourSpace::Rgb),
                b"ICCBased" => {
                    let Some(Object::Stream(profile)) = items.get(1).map(|obj| resolve(document, obj)) else {
                        return Err("ICCBased colour space without a profile".to_string());
                    };
                    match dict_u32(&profile.dict, b"N") {
                        Some(1) => Ok(ColourSpace::Gray),
                        Some(3) => Ok(ColourSpace::Rgb),
                        Some(4) => Ok(ColourSpace::Cmyk),
                        n => Err(format!("unsupported ICC profile with {n:?} components")),
                    }
                }
                b"Separation" => Ok(ColourSpace::Separation),
                b"Indexed" | b"I" => parse_indexed(document, items),
                other => Err(format!(
                    "unsupported colour space {}",
                    String::from_utf8_lossy(other)
                )),
            }
        }
        _ => Err("malformed colour space".to_string()),
    }
}

/// `[/Indexed base hival lookup]`.
fn parse_indexed(document: &Document, items: &[Object]) -> Result<ColourSpace, String> {
    let [_, base, hival, lookup] = items else {
        return Err("Indexed colour space needs four entries".to_string());
    };
    if let Object::Array(base_items) = resolve(document, base) {
        if matches!(base_items.first(), Some(Object::Name(n)) if n == b"Indexed" || n == b"I") {
            return Err("Indexed colour space over another Indexed space".to_string());
        }
    }
    let base = parse_colour_space(document, base)?;
    let hival = match resolve(document, hival) {
        Object::Integer(v @ 0..=255) => *v as usize,
        _ => return Err("Indexed hival out of range".to_string()),
    };
    let table = match resolve(document, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => {
            let filters = filter_names(&stream.dict);
            let params = decode_parms(document, &stream.dict, filters.len());
            apply_filters(&stream.content, &filters, &params)?
        }
        _ => return Err("Indexed lookup table is neither a string nor a stream".to_string()),
    };

    let width = base.components();
    if table.len() < (hival + 1) * width {
        return Err(format!(
            "Indexed lookup table has {} bytes, expected {}",
            table.len(),
            (hival + 1) * width
        ));
    }
    let palette = table
        .chunks_exact(width)
        .take(hival + 1)
        .map(|entry| match base {
            ColourSpace::Rgb => [entry[0], entry[1], entry[2]],
            ColourSpace::Cmyk => cmyk_pixel(entry),
            ColourSpace::Separation => [255 - entry[0]; 3],
            _ => [entry[0]; 3],
        })
        .collect();
    Ok(ColourSpace::Indexed(palette))
}

/// Build a pixel buffer from raw samples.
///
/// Rows start on a byte boundary. Samples below 8 bits are scaled to the full
/// 0..=255 range (palette indices are used as-is); 16-bit samples keep their
/// high byte.
fn build_image(
    width: u32,
    height: u32,
    bits: u32,
    colour: &ColourSpace,
    samples: &[u8],
) -> Result<DynamicImage, String> {
    let short = || format!("sample data too short for {width}x{height}");
    if width == 0 || height == 0 {
        return Err(format!("empty image {width}x{height}"));
    }
    let supported = match colour {
        ColourSpace::Indexed(_) => matches!(bits, 1 | 2 | 4 | 8),
        _ => matches!(bits, 1 | 2 | 4 | 8 | 16),
    };
    if !supported {
        return Err(format!(
            "unsupported sample layout: {bits} bit(s) x {} component(s)",
            colour.components()
        ));
    }

    let per_row = (width as usize)
        .checked_mul(colour.components())
        .ok_or_else(short)?;
    let values = unpack_samples(samples, per_row, height as usize, bits).ok_or_else(short)?;

    let gray = |pixels: Vec<u8>| {
        GrayImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(short)
    };
    let rgb = |pixels: Vec<u8>| {
        RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(short)
    };
    let scale = |v: u8| scale_to_byte(v, bits);

    match colour {
        ColourSpace::Gray => gray(values.into_iter().map(scale).collect()),
        ColourSpace::Separation => gray(values.into_iter().map(|v| 255 - scale(v)).collect()),
        ColourSpace::Rgb => rgb(values.into_iter().map(scale).collect()),
        ColourSpace::Cmyk => {
            let scaled: Vec<u8> = values.into_iter().map(scale).collect();
            rgb(cmyk_to_rgb(&scaled))
        }
        ColourSpace::Indexed(palette) => {
            let last = palette.len().saturating_sub(1);
            rgb(values
                .into_iter()
                .flat_map(|i| palette[(i as usize).min(last)])
                .collect())
        }
    }
}

/// Split byte-padded rows of `per_row` samples of `bits` each into one byte
/// per sample. `None` when `samples` is too short or the sizes overflow.
fn unpack_samples(samples: &[u8], per_row: usize, rows: usize, bits: u32) -> Option<Vec<u8>> {
    let bits = bits as usize;
    let row_bytes = per_row.checked_mul(bits)?.div_ceil(8);
    if row_bytes == 0 || samples.len() < row_bytes.checked_mul(rows)? {
        return None;
    }

    let mut out = Vec::with_capacity(per_row * rows);
    for row in samples.chunks(row_bytes).take(rows) {
        match bits {
            8 => out.extend_from_slice(&row[..per_row]),
            16 => out.extend(row.chunks_exact(2).take(per_row).map(|pair| pair[0])),
            _ => {
                let mask = (1u8 << bits) - 1;
                out.extend((0..per_row).map(|i| {
                    let bit = i * bits;
                    (row[bit / 8] >> (8 - bits - bit % 8)) & mask
                }));
            }
        }
    }
    Some(out)
}

fn scale_to_byte(value: u8, bits: u32) -> u8 {
    match bits {
        1 | 2 | 4 => value * (255 / ((1u8 << bits) - 1)),
        _ => value,
    }
}

/// Naive CMYK → RGB without a colour profile.
fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples.chunks_exact(4).flat_map(cmyk_pixel).collect()
}

fn cmyk_pixel(px: &[u8]) -> [u8; 3] {
    let k = 255 - px[3] as u16;
    [px[0], px[1], px[2]].map(|c| ((255 - c as u16) * k / 255) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    fn raw_image(extra: Dictionary, samples: Vec<u8>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
        };
        dict.extend(&extra);
        Stream::new(dict, samples)
    }

    fn decode_rgb(document: &Document, stream: &Stream) -> image::RgbImage {
        let (ext, bytes) = decode_image(document, stream).unwrap();
        assert_eq!(ext, "png");
        image::load_from_memory(&bytes).unwrap().to_rgb8()
    }

    #[test]
    fn file_name_scheme() {
        assert_eq!(image_file_name("doc", 1, 0, "png"), "doc_p1_0.png");
        assert_eq!(image_file_name("a b", 12, 3, "jpeg"), "a b_p12_3.jpeg");
        let image = ExtractedImage {
            page_number: 2,
            index: 1,
            ext: "jpx",
            bytes: Vec::new(),
        };
        assert_eq!(image.file_name("scan"), "scan_p2_1.jpx");
    }

    #[test]
    fn filter_names_accepts_name_and_array() {
        let single = dictionary! { "Filter" => "FlateDecode" };
        assert_eq!(filter_names(&single), vec![b"FlateDecode".to_vec()]);

        let chain = dictionary! {
            "Filter" => vec![Object::Name(b"ASCII85Decode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
        };
        assert_eq!(filter_names(&chain).len(), 2);
        assert!(filter_names(&Dictionary::new()).is_empty());
    }

    #[test]
    fn cmyk_white_and_black() {
        let rgb = cmyk_to_rgb(&[0, 0, 0, 0, 0, 0, 0, 255, 255, 0, 0, 0]);
        assert_eq!(rgb, vec![255, 255, 255, 0, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn one_bit_rows_are_padded() {
        // width 3: each row is one byte, only the top three bits matter
        let out = unpack_samples(&[0b1010_0000, 0b0100_0000], 3, 2, 1).unwrap();
        assert_eq!(out, vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn two_and_four_bit_samples_are_unpacked() {
        assert_eq!(unpack_samples(&[0b11_10_01_00], 4, 1, 2).unwrap(), vec![3, 2, 1, 0]);
        // 3 samples per row of 4 bits: rows are 2 bytes, low nibble of byte 2 is padding
        let out = unpack_samples(&[0xF0, 0x8F, 0x12, 0x3F], 3, 2, 4).unwrap();
        assert_eq!(out, vec![15, 0, 8, 1, 2, 3]);
        assert_eq!(scale_to_byte(3, 2), 255);
        assert_eq!(scale_to_byte(8, 4), 136);
    }

    #[test]
    fn sixteen_bit_samples_keep_the_high_byte() {
        let img = build_image(2, 1, 16, &ColourSpace::Gray, &[0xAB, 0xCD, 0x12, 0x34]).unwrap();
        assert_eq!(img.to_luma8().into_raw(), vec![0xAB, 0x12]);
    }

    #[test]
    fn build_image_rejects_short_data() {
        assert!(build_image(4, 4, 8, &ColourSpace::Rgb, &[0; 10]).is_err());
        assert!(build_image(2, 2, 16, &ColourSpace::Rgb, &[0; 23]).is_err());
        assert!(build_image(2, 2, 3, &ColourSpace::Gray, &[0; 8]).is_err());
        assert!(build_image(0, 2, 8, &ColourSpace::Gray, &[0; 8]).is_err());
    }

    #[test]
    fn huge_dimensions_are_an_error_not_a_panic() {
        let err = build_image(u32::MAX, u32::MAX, 8, &ColourSpace::Cmyk, &[0; 16]).unwrap_err();
        assert!(err.contains("too short"), "got {err}");
        assert!(build_image(u32::MAX, u32::MAX, 16, &ColourSpace::Rgb, &[0; 16]).is_err());
    }

    #[test]
    fn decode_raw_rgb_to_png() {
        let document = Document::with_version("1.5");
        let stream = raw_image(
            dictionary! { "Width" => 2, "Height" => 1, "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8 },
            vec![255, 0, 0, 0, 0, 255],
        );
        let decoded = decode_rgb(&document, &stream);
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn indexed_string_palette_is_looked_up() {
        let document = Document::with_version("1.5");
        let colour_space = vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(1),
            Object::String(vec![0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF], StringFormat::Hexadecimal),
        ];
        let stream = raw_image(
            dictionary! { "Width" => 3, "Height" => 1, "ColorSpace" => colour_space, "BitsPerComponent" => 8 },
            // index 7 is past hival and clamps to the last entry
            vec![1, 0, 7],
        );
        let decoded = decode_rgb(&document, &stream);
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0]);
        assert_eq!(decoded.get_pixel(2, 0).0, [0, 0, 255]);
    }

    #[test]
    fn indexed_stream_palette_with_four_bit_indices() {
        let mut document = Document::with_version("1.5");
        let palette = document.add_object(Stream::new(dictionary! {}, vec![0, 255, 128]));
        let colour_space = vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceGray".to_vec()),
            Object::Integer(2),
            Object::Reference(palette),
        ];
        let stream = raw_image(
            dictionary! { "Width" => 2, "Height" => 1, "ColorSpace" => colour_space, "BitsPerComponent" => 4 },
            vec![0x21],
        );
        let decoded = decode_rgb(&document, &stream);
        assert_eq!(decoded.get_pixel(0, 0).0, [128, 128, 128]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn indexed_palette_too_short_is_skipped() {
        let document = Document::with_version("1.5");
        let colour_space = vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(3),
            Object::String(vec![0; 6], StringFormat::Literal),
        ];
        let stream = raw_image(
            dictionary! { "Width" => 1, "Height" => 1, "ColorSpace" => colour_space, "BitsPerComponent" => 8 },
            vec![0],
        );
        assert!(decode_image(&document, &stream).is_err());
    }

    #[test]
    fn flate_compressed_samples_are_decoded() {
        let document = Document::with_version("1.5");
        let mut plain = Stream::new(dictionary! {}, vec![40; 64 * 3]);
        plain.compress().unwrap();
        let mut stream = raw_image(
            dictionary! { "Width" => 8, "Height" => 8, "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8 },
            Vec::new(),
        );
        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(plain.content);

        let decoded = decode_rgb(&document, &stream);
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(7, 7).0, [40, 40, 40]);
    }

    #[test]
    fn dct_stream_is_passed_through() {
        let document = Document::with_version("1.5");
        let stream = raw_image(dictionary! { "Filter" => "DCTDecode" }, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        let (ext, bytes) = decode_image(&document, &stream).unwrap();
        assert_eq!(ext, "jpeg");
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn jpeg_behind_ascii_filters_is_unwrapped() {
        let document = Document::with_version("1.5");
        let hex = raw_image(
            dictionary! {
                "Filter" => vec![Object::Name(b"ASCIIHexDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
            },
            b"FF D8 ff d9>".to_vec(),
        );
        assert_eq!(decode_image(&document, &hex).unwrap(), ("jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]));

        // "FFD8FFD9" in ASCII85
        let a85 = raw_image(
            dictionary! {
                "Filter" => vec![Object::Name(b"ASCII85Decode".to_vec()), Object::Name(b"JPXDecode".to_vec())],
            },
            b"<~s4IA)~>".to_vec(),
        );
        assert_eq!(decode_image(&document, &a85).unwrap(), ("jpx", vec![0xFF, 0xD8, 0xFF, 0xD9]));
    }

    #[test]
    fn ascii85_partial_group_and_zero_shorthand() {
        assert_eq!(decode_ascii85(b"z87cURD]j7BEbo7~>").unwrap(), b"\0\0\0\0Hello world".to_vec());
        assert!(decode_ascii85(b"8~>").is_err());
    }

    #[test]
    fn run_length_literals_and_repeats() {
        // literal "ab", then 'x' three times, then EOD
        assert_eq!(decode_run_length(&[1, b'a', b'b', 254, b'x', 128]).unwrap(), b"abxxx".to_vec());
        assert!(decode_run_length(&[5, b'a']).is_err());
    }

    #[test]
    fn ccitt_is_skipped() {
        let document = Document::with_version("1.5");
        let stream = raw_image(
            dictionary! { "Filter" => "CCITTFaxDecode", "Width" => 1, "Height" => 1 },
            vec![0],
        );
        assert!(decode_image(&document, &stream).is_err());
    }

    #[test]
    fn lab_is_skipped() {
        let document = Document::with_version("1.5");
        let stream = raw_image(
            dictionary! {
                "Width" => 1, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => vec![Object::Name(b"Lab".to_vec()), Object::Dictionary(Dictionary::new())],
            },
            vec![0, 0, 0],
        );
        let err = decode_image(&document, &stream).unwrap_err();
        assert!(err.contains("Lab"), "got {err}");
    }
}
