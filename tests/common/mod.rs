//! Shared fixtures: in-process PDFs built with lopdf and scripted engines.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf2md_batch::{ConversionEngine, Pdf2MdError, RenderedDocument, RenderedPage};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

// ── PDF fixtures ─────────────────────────────────────────────────────────────

/// An image XObject to embed.
#[derive(Debug, Clone)]
pub enum FixtureImage {
    /// Raw 8-bit RGB samples, one solid colour.
    Rgb { width: u32, height: u32, colour: [u8; 3] },
    /// A real JPEG file stored with `DCTDecode`.
    Jpeg { width: u32, height: u32 },
    /// The JPEG of [`FixtureImage::Jpeg`], zlib-compressed behind
    /// `[/FlateDecode /DCTDecode]`.
    FlateJpeg { width: u32, height: u32 },
    /// Raw RGB samples compressed with `FlateDecode`.
    FlateRgb { width: u32, height: u32, colour: [u8; 3] },
    /// An image drawn through a form XObject rather than by the page itself.
    InForm(Box<FixtureImage>),
}

impl FixtureImage {
    pub fn rgb(colour: [u8; 3]) -> Self {
        FixtureImage::Rgb {
            width: 4,
            height: 3,
            colour,
        }
    }

    pub fn jpeg() -> Self {
        FixtureImage::Jpeg { width: 8, height: 8 }
    }

    pub fn in_form(inner: FixtureImage) -> Self {
        FixtureImage::InForm(Box::new(inner))
    }
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn solid_rgb(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
    (0..width * height).flat_map(|_| colour).collect()
}

fn image_dict(width: u32, height: u32) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    }
}

/// The JPEG bytes that [`FixtureImage::Jpeg`] embeds.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 30, 30])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg).unwrap();
    out
}

fn image_stream(doc: &mut Document, image: &FixtureImage) -> Stream {
    match *image {
        FixtureImage::Rgb { width, height, colour } => {
            Stream::new(image_dict(width, height), solid_rgb(width, height, colour))
        }
        FixtureImage::Jpeg { width, height } => {
            let mut dict = image_dict(width, height);
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, jpeg_bytes(width, height))
        }
        FixtureImage::FlateJpeg { width, height } => {
            let mut dict = image_dict(width, height);
            dict.set(
                "Filter",
                vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
            );
            Stream::new(dict, zlib(&jpeg_bytes(width, height)))
        }
        FixtureImage::FlateRgb { width, height, colour } => {
            let mut dict = image_dict(width, height);
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, zlib(&solid_rgb(width, height, colour)))
        }
        FixtureImage::InForm(ref inner) => {
            let inner = image_stream(doc, inner);
            let inner_id = doc.add_object(inner);
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Im0" => inner_id },
                    },
                },
                b"q /Im0 Do Q".to_vec(),
            )
        }
    }
}

fn resources(doc: &mut Document, font_id: ObjectId, images: &[FixtureImage]) -> Dictionary {
    let mut xobjects = Dictionary::new();
    for (i, image) in images.iter().enumerate() {
        let stream = image_stream(doc, image);
        let id = doc.add_object(stream);
        xobjects.set(format!("Im{i}"), id);
    }
    dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => xobjects,
    }
}

/// Build a document with one entry of `pages` per page.
///
/// A page with an empty image list carries no `/Resources` of its own and
/// inherits `inherited` from the page tree root.
pub fn build_pdf(pages: &[Vec<FixtureImage>], inherited: &[FixtureImage]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for (i, images) in pages.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Fixture page {}", i + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        if !images.is_empty() {
            page.set("Resources", resources(&mut doc, font_id, images));
        }
        kids.push(doc.add_object(page).into());
    }

    let mut root = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
    };
    root.set("Resources", resources(&mut doc, font_id, inherited));
    doc.objects.insert(pages_id, Object::Dictionary(root));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_pdf(path: &Path, pages: &[Vec<FixtureImage>]) {
    build_pdf(pages, &[]).save(path).unwrap();
}

pub fn write_pdf_with_inherited(path: &Path, page_count: usize, inherited: &[FixtureImage]) {
    let pages = vec![Vec::new(); page_count];
    build_pdf(&pages, inherited).save(path).unwrap();
}

// ── Scripted engines ─────────────────────────────────────────────────────────

/// Text a [`ScriptedEngine`] produces for a document stem.
pub fn scripted_text(stem: &str) -> String {
    format!("# {stem}\n\nBody of {stem}.\n")
}

/// Renders `scripted_text(stem)` as a single page, or fails for any stem
/// starting with `fail`.
pub struct ScriptedEngine;

impl ConversionEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn render(&mut self, pdf_path: &Path) -> Result<RenderedDocument, Pdf2MdError> {
        let stem = pdf_path.file_stem().unwrap().to_string_lossy().into_owned();
        if stem.starts_with("fail") {
            return Err(Pdf2MdError::AllPagesFailed {
                total: 1,
                first_error: format!("scripted failure for {stem}"),
            });
        }
        let mut rendered = RenderedDocument::new(self.name());
        rendered.pages.push(RenderedPage {
            page_num: 1,
            markdown: scripted_text(&stem),
            ..Default::default()
        });
        Ok(rendered)
    }
}

pub fn scripted_factory() -> Result<Box<dyn ConversionEngine>, Pdf2MdError> {
    Ok(Box::new(ScriptedEngine))
}

/// A factory that counts how many engines it has built.
pub struct CountingFactory {
    pub created: AtomicUsize,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl pdf2md_batch::EngineFactory for CountingFactory {
    fn create_engine(&self) -> Result<Box<dyn ConversionEngine>, Pdf2MdError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        scripted_factory()
    }
}
