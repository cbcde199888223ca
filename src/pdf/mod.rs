//! # PDF Serializer
//!
//! Draws a [`Document`] of primitives into a PDF 1.7 file. The primitive
//! coordinates are already in PDF user space (points, bottom-left origin),
//! so the writer only turns each one into content-stream operators.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Text uses the standard Helvetica font with WinAnsiEncoding unless a
//! TrueType font is supplied. A supplied font is embedded whole as a
//! CIDFontType2 with Identity-H encoding, a `/W` width array for the glyphs
//! in use, and a ToUnicode CMap so text stays extractable.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use crate::error::FolioError;
use crate::font::{FallbackMetrics, FontHandle, TextMeasure, TrueTypeFont};
use crate::image_loader::{load_image, ImagePixelData, JpegColorSpace, LoadedImage};
use crate::model::{Document, Page, Primitive, Rgb};
use log::{debug, warn};
use miniz_oxide::deflate::compress_to_vec_zlib;
use serde::{Deserialize, Serialize};

/// Resolution of the shrink-to-fit size search.
const FIT_STEP: f64 = 0.5;
/// Bézier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.5522847498;

/// Document information written to the `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Default)]
pub struct PdfWriter<'a> {
    font: Option<&'a TrueTypeFont>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Object id of the font every text handle points at.
    font_obj: usize,
    /// (fill alpha, stroke alpha) in thousandths -> (resource index, object id)
    ext_gstates: HashMap<(u16, u16), (usize, usize)>,
    /// Image path -> (resource index, object id), or `None` when it failed to load.
    images: HashMap<String, Option<(usize, usize)>>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} >>\nstream\n",
            dict_entries,
            payload.len()
        );
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }

    /// Name of the graphics state for the given alphas, creating it on first use.
    fn ext_gstate(&mut self, fill_alpha: f64, stroke_alpha: f64) -> String {
        let key = (alpha_key(fill_alpha), alpha_key(stroke_alpha));
        if let Some((index, _)) = self.ext_gstates.get(&key) {
            return format!("GS{}", index);
        }
        let index = self.ext_gstates.len();
        let id = self.push(
            format!(
                "<< /Type /ExtGState /ca {:.3} /CA {:.3} >>",
                key.0 as f64 / 1000.0,
                key.1 as f64 / 1000.0
            )
            .into_bytes(),
        );
        self.ext_gstates.insert(key, (index, id));
        format!("GS{}", index)
    }

    /// XObject name for the image at `path`, or `None` when it cannot be embedded.
    fn image(&mut self, path: &str) -> Option<String> {
        if let Some(entry) = self.images.get(path) {
            return entry.map(|(index, _)| format!("Im{}", index));
        }
        let entry = match load_image(path) {
            Ok(image) => {
                let index = self.images.values().filter(|e| e.is_some()).count();
                let id = write_image_xobject(self, &image);
                Some((index, id))
            }
            Err(e) => {
                warn!("drawing placeholder for image {}: {}", path, e);
                None
            }
        };
        self.images.insert(path.to_string(), entry);
        entry.map(|(index, _)| format!("Im{}", index))
    }
}

fn alpha_key(alpha: f64) -> u16 {
    (alpha.clamp(0.0, 1.0) * 1000.0).round() as u16
}

impl<'a> PdfWriter<'a> {
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Embed `font` and use it for every text primitive.
    pub fn with_font(font: &'a TrueTypeFont) -> Self {
        Self { font: Some(font) }
    }

    fn measure(&self) -> &dyn TextMeasure {
        match self.font {
            Some(font) => font,
            None => &FallbackMetrics,
        }
    }

    /// Write the document's pages to a PDF byte vector.
    pub fn write(&self, document: &Document, metadata: &Metadata) -> Result<Vec<u8>, FolioError> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_obj: 0,
            ext_gstates: HashMap::new(),
            images: HashMap::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = font, then per page: graphics states and images as first
        //      used, the content stream, the page object
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());

        builder.font_obj = match self.font {
            Some(font) => write_custom_font_objects(&mut builder, font, &used_chars(document))?,
            None => builder.push(
                b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                    .to_vec(),
            ),
        };
        let font_resources = font_handles(document)
            .iter()
            .map(|handle| format!("/{} {} 0 R", handle, builder.font_obj))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_obj_ids: Vec<usize> = Vec::new();
        for page in &document.pages {
            let content = self.build_content_stream(page, &mut builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >>{}{} >> >>",
                page.width,
                page.height,
                content_obj_id,
                font_resources,
                ext_gstate_resources(&builder),
                xobject_resources(&builder),
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", pdf_text_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author {} ", pdf_text_string(author));
        }
        info.push_str("/Producer (folio) >>");
        let info_obj_id = builder.push(info.into_bytes());

        Ok(serialize(&builder, info_obj_id))
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &Page, builder: &mut PdfBuilder) -> String {
        let mut stream = String::new();
        for item in &page.items {
            self.write_primitive(&mut stream, item, builder);
        }
        stream
    }

    fn write_primitive(&self, stream: &mut String, item: &Primitive, builder: &mut PdfBuilder) {
        match item {
            Primitive::Rect {
                x,
                y,
                w,
                h,
                fill,
                stroke,
                stroke_width,
                alpha,
                stroke_alpha,
                radius,
            } => {
                if fill.is_none() && stroke.is_none() {
                    return;
                }
                let fill_alpha = if fill.is_some() { *alpha } else { 1.0 };
                let line_alpha = if stroke.is_some() { *stroke_alpha } else { 1.0 };
                stream.push_str("q\n");
                if fill_alpha < 1.0 || line_alpha < 1.0 {
                    let gs = builder.ext_gstate(fill_alpha, line_alpha);
                    let _ = writeln!(stream, "/{} gs", gs);
                }
                if let Some(c) = fill {
                    write_color(stream, *c, "rg");
                }
                if let Some(c) = stroke {
                    write_color(stream, *c, "RG");
                    let _ = writeln!(stream, "{:.2} w", stroke_width);
                }
                write_rect_path(stream, *x, *y, *w, *h, *radius);
                let op = match (fill.is_some(), stroke.is_some()) {
                    (true, true) => "B",
                    (true, false) => "f",
                    _ => "S",
                };
                let _ = writeln!(stream, "{}\nQ", op);
            }

            Primitive::StrokeRect {
                x,
                y,
                w,
                h,
                stroke,
                stroke_width,
                alpha,
                radius,
            } => {
                stream.push_str("q\n");
                if *alpha < 1.0 {
                    let gs = builder.ext_gstate(1.0, *alpha);
                    let _ = writeln!(stream, "/{} gs", gs);
                }
                write_color(stream, *stroke, "RG");
                let _ = writeln!(stream, "{:.2} w", stroke_width);
                write_rect_path(stream, *x, *y, *w, *h, *radius);
                stream.push_str("S\nQ\n");
            }

            Primitive::Text {
                content,
                x,
                y,
                size,
                color,
                alpha,
                font,
            } => self.write_text(stream, builder, content, *x, *y, *size, *color, *alpha, font),

            Primitive::TextFit {
                content,
                x,
                y,
                w,
                h,
                min_size,
                max_size,
                color,
                font,
            } => {
                let size = fit_font_size(self.measure(), content, *w, *min_size, *max_size);
                let width = self.measure().text_width(content, size);
                let tx = x + (w - width) / 2.0;
                let ty = y + (h - size) / 2.0;
                self.write_text(stream, builder, content, tx, ty, size, *color, 1.0, font);
            }

            Primitive::Image { path, x, y, w, h } => match builder.image(path) {
                Some(name) => {
                    let _ = writeln!(
                        stream,
                        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ",
                        w, h, x, y, name
                    );
                }
                None => {
                    let _ = writeln!(
                        stream,
                        "q\n0.9 0.9 0.9 rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ",
                        x, y, w, h
                    );
                }
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_text(
        &self,
        stream: &mut String,
        builder: &mut PdfBuilder,
        content: &str,
        x: f64,
        y: f64,
        size: f64,
        color: Rgb,
        alpha: f64,
        font: &FontHandle,
    ) {
        if content.is_empty() {
            return;
        }
        stream.push_str("q\n");
        if alpha < 1.0 {
            let gs = builder.ext_gstate(alpha, alpha);
            let _ = writeln!(stream, "/{} gs", gs);
        }
        stream.push_str("BT\n");
        write_color(stream, color, "rg");
        let _ = writeln!(
            stream,
            "/{} {:.2} Tf\n{:.2} {:.2} Td",
            resource_name(font),
            size,
            x,
            y
        );
        match self.font {
            Some(embedded) => {
                let hex: String = content
                    .chars()
                    .map(|c| format!("{:04X}", embedded.metrics().glyph_id(c)))
                    .collect();
                let _ = writeln!(stream, "<{}> Tj", hex);
            }
            None => {
                let _ = writeln!(stream, "({}) Tj", encode_winansi(content));
            }
        }
        stream.push_str("ET\nQ\n");
    }
}

/// Largest size in `[min, max]` at which `text` fits `width`, searched at
/// half-point resolution. Falls back to `min` when nothing fits.
pub fn fit_font_size(measure: &dyn TextMeasure, text: &str, width: f64, min: f64, max: f64) -> f64 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    if measure.text_width(text, max) <= width {
        return max;
    }
    let (mut lo, mut hi, mut best) = (min, max, min);
    while hi - lo > FIT_STEP {
        let mid = (lo + hi) / 2.0;
        if measure.text_width(text, mid) <= width {
            best = mid;
            lo = mid;
        } else {
            hi = mid;
        }
    }
    best
}

fn write_color(stream: &mut String, c: Rgb, op: &str) {
    let _ = writeln!(
        stream,
        "{:.3} {:.3} {:.3} {}",
        c.r as f64 / 255.0,
        c.g as f64 / 255.0,
        c.b as f64 / 255.0,
        op
    );
}

/// Append a rectangle path, rounded when `radius` > 0. The radius is
/// limited to half the shorter side.
fn write_rect_path(stream: &mut String, x: f64, y: f64, w: f64, h: f64, radius: f64) {
    let r = radius.min(w / 2.0).min(h / 2.0);
    if r <= 0.0 {
        let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re", x, y, w, h);
        return;
    }
    let k = r * KAPPA;
    let _ = writeln!(stream, "{:.2} {:.2} m", x + r, y);
    let _ = writeln!(stream, "{:.2} {:.2} l", x + w - r, y);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x + w - r + k, y, x + w, y + r - k, x + w, y + r
    );
    let _ = writeln!(stream, "{:.2} {:.2} l", x + w, y + h - r);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x + w, y + h - r + k, x + w - r + k, y + h, x + w - r, y + h
    );
    let _ = writeln!(stream, "{:.2} {:.2} l", x + r, y + h);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x + r - k, y + h, x, y + h - r + k, x, y + h - r
    );
    let _ = writeln!(stream, "{:.2} {:.2} l", x, y + r);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x, y + r - k, x + r - k, y, x + r, y
    );
    stream.push_str("h\n");
}

fn resource_name(handle: &FontHandle) -> String {
    let name: String = handle
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        FontHandle::default().0
    } else {
        name
    }
}

/// Distinct font resource names used by text primitives, plus the default.
fn font_handles(document: &Document) -> BTreeSet<String> {
    let mut handles = BTreeSet::from([FontHandle::default().0]);
    for item in document.pages.iter().flat_map(|p| &p.items) {
        if let Primitive::Text { font, .. } | Primitive::TextFit { font, .. } = item {
            handles.insert(resource_name(font));
        }
    }
    handles
}

fn used_chars(document: &Document) -> BTreeSet<char> {
    document
        .pages
        .iter()
        .flat_map(|p| &p.items)
        .filter_map(|item| match item {
            Primitive::Text { content, .. } | Primitive::TextFit { content, .. } => Some(content),
            _ => None,
        })
        .flat_map(|content| content.chars())
        .collect()
}

fn ext_gstate_resources(builder: &PdfBuilder) -> String {
    if builder.ext_gstates.is_empty() {
        return String::new();
    }
    let mut entries: Vec<&(usize, usize)> = builder.ext_gstates.values().collect();
    entries.sort();
    let body = entries
        .iter()
        .map(|(index, id)| format!("/GS{} {} 0 R", index, id))
        .collect::<Vec<_>>()
        .join(" ");
    format!(" /ExtGState << {} >>", body)
}

fn xobject_resources(builder: &PdfBuilder) -> String {
    let mut entries: Vec<(usize, usize)> = builder.images.values().flatten().copied().collect();
    if entries.is_empty() {
        return String::new();
    }
    entries.sort();
    let body = entries
        .iter()
        .map(|(index, id)| format!("/Im{} {} 0 R", index, id))
        .collect::<Vec<_>>()
        .join(" ");
    format!(" /XObject << {} >>", body)
}

/// Write a single image as one or two XObject PDF objects.
/// Returns the main XObject ID.
fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
    match &image.pixel_data {
        ImagePixelData::Jpeg { data, color_space } => {
            let color_space = match color_space {
                JpegColorSpace::DeviceRGB => "/DeviceRGB",
                JpegColorSpace::DeviceGray => "/DeviceGray",
            };
            builder.push_stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode",
                    image.width_px, image.height_px, color_space
                ),
                data,
            )
        }
        ImagePixelData::Decoded { rgb, alpha } => {
            // Write SMask first if alpha channel exists
            let smask_ref = alpha
                .as_ref()
                .map(|alpha_data| {
                    let id = builder.push_stream(
                        &format!(
                            "/Type /XObject /Subtype /Image /Width {} /Height {} \
                             /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                            image.width_px, image.height_px
                        ),
                        &compress_to_vec_zlib(alpha_data, 6),
                    );
                    format!(" /SMask {} 0 R", id)
                })
                .unwrap_or_default();
            builder.push_stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode{}",
                    image.width_px, image.height_px, smask_ref
                ),
                &compress_to_vec_zlib(rgb, 6),
            )
        }
    }
}

/// Write the font file, descriptor, CIDFont, ToUnicode CMap and Type0 root
/// for an embedded TrueType font. Returns the Type0 object id.
fn write_custom_font_objects(
    builder: &mut PdfBuilder,
    font: &TrueTypeFont,
    used: &BTreeSet<char>,
) -> Result<usize, FolioError> {
    let face = ttf_parser::Face::parse(font.data(), 0)
        .map_err(|e| FolioError::Font(format!("cannot embed font: {}", e)))?;
    let metrics = font.metrics();
    let scale = 1000.0 / metrics.units_per_em as f64;
    let name = font.postscript_name();

    // 1. FontFile2 stream
    let compressed = compress_to_vec_zlib(font.data(), 6);
    let fontfile2_id = builder.push_stream(
        &format!("/Length1 {} /Filter /FlateDecode", font.data().len()),
        &compressed,
    );

    // 2. FontDescriptor
    let bbox = face.global_bounding_box();
    let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
    let descriptor_id = builder.push(
        format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
             /FontFile2 {} 0 R >>",
            name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            cap_height as i32,
            fontfile2_id,
        )
        .into_bytes(),
    );

    // 3. CIDFont
    let glyphs: Vec<(u16, char)> = used.iter().map(|&c| (metrics.glyph_id(c), c)).collect();
    let cidfont_id = builder.push(
        format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
            name,
            descriptor_id,
            (metrics.default_advance as f64 * scale) as u32,
            build_w_array(&glyphs, font),
        )
        .into_bytes(),
    );

    // 4. ToUnicode CMap
    let cmap = build_tounicode_cmap(&glyphs, name);
    let tounicode_id =
        builder.push_stream("/Filter /FlateDecode", &compress_to_vec_zlib(cmap.as_bytes(), 6));

    // 5. Type0 root
    debug!("embedding font {} ({} glyphs in use)", name, glyphs.len());
    Ok(builder.push(
        format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            name, cidfont_id, tounicode_id
        )
        .into_bytes(),
    ))
}

/// Build the /W array: `[gid [width] gid [width] ...]` in 1/1000 em.
fn build_w_array(glyphs: &[(u16, char)], font: &TrueTypeFont) -> String {
    let metrics = font.metrics();
    let scale = 1000.0 / metrics.units_per_em as f64;
    let mut entries: Vec<(u16, u32)> = glyphs
        .iter()
        .map(|&(gid, ch)| (gid, (metrics.advance(ch) as f64 * scale) as u32))
        .collect();
    entries.sort_by_key(|(gid, _)| *gid);
    entries.dedup_by_key(|(gid, _)| *gid);

    let mut result = String::from("[");
    for (gid, width) in &entries {
        let _ = write!(result, " {} [{}]", gid, width);
    }
    result.push_str(" ]");
    result
}

/// Map glyph ids back to Unicode for text extraction.
fn build_tounicode_cmap(glyphs: &[(u16, char)], font_name: &str) -> String {
    let mut mapping: Vec<(u16, char)> = glyphs.iter().copied().filter(|(gid, _)| *gid != 0).collect();
    mapping.sort();
    mapping.dedup_by_key(|(gid, _)| *gid);

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    // At most 100 entries per bfchar block.
    for chunk in mapping.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Encode `text` as the body of a WinAnsi literal string. Bytes outside
/// ASCII become octal escapes; unmappable characters become `?`.
fn encode_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match unicode_to_winansi(ch) {
            Some(b'\\') => out.push_str("\\\\"),
            Some(b'(') => out.push_str("\\("),
            Some(b')') => out.push_str("\\)"),
            Some(b) if b.is_ascii() => out.push(b as char),
            Some(b) => {
                let _ = write!(out, "\\{:03o}", b);
            }
            None => out.push('?'),
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    // Windows-1252 specials in 0x80..=0x9F
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Info strings: literal when plain ASCII, UTF-16BE hex with a BOM otherwise.
fn pdf_text_string(s: &str) -> String {
    if s.is_ascii() {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        return format!("({})", escaped);
    }
    let hex: String = s.encode_utf16().map(|u| format!("{:04X}", u)).collect();
    format!("<FEFF{}>", hex)
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in builder.objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }

    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_obj_id,
        xref_offset
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(items: Vec<Primitive>) -> Document {
        Document {
            pages: vec![Page {
                width: 200.0,
                height: 100.0,
                items,
            }],
        }
    }

    fn render(items: Vec<Primitive>) -> String {
        let bytes = PdfWriter::new()
            .write(&document(items), &Metadata::default())
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Content streams are compressed; inflate the first one for inspection.
    fn first_content_stream(pdf: &[u8]) -> String {
        let marker = b"/Filter /FlateDecode /Length ";
        let start = pdf.windows(marker.len()).position(|w| w == marker).unwrap();
        let rest = &pdf[start..];
        let body = rest.windows(7).position(|w| w == b"stream\n").unwrap() + 7;
        let end = rest.windows(10).position(|w| w == b"\nendstream").unwrap();
        let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(&rest[body..end]).unwrap();
        String::from_utf8(inflated).unwrap()
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let text = render(vec![]);
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("%%EOF"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
        assert!(text.contains("/MediaBox [0 0 200.00 100.00]"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = Metadata {
            title: Some("Quarterly (draft)".to_string()),
            author: Some("Zoë".to_string()),
        };
        let bytes = PdfWriter::new().write(&document(vec![]), &metadata).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Quarterly \\(draft\\))"));
        assert!(text.contains("/Author <FEFF"));
    }

    #[test]
    fn translucent_fill_uses_one_shared_graphics_state() {
        let rect = Primitive::fill(0.0, 0.0, 10.0, 10.0, Rgb::BLACK, 0.5, 0.0);
        let bytes = PdfWriter::new()
            .write(&document(vec![rect.clone(), rect]), &Metadata::default())
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Type /ExtGState").count(), 1);
        assert!(text.contains("/ca 0.500"));
        let content = first_content_stream(&bytes);
        assert_eq!(content.matches("/GS0 gs").count(), 2);
    }

    #[test]
    fn rounded_rect_uses_curves() {
        let bytes = PdfWriter::new()
            .write(
                &document(vec![Primitive::StrokeRect {
                    x: 0.0,
                    y: 0.0,
                    w: 20.0,
                    h: 10.0,
                    stroke: Rgb::BLACK,
                    stroke_width: 1.0,
                    alpha: 1.0,
                    radius: 50.0,
                }]),
                &Metadata::default(),
            )
            .unwrap();
        let content = first_content_stream(&bytes);
        assert_eq!(content.matches(" c\n").count(), 4);
        // Radius clamps to half the height.
        assert!(content.contains("5.00 0.00 m"));
    }

    #[test]
    fn missing_image_draws_placeholder() {
        let bytes = PdfWriter::new()
            .write(
                &document(vec![Primitive::Image {
                    path: "/no/such/image.png".into(),
                    x: 1.0,
                    y: 2.0,
                    w: 3.0,
                    h: 4.0,
                }]),
                &Metadata::default(),
            )
            .unwrap();
        let content = first_content_stream(&bytes);
        assert!(content.contains("0.9 0.9 0.9 rg"));
        assert!(content.contains("1.00 2.00 3.00 4.00 re"));
    }

    #[test]
    fn helvetica_text_is_winansi() {
        let bytes = PdfWriter::new()
            .write(
                &document(vec![Primitive::Text {
                    content: "Café (1)".into(),
                    x: 5.0,
                    y: 6.0,
                    size: 12.0,
                    color: Rgb::BLACK,
                    alpha: 1.0,
                    font: FontHandle::default(),
                }]),
                &Metadata::default(),
            )
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/BaseFont /Helvetica"));
        assert!(text.contains("/F1 3 0 R"));
        let content = first_content_stream(&bytes);
        assert!(content.contains("(Caf\\351 \\(1\\)) Tj"));
        assert!(content.contains("/F1 12.00 Tf"));
    }

    #[test]
    fn fit_size_search() {
        // Fallback metrics: width = chars * size / 2.
        let m = FallbackMetrics;
        assert_eq!(fit_font_size(&m, "abcd", 100.0, 8.0, 24.0), 24.0);
        let size = fit_font_size(&m, "abcd", 40.0, 8.0, 24.0);
        assert!(size <= 20.0 && size > 19.0);
        assert_eq!(fit_font_size(&m, "abcdefghij", 5.0, 8.0, 24.0), 8.0);
    }

    #[test]
    fn winansi_escapes() {
        assert_eq!(encode_winansi("a\\b"), "a\\\\b");
        assert_eq!(encode_winansi("€"), "\\200");
        assert_eq!(encode_winansi("日"), "?");
    }

    #[test]
    fn tounicode_cmap_format() {
        let cmap = build_tounicode_cmap(&[(36, 'A'), (0, 'x'), (40, '😀')], "Test");
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0028> <D83DDE00>"));
        assert!(cmap.contains("/CMapName /Test-UTF16 def"));
    }
}
