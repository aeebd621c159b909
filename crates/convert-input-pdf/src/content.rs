//! Content stream interpretation.
//!
//! Walks the operators of a page's content stream (and of the Form XObjects
//! it draws), tracking just enough graphics and text state to place every
//! shown string and every image on the page.
//!
//! Output coordinates are in points with the origin at the top-left corner
//! of the page's visible box and `y` growing downwards.

use std::collections::{BTreeMap, HashSet};

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use convert_core::error::{ConvertError, Result};
use convert_utils::encoding::decode_shown_text;

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// A `TJ` adjustment larger than this (thousandths of an em) is a word gap.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Average advance of a glyph, in ems. Glyph widths are not read from the
/// font, so span widths are estimates.
const GLYPH_ADVANCE_EM: f64 = 0.5;

/// Parent chain walks stop after this many levels.
const MAX_INHERITANCE_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Affine transform `[a b c d e f]` as used by PDF (row-vector convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: the transform that applies `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit x vector.
    pub fn scale_x(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed unit y vector.
    pub fn scale_y(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f64> = operands[..6].iter().filter_map(number).collect();
        if n.len() != 6 {
            return None;
        }
        Some(Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }
}

/// The visible area of a page in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise display rotation: 0, 90, 180 or 270.
    pub rotate: i64,
}

impl PageBox {
    /// US Letter, used when a page has no usable box.
    pub const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        width: 612.0,
        height: 792.0,
        rotate: 0,
    };

    /// Page size as displayed, with the rotation applied.
    pub fn oriented_size(&self) -> (f64, f64) {
        if self.rotate % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Convert a user-space point to top-left based coordinates of the
    /// displayed (rotated) page.
    pub fn to_top_left(&self, x: f64, y: f64) -> (f64, f64) {
        let (u, v) = (x - self.x0, self.y0 + self.height - y);
        match self.rotate {
            90 => (self.height - v, u),
            180 => (self.width - u, self.height - v),
            270 => (v, self.width - u),
            _ => (u, v),
        }
    }

    /// Top-left corner and size of a user-space rectangle on the
    /// displayed page.
    pub fn rect_to_top_left(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> (f64, f64, f64, f64) {
        let (ax, ay) = self.to_top_left(min_x, min_y);
        let (bx, by) = self.to_top_left(max_x, max_y);
        (ax.min(bx), ay.min(by), (ax - bx).abs(), (ay - by).abs())
    }
}

/// Read the page's CropBox (or MediaBox) and `/Rotate`, honouring
/// inheritance.
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let rect = [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .iter()
        .find_map(|key| inherited_attribute(doc, page_id, key).and_then(|o| rect(doc, o)));
    // Only quarter turns are valid; anything else is treated as upright.
    let rotate = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|o| resolve(doc, o).as_i64().ok())
        .map(|r| r.rem_euclid(360))
        .filter(|r| r % 90 == 0)
        .unwrap_or(0);

    let bbox = match rect {
        Some([x0, y0, x1, y1]) if (x1 - x0).abs() > 1.0 && (y1 - y0).abs() > 1.0 => PageBox {
            x0: x0.min(x1),
            y0: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
            rotate: 0,
        },
        _ => PageBox::LETTER,
    };
    PageBox { rotate, ..bbox }
}

fn rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = number(resolve(doc, item))?;
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Object helpers
// ---------------------------------------------------------------------------

/// Follow a reference to the object it points at. Dangling references
/// resolve to themselves.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).as_dict().ok()
}

/// Look up a page attribute, walking up the page tree for inheritable ones.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").ok()?;
        dict = resolve_dict(doc, parent)?;
    }
    None
}

pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn operand(operands: &[Object], idx: usize) -> Option<f64> {
    operands.get(idx).and_then(number)
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A run of shown text with position and style information.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Left edge.
    pub x: f64,
    /// Baseline, measured from the top of the page.
    pub baseline: f64,
    /// Estimated advance width.
    pub width: f64,
    /// Effective font size in points.
    pub font_size: f64,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, x: f64, baseline: f64, font_size: f64) -> Self {
        Self {
            text: text.into(),
            x,
            baseline,
            width: 0.0,
            font_size,
            font_name: String::new(),
            bold: false,
            italic: false,
        }
    }

    /// Set the font name, inferring bold/italic from it.
    pub fn with_font(mut self, font_name: &str) -> Self {
        let lower = font_name.to_lowercase();
        self.bold |= ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|k| lower.contains(k));
        self.italic |= lower.contains("italic") || lower.contains("oblique");
        self.font_name = font_name.to_string();
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn top(&self) -> f64 {
        self.baseline - self.font_size * 0.8
    }

    pub fn bottom(&self) -> f64 {
        self.baseline + self.font_size * 0.2
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Where an image XObject is drawn on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub object_id: ObjectId,
    pub x: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Everything drawn on one page that the converter cares about.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub spans: Vec<TextSpan>,
    pub images: Vec<ImagePlacement>,
}

impl PageContent {
    pub fn has_text(&self) -> bool {
        self.spans.iter().any(|s| !s.text.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Interpret the content stream(s) of a page.
pub fn interpret_page(doc: &Document, page_id: ObjectId, page_box: PageBox) -> Result<PageContent> {
    let content = doc
        .get_page_content(page_id)
        .map_err(|e| ConvertError::Pdf(format!("Failed to read page content: {}", e)))?;
    let resources = inherited_attribute(doc, page_id, b"Resources").and_then(|o| resolve_dict(doc, o));

    let mut interpreter = Interpreter {
        doc,
        page_box,
        output: PageContent::default(),
        active_forms: HashSet::new(),
    };
    interpreter.run(&content, resources, Matrix::IDENTITY, 0)?;
    Ok(interpreter.output)
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_size: f64,
    leading: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scaling: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

struct Interpreter<'a> {
    doc: &'a Document,
    page_box: PageBox,
    output: PageContent,
    /// Forms currently being drawn, to break reference cycles.
    active_forms: HashSet<ObjectId>,
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|e| ConvertError::Pdf(format!("Failed to decode content stream: {}", e)))?;
        let fonts = self.fonts(resources);

        let mut state = GraphicsState {
            ctm: base_ctm,
            text: TextState::default(),
        };
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in &content.operations {
            let ops = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(ops) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = ops.first() {
                        state.text.font = name.clone();
                    }
                    if let Some(size) = operand(ops, 1) {
                        state.text.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(v) = operand(ops, 0) {
                        state.text.leading = v;
                    }
                }
                "Tc" => {
                    if let Some(v) = operand(ops, 0) {
                        state.text.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = operand(ops, 0) {
                        state.text.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = operand(ops, 0) {
                        state.text.horizontal_scaling = v / 100.0;
                    }
                }
                "Td" | "TD" => {
                    let tx = operand(ops, 0).unwrap_or(0.0);
                    let ty = operand(ops, 1).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.text.leading = -ty;
                    }
                    tlm = Matrix::translation(tx, ty).multiply(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(ops) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -state.text.leading).multiply(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(obj @ Object::String(..)) = ops.first() {
                        self.show(std::slice::from_ref(obj), &state, &fonts, &mut tm);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = ops.first() {
                        self.show(items, &state, &fonts, &mut tm);
                    }
                }
                "'" | "\"" => {
                    let text_idx = if op.operator == "\"" {
                        if let Some(v) = operand(ops, 0) {
                            state.text.word_spacing = v;
                        }
                        if let Some(v) = operand(ops, 1) {
                            state.text.char_spacing = v;
                        }
                        2
                    } else {
                        0
                    };
                    tlm = Matrix::translation(0.0, -state.text.leading).multiply(&tlm);
                    tm = tlm;
                    if let Some(obj @ Object::String(..)) = ops.get(text_idx) {
                        self.show(std::slice::from_ref(obj), &state, &fonts, &mut tm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = ops.first() {
                        self.draw_xobject(name, resources, state.ctm, depth);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Font resources by name.
    fn fonts(&self, resources: Option<&'a Dictionary>) -> BTreeMap<Vec<u8>, &'a Dictionary> {
        let mut fonts = BTreeMap::new();
        let font_dict = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|o| resolve_dict(self.doc, o));
        if let Some(font_dict) = font_dict {
            for (name, obj) in font_dict.iter() {
                if let Some(dict) = resolve_dict(self.doc, obj) {
                    fonts.insert(name.clone(), dict);
                }
            }
        }
        fonts
    }

    /// Show the strings of a `Tj`/`TJ` operand list as one span and advance
    /// the text matrix past them.
    fn show(
        &mut self,
        items: &[Object],
        state: &GraphicsState,
        fonts: &BTreeMap<Vec<u8>, &'a Dictionary>,
        tm: &mut Matrix,
    ) {
        let ts = &state.text;
        let font = fonts.get(&ts.font).copied();
        let encoding = font.and_then(|f| f.get_font_encoding(self.doc).ok());

        let start = *tm;
        let mut text = String::new();
        let mut advance = 0.0;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = match encoding {
                        Some(ref enc) => Document::decode_text(enc, bytes)
                            .unwrap_or_else(|_| decode_shown_text(bytes)),
                        None => decode_shown_text(bytes),
                    };
                    for ch in decoded.chars() {
                        let mut w = GLYPH_ADVANCE_EM * ts.font_size + ts.char_spacing;
                        if ch == ' ' {
                            w += ts.word_spacing;
                        }
                        advance += w * ts.horizontal_scaling;
                    }
                    text.push_str(&decoded);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        advance -= adjust / 1000.0 * ts.font_size * ts.horizontal_scaling;
                        if -adjust > TJ_SPACE_THRESHOLD {
                            push_word_gap(&mut text);
                        }
                    }
                }
            }
        }

        *tm = Matrix::translation(advance, 0.0).multiply(tm);

        if text.trim().is_empty() {
            return;
        }

        let trm = start.multiply(&state.ctm);
        let (ux, uy) = trm.apply(0.0, 0.0);
        let (x, baseline) = self.page_box.to_top_left(ux, uy);
        let font_size = ts.font_size * trm.scale_y();
        let width = advance * trm.scale_x();

        let (font_name, flag_bold, flag_italic) = font.map(|f| font_style(self.doc, f)).unwrap_or_default();
        let mut span = TextSpan::new(text, x, baseline, font_size)
            .with_width(width.max(0.0))
            .with_font(&font_name);
        span.bold |= flag_bold;
        span.italic |= flag_italic;
        self.output.spans.push(span);
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) {
        let Some(xobjects) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| resolve_dict(self.doc, o))
        else {
            return;
        };
        let Ok(Object::Reference(id)) = xobjects.get(name) else {
            return;
        };
        let id = *id;
        let Ok(stream) = self.doc.get_object(id).and_then(|o| o.as_stream()) else {
            return;
        };

        let subtype = stream
            .dict
            .get(b"Subtype")
            .and_then(|o| o.as_name())
            .unwrap_or_default();

        match subtype {
            b"Image" => {
                let corners = [
                    ctm.apply(0.0, 0.0),
                    ctm.apply(1.0, 0.0),
                    ctm.apply(0.0, 1.0),
                    ctm.apply(1.0, 1.0),
                ];
                let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
                let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
                let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
                let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
                let (x, top, width, height) = self.page_box.rect_to_top_left(min_x, min_y, max_x, max_y);
                self.output.images.push(ImagePlacement {
                    object_id: id,
                    x,
                    top,
                    width,
                    height,
                });
            }
            b"Form" => {
                if depth >= MAX_FORM_DEPTH || !self.active_forms.insert(id) {
                    log::debug!("Skipping nested form XObject {:?}", id);
                    return;
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|o| resolve(self.doc, o).as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(self.doc, o))
                    .or(resources);
                match stream.decompressed_content() {
                    Ok(data) => {
                        if let Err(e) =
                            self.run(&data, form_resources, matrix.multiply(&ctm), depth + 1)
                        {
                            log::warn!("Skipping unreadable form XObject {:?}: {}", id, e);
                        }
                    }
                    Err(e) => log::warn!("Cannot decompress form XObject {:?}: {}", id, e),
                }
                self.active_forms.remove(&id);
            }
            _ => {}
        }
    }
}

/// Insert a word gap unless the text already ends with one or with a
/// character from a script that does not separate words with spaces.
fn push_word_gap(text: &mut String) {
    match text.chars().last() {
        Some(c) if !c.is_whitespace() && !is_spaceless_script_char(c) => text.push(' '),
        _ => {}
    }
}

/// Base font name (subset tag removed) plus the bold/italic bits of the
/// font descriptor flags.
fn font_style(doc: &Document, font: &Dictionary) -> (String, bool, bool) {
    let name = font
        .get(b"BaseFont")
        .ok()
        .and_then(|o| resolve(doc, o).as_name().ok())
        .map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_default();
    let name = match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 => rest.to_string(),
        _ => name,
    };

    let flags = font
        .get(b"FontDescriptor")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
        .and_then(|d| d.get(b"Flags").ok())
        .and_then(|o| resolve(doc, o).as_i64().ok())
        .unwrap_or(0);
    let italic = flags & (1 << 6) != 0;
    let bold = flags & (1 << 18) != 0;
    (name, bold, italic)
}

/// Chinese and Japanese text does not put spaces between words; Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF         // CJK Unified Ideographs
        | 0x3400..=0x4DBF       // Extension A
        | 0x20000..=0x2EBEF     // Extensions B-F
        | 0x3040..=0x309F       // Hiragana
        | 0x30A0..=0x30FF       // Katakana
        | 0x3000..=0x303F       // CJK symbols and punctuation
    )
}
