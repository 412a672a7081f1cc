//! Page layout from content streams: positioned text, ruling lines and embedded images

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Letter size, used when a page carries no usable MediaBox
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Coordinates closer than this are treated as the same line
const AXIS_TOLERANCE: f32 = 1.0;

/// Filled rectangles thinner than this are drawn rules, not shapes
const MAX_RULE_THICKNESS: f32 = 3.0;

/// A run of text with its position in page space (origin bottom-left)
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    /// Baseline start
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl TextFragment {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Ruling direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned stroked line, normalized so that `x1 <= x2` and `y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub orientation: Orientation,
}

impl Ruling {
    /// Build a ruling from a segment; diagonal or degenerate segments yield `None`
    pub fn from_segment(a: (f32, f32), b: (f32, f32)) -> Option<Self> {
        let (x1, x2) = (a.0.min(b.0), a.0.max(b.0));
        let (y1, y2) = (a.1.min(b.1), a.1.max(b.1));

        let orientation = if y2 - y1 <= AXIS_TOLERANCE && x2 - x1 > AXIS_TOLERANCE {
            Orientation::Horizontal
        } else if x2 - x1 <= AXIS_TOLERANCE && y2 - y1 > AXIS_TOLERANCE {
            Orientation::Vertical
        } else {
            return None;
        };

        Some(Self {
            x1,
            y1,
            x2,
            y2,
            orientation,
        })
    }

    /// Constant coordinate: y for horizontal rulings, x for vertical ones
    pub fn position(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => (self.y1 + self.y2) / 2.0,
            Orientation::Vertical => (self.x1 + self.x2) / 2.0,
        }
    }
}

/// A JPEG image placed on the page
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// Encoded JPEG bytes
    pub data: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Bottom-left corner
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageImage {
    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Everything the extractors need to know about one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// 1-based page number
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub fragments: Vec<TextFragment>,
    pub rulings: Vec<Ruling>,
    pub images: Vec<PageImage>,
}

/// Fragments sharing a baseline
#[derive(Debug, Clone)]
pub struct TextLine {
    pub y: f32,
    /// Largest font size on the line
    pub font_size: f32,
    /// Sorted by x
    pub fragments: Vec<TextFragment>,
}

/// Group fragments into lines, top to bottom. Fragments join a line when their baselines
/// differ by less than `tolerance_factor` times the font size.
pub fn group_into_lines<'a, I>(fragments: I, tolerance_factor: f32) -> Vec<TextLine>
where
    I: IntoIterator<Item = &'a TextFragment>,
{
    let mut sorted: Vec<&TextFragment> = fragments.into_iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for fragment in sorted {
        let tolerance = fragment.font_size.max(1.0) * tolerance_factor;
        match lines.last_mut() {
            Some(line) if (line.y - fragment.y).abs() <= tolerance => {
                line.font_size = line.font_size.max(fragment.font_size);
                line.fragments.push(fragment.clone());
            }
            _ => lines.push(TextLine {
                y: fragment.y,
                font_size: fragment.font_size,
                fragments: vec![fragment.clone()],
            }),
        }
    }

    for line in &mut lines {
        line.fragments.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

/// Interpret one page's content stream
pub fn interpret_page(
    doc: &Document,
    number: u32,
    page_id: ObjectId,
) -> Result<PageLayout, lopdf::Error> {
    let (width, height) = media_box(doc, page_id).unwrap_or(DEFAULT_PAGE_SIZE);
    let resources = inherited(doc, page_id, b"Resources").and_then(|o| o.as_dict().ok());

    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut interpreter = Interpreter::new(load_fonts(doc, resources), load_images(doc, resources));
    for op in &content.operations {
        interpreter.apply(&op.operator, &op.operands);
    }

    Ok(PageLayout {
        number,
        width,
        height,
        fragments: interpreter.fragments,
        rulings: interpreter.rulings,
        images: interpreter.images,
    })
}

fn multiply(l: &Matrix, r: &Matrix) -> Matrix {
    [
        l[0] * r[0] + l[1] * r[2],
        l[0] * r[1] + l[1] * r[3],
        l[2] * r[0] + l[3] * r[2],
        l[2] * r[1] + l[3] * r[3],
        l[4] * r[0] + l[5] * r[2] + r[4],
        l[4] * r[1] + l[5] * r[3] + r[5],
    ]
}

fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn transform(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = number(obj)?;
    }
    Some(out)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up a page attribute, following `Parent` links for inherited values
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    // Bounded walk; malformed trees can contain cycles
    for _ in 0..32 {
        if let Ok(obj) = dict.get(key) {
            return resolve(doc, obj);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let values = inherited(doc, page_id, b"MediaBox")?.as_array().ok()?;
    let [llx, lly, urx, ury] = numbers::<4>(values)?;
    let (w, h) = ((urx - llx).abs(), (ury - lly).abs());
    (w > 0.0 && h > 0.0).then_some((w, h))
}

fn sub_dict<'a>(doc: &'a Document, resources: Option<&'a Dictionary>, key: &[u8]) -> Option<&'a Dictionary> {
    resources
        .and_then(|r| r.get(key).ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
}

#[derive(Debug, Clone)]
struct FontInfo {
    /// Multi-byte (Type0) fonts need a CMap to decode; their text is skipped
    composite: bool,
    bold: bool,
    italic: bool,
    first_char: i64,
    /// Glyph widths in thousandths of an em
    widths: Vec<f32>,
    default_width: f32,
}

impl FontInfo {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let name_of = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_lowercase())
                .unwrap_or_default()
        };
        let subtype = name_of(b"Subtype");
        let base_font = name_of(b"BaseFont");

        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|values| values.iter().map(|v| number(v).unwrap_or(0.0)).collect())
            .unwrap_or_default();

        Self {
            composite: subtype == "type0",
            bold: ["bold", "black", "heavy", "semibold"]
                .iter()
                .any(|w| base_font.contains(w)),
            italic: base_font.contains("italic") || base_font.contains("oblique"),
            first_char: dict
                .get(b"FirstChar")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0),
            widths,
            default_width: if base_font.contains("courier") { 600.0 } else { 500.0 },
        }
    }

    fn glyph_width(&self, code: u8) -> f32 {
        usize::try_from(i64::from(code) - self.first_char)
            .ok()
            .and_then(|i| self.widths.get(i))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            composite: false,
            bold: false,
            italic: false,
            first_char: 0,
            widths: Vec::new(),
            default_width: 500.0,
        }
    }
}

fn load_fonts(doc: &Document, resources: Option<&Dictionary>) -> HashMap<Vec<u8>, FontInfo> {
    let Some(fonts) = sub_dict(doc, resources, b"Font") else {
        return HashMap::new();
    };

    fonts
        .iter()
        .filter_map(|(name, obj)| {
            let dict = resolve(doc, obj)?.as_dict().ok()?;
            Some((name.clone(), FontInfo::from_dict(doc, dict)))
        })
        .collect()
}

#[derive(Debug, Clone)]
struct ImageXObject {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

fn is_jpeg(dict: &Dictionary) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => {
            filters.len() == 1 && matches!(&filters[0], Object::Name(n) if n == b"DCTDecode")
        }
        _ => false,
    }
}

/// Collect JPEG image XObjects; other encodings would need decoding and are skipped
fn load_images(doc: &Document, resources: Option<&Dictionary>) -> HashMap<Vec<u8>, ImageXObject> {
    let Some(xobjects) = sub_dict(doc, resources, b"XObject") else {
        return HashMap::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let Object::Stream(stream) = resolve(doc, obj)? else {
                return None;
            };
            let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
            if subtype != b"Image" || !is_jpeg(&stream.dict) {
                return None;
            }
            let dim = |key: &[u8]| {
                stream
                    .dict
                    .get(key)
                    .ok()
                    .and_then(|o| o.as_i64().ok())
                    .and_then(|v| u32::try_from(v).ok())
            };
            Some((
                name.clone(),
                ImageXObject {
                    data: stream.content.clone(),
                    width: dim(b"Width")?,
                    height: dim(b"Height")?,
                },
            ))
        })
        .collect()
}

/// Decode a string operand from a simple font: UTF-16BE with BOM, else WinAnsi
fn decode_simple(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| win_ansi(b)).collect()
}

fn win_ansi(b: u8) -> char {
    match b {
        0x80 => '\u{20AC}',
        0x85 => '\u{2026}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x99 => '\u{2122}',
        _ => b as char,
    }
}

#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font: Option<Vec<u8>>,
    size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            line_matrix: IDENTITY,
            font: None,
            size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
        }
    }
}

struct Interpreter {
    fonts: HashMap<Vec<u8>, FontInfo>,
    image_objects: HashMap<Vec<u8>, ImageXObject>,
    ctm: Matrix,
    stack: Vec<Matrix>,
    text: TextState,
    current_point: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    segments: Vec<((f32, f32), (f32, f32))>,
    rects: Vec<[(f32, f32); 4]>,
    fragments: Vec<TextFragment>,
    rulings: Vec<Ruling>,
    images: Vec<PageImage>,
}

impl Interpreter {
    fn new(fonts: HashMap<Vec<u8>, FontInfo>, image_objects: HashMap<Vec<u8>, ImageXObject>) -> Self {
        Self {
            fonts,
            image_objects,
            ctm: IDENTITY,
            stack: Vec::new(),
            text: TextState::default(),
            current_point: None,
            subpath_start: None,
            segments: Vec::new(),
            rects: Vec::new(),
            fragments: Vec::new(),
            rulings: Vec::new(),
            images: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            // Graphics state
            "q" => self.stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }

            // Text state
            "BT" => {
                self.text.matrix = IDENTITY;
                self.text.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.text.font = Some(name.clone());
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.text.size = size;
                }
            }
            "TL" => {
                if let Some([leading]) = numbers::<1>(operands) {
                    self.text.leading = leading;
                }
            }
            "Tc" => {
                if let Some([spacing]) = numbers::<1>(operands) {
                    self.text.char_spacing = spacing;
                }
            }
            "Tw" => {
                if let Some([spacing]) = numbers::<1>(operands) {
                    self.text.word_spacing = spacing;
                }
            }
            "Tz" => {
                if let Some([scale]) = numbers::<1>(operands) {
                    self.text.horizontal_scale = scale / 100.0;
                }
            }

            // Text positioning
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.text.matrix = m;
                    self.text.line_matrix = m;
                }
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                if let Some(op) = operands.first() {
                    self.show(std::slice::from_ref(op));
                }
            }
            "'" => {
                self.next_line();
                if let Some(op) = operands.first() {
                    self.show(std::slice::from_ref(op));
                }
            }
            "\"" => {
                if let Some([word, chars]) = numbers::<2>(operands) {
                    self.text.word_spacing = word;
                    self.text.char_spacing = chars;
                }
                self.next_line();
                if let Some(op) = operands.get(2) {
                    self.show(std::slice::from_ref(op));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show(items);
                }
            }

            // Path construction
            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    let p = transform(&self.ctm, x, y);
                    self.current_point = Some(p);
                    self.subpath_start = Some(p);
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    let p = transform(&self.ctm, x, y);
                    if let Some(from) = self.current_point {
                        self.segments.push((from, p));
                    }
                    self.current_point = Some(p);
                }
            }
            "c" => {
                if let Some([.., x, y]) = numbers::<6>(operands) {
                    self.current_point = Some(transform(&self.ctm, x, y));
                }
            }
            "v" | "y" => {
                if let Some([.., x, y]) = numbers::<4>(operands) {
                    self.current_point = Some(transform(&self.ctm, x, y));
                }
            }
            "h" => self.close_subpath(),
            "re" => {
                if let Some([x, y, w, h]) = numbers::<4>(operands) {
                    let corners = [
                        transform(&self.ctm, x, y),
                        transform(&self.ctm, x + w, y),
                        transform(&self.ctm, x + w, y + h),
                        transform(&self.ctm, x, y + h),
                    ];
                    self.rects.push(corners);
                    self.current_point = Some(corners[0]);
                    self.subpath_start = Some(corners[0]);
                }
            }

            // Path painting
            "S" => self.paint(true, false),
            "s" => {
                self.close_subpath();
                self.paint(true, false);
            }
            "f" | "F" | "f*" => self.paint(false, true),
            "B" | "B*" => self.paint(true, true),
            "b" | "b*" => {
                self.close_subpath();
                self.paint(true, true);
            }
            "n" => self.paint(false, false),

            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.place_image(name);
                }
            }

            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.text.line_matrix = multiply(&translate(tx, ty), &self.text.line_matrix);
        self.text.matrix = self.text.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Advance the text matrix horizontally by `tx` text-space units
    fn advance(&mut self, tx: f32) {
        self.text.matrix = multiply(&translate(tx, 0.0), &self.text.matrix);
    }

    fn origin(&self) -> (f32, f32, f32) {
        let rendering = multiply(&self.text.matrix, &self.ctm);
        let scale = (rendering[2] * rendering[2] + rendering[3] * rendering[3]).sqrt();
        (rendering[4], rendering[5], self.text.size * scale)
    }

    /// Show strings and kerning adjustments as one fragment
    fn show(&mut self, items: &[Object]) {
        let font = self
            .text
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .cloned()
            .unwrap_or_default();

        let (start_x, start_y, font_size) = self.origin();
        let mut text = String::new();

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    if font.composite {
                        // Two-byte codes of unknown width
                        self.advance(bytes.len() as f32 / 2.0 * self.text.size * self.text.horizontal_scale);
                        continue;
                    }
                    for &code in bytes {
                        let mut tx = font.glyph_width(code) / 1000.0 * self.text.size + self.text.char_spacing;
                        if code == b' ' {
                            tx += self.text.word_spacing;
                        }
                        self.advance(tx * self.text.horizontal_scale);
                    }
                    text.push_str(&decode_simple(bytes));
                }
                other => {
                    if let Some(adjust) = number(other) {
                        self.advance(-adjust / 1000.0 * self.text.size * self.text.horizontal_scale);
                        if adjust < -200.0 && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                    }
                }
            }
        }

        let text: String = text.chars().filter(|c| !c.is_control()).collect();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        let (end_x, _, _) = self.origin();
        let font_size = if font_size > 0.0 { font_size } else { self.text.size.max(1.0) };
        self.fragments.push(TextFragment {
            text: trimmed.to_string(),
            x: start_x,
            y: start_y,
            width: (end_x - start_x).max(0.0),
            font_size,
            bold: font.bold,
            italic: font.italic,
        });
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(start)) = (self.current_point, self.subpath_start) {
            if from != start {
                self.segments.push((from, start));
            }
            self.current_point = Some(start);
        }
    }

    fn paint(&mut self, stroke: bool, fill: bool) {
        let segments = std::mem::take(&mut self.segments);
        let rects = std::mem::take(&mut self.rects);
        self.current_point = None;
        self.subpath_start = None;

        if stroke {
            for (a, b) in segments {
                self.push_ruling(a, b);
            }
            for corners in &rects {
                for i in 0..4 {
                    self.push_ruling(corners[i], corners[(i + 1) % 4]);
                }
            }
        } else if fill {
            // Thin filled rectangles are how many generators draw table rules
            for corners in &rects {
                let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
                let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
                let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
                let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
                let mid_x = (min_x + max_x) / 2.0;
                let mid_y = (min_y + max_y) / 2.0;

                if max_y - min_y <= MAX_RULE_THICKNESS && max_x - min_x > MAX_RULE_THICKNESS {
                    self.push_ruling((min_x, mid_y), (max_x, mid_y));
                } else if max_x - min_x <= MAX_RULE_THICKNESS && max_y - min_y > MAX_RULE_THICKNESS {
                    self.push_ruling((mid_x, min_y), (mid_x, max_y));
                }
            }
        }
    }

    fn push_ruling(&mut self, a: (f32, f32), b: (f32, f32)) {
        if let Some(ruling) = Ruling::from_segment(a, b) {
            self.rulings.push(ruling);
        }
    }

    fn place_image(&mut self, name: &[u8]) {
        let Some(image) = self.image_objects.get(name) else {
            return;
        };
        let (x0, y0) = transform(&self.ctm, 0.0, 0.0);
        let (x1, y1) = transform(&self.ctm, 1.0, 1.0);
        let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        self.images.push(PageImage {
            data: image.data.clone(),
            pixel_width: image.width,
            pixel_height: image.height,
            x: x0.min(x1),
            y: y0.min(y1),
            width,
            height,
        });
    }
}
