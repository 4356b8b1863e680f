// First page glyph runs - lopdf content streams turned into positioned text runs
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::content_scan::{scan_content, ContentScan};
use crate::types::{TextRun, TitleError, TitleResult};

// Glyph width used when a font carries no /Widths, in 1/1000 em
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;
// Bound on /Parent hops while looking for inherited resources
const MAX_TREE_DEPTH: usize = 32;

/// Glyph runs of the first usable page, in content-stream order.
///
/// A document without pages, or whose first page shows no text, gives an
/// empty vector.
pub fn first_page_runs(bytes: &[u8]) -> TitleResult<Vec<TextRun>> {
    with_pdf_bytes(bytes, read_first_page)
}

/// Load a PDF from memory and run `f` on it behind a fault boundary.
///
/// Load failures become `ReaderInit`; `f` reports its own failures, and
/// panics raised while it walks the document become aborts, never
/// unwinding past this call.
pub fn with_pdf_bytes<F, R>(bytes: &[u8], f: F) -> TitleResult<R>
where
    F: FnOnce(&Document) -> TitleResult<R>,
{
    guarded(|| {
        let document =
            Document::load_mem(bytes).map_err(|e| TitleError::ReaderInit(e.to_string()))?;
        f(&document)
    })
}

/// Run `f`, converting any panic into a classified abort.
pub fn guarded<F, R>(f: F) -> TitleResult<R>
where
    F: FnOnce() -> TitleResult<R>,
{
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(TitleError::from_abort_message(&panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn read_first_page(document: &Document) -> TitleResult<Vec<TextRun>> {
    for (_, page_id) in document.get_pages() {
        // pages whose content can't be fetched are skipped like missing ones
        let Ok(data) = document.get_page_content(page_id) else {
            continue;
        };
        let fonts = page_fonts(document, page_id);
        let content = decode_content(&data)?;
        let mut reader = RunReader::new(&fonts);
        for op in &content.operations {
            reader.apply(op);
        }
        return Ok(reader.runs);
    }
    Ok(Vec::new())
}

// lopdf hands back whatever it parsed before a bad token, so the raw
// stream is checked first and the decoded operator count compared after
fn decode_content(data: &[u8]) -> TitleResult<Content> {
    let scan = scan_content(data).map_err(|err| {
        debug!(%err, "content stream rejected");
        TitleError::MalformedEncoding
    })?;
    let content =
        Content::decode(data).map_err(|e| TitleError::from_abort_message(&e.to_string()))?;
    check_complete(content.operations.len(), &scan)?;
    Ok(content)
}

fn check_complete(decoded: usize, scan: &ContentScan) -> TitleResult<()> {
    if decoded < scan.operators {
        return Err(TitleError::ReaderAbort(format!(
            "content stream decoding stopped after {decoded} of {} operators",
            scan.operators
        )));
    }
    Ok(())
}

// Follow one level of indirection
fn resolve<'a>(document: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn dict_entry<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(document, obj))
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

// Resources of a page, inherited from the page tree when absent
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = document.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Some(resources) = dict_entry(document, node, b"Resources") {
            return resources.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

/// Metrics needed to place glyph runs.
#[derive(Debug, Clone)]
struct FontMetrics {
    name: String,
    first_char: i64,
    widths: Vec<f64>,
    two_byte: bool,
}

impl FontMetrics {
    fn from_dict(document: &Document, resource_name: &[u8], font: &Dictionary) -> Self {
        let name = dict_entry(document, font, b"BaseFont")
            .and_then(|o| o.as_name().ok())
            .unwrap_or(resource_name);
        let two_byte = dict_entry(document, font, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Type0");
        let first_char = dict_entry(document, font, b"FirstChar")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let widths = dict_entry(document, font, b"Widths")
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| resolve(document, w).and_then(number).unwrap_or(DEFAULT_GLYPH_WIDTH))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            first_char,
            widths,
            two_byte,
        }
    }

    fn fallback(resource_name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(resource_name).into_owned(),
            first_char: 0,
            widths: Vec::new(),
            two_byte: false,
        }
    }

    // Width of a glyph code in 1/1000 em
    fn glyph_width(&self, code: u32) -> f64 {
        let index = i64::from(code) - self.first_char;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.widths.get(i))
            .copied()
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }
}

fn page_fonts(document: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontMetrics> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = page_resources(document, page_id)
        .and_then(|res| dict_entry(document, res, b"Font"))
        .and_then(|o| o.as_dict().ok())
    else {
        return fonts;
    };
    for (name, value) in font_dict.iter() {
        if let Some(font) = resolve(document, value).and_then(|o| o.as_dict().ok()) {
            fonts.insert(name.clone(), FontMetrics::from_dict(document, name, font));
        }
    }
    fonts
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    fn translate(tx: f64, ty: f64) -> Self {
        Matrix { e: tx, f: ty, ..Self::IDENTITY }
    }

    fn from_operands(v: &[f64]) -> Option<Self> {
        match v {
            [a, b, c, d, e, f] => Some(Matrix { a: *a, b: *b, c: *c, d: *d, e: *e, f: *f }),
            _ => None,
        }
    }

    // self applied first, then other
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn horizontal_scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    fn vertical_scale(&self) -> f64 {
        self.c.hypot(self.d)
    }
}

// Graphics state entries that q/Q save and restore
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scaling: f64,
    leading: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 1.0,
            leading: 0.0,
        }
    }
}

struct RunReader<'a> {
    fonts: &'a HashMap<Vec<u8>, FontMetrics>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    runs: Vec<TextRun>,
}

impl<'a> RunReader<'a> {
    fn new(fonts: &'a HashMap<Vec<u8>, FontMetrics>) -> Self {
        Self {
            fonts,
            state: GraphicsState::default(),
            saved: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            runs: Vec::new(),
        }
    }

    fn apply(&mut self, op: &Operation) {
        let nums: Vec<f64> = op.operands.iter().filter_map(number).collect();
        match op.operator.as_str() {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&nums) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                if let Some(size) = op.operands.get(1).and_then(number) {
                    self.state.font_size = size;
                }
            }
            "Td" => {
                if let [tx, ty] = nums[..] {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty] = nums[..] {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&nums) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "TL" => set_first(&nums, &mut self.state.leading),
            "Tc" => set_first(&nums, &mut self.state.char_spacing),
            "Tw" => set_first(&nums, &mut self.state.word_spacing),
            "Tz" => {
                if let Some(pct) = nums.first() {
                    self.state.h_scaling = pct / 100.0;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                let spacing = [op.operands.first(), op.operands.get(1)].map(|o| o.and_then(number));
                if let [Some(aw), Some(ac)] = spacing {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let st = &self.state;
                                    let tx = -adjust / 1000.0 * st.font_size * st.h_scaling;
                                    self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, raw: &[u8]) {
        let fallback;
        let metrics = match self.state.font.as_ref() {
            Some(key) => match self.fonts.get(key) {
                Some(m) => m,
                None => {
                    fallback = FontMetrics::fallback(key);
                    &fallback
                }
            },
            None => {
                fallback = FontMetrics::fallback(b"");
                &fallback
            }
        };

        let st = &self.state;
        let mut advance = 0.0;
        if metrics.two_byte {
            for pair in raw.chunks(2) {
                let code = pair.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                let tx = metrics.glyph_width(code) / 1000.0 * st.font_size + st.char_spacing;
                advance += tx * st.h_scaling;
            }
        } else {
            for &byte in raw {
                let width = metrics.glyph_width(u32::from(byte));
                let mut tx = width / 1000.0 * st.font_size + st.char_spacing;
                if byte == b' ' {
                    tx += st.word_spacing;
                }
                advance += tx * st.h_scaling;
            }
        }

        let user = self.tm.then(&st.ctm);
        self.runs.push(TextRun {
            text: decode_text(raw),
            font: metrics.name.clone(),
            font_size: st.font_size * user.vertical_scale(),
            x: user.e,
            y: user.f,
            width: advance * user.horizontal_scale(),
        });
        self.tm = Matrix::translate(advance, 0.0).then(&self.tm);
    }
}

fn set_first(nums: &[f64], slot: &mut f64) {
    if let Some(v) = nums.first() {
        *slot = *v;
    }
}

// UTF-16BE strings carry a byte order mark; everything else is passed on raw
fn decode_text(raw: &[u8]) -> Vec<u8> {
    match raw {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks(2)
                .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                .collect();
            String::from_utf16_lossy(&units).into_bytes()
        }
        _ => raw.to_vec(),
    }
}
