//! Preparation, part one: splitting a component source into its script,
//! style and markup sections and parsing the markup.
//!
//! Offsets are sacred here. Script and style regions are blanked byte for
//! byte rather than removed, and every markup expression is recorded with its
//! exact span in the original file, so later stages can slice the original
//! text and report diagnostics against it.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::diagnostics::{
    Diagnostic, DiagnosticSink, SourceSpan, ERR_BLOCK_STRUCTURE, ERR_EMPTY_EXPRESSION,
    ERR_SCRIPT_BLOCK, ERR_UNSUPPORTED_BLOCK, ERR_UNSUPPORTED_DIRECTIVE,
    ERR_UNTERMINATED_EXPRESSION,
};
use crate::validate::{
    AttributeIR, AttributePart, AttributeValue, ComponentNode, ElementNode, ExprId,
    ExpressionNode, IfBlockNode, IfBranch, MarkupNode, SlotNode, TextNode,
};

const ORIG_NAME_ATTR: &str = "data-zen-orig-name";
const OFFSET_ATTR: &str = "data-zen-at";
const ATTR_NAMES_ATTR: &str = "data-zen-attrs";
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

lazy_static! {
    /// html5ever lowercases every attribute; SVG needs these back in camelCase.
    static ref SVG_ATTR_CASE_MAP: HashMap<String, &'static str> = [
        "viewBox", "preserveAspectRatio", "baseFrequency", "clipPathUnits",
        "diffuseConstant", "edgeMode", "filterUnits", "gradientTransform",
        "gradientUnits", "kernelMatrix", "kernelUnitLength", "keyPoints",
        "keySplines", "keyTimes", "lengthAdjust", "limitingConeAngle",
        "markerHeight", "markerUnits", "markerWidth", "maskContentUnits",
        "maskUnits", "numOctaves", "pathLength", "patternContentUnits",
        "patternTransform", "patternUnits", "pointsAtX", "pointsAtY", "pointsAtZ",
        "primitiveUnits", "refX", "refY", "repeatCount", "repeatDur",
        "specularConstant", "specularExponent", "spreadMethod", "startOffset",
        "stdDeviation", "stitchTiles", "surfaceScale", "tableValues", "targetX",
        "targetY", "textLength", "xChannelSelector", "yChannelSelector",
        "attributeName", "attributeType", "calcMode",
    ]
    .into_iter()
    .map(|name| (name.to_ascii_lowercase(), name))
    .collect();

    static ref SVG_TAGS: HashSet<&'static str> = [
        "svg", "path", "circle", "ellipse", "line", "polyline", "polygon", "rect",
        "g", "defs", "use", "symbol", "clippath", "mask", "pattern", "marker",
        "lineargradient", "radialgradient", "stop", "filter", "foreignobject",
        "image", "tspan", "textpath", "animate", "animatemotion",
        "animatetransform", "mpath",
    ]
    .into_iter()
    .collect();

    static ref VOID_TAGS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
        "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    /// Expression placeholder pattern for normalization
    static ref EXPR_PLACEHOLDER_RE: Regex = Regex::new(r"__ZENITH_EXPR_(\d+)__").unwrap();

    static ref SCRIPT_REGEX: Regex =
        Regex::new(r"(?is)<script\b([^>]*)>([\s\S]*?)</script\s*>").unwrap();

    static ref SCRIPT_OPEN_REGEX: Regex = Regex::new(r"(?i)<script\b").unwrap();

    static ref STYLE_REGEX: Regex =
        Regex::new(r"(?is)<style\b[^>]*>([\s\S]*?)</style\s*>").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PreparedSource {
    /// Content range of the instance script, if any.
    pub script: Option<SourceSpan>,
    pub styles: Vec<String>,
    pub markup: Vec<MarkupNode>,
    /// Original span of every markup expression, indexed by `ExprId`.
    pub expressions: Vec<SourceSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Expr(ExprId),
    IfOpen(ExprId),
    ElseIf(ExprId),
    Else,
    EndIf,
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    span: SourceSpan,
    kind: MarkerKind,
}

/// Split, normalize and parse one component source. Problems are reported to
/// `sink`; the result is always usable, possibly with parts missing.
pub fn prepare(source: &str, sink: &mut dyn DiagnosticSink) -> PreparedSource {
    let (blanked, script, styles) = split_blocks(source, sink);
    let normalized = normalize_markup(&blanked, sink);
    tracing::debug!(
        expressions = normalized.expressions.len(),
        markers = normalized.markers.len(),
        "markup normalized"
    );
    let markup = parse_markup(&normalized, sink);
    PreparedSource {
        script,
        styles,
        markup,
        expressions: normalized.expressions,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK SPLITTING
// ═══════════════════════════════════════════════════════════════════════════════

fn blank(buf: &mut [u8], start: usize, end: usize) {
    for b in &mut buf[start..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// Blank inline scripts and styles out of the markup. External scripts
/// (`<script src>`) stay in the markup as ordinary elements.
fn split_blocks(
    source: &str,
    sink: &mut dyn DiagnosticSink,
) -> (String, Option<SourceSpan>, Vec<String>) {
    let mut buf = source.as_bytes().to_vec();
    let mut script = None;
    let mut covered: Vec<(usize, usize)> = Vec::new();

    for caps in SCRIPT_REGEX.captures_iter(source) {
        let (Some(whole), Some(content)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        covered.push((whole.start(), whole.end()));
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if attrs.contains("src=") {
            continue;
        }
        if script.is_some() {
            sink.report(
                Diagnostic::malformed(
                    ERR_SCRIPT_BLOCK,
                    "A component may contain only one instance <script>.",
                    SourceSpan::new(whole.start() as u32, whole.end() as u32),
                )
                .with_hint("Merge the script blocks into one."),
            );
        } else {
            script = Some(SourceSpan::new(content.start() as u32, content.end() as u32));
        }
        blank(&mut buf, whole.start(), whole.end());
    }

    for open in SCRIPT_OPEN_REGEX.find_iter(source) {
        let inside = covered
            .iter()
            .any(|(s, e)| open.start() >= *s && open.start() < *e);
        if !inside {
            sink.report(Diagnostic::malformed(
                ERR_SCRIPT_BLOCK,
                "Unclosed <script> block.",
                SourceSpan::new(open.start() as u32, open.end() as u32),
            ));
            blank(&mut buf, open.start(), source.len());
            break;
        }
    }

    let mut styles = Vec::new();
    for caps in STYLE_REGEX.captures_iter(source) {
        let (Some(whole), Some(content)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if covered.iter().any(|(s, e)| whole.start() >= *s && whole.start() < *e) {
            continue;
        }
        styles.push(content.as_str().trim().to_string());
        blank(&mut buf, whole.start(), whole.end());
    }

    let blanked = String::from_utf8_lossy(&buf).into_owned();
    (blanked, script, styles)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Find the end of a balanced brace expression, skipping strings and
/// template literals. Returns the byte index after the closing brace.
pub(crate) fn find_balanced_brace_end(bytes: &[u8], start_index: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start_index;
    let mut in_string: Option<u8> = None;
    let mut in_template_literal = false;
    let mut template_brace_depth = 0usize;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if in_template_literal {
            if c == b'`' && template_brace_depth == 0 {
                in_template_literal = false;
            } else if c == b'$' && bytes.get(i + 1) == Some(&b'{') {
                template_brace_depth += 1;
                i += 2;
                continue;
            } else if c == b'}' && template_brace_depth > 0 {
                template_brace_depth -= 1;
            }
            i += 1;
            continue;
        }

        match c {
            b'"' | b'\'' => in_string = Some(c),
            b'`' => in_template_literal = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Narrow `[start, end)` to its non-whitespace core.
fn trim_range(bytes: &[u8], mut start: usize, mut end: usize) -> (usize, usize) {
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    (start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceContext {
    Text,
    Attribute,
}

struct Normalized {
    text: String,
    markers: Vec<Marker>,
    expressions: Vec<SourceSpan>,
}

/// Single pass over the blanked source that
/// - replaces `{…}` with `__ZENITH_EXPR_n__` placeholders (n indexes markers),
/// - tags every opening tag with its original offset,
/// - keeps component tag and attribute casing, which html5ever would lose,
/// - closes self-closing non-void tags so html5ever does not nest siblings.
struct Normalizer<'s, 'd> {
    src: &'s str,
    bytes: &'s [u8],
    out: Vec<u8>,
    markers: Vec<Marker>,
    expressions: Vec<SourceSpan>,
    sink: &'d mut dyn DiagnosticSink,
}

fn normalize_markup(src: &str, sink: &mut dyn DiagnosticSink) -> Normalized {
    let mut normalizer = Normalizer {
        src,
        bytes: src.as_bytes(),
        out: Vec::with_capacity(src.len()),
        markers: Vec::new(),
        expressions: Vec::new(),
        sink,
    };
    normalizer.run();
    Normalized {
        text: String::from_utf8_lossy(&normalizer.out).into_owned(),
        markers: normalizer.markers,
        expressions: normalizer.expressions,
    }
}

impl Normalizer<'_, '_> {
    fn run(&mut self) {
        let len = self.bytes.len();
        let mut i = 0;
        while i < len {
            let b = self.bytes[i];
            if b == b'<' {
                if self.src[i..].starts_with("<!--") {
                    let end = self.src[i + 4..]
                        .find("-->")
                        .map(|p| i + 4 + p + 3)
                        .unwrap_or(len);
                    self.out.extend_from_slice(&self.bytes[i..end]);
                    i = end;
                    continue;
                }
                if self.bytes.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic()) {
                    i = self.open_tag(i);
                    continue;
                }
            }
            if b == b'{' {
                i = self.brace(i, BraceContext::Text);
                continue;
            }
            self.out.push(b);
            i += 1;
        }
    }

    fn push_str(&mut self, s: &str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    fn open_tag(&mut self, start: usize) -> usize {
        let len = self.bytes.len();
        let mut k = start + 1;
        while k < len
            && (self.bytes[k].is_ascii_alphanumeric() || matches!(self.bytes[k], b'-' | b'.' | b':'))
        {
            k += 1;
        }
        let name = &self.src[start + 1..k];
        let is_component = name.starts_with(|c: char| c.is_ascii_uppercase());
        let is_void = VOID_TAGS.contains(name.to_ascii_lowercase().as_str());

        self.push_str("<");
        self.push_str(name);
        if is_component {
            self.push_str(&format!(" {}=\"{}\"", ORIG_NAME_ATTR, name));
        }
        self.push_str(&format!(" {}=\"{}\"", OFFSET_ATTR, start));

        let mut attr_names: Vec<String> = Vec::new();
        let mut after_equals = false;
        while k < len {
            match self.bytes[k] {
                b'>' => {
                    self.close_attr_names(is_component, &attr_names);
                    self.out.push(b'>');
                    return k + 1;
                }
                b'/' if self.bytes.get(k + 1) == Some(&b'>') => {
                    self.close_attr_names(is_component, &attr_names);
                    if is_void {
                        self.push_str("/>");
                    } else {
                        self.push_str(&format!("></{}>", name));
                    }
                    return k + 2;
                }
                b'=' => {
                    self.out.push(b'=');
                    after_equals = true;
                    k += 1;
                }
                quote @ (b'"' | b'\'') => {
                    self.out.push(quote);
                    k += 1;
                    while k < len && self.bytes[k] != quote {
                        if self.bytes[k] == b'{' {
                            k = self.brace(k, BraceContext::Attribute);
                        } else {
                            self.out.push(self.bytes[k]);
                            k += 1;
                        }
                    }
                    if k < len {
                        self.out.push(quote);
                        k += 1;
                    }
                    after_equals = false;
                }
                b'{' if after_equals => {
                    k = self.brace(k, BraceContext::Attribute);
                    after_equals = false;
                }
                b'{' => {
                    k = self.shorthand_attribute(k, is_component, &mut attr_names);
                }
                c if c.is_ascii_whitespace() => {
                    self.out.push(c);
                    k += 1;
                }
                _ => {
                    let token_start = k;
                    while k < len
                        && !self.bytes[k].is_ascii_whitespace()
                        && !matches!(self.bytes[k], b'=' | b'>' | b'"' | b'\'' | b'{')
                        && !(self.bytes[k] == b'/' && self.bytes.get(k + 1) == Some(&b'>'))
                    {
                        k += 1;
                    }
                    // A lone '/' that is not "/>" would otherwise stall the loop.
                    if k == token_start {
                        k += 1;
                    }
                    let token = &self.src[token_start..k];
                    if !after_equals && is_component {
                        attr_names.push(token.to_string());
                    }
                    self.push_str(token);
                    after_equals = false;
                }
            }
        }
        k
    }

    fn close_attr_names(&mut self, is_component: bool, names: &[String]) {
        if is_component && !names.is_empty() {
            self.push_str(&format!(" {}=\"{}\"", ATTR_NAMES_ATTR, names.join(",")));
        }
    }

    /// `{name}` in attribute position is shorthand for `name={name}`.
    fn shorthand_attribute(
        &mut self,
        start: usize,
        is_component: bool,
        attr_names: &mut Vec<String>,
    ) -> usize {
        let Some(end) = find_balanced_brace_end(self.bytes, start) else {
            self.sink.report(Diagnostic::malformed(
                ERR_UNTERMINATED_EXPRESSION,
                "Unterminated `{` in tag.",
                SourceSpan::at(start as u32),
            ));
            return self.bytes.len();
        };
        let (s, e) = trim_range(self.bytes, start + 1, end - 1);
        let content = &self.src[s..e];
        let span = SourceSpan::new(start as u32, end as u32);
        if content.starts_with("...") {
            self.sink.report(Diagnostic::unsupported(
                ERR_UNSUPPORTED_DIRECTIVE,
                "Spread attributes are not supported.",
                span,
            ));
        } else if is_identifier(content) {
            if is_component {
                attr_names.push(content.to_string());
            }
            self.push_str(content);
            self.push_str("=");
            let id = self.register_expression(s, e);
            self.push_marker(span, MarkerKind::Expr(id));
        } else {
            self.sink.report(Diagnostic::malformed(
                ERR_EMPTY_EXPRESSION,
                "Expected `{name}` shorthand or `name={expression}`.",
                span,
            ));
        }
        end
    }

    fn register_expression(&mut self, start: usize, end: usize) -> ExprId {
        self.expressions
            .push(SourceSpan::new(start as u32, end as u32));
        self.expressions.len() - 1
    }

    fn push_marker(&mut self, span: SourceSpan, kind: MarkerKind) {
        let index = self.markers.len();
        self.markers.push(Marker { span, kind });
        self.push_str(&format!("__ZENITH_EXPR_{}__", index));
    }

    fn brace(&mut self, start: usize, context: BraceContext) -> usize {
        let Some(end) = find_balanced_brace_end(self.bytes, start) else {
            self.sink.report(Diagnostic::malformed(
                ERR_UNTERMINATED_EXPRESSION,
                "Unterminated `{` in markup.",
                SourceSpan::at(start as u32),
            ));
            self.out.push(b'{');
            return start + 1;
        };
        let span = SourceSpan::new(start as u32, end as u32);
        let (s, e) = trim_range(self.bytes, start + 1, end - 1);
        if s == e {
            self.sink.report(Diagnostic::malformed(
                ERR_EMPTY_EXPRESSION,
                "Empty `{}` in markup.",
                span,
            ));
            return end;
        }

        let Some(kind) = self.classify(s, e, span) else {
            return end;
        };
        if context == BraceContext::Attribute && !matches!(kind, MarkerKind::Expr(_)) {
            self.sink.report(Diagnostic::malformed(
                ERR_BLOCK_STRUCTURE,
                "Control blocks cannot appear inside a tag.",
                span,
            ));
            return end;
        }
        self.push_marker(span, kind);
        end
    }

    fn classify(&mut self, s: usize, e: usize, span: SourceSpan) -> Option<MarkerKind> {
        let text = &self.src[s..e];
        let first = text.as_bytes()[0];
        if !matches!(first, b'#' | b':' | b'/' | b'@') {
            return Some(MarkerKind::Expr(self.register_expression(s, e)));
        }

        if let Some(cond) = keyword_rest(text, "#if") {
            let id = self.condition(s + cond, e, span)?;
            return Some(MarkerKind::IfOpen(id));
        }
        if let Some(cond) = keyword_rest(text, ":else if") {
            let id = self.condition(s + cond, e, span)?;
            return Some(MarkerKind::ElseIf(id));
        }
        if text == ":else" {
            return Some(MarkerKind::Else);
        }
        if text == "/if" {
            return Some(MarkerKind::EndIf);
        }

        let block: String = text
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        self.sink.report(
            Diagnostic::unsupported(
                ERR_UNSUPPORTED_BLOCK,
                format!("Unsupported block `{{{}}}`.", block),
                span,
            )
            .with_hint("Only {#if}, {:else if}, {:else} and {/if} are available."),
        );
        None
    }

    fn condition(&mut self, s: usize, e: usize, span: SourceSpan) -> Option<ExprId> {
        let (s, e) = trim_range(self.bytes, s, e);
        if s == e {
            self.sink.report(Diagnostic::malformed(
                ERR_BLOCK_STRUCTURE,
                "Conditional block is missing its condition.",
                span,
            ));
            return None;
        }
        Some(self.register_expression(s, e))
    }
}

/// `keyword_rest("#if x", "#if")` → offset of the condition. The keyword must
/// be followed by whitespace or `(`.
fn keyword_rest(text: &str, keyword: &str) -> Option<usize> {
    let rest = text.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '(' => Some(keyword.len()),
        _ => None,
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Check if a tag name represents a component (starts with uppercase)
pub fn is_component_tag(tag_name: &str) -> bool {
    tag_name
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
}

pub fn is_svg_tag(tag_name: &str) -> bool {
    SVG_TAGS.contains(tag_name.to_ascii_lowercase().as_str())
}

/// Restore camelCase for SVG attributes on SVG elements.
fn correct_svg_attribute_name(attr_name: &str, svg: bool) -> String {
    if svg {
        if let Some(&corrected) = SVG_ATTR_CASE_MAP.get(attr_name.to_ascii_lowercase().as_str()) {
            return corrected.to_string();
        }
    }
    attr_name.to_string()
}

enum Item {
    Node(MarkupNode),
    Marker(Marker),
}

struct MarkupBuilder<'n, 'd> {
    markers: &'n [Marker],
    sink: &'d mut dyn DiagnosticSink,
}

fn parse_markup(normalized: &Normalized, sink: &mut dyn DiagnosticSink) -> Vec<MarkupNode> {
    let dom = match parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut normalized.text.as_bytes())
    {
        Ok(dom) => dom,
        Err(e) => {
            sink.report(Diagnostic::malformed(
                ERR_BLOCK_STRUCTURE,
                format!("Failed to parse markup: {}", e),
                SourceSpan::at(0),
            ));
            return vec![];
        }
    };

    let mut builder = MarkupBuilder {
        markers: &normalized.markers,
        sink,
    };
    let mut items = Vec::new();
    builder.collect_document(&dom.document, &mut items);
    builder.fold_blocks(items)
}

impl MarkupBuilder<'_, '_> {
    /// html5ever always synthesizes html/head/body; component markup is a
    /// fragment, so those wrappers are flattened away.
    fn collect_document(&mut self, handle: &Handle, items: &mut Vec<Item>) {
        match &handle.data {
            NodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.collect_document(child, items);
                }
            }
            NodeData::Element { name, .. }
                if matches!(&*name.local, "html" | "head" | "body") =>
            {
                for child in handle.children.borrow().iter() {
                    self.collect_document(child, items);
                }
            }
            _ => self.collect_node(handle, items),
        }
    }

    fn children_of(&mut self, handle: &Handle) -> Vec<MarkupNode> {
        let mut items = Vec::new();
        for child in handle.children.borrow().iter() {
            self.collect_node(child, &mut items);
        }
        self.fold_blocks(items)
    }

    fn collect_node(&mut self, handle: &Handle, items: &mut Vec<Item>) {
        match &handle.data {
            NodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                self.split_text(&text, items);
            }
            NodeData::Element { name, attrs, .. } => {
                let attributes = attrs.borrow();
                let mut tag = name.local.to_string();
                let svg = &*name.ns == SVG_NAMESPACE || is_svg_tag(&tag);
                let mut location = SourceSpan::at(0);
                let mut original_names: Vec<&str> = Vec::new();
                let mut names_raw = String::new();
                for attr in attributes.iter() {
                    match &*attr.name.local {
                        ORIG_NAME_ATTR => tag = attr.value.to_string(),
                        OFFSET_ATTR => {
                            location = SourceSpan::at(attr.value.parse().unwrap_or(0));
                        }
                        ATTR_NAMES_ATTR => names_raw = attr.value.to_string(),
                        _ => {}
                    }
                }
                if !names_raw.is_empty() {
                    original_names = names_raw.split(',').collect();
                }

                let mut parsed_attrs = Vec::new();
                for attr in attributes.iter() {
                    let local = attr.name.local.to_string();
                    if matches!(local.as_str(), ORIG_NAME_ATTR | OFFSET_ATTR | ATTR_NAMES_ATTR) {
                        continue;
                    }
                    let name = original_names
                        .iter()
                        .find(|n| n.eq_ignore_ascii_case(&local))
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| correct_svg_attribute_name(&local, svg));
                    parsed_attrs.push(AttributeIR {
                        name,
                        value: self.attribute_value(&attr.value),
                        location,
                    });
                }
                drop(attributes);

                let children = self.children_of(handle);
                let node = if is_component_tag(&tag) {
                    MarkupNode::Component(ComponentNode {
                        name: tag,
                        attributes: parsed_attrs,
                        children,
                        location,
                    })
                } else if tag == "slot" && !svg {
                    let name = parsed_attrs.iter().find(|a| a.name == "name").and_then(|a| {
                        match &a.value {
                            AttributeValue::Static(n) => Some(n.clone()),
                            _ => None,
                        }
                    });
                    MarkupNode::Slot(SlotNode {
                        name,
                        fallback: children,
                        location,
                    })
                } else {
                    MarkupNode::Element(ElementNode {
                        tag,
                        svg,
                        attributes: parsed_attrs,
                        children,
                        location,
                    })
                };
                items.push(Item::Node(node));
            }
            NodeData::Document
            | NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => {}
        }
    }

    fn attribute_value(&mut self, value: &str) -> AttributeValue {
        let mut parts = Vec::new();
        let mut last_end = 0;
        for caps in EXPR_PLACEHOLDER_RE.captures_iter(value) {
            let (Some(m), Some(index)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if m.start() > last_end {
                parts.push(AttributePart::Text(value[last_end..m.start()].to_string()));
            }
            if let Some(MarkerKind::Expr(id)) = self.marker(index.as_str()).map(|m| m.kind) {
                parts.push(AttributePart::Expression(id));
            }
            last_end = m.end();
        }
        if parts.is_empty() {
            return AttributeValue::Static(value.to_string());
        }
        if last_end < value.len() {
            parts.push(AttributePart::Text(value[last_end..].to_string()));
        }
        match parts.as_slice() {
            [AttributePart::Expression(id)] => AttributeValue::Dynamic(*id),
            _ => AttributeValue::Interpolated(parts),
        }
    }

    fn marker(&self, index: &str) -> Option<Marker> {
        index
            .parse::<usize>()
            .ok()
            .and_then(|i| self.markers.get(i))
            .copied()
    }

    /// Split a text node on placeholders. Whitespace-only runs at the edges of
    /// the text node are layout noise and dropped; interior ones separate
    /// interpolations and are kept.
    fn split_text(&mut self, text: &str, items: &mut Vec<Item>) {
        let mut segments: Vec<Item> = Vec::new();
        let mut last_end = 0;
        for caps in EXPR_PLACEHOLDER_RE.captures_iter(text) {
            let (Some(m), Some(index)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if m.start() > last_end {
                segments.push(text_item(&text[last_end..m.start()]));
            }
            if let Some(marker) = self.marker(index.as_str()) {
                segments.push(match marker.kind {
                    MarkerKind::Expr(id) => Item::Node(MarkupNode::Expression(ExpressionNode {
                        expression: id,
                        location: marker.span,
                    })),
                    _ => Item::Marker(marker),
                });
            }
            last_end = m.end();
        }
        if last_end < text.len() {
            segments.push(text_item(&text[last_end..]));
        }

        let count = segments.len();
        for (i, item) in segments.into_iter().enumerate() {
            let edge = i == 0 || i + 1 == count;
            if edge && matches!(&item, Item::Node(MarkupNode::Text(t)) if t.value.trim().is_empty()) {
                continue;
            }
            items.push(item);
        }
    }

    fn fold_blocks(&mut self, items: Vec<Item>) -> Vec<MarkupNode> {
        struct Frame {
            location: SourceSpan,
            branches: Vec<IfBranch>,
            condition: ExprId,
            current: Vec<MarkupNode>,
            in_else: bool,
        }

        impl Frame {
            fn close(mut self) -> MarkupNode {
                let otherwise = if self.in_else {
                    Some(std::mem::take(&mut self.current))
                } else {
                    self.branches.push(IfBranch {
                        condition: self.condition,
                        children: std::mem::take(&mut self.current),
                    });
                    None
                };
                MarkupNode::If(IfBlockNode {
                    branches: self.branches,
                    otherwise,
                    location: self.location,
                })
            }
        }

        let mut root = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for item in items {
            match item {
                Item::Node(node) => match stack.last_mut() {
                    Some(frame) => frame.current.push(node),
                    None => root.push(node),
                },
                Item::Marker(marker) => match marker.kind {
                    MarkerKind::IfOpen(condition) => stack.push(Frame {
                        location: marker.span,
                        branches: vec![],
                        condition,
                        current: vec![],
                        in_else: false,
                    }),
                    MarkerKind::ElseIf(condition) => match stack.last_mut() {
                        Some(frame) if !frame.in_else => {
                            let children = std::mem::take(&mut frame.current);
                            frame.branches.push(IfBranch {
                                condition: frame.condition,
                                children,
                            });
                            frame.condition = condition;
                        }
                        Some(_) => self.structure_error("`{:else if}` cannot follow `{:else}`.", marker),
                        None => self.structure_error("`{:else if}` without a matching `{#if}`.", marker),
                    },
                    MarkerKind::Else => match stack.last_mut() {
                        Some(frame) if !frame.in_else => {
                            let children = std::mem::take(&mut frame.current);
                            frame.branches.push(IfBranch {
                                condition: frame.condition,
                                children,
                            });
                            frame.in_else = true;
                        }
                        Some(_) => self.structure_error("Duplicate `{:else}`.", marker),
                        None => self.structure_error("`{:else}` without a matching `{#if}`.", marker),
                    },
                    MarkerKind::EndIf => match stack.pop() {
                        Some(frame) => {
                            let node = frame.close();
                            match stack.last_mut() {
                                Some(parent) => parent.current.push(node),
                                None => root.push(node),
                            }
                        }
                        None => self.structure_error("`{/if}` without a matching `{#if}`.", marker),
                    },
                    MarkerKind::Expr(_) => {}
                },
            }
        }

        // Close what was left open so later stages still see the content.
        while let Some(frame) = stack.pop() {
            self.sink.report(
                Diagnostic::malformed(ERR_BLOCK_STRUCTURE, "Unclosed `{#if}` block.", frame.location)
                    .with_hint("Blocks must open and close within the same parent element."),
            );
            let node = frame.close();
            match stack.last_mut() {
                Some(parent) => parent.current.push(node),
                None => root.push(node),
            }
        }

        root
    }

    fn structure_error(&mut self, message: &str, marker: Marker) {
        self.sink
            .report(Diagnostic::malformed(ERR_BLOCK_STRUCTURE, message, marker.span));
    }
}

fn text_item(value: &str) -> Item {
    Item::Node(MarkupNode::Text(TextNode {
        value: value.to_string(),
    }))
}
