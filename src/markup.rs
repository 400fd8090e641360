//! Inline span-markup dialect.
//!
//! A small XML-like styling syntax consumed by the text backend:
//! `<span foreground='#0099ff' weight='bold'>styled</span>` inside otherwise
//! plain text. Spans may nest; inner spans override outer ones where they
//! overlap. Text outside any span renders with the backend defaults.
//!
//! `size` and `rise` values are expressed in 1024ths of a point, matching the
//! dialect this tool showcases.

use std::ops::Range;

use crate::error::{MarkshotError, MarkshotResult};

/// Markup units per typographic point (`size` and `rise` attribute values).
pub const UNITS_PER_PT: f32 = 1024.0;

/// Pixels per typographic point at the 96 dpi rendering scale.
pub const PX_PER_PT: f32 = 96.0 / 72.0;

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse(s: &str) -> MarkshotResult<Self> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| MarkshotError::markup(format!("color '{s}' must start with '#'")))?;
        // Byte-offset slicing below is only sound on all-ASCII input.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MarkshotError::markup(format!(
                "color '{s}' has invalid hex digits"
            )));
        }

        let nibble = |i: usize| -> MarkshotResult<u8> {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map_err(|_| MarkshotError::markup(format!("color '{s}' has invalid hex digits")))
        };
        let byte = |i: usize| -> MarkshotResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| MarkshotError::markup(format!("color '{s}' has invalid hex digits")))
        };

        match hex.len() {
            3 => Ok(Self {
                r: nibble(0)? * 17,
                g: nibble(1)? * 17,
                b: nibble(2)? * 17,
                a: 255,
            }),
            6 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: 255,
            }),
            8 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(MarkshotError::markup(format!(
                "color '{s}' must be #rgb, #rrggbb or #rrggbbaa"
            ))),
        }
    }

    /// Lowercase hex form, with alpha only when not fully opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Font style attribute values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontStyleKind {
    Normal,
    Italic,
    Oblique,
}

/// One typed span attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum SpanAttr {
    Foreground(Rgba8),
    /// Font size in 1024ths of a point.
    Size(f32),
    FontFamily(String),
    /// CSS-style numeric weight, 1..=1000.
    Weight(u16),
    Style(FontStyleKind),
    Underline(bool),
    Strikethrough(bool),
    /// Baseline offset in 1024ths of a point; positive raises the text.
    Rise(f32),
}

/// A styled region of the parsed plain text.
#[derive(Clone, Debug, PartialEq)]
pub struct StyledSpan {
    /// Byte range into [`MarkupDoc::text`].
    pub range: Range<usize>,
    pub attrs: Vec<SpanAttr>,
    /// Index of the enclosing span, if nested. Always smaller than this
    /// span's own index (spans are recorded in open order).
    pub parent: Option<usize>,
}

/// Parsed markup: plain text plus styled spans in open order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkupDoc {
    pub text: String,
    pub spans: Vec<StyledSpan>,
}

impl MarkupDoc {
    pub fn parse(markup: &str) -> MarkshotResult<Self> {
        let bytes = markup.as_bytes();
        let mut text = String::new();
        let mut spans: Vec<StyledSpan> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'<' => {
                    if markup[i..].starts_with("</span>") {
                        let idx = stack.pop().ok_or_else(|| {
                            MarkshotError::markup("closing </span> without a matching open tag")
                        })?;
                        spans[idx].range.end = text.len();
                        i += "</span>".len();
                    } else if markup[i..].starts_with("<span") {
                        let (attrs, consumed) = parse_open_tag(&markup[i..])?;
                        spans.push(StyledSpan {
                            range: text.len()..text.len(),
                            attrs,
                            parent: stack.last().copied(),
                        });
                        stack.push(spans.len() - 1);
                        i += consumed;
                    } else {
                        return Err(MarkshotError::markup(format!(
                            "unexpected '<' at byte {i}; only <span> tags are supported"
                        )));
                    }
                }
                b'&' => {
                    let (ch, consumed) = parse_entity(&markup[i..])?;
                    text.push(ch);
                    i += consumed;
                }
                _ => {
                    // Copy one whole UTF-8 scalar.
                    let ch = markup[i..]
                        .chars()
                        .next()
                        .ok_or_else(|| MarkshotError::markup("invalid UTF-8 boundary"))?;
                    text.push(ch);
                    i += ch.len_utf8();
                }
            }
        }

        if let Some(idx) = stack.last() {
            return Err(MarkshotError::markup(format!(
                "unclosed <span> starting before byte offset {}",
                spans[*idx].range.start
            )));
        }

        Ok(Self { text, spans })
    }
}

/// Escape text so it can be embedded in markup (element content or a quoted
/// attribute value). Escapes `&`, `<`, `>`, `"` and `'`.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Decode all entities in `s`. Inverse of [`escape_text`] on its output.
pub fn unescape_text(s: &str) -> MarkshotResult<String> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let (ch, consumed) = parse_entity(&rest[pos..])?;
        out.push(ch);
        rest = &rest[pos + consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Decode one entity at the start of `s` (which begins with `&`). Returns the
/// decoded char and the number of bytes consumed.
fn parse_entity(s: &str) -> MarkshotResult<(char, usize)> {
    let semi = s
        .char_indices()
        .take(12)
        .find(|&(_, c)| c == ';')
        .map(|(i, _)| i)
        .ok_or_else(|| MarkshotError::markup("'&' must start an entity such as &amp;"))?;
    let name = &s[1..semi];

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let digits = name
                .strip_prefix('#')
                .ok_or_else(|| MarkshotError::markup(format!("unknown entity '&{name};'")))?;
            let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => digits.parse::<u32>(),
            }
            .map_err(|_| MarkshotError::markup(format!("invalid numeric entity '&{name};'")))?;
            char::from_u32(code)
                .ok_or_else(|| MarkshotError::markup(format!("entity '&{name};' is not a char")))?
        }
    };
    Ok((ch, semi + 1))
}

/// Parse `<span k='v' ...>` at the start of `s`. Returns the typed attributes
/// and the number of bytes consumed including the closing `>`.
fn parse_open_tag(s: &str) -> MarkshotResult<(Vec<SpanAttr>, usize)> {
    debug_assert!(s.starts_with("<span"));
    let bytes = s.as_bytes();
    let mut i = "<span".len();
    let mut attrs = Vec::new();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(MarkshotError::markup("unterminated <span> tag")),
            Some(&b'>') => return Ok((attrs, i + 1)),
            _ => {}
        }

        let name_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
        if i == name_start {
            let found = s[i..].chars().next().unwrap_or('?');
            return Err(MarkshotError::markup(format!(
                "expected attribute name in <span> tag, found '{found}'"
            )));
        }
        let name = &s[name_start..i];

        if bytes.get(i) != Some(&b'=') {
            return Err(MarkshotError::markup(format!(
                "attribute '{name}' is missing '=<value>'"
            )));
        }
        i += 1;

        let quote = match bytes.get(i).copied() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => {
                return Err(MarkshotError::markup(format!(
                    "attribute '{name}' value must be quoted"
                )));
            }
        };
        i += 1;
        let value_start = i;
        while i < bytes.len() && bytes[i] != quote {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(MarkshotError::markup(format!(
                "attribute '{name}' has an unterminated value"
            )));
        }
        let raw_value = &s[value_start..i];
        i += 1;

        let value = unescape_text(raw_value)?;
        attrs.push(parse_attr(name, &value)?);
    }
}

fn parse_attr(name: &str, value: &str) -> MarkshotResult<SpanAttr> {
    match name {
        "foreground" => Ok(SpanAttr::Foreground(Rgba8::parse(value)?)),
        "size" => {
            let units: f32 = value.parse().map_err(|_| {
                MarkshotError::markup(format!("size '{value}' is not a number"))
            })?;
            if !units.is_finite() || units <= 0.0 {
                return Err(MarkshotError::markup("size must be finite and > 0"));
            }
            Ok(SpanAttr::Size(units))
        }
        "font_family" => {
            if value.is_empty() {
                return Err(MarkshotError::markup("font_family must be non-empty"));
            }
            Ok(SpanAttr::FontFamily(value.to_string()))
        }
        "weight" => Ok(SpanAttr::Weight(parse_weight(value)?)),
        "style" => {
            let kind = match value {
                "normal" => FontStyleKind::Normal,
                "italic" => FontStyleKind::Italic,
                "oblique" => FontStyleKind::Oblique,
                _ => {
                    return Err(MarkshotError::markup(format!(
                        "style '{value}' is not normal, italic or oblique"
                    )));
                }
            };
            Ok(SpanAttr::Style(kind))
        }
        "underline" => {
            let on = match value {
                "none" => false,
                "single" | "double" | "low" | "error" => true,
                _ => {
                    return Err(MarkshotError::markup(format!(
                        "underline '{value}' is not a known underline kind"
                    )));
                }
            };
            Ok(SpanAttr::Underline(on))
        }
        "strikethrough" => {
            let on = match value {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(MarkshotError::markup(format!(
                        "strikethrough '{value}' must be true or false"
                    )));
                }
            };
            Ok(SpanAttr::Strikethrough(on))
        }
        "rise" => {
            let units: f32 = value.parse().map_err(|_| {
                MarkshotError::markup(format!("rise '{value}' is not a number"))
            })?;
            if !units.is_finite() {
                return Err(MarkshotError::markup("rise must be finite"));
            }
            Ok(SpanAttr::Rise(units))
        }
        _ => Err(MarkshotError::markup(format!(
            "unknown span attribute '{name}'"
        ))),
    }
}

fn parse_weight(value: &str) -> MarkshotResult<u16> {
    let named = match value {
        "thin" => Some(100),
        "ultralight" => Some(200),
        "light" => Some(300),
        "normal" | "regular" => Some(400),
        "medium" => Some(500),
        "semibold" => Some(600),
        "bold" => Some(700),
        "ultrabold" => Some(800),
        "heavy" => Some(900),
        _ => None,
    };
    if let Some(w) = named {
        return Ok(w);
    }
    let n: u16 = value
        .parse()
        .map_err(|_| MarkshotError::markup(format!("weight '{value}' is not a name or number")))?;
    if !(1..=1000).contains(&n) {
        return Err(MarkshotError::markup("numeric weight must be in 1..=1000"));
    }
    Ok(n)
}
