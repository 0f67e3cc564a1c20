use std::f64::consts::TAU;
use std::fmt::Write as _;

/// RGBA color, channels in `0..=255` plus float alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TEXT: Color = Color::rgb(51, 51, 51);
    pub const MUTED: Color = Color::rgb(136, 136, 136);
    pub const GRID: Color = Color::rgba(0, 0, 0, 0.08);
    pub const AXIS: Color = Color::rgb(170, 170, 170);

    /// `#rrggbb`
    #[must_use]
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Black or white, whichever reads better on top of this color.
    #[must_use]
    pub fn contrast_text(&self) -> Color {
        let luma = 0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b);
        if luma > 150.0 {
            Color::TEXT
        } else {
            Color::WHITE
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Shrink on every side, never below zero size.
    #[must_use]
    pub fn inset(&self, by: f64) -> Rect {
        Rect::new(
            self.x + by,
            self.y + by,
            (self.width - 2.0 * by).max(0.0),
            (self.height - 2.0 * by).max(0.0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_svg(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// One drawn primitive.
///
/// Angles of [`Mark::Arc`] are radians, measured clockwise from 12 o'clock.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Rect {
        rect: Rect,
        fill: Color,
        stroke: Option<Color>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Color,
        width: f64,
    },
    Polyline {
        points: Vec<Point>,
        stroke: Color,
        width: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Color,
        stroke: Option<Color>,
    },
    Arc {
        center: Point,
        outer_radius: f64,
        inner_radius: f64,
        start_angle: f64,
        end_angle: f64,
        fill: Color,
    },
    Text {
        at: Point,
        text: String,
        size: f64,
        anchor: TextAnchor,
        fill: Color,
        bold: bool,
    },
}

impl Mark {
    pub fn text(at: Point, text: impl Into<String>, size: f64, anchor: TextAnchor, fill: Color) -> Self {
        Mark::Text {
            at,
            text: text.into(),
            size,
            anchor,
            fill,
            bold: false,
        }
    }
}

/// The container a renderer draws into.
///
/// Holds the pixel box (read by renderers at call time) and the retained
/// list of marks. Renderers clear it before drawing, so calling a renderer
/// twice on the same surface leaves only the second drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: f64,
    height: f64,
    title: Option<String>,
    marks: Vec<Mark>,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            title: None,
            marks: Vec::new(),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Change the pixel box (a container resize). Marks are kept until the next render.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn push(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    #[must_use]
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// All text content, in draw order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.marks
            .iter()
            .filter_map(|m| match m {
                Mark::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize as a standalone SVG document.
    #[must_use]
    pub fn to_svg(&self) -> String {
        let mut out = String::with_capacity(256 + self.marks.len() * 96);
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
            w = fmt_num(self.width),
            h = fmt_num(self.height),
        );
        if let Some(title) = &self.title {
            let _ = write!(out, "<title>{}</title>", escape_xml(title));
        }
        let _ = write!(
            out,
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            fmt_num(self.width),
            fmt_num(self.height),
            Color::WHITE.hex()
        );
        for mark in &self.marks {
            write_mark(&mut out, mark);
        }
        out.push_str("</svg>");
        out
    }
}

fn write_mark(out: &mut String, mark: &Mark) {
    match mark {
        Mark::Rect { rect, fill, stroke } => {
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}"{}{}/>"#,
                fmt_num(rect.x),
                fmt_num(rect.y),
                fmt_num(rect.width.max(0.0)),
                fmt_num(rect.height.max(0.0)),
                fill_attr(*fill),
                stroke_attr(*stroke, 1.0),
            );
        }
        Mark::Line { from, to, stroke, width } => {
            let _ = write!(
                out,
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
                fmt_num(from.x),
                fmt_num(from.y),
                fmt_num(to.x),
                fmt_num(to.y),
                stroke_attr(Some(*stroke), *width),
            );
        }
        Mark::Polyline { points, stroke, width } => {
            let pts: Vec<String> = points
                .iter()
                .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
                .collect();
            let _ = write!(
                out,
                r#"<polyline points="{}" fill="none"{}/>"#,
                pts.join(" "),
                stroke_attr(Some(*stroke), *width),
            );
        }
        Mark::Circle { center, radius, fill, stroke } => {
            let _ = write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}"{}{}/>"#,
                fmt_num(center.x),
                fmt_num(center.y),
                fmt_num(radius.max(0.0)),
                fill_attr(*fill),
                stroke_attr(*stroke, 1.0),
            );
        }
        Mark::Arc {
            center,
            outer_radius,
            inner_radius,
            start_angle,
            end_angle,
            fill,
        } => {
            let _ = write!(
                out,
                r#"<path d="{}"{} stroke="{}" stroke-width="1"/>"#,
                arc_path(*center, *outer_radius, *inner_radius, *start_angle, *end_angle),
                fill_attr(*fill),
                Color::WHITE.hex(),
            );
        }
        Mark::Text {
            at,
            text,
            size,
            anchor,
            fill,
            bold,
        } => {
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" font-size="{}" text-anchor="{}" dominant-baseline="middle"{}{}>{}</text>"#,
                fmt_num(at.x),
                fmt_num(at.y),
                fmt_num(*size),
                anchor.as_svg(),
                fill_attr(*fill),
                if *bold { r#" font-weight="bold""# } else { "" },
                escape_xml(text),
            );
        }
    }
}

/// Point on a circle for a clockwise-from-top angle.
#[must_use]
pub fn polar(center: Point, radius: f64, angle: f64) -> Point {
    Point::new(center.x + radius * angle.sin(), center.y - radius * angle.cos())
}

fn arc_path(center: Point, outer: f64, inner: f64, start: f64, end: f64) -> String {
    let sweep = (end - start).clamp(0.0, TAU);
    // A single SVG arc cannot draw a full circle; split it in two halves.
    if sweep >= TAU - 1e-9 {
        let top = polar(center, outer, 0.0);
        let bottom = polar(center, outer, TAU / 2.0);
        let mut d = format!(
            "M{},{} A{o},{o} 0 1 1 {},{} A{o},{o} 0 1 1 {},{} Z",
            fmt_num(top.x),
            fmt_num(top.y),
            fmt_num(bottom.x),
            fmt_num(bottom.y),
            fmt_num(top.x),
            fmt_num(top.y),
            o = fmt_num(outer),
        );
        if inner > 0.0 {
            let itop = polar(center, inner, 0.0);
            let ibottom = polar(center, inner, TAU / 2.0);
            let _ = write!(
                d,
                " M{},{} A{i},{i} 0 1 0 {},{} A{i},{i} 0 1 0 {},{} Z",
                fmt_num(itop.x),
                fmt_num(itop.y),
                fmt_num(ibottom.x),
                fmt_num(ibottom.y),
                fmt_num(itop.x),
                fmt_num(itop.y),
                i = fmt_num(inner),
            );
        }
        return d;
    }

    let large = if sweep > TAU / 2.0 { 1 } else { 0 };
    let o0 = polar(center, outer, start);
    let o1 = polar(center, outer, start + sweep);
    if inner > 0.0 {
        let i1 = polar(center, inner, start + sweep);
        let i0 = polar(center, inner, start);
        format!(
            "M{},{} A{o},{o} 0 {large} 1 {},{} L{},{} A{i},{i} 0 {large} 0 {},{} Z",
            fmt_num(o0.x),
            fmt_num(o0.y),
            fmt_num(o1.x),
            fmt_num(o1.y),
            fmt_num(i1.x),
            fmt_num(i1.y),
            fmt_num(i0.x),
            fmt_num(i0.y),
            o = fmt_num(outer),
            i = fmt_num(inner),
        )
    } else {
        format!(
            "M{},{} L{},{} A{o},{o} 0 {large} 1 {},{} Z",
            fmt_num(center.x),
            fmt_num(center.y),
            fmt_num(o0.x),
            fmt_num(o0.y),
            fmt_num(o1.x),
            fmt_num(o1.y),
            o = fmt_num(outer),
        )
    }
}

fn fill_attr(c: Color) -> String {
    if c.a < 1.0 {
        format!(r#" fill="{}" fill-opacity="{}""#, c.hex(), fmt_num(c.a))
    } else {
        format!(r#" fill="{}""#, c.hex())
    }
}

fn stroke_attr(c: Option<Color>, width: f64) -> String {
    match c {
        Some(c) if c.a < 1.0 => format!(
            r#" stroke="{}" stroke-opacity="{}" stroke-width="{}""#,
            c.hex(),
            fmt_num(c.a),
            fmt_num(width)
        ),
        Some(c) => format!(r#" stroke="{}" stroke-width="{}""#, c.hex(), fmt_num(width)),
        None => String::new(),
    }
}

/// Two decimals, trailing zeros trimmed.
fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
