use super::scale::LinearScale;
use super::scene::{Color, Mark, Point, Rect, Surface, TextAnchor};

/// Text shown instead of an empty coordinate system.
pub const PLACEHOLDER_TEXT: &str = "No data available";

/// Approximate advance of one glyph at `size` px (Helvetica-ish average).
#[must_use]
pub fn char_width(size: f64) -> f64 {
    size * 0.58
}

/// Elide `text` to at most `max_chars` characters, ending with `…`.
///
/// Returns `None` when fewer than three characters fit, i.e. the label
/// should be hidden rather than reduced to noise.
#[must_use]
pub fn truncate_label(text: &str, max_chars: usize) -> Option<String> {
    let len = text.chars().count();
    if len <= max_chars {
        return Some(text.to_string());
    }
    if max_chars < 3 {
        return None;
    }
    let kept: String = text.chars().take(max_chars - 1).collect();
    Some(format!("{kept}…"))
}

/// Compact number for axis ticks and labels: 1234 → "1.2K", 2500000 → "2.5M".
#[must_use]
pub fn format_compact(v: f64) -> String {
    let abs = v.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (v / 1e9, "B")
    } else if abs >= 1e6 {
        (v / 1e6, "M")
    } else if abs >= 1e3 {
        (v / 1e3, "K")
    } else {
        (v, "")
    };
    let s = if suffix.is_empty() && scaled.fract().abs() < 1e-9 {
        format!("{scaled:.0}")
    } else {
        let s = format!("{scaled:.1}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    format!("{s}{suffix}")
}

/// Percentage with one decimal: 0.1234 → "12.3%".
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Clear the surface and draw the centered empty-state message.
pub fn draw_placeholder(surface: &mut Surface) {
    surface.clear();
    let center = Point::new(surface.width() / 2.0, surface.height() / 2.0);
    surface.push(Mark::text(center, PLACEHOLDER_TEXT, 14.0, TextAnchor::Middle, Color::MUTED));
}

/// Inner plot area after fixed margins (top, right, bottom, left).
#[must_use]
pub fn plot_area(surface: &Surface, margins: (f64, f64, f64, f64)) -> Rect {
    let (top, right, bottom, left) = margins;
    Rect::new(
        left,
        top,
        (surface.width() - left - right).max(0.0),
        (surface.height() - top - bottom).max(0.0),
    )
}

/// Horizontal grid lines plus value labels on the left edge of `plot`.
pub fn draw_value_axis(surface: &mut Surface, plot: Rect, scale: &LinearScale, ticks: usize) {
    for tick in scale.ticks(ticks) {
        let y = scale.map(tick);
        surface.push(Mark::Line {
            from: Point::new(plot.x, y),
            to: Point::new(plot.x + plot.width, y),
            stroke: Color::GRID,
            width: 1.0,
        });
        surface.push(Mark::text(
            Point::new(plot.x - 6.0, y),
            format_compact(tick),
            10.0,
            TextAnchor::End,
            Color::MUTED,
        ));
    }
    surface.push(Mark::Line {
        from: Point::new(plot.x, plot.y + plot.height),
        to: Point::new(plot.x + plot.width, plot.y + plot.height),
        stroke: Color::AXIS,
        width: 1.0,
    });
}

/// Category label under the x axis, elided to `max_width` px.
pub fn draw_category_label(surface: &mut Surface, x: f64, y: f64, text: &str, max_width: f64) {
    let size = 10.0;
    let max_chars = (max_width / char_width(size)).floor().max(0.0) as usize;
    if let Some(label) = truncate_label(text, max_chars) {
        surface.push(Mark::text(Point::new(x, y), label, size, TextAnchor::Middle, Color::TEXT));
    }
}
