use std::f64::consts::{PI, TAU};

use super::common::{char_width, draw_placeholder, format_compact, format_percent, truncate_label};
use super::palette::color_at;
use super::scene::{polar, Color, Mark, Point, Rect, Surface, TextAnchor};
use super::RenderOutcome;
use crate::models::chart::SeriesDatum;

const LABEL_SIZE: f64 = 10.0;
const LEGEND_ROW: f64 = 18.0;
const LEGEND_SWATCH: f64 = 10.0;
/// Horizontal space kept free for external labels on each side of the circle.
const LABEL_GUTTER: f64 = 56.0;
/// Leader line: radial segment, then a horizontal elbow.
const LEADER_RADIAL: f64 = 12.0;
const LEADER_ELBOW: f64 = 10.0;
const EDGE_MARGIN: f64 = 8.0;
const MIN_LABEL_GAP: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieStyle {
    Pie,
    Doughnut,
}

impl PieStyle {
    /// Slices at or above this share get their label inside the slice.
    #[must_use]
    pub fn inline_threshold(&self) -> f64 {
        match self {
            PieStyle::Pie => 0.05,
            PieStyle::Doughnut => 0.08,
        }
    }

    /// Hole radius as a fraction of the outer radius.
    #[must_use]
    pub fn inner_ratio(&self) -> f64 {
        match self {
            PieStyle::Pie => 0.0,
            PieStyle::Doughnut => 0.55,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub fraction: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: Color,
}

impl Slice {
    #[must_use]
    pub fn mid_angle(&self) -> f64 {
        (self.start_angle + self.end_angle) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPlacement {
    Inline,
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceLabel {
    pub slice: usize,
    pub placement: LabelPlacement,
    pub text: String,
    pub at: Point,
    pub anchor: TextAnchor,
    /// Leader line from the slice edge through the elbow to the text, external labels only.
    pub leader: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub color: Color,
    pub swatch: Rect,
    pub text_at: Point,
}

/// Geometry of a pie or doughnut, computed before anything is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PieLayout {
    pub center: Point,
    pub radius: f64,
    pub inner_radius: f64,
    pub total: f64,
    pub slices: Vec<Slice>,
    pub labels: Vec<SliceLabel>,
    pub legend: Vec<LegendItem>,
    pub legend_height: f64,
}

/// Legend columns: 3 for up to six items, 4 beyond.
#[must_use]
pub fn legend_columns(items: usize) -> usize {
    if items <= 6 {
        3
    } else {
        4
    }
}

/// Lay out slices, labels and the legend for a `width × height` box.
///
/// Only strictly positive values become slices. Returns `None` when nothing
/// positive remains, which callers treat as "no data".
#[must_use]
pub fn layout_pie(width: f64, height: f64, datum: &SeriesDatum, style: PieStyle) -> Option<PieLayout> {
    let positive: Vec<(usize, &str, f64)> = datum
        .iter()
        .enumerate()
        .filter(|(_, (_, v))| v.is_finite() && *v > 0.0)
        .map(|(i, (l, v))| (i, l, v))
        .collect();
    let total: f64 = positive.iter().map(|(_, _, v)| v).sum();
    if positive.is_empty() || total <= 0.0 {
        return None;
    }

    // Legend first; the circle gets whatever height is left.
    let cols = legend_columns(positive.len());
    let rows = positive.len().div_ceil(cols);
    let legend_height = rows as f64 * LEGEND_ROW + EDGE_MARGIN;
    let chart_height = (height - legend_height).max(0.0);

    let radius = ((width - 2.0 * LABEL_GUTTER).min(chart_height - 2.0 * (LEADER_RADIAL + EDGE_MARGIN)) / 2.0)
        .max(0.0);
    let center = Point::new(width / 2.0, chart_height / 2.0);
    let inner_radius = radius * style.inner_ratio();

    let mut angle = 0.0;
    let slices: Vec<Slice> = positive
        .iter()
        .map(|&(i, label, value)| {
            let fraction = value / total;
            let start = angle;
            angle += fraction * TAU;
            Slice {
                label: label.to_string(),
                value,
                fraction,
                start_angle: start,
                end_angle: angle,
                color: color_at(i),
            }
        })
        .collect();

    let labels = place_labels(width, chart_height, center, radius, inner_radius, &slices, style);

    let col_width = width / cols as f64;
    let legend_top = chart_height + EDGE_MARGIN / 2.0;
    let max_chars = ((col_width - LEGEND_SWATCH - 12.0) / char_width(LABEL_SIZE)).floor().max(0.0) as usize;
    let legend = slices
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let (row, col) = (i / cols, i % cols);
            let x = col as f64 * col_width + 6.0;
            let y = legend_top + row as f64 * LEGEND_ROW;
            LegendItem {
                label: truncate_label(&s.label, max_chars).unwrap_or_default(),
                color: s.color,
                swatch: Rect::new(x, y + (LEGEND_ROW - LEGEND_SWATCH) / 2.0, LEGEND_SWATCH, LEGEND_SWATCH),
                text_at: Point::new(x + LEGEND_SWATCH + 4.0, y + LEGEND_ROW / 2.0),
            }
        })
        .collect();

    Some(PieLayout {
        center,
        radius,
        inner_radius,
        total,
        slices,
        labels,
        legend,
        legend_height,
    })
}

fn place_labels(
    width: f64,
    chart_height: f64,
    center: Point,
    radius: f64,
    inner_radius: f64,
    slices: &[Slice],
    style: PieStyle,
) -> Vec<SliceLabel> {
    let mut inline = Vec::new();
    let mut right = Vec::new();
    let mut left = Vec::new();

    for (i, slice) in slices.iter().enumerate() {
        let mid = slice.mid_angle();
        if slice.fraction >= style.inline_threshold() {
            let r = if inner_radius > 0.0 {
                (radius + inner_radius) / 2.0
            } else {
                radius * 0.65
            };
            inline.push(SliceLabel {
                slice: i,
                placement: LabelPlacement::Inline,
                text: format_percent(slice.fraction),
                at: polar(center, r, mid),
                anchor: TextAnchor::Middle,
                leader: Vec::new(),
            });
            continue;
        }

        let edge = polar(center, radius, mid);
        let bend = polar(center, radius + LEADER_RADIAL, mid);
        let on_right = mid < PI;
        let label = SliceLabel {
            slice: i,
            placement: LabelPlacement::External,
            text: format!("{} ({})", slice.label, format_percent(slice.fraction)),
            at: bend,
            anchor: if on_right { TextAnchor::Start } else { TextAnchor::End },
            leader: vec![edge, bend],
        };
        if on_right {
            right.push(label);
        } else {
            left.push(label);
        }
    }

    let (top, bottom) = (EDGE_MARGIN, chart_height - EDGE_MARGIN);
    spread_vertically(&mut right, slices, top, bottom);
    spread_vertically(&mut left, slices, top, bottom);

    let mut out = inline;
    for mut label in right.into_iter().chain(left) {
        let dir = if label.anchor == TextAnchor::Start { 1.0 } else { -1.0 };
        let elbow_x = (label.at.x + dir * LEADER_ELBOW).clamp(EDGE_MARGIN, width - EDGE_MARGIN);
        let elbow = Point::new(elbow_x, label.at.y);
        label.leader.push(elbow);

        let text_x = (elbow_x + dir * 3.0).clamp(EDGE_MARGIN, width - EDGE_MARGIN);
        let room = if dir > 0.0 { width - EDGE_MARGIN - text_x } else { text_x - EDGE_MARGIN };
        let max_chars = (room / char_width(LABEL_SIZE)).floor().max(0.0) as usize;
        label.text = truncate_label(&label.text, max_chars).unwrap_or_default();
        label.at = Point::new(text_x, label.at.y);
        out.push(label);
    }
    out
}

/// Spread one column of external labels so neighbouring rows keep
/// `MIN_LABEL_GAP` and every row stays inside `[top, bottom]`.
///
/// When the column cannot hold all rows, labels of the smallest slices are
/// dropped.
fn spread_vertically(labels: &mut Vec<SliceLabel>, slices: &[Slice], top: f64, bottom: f64) {
    let capacity = if bottom < top {
        0
    } else {
        ((bottom - top) / MIN_LABEL_GAP).floor() as usize + 1
    };
    if labels.len() > capacity {
        labels.sort_by(|a, b| slices[b.slice].fraction.total_cmp(&slices[a.slice].fraction));
        labels.truncate(capacity);
    }
    labels.sort_by(|a, b| a.at.y.total_cmp(&b.at.y));

    // Downward from the top edge, then upward from the bottom edge.
    for i in 0..labels.len() {
        let min_y = if i == 0 { top } else { labels[i - 1].at.y + MIN_LABEL_GAP };
        if labels[i].at.y < min_y {
            move_label(&mut labels[i], min_y);
        }
    }
    for i in (0..labels.len()).rev() {
        let max_y = if i + 1 == labels.len() { bottom } else { labels[i + 1].at.y - MIN_LABEL_GAP };
        if labels[i].at.y > max_y {
            move_label(&mut labels[i], max_y);
        }
    }
}

fn move_label(label: &mut SliceLabel, y: f64) {
    label.at.y = y;
    if let Some(bend) = label.leader.last_mut() {
        bend.y = y;
    }
}

/// Pie chart with inline/external labels and a bottom legend.
pub fn render_pie(surface: &mut Surface, datum: &SeriesDatum) -> RenderOutcome {
    render_with_style(surface, datum, PieStyle::Pie)
}

/// Ring chart with the total in the middle.
pub fn render_doughnut(surface: &mut Surface, datum: &SeriesDatum) -> RenderOutcome {
    render_with_style(surface, datum, PieStyle::Doughnut)
}

fn render_with_style(surface: &mut Surface, datum: &SeriesDatum, style: PieStyle) -> RenderOutcome {
    let Some(layout) = layout_pie(surface.width(), surface.height(), datum, style) else {
        draw_placeholder(surface);
        return RenderOutcome::Placeholder;
    };
    surface.clear();

    for slice in &layout.slices {
        surface.push(Mark::Arc {
            center: layout.center,
            outer_radius: layout.radius,
            inner_radius: layout.inner_radius,
            start_angle: slice.start_angle,
            end_angle: slice.end_angle,
            fill: slice.color,
        });
    }

    for label in &layout.labels {
        match label.placement {
            LabelPlacement::Inline => {
                let fill = layout.slices[label.slice].color.contrast_text();
                surface.push(Mark::text(label.at, label.text.clone(), LABEL_SIZE, label.anchor, fill));
            }
            LabelPlacement::External => {
                if label.leader.len() > 1 {
                    surface.push(Mark::Polyline {
                        points: label.leader.clone(),
                        stroke: Color::MUTED,
                        width: 1.0,
                    });
                }
                if !label.text.is_empty() {
                    surface.push(Mark::text(label.at, label.text.clone(), LABEL_SIZE, label.anchor, Color::TEXT));
                }
            }
        }
    }

    if style == PieStyle::Doughnut {
        surface.push(Mark::Text {
            at: Point::new(layout.center.x, layout.center.y - 6.0),
            text: format_compact(layout.total),
            size: 16.0,
            anchor: TextAnchor::Middle,
            fill: Color::TEXT,
            bold: true,
        });
        surface.push(Mark::text(
            Point::new(layout.center.x, layout.center.y + 12.0),
            "Total",
            10.0,
            TextAnchor::Middle,
            Color::MUTED,
        ));
    }

    for item in &layout.legend {
        surface.push(Mark::Rect {
            rect: item.swatch,
            fill: item.color,
            stroke: None,
        });
        surface.push(Mark::text(item.text_at, item.label.clone(), LABEL_SIZE, TextAnchor::Start, Color::TEXT));
    }

    RenderOutcome::drawn(surface)
}
