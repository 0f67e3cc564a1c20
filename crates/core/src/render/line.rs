use super::common::{draw_category_label, draw_placeholder, draw_value_axis, plot_area};
use super::palette::color_at;
use super::scale::{LinearScale, PointScale};
use super::scene::{Color, Mark, Point, Surface};
use super::RenderOutcome;
use crate::models::chart::SeriesDatum;

const MARGINS: (f64, f64, f64, f64) = (20.0, 24.0, 36.0, 52.0);
const TICKS: usize = 5;

/// Polyline through one point per label plus round markers.
///
/// Labels are drawn in the order given; callers pass date-sorted series.
/// When labels would collide only every n-th one is drawn.
pub fn render_line(surface: &mut Surface, datum: &SeriesDatum) -> RenderOutcome {
    if datum.is_empty() {
        draw_placeholder(surface);
        return RenderOutcome::Placeholder;
    }
    surface.clear();

    let plot = plot_area(surface, MARGINS);
    let max = datum.values.iter().copied().fold(0.0_f64, f64::max);
    let y = LinearScale::zero_based(max, plot.y + plot.height, plot.y).nice(TICKS);
    let x = PointScale::new(datum.len(), plot.x, plot.x + plot.width);

    draw_value_axis(surface, plot, &y, TICKS);

    let stroke = color_at(0);
    let points: Vec<Point> = datum
        .iter()
        .enumerate()
        .filter_map(|(i, (_, v))| x.position(i).map(|px| Point::new(px, y.map(v.max(0.0)))))
        .collect();

    if points.len() > 1 {
        surface.push(Mark::Polyline {
            points: points.clone(),
            stroke,
            width: 2.0,
        });
    }
    for p in &points {
        surface.push(Mark::Circle {
            center: *p,
            radius: 3.0,
            fill: Color::WHITE,
            stroke: Some(stroke),
        });
    }

    // Roughly 60px per label keeps dates legible.
    let slot = if datum.len() > 1 { x.step() } else { plot.width };
    let every = ((60.0 / slot.max(1.0)).ceil() as usize).max(1);
    let baseline = plot.y + plot.height;
    for (i, (label, _)) in datum.iter().enumerate() {
        if i % every != 0 {
            continue;
        }
        if let Some(px) = x.position(i) {
            draw_category_label(surface, px, baseline + 14.0, label, slot * every as f64);
        }
    }

    RenderOutcome::drawn(surface)
}
