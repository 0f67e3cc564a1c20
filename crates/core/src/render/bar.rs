use super::common::{draw_category_label, draw_placeholder, draw_value_axis, format_compact, plot_area};
use super::palette::color_at;
use super::scale::{BandScale, LinearScale};
use super::scene::{Color, Mark, Point, Rect, Surface, TextAnchor};
use super::RenderOutcome;
use crate::models::chart::SeriesDatum;

const MARGINS: (f64, f64, f64, f64) = (20.0, 16.0, 36.0, 52.0);
const TICKS: usize = 5;

/// Vertical bars, one per label, over a `[0, max]` value axis.
pub fn render_bar(surface: &mut Surface, datum: &SeriesDatum) -> RenderOutcome {
    if datum.is_empty() {
        draw_placeholder(surface);
        return RenderOutcome::Placeholder;
    }
    surface.clear();

    let plot = plot_area(surface, MARGINS);
    let max = datum.values.iter().copied().fold(0.0_f64, f64::max);
    let y = LinearScale::zero_based(max, plot.y + plot.height, plot.y).nice(TICKS);
    let x = BandScale::new(datum.len(), plot.x, plot.x + plot.width, 0.2, 0.1);

    draw_value_axis(surface, plot, &y, TICKS);

    let baseline = y.map(0.0);
    for (i, (label, value)) in datum.iter().enumerate() {
        let Some(center) = x.center(i) else { continue };
        let left = center - x.band_width() / 2.0;
        let top = y.map(value.max(0.0));
        let rect = Rect::new(left, top, x.band_width(), (baseline - top).max(0.0));
        surface.push(Mark::Rect {
            rect,
            fill: color_at(0),
            stroke: None,
        });

        if x.band_width() >= 24.0 && rect.height > 0.0 {
            surface.push(Mark::text(
                Point::new(center, top - 8.0),
                format_compact(value),
                9.0,
                TextAnchor::Middle,
                Color::TEXT,
            ));
        }
        draw_category_label(surface, center, baseline + 14.0, label, x.step());
    }

    RenderOutcome::drawn(surface)
}
