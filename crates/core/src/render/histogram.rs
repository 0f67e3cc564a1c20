use super::common::{draw_placeholder, draw_value_axis, format_compact, plot_area};
use super::palette::color_at;
use super::scale::LinearScale;
use super::scene::{Color, Mark, Point, Rect, Surface, TextAnchor};
use super::RenderOutcome;
use crate::models::settings::MAX_HISTOGRAM_BINS;

const MARGINS: (f64, f64, f64, f64) = (20.0, 16.0, 36.0, 52.0);
const TICKS: usize = 5;

/// One equal-width bucket. `end` is exclusive except for the last bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Bucket `values` into `bins` equal-width bins over `[min, max]`.
///
/// Non-finite values are ignored. The maximum lands in the last bin. A
/// degenerate domain (all values equal) widens to `[v - 0.5, v + 0.5]`.
/// `bins` is clamped to `1..=MAX_HISTOGRAM_BINS`.
#[must_use]
pub fn bin_values(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let bins = bins.clamp(1, MAX_HISTOGRAM_BINS);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }

    let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min < 1e-12 {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

/// Adjacent bars, one per bin, heights proportional to counts.
pub fn render_histogram(surface: &mut Surface, values: &[f64], bins: usize) -> RenderOutcome {
    let buckets = bin_values(values, bins);
    if buckets.is_empty() {
        draw_placeholder(surface);
        return RenderOutcome::Placeholder;
    }
    surface.clear();

    let plot = plot_area(surface, MARGINS);
    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    let y = LinearScale::zero_based(max_count, plot.y + plot.height, plot.y).nice(TICKS);
    let (lo, hi) = (buckets[0].start, buckets[buckets.len() - 1].end);
    let x = LinearScale::new(lo, hi, plot.x, plot.x + plot.width);

    draw_value_axis(surface, plot, &y, TICKS);

    let baseline = y.map(0.0);
    let fill = color_at(2);
    for bucket in &buckets {
        let left = x.map(bucket.start);
        let right = x.map(bucket.end);
        let top = y.map(bucket.count as f64);
        surface.push(Mark::Rect {
            rect: Rect::new(left, top, (right - left).max(0.0), (baseline - top).max(0.0)),
            fill,
            stroke: Some(Color::WHITE),
        });
    }

    // Edge labels only where they do not crowd: first, last and every k-th.
    let bin_px = plot.width / buckets.len() as f64;
    let every = ((48.0 / bin_px.max(1.0)).ceil() as usize).max(1);
    for (i, bucket) in buckets.iter().enumerate() {
        if i % every == 0 {
            surface.push(Mark::text(
                Point::new(x.map(bucket.start), baseline + 14.0),
                format_compact(bucket.start),
                10.0,
                TextAnchor::Middle,
                Color::TEXT,
            ));
        }
    }
    surface.push(Mark::text(
        Point::new(x.map(hi), baseline + 14.0),
        format_compact(hi),
        10.0,
        TextAnchor::Middle,
        Color::TEXT,
    ));

    RenderOutcome::drawn(surface)
}
