use std::collections::HashMap;

use super::common::{char_width, draw_placeholder, format_compact, truncate_label};
use super::palette::color_at;
use super::scene::{Color, Mark, Point, Rect, Surface, TextAnchor};
use super::RenderOutcome;
use crate::models::chart::EntityRollup;

/// Largest bubble radius relative to the smaller surface dimension.
pub const MAX_RADIUS_FRACTION: f64 = 0.15;
const MIN_RADIUS: f64 = 4.0;
const PADDING: f64 = 8.0;
const OVERLAP_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub name: String,
    pub revenue: f64,
    pub profit: f64,
    pub units_sold: f64,
    pub center: Point,
    pub radius: f64,
    pub color: Color,
}

/// Radius for a cumulative profit: linear between the minimum and
/// `max_radius`, non-positive profit pinned to the minimum.
#[must_use]
pub fn bubble_radius(profit: f64, max_profit: f64, max_radius: f64) -> f64 {
    let min = MIN_RADIUS.min(max_radius);
    if !(profit > 0.0) || !(max_profit > 0.0) {
        return min;
    }
    min + (profit / max_profit).min(1.0) * (max_radius - min)
}

// ── Circle packing ──────────────────────────────────────────────────

/// Pack circles without overlap, largest first, each one tangent to the
/// already placed ones at the free spot closest to the origin.
///
/// Returns centers in input order. Deterministic: ties keep input order.
#[must_use]
pub fn pack_circles(radii: &[f64]) -> Vec<Point> {
    let mut centers = vec![Point::default(); radii.len()];
    let mut order: Vec<usize> = (0..radii.len()).collect();
    order.sort_by(|&a, &b| radii[b].total_cmp(&radii[a]).then(a.cmp(&b)));

    let largest = order.first().map_or(0.0, |&i| radii[i].max(0.0));
    let mut grid = Grid::new(2.0 * largest);
    let mut placed: Vec<usize> = Vec::with_capacity(radii.len());
    for &i in &order {
        let r = radii[i].max(0.0);
        centers[i] = match placed.as_slice() {
            [] => Point::new(0.0, 0.0),
            [first] => Point::new(centers[*first].x + radii[*first] + r, centers[*first].y),
            _ => best_position(&placed, &centers, radii, r, &grid),
        };
        grid.insert(i, centers[i]);
        placed.push(i);
    }
    centers
}

/// Uniform grid over placed centers. Cells are as wide as the largest
/// diameter, so any circle overlapping a new one sits in the 3×3 block
/// around the new center.
struct Grid {
    cell: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl Grid {
    fn new(cell: f64) -> Self {
        Self {
            cell: cell.max(1e-9),
            cells: HashMap::new(),
        }
    }

    fn key(&self, p: Point) -> (i64, i64) {
        ((p.x / self.cell).floor() as i64, (p.y / self.cell).floor() as i64)
    }

    fn insert(&mut self, idx: usize, p: Point) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push(idx);
    }

    fn near(&self, p: Point) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.key(p);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(|k| self.cells.get(&k))
            .flatten()
            .copied()
    }
}

fn best_position(placed: &[usize], centers: &[Point], radii: &[f64], r: f64, grid: &Grid) -> Point {
    let fits = |p: Point| {
        grid.near(p)
            .all(|j| distance(p, centers[j]) >= r + radii[j] - OVERLAP_EPSILON)
    };

    let mut candidates: Vec<Point> = Vec::new();
    for (k, &a) in placed.iter().enumerate() {
        for &b in &placed[k + 1..] {
            // Too far apart for one circle to touch both.
            let reach = radii[a] + radii[b] + 2.0 * r;
            let (dx, dy) = (centers[b].x - centers[a].x, centers[b].y - centers[a].y);
            if dx * dx + dy * dy > reach * reach {
                continue;
            }
            candidates.extend(tangent_points(centers[a], radii[a], centers[b], radii[b], r).into_iter().flatten());
        }
    }
    for &a in placed {
        for step in 0..8 {
            let angle = step as f64 * std::f64::consts::FRAC_PI_4;
            let d = radii[a] + r;
            candidates.push(Point::new(centers[a].x + d * angle.cos(), centers[a].y + d * angle.sin()));
        }
    }

    // Nearest first; the stable sort keeps generation order on ties.
    let mut ranked: Vec<(f64, Point)> = candidates
        .into_iter()
        .map(|p| (distance(p, Point::default()), p))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    ranked.into_iter().map(|(_, p)| p).find(|p| fits(*p)).unwrap_or_else(|| {
        // Past the right-most extent nothing can overlap.
        let right = placed
            .iter()
            .map(|&j| centers[j].x + radii[j])
            .fold(f64::NEG_INFINITY, f64::max);
        Point::new(right + r, 0.0)
    })
}

/// Centers of a circle of radius `r` touching both given circles.
fn tangent_points(a: Point, ra: f64, b: Point, rb: f64, r: f64) -> [Option<Point>; 2] {
    let d0 = ra + r;
    let d1 = rb + r;
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let d = dx.hypot(dy);
    if d < 1e-12 || d > d0 + d1 || d < (d0 - d1).abs() {
        return [None, None];
    }
    let along = (d0 * d0 - d1 * d1 + d * d) / (2.0 * d);
    let h2 = d0 * d0 - along * along;
    if h2 < 0.0 {
        return [None, None];
    }
    let h = h2.sqrt();
    let mid = Point::new(a.x + along * dx / d, a.y + along * dy / d);
    [
        Some(Point::new(mid.x - h * dy / d, mid.y + h * dx / d)),
        Some(Point::new(mid.x + h * dy / d, mid.y - h * dx / d)),
    ]
}

fn distance(p: Point, q: Point) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}

// ── Layout + rendering ──────────────────────────────────────────────

/// Size, pack and fit one bubble per rollup into a `width × height` box.
///
/// The packing is scaled down (never up) and centered so every bubble
/// stays inside the padded box.
#[must_use]
pub fn layout_bubbles(width: f64, height: f64, rollups: &[EntityRollup]) -> Vec<Bubble> {
    if rollups.is_empty() {
        return Vec::new();
    }
    let area = Rect::new(PADDING, PADDING, (width - 2.0 * PADDING).max(0.0), (height - 2.0 * PADDING).max(0.0));
    let max_radius = (width.min(height) * MAX_RADIUS_FRACTION).max(0.0);
    let max_profit = rollups.iter().map(|r| r.profit).fold(0.0_f64, f64::max);

    let radii: Vec<f64> = rollups
        .iter()
        .map(|r| bubble_radius(r.profit, max_profit, max_radius))
        .collect();
    let centers = pack_circles(&radii);

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (c, r) in centers.iter().zip(&radii) {
        min_x = min_x.min(c.x - r);
        min_y = min_y.min(c.y - r);
        max_x = max_x.max(c.x + r);
        max_y = max_y.max(c.y + r);
    }
    let (bw, bh) = (max_x - min_x, max_y - min_y);
    let scale = if bw > 0.0 && bh > 0.0 {
        (area.width / bw).min(area.height / bh).min(1.0)
    } else {
        1.0
    };
    let offset_x = area.x + area.width / 2.0 - scale * (min_x + max_x) / 2.0;
    let offset_y = area.y + area.height / 2.0 - scale * (min_y + max_y) / 2.0;

    rollups
        .iter()
        .zip(centers.iter().zip(&radii))
        .enumerate()
        .map(|(i, (rollup, (c, r)))| Bubble {
            name: rollup.name.clone(),
            revenue: rollup.revenue,
            profit: rollup.profit,
            units_sold: rollup.units_sold,
            center: Point::new(offset_x + scale * c.x, offset_y + scale * c.y),
            radius: r * scale,
            color: color_at(i),
        })
        .collect()
}

/// Non-overlapping bubbles sized by cumulative profit, labelled when large enough.
pub fn render_bubble(surface: &mut Surface, rollups: &[EntityRollup]) -> RenderOutcome {
    if rollups.is_empty() {
        draw_placeholder(surface);
        return RenderOutcome::Placeholder;
    }
    surface.clear();

    let bubbles = layout_bubbles(surface.width(), surface.height(), rollups);
    for b in &bubbles {
        surface.push(Mark::Circle {
            center: b.center,
            radius: b.radius,
            fill: Color::rgba(b.color.r, b.color.g, b.color.b, 0.75),
            stroke: Some(b.color),
        });

        if b.radius < 18.0 {
            continue;
        }
        let max_chars = (b.radius * 1.6 / char_width(10.0)).floor() as usize;
        let text_fill = b.color.contrast_text();
        if let Some(name) = truncate_label(&b.name, max_chars) {
            let y = if b.radius >= 28.0 { b.center.y - 6.0 } else { b.center.y };
            surface.push(Mark::text(Point::new(b.center.x, y), name, 10.0, TextAnchor::Middle, text_fill));
        }
        if b.radius >= 28.0 {
            surface.push(Mark::text(
                Point::new(b.center.x, b.center.y + 8.0),
                format_compact(b.profit),
                9.0,
                TextAnchor::Middle,
                text_fill,
            ));
        }
    }

    RenderOutcome::drawn(surface)
}
