use super::common::{draw_placeholder, format_compact, truncate_label};
use super::palette::{color_at, shade};
use super::scene::{Color, Mark, Point, Rect, Surface, TextAnchor};
use super::RenderOutcome;
use crate::errors::CoreError;
use crate::models::chart::HierarchyNode;

const BREADCRUMB_HEIGHT: f64 = 22.0;
const GROUP_HEADER: f64 = 18.0;
const GROUP_PADDING: f64 = 2.0;

// Adaptive label density: below these cell sizes the text is dropped.
const NAME_MIN_WIDTH: f64 = 30.0;
const NAME_MIN_HEIGHT: f64 = 16.0;
const VALUE_MIN_WIDTH: f64 = 48.0;
const VALUE_MIN_HEIGHT: f64 = 32.0;
const LABEL_PADDING: f64 = 8.0;
const LABEL_CHAR_WIDTH: f64 = 7.0;

// ── Squarified layout ───────────────────────────────────────────────

/// Squarified treemap tiling of `weights` inside `rect`.
///
/// Returns one rectangle per weight, in input order. Non-positive weights
/// get an empty rectangle at the origin of `rect`. Rectangle areas are
/// proportional to weights and together tile `rect`.
#[must_use]
pub fn squarify(weights: &[f64], rect: Rect) -> Vec<Rect> {
    let mut out = vec![Rect::new(rect.x, rect.y, 0.0, 0.0); weights.len()];
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 || rect.area() <= 0.0 {
        return out;
    }

    let scale = rect.area() / total;
    let mut order: Vec<usize> = (0..weights.len()).filter(|&i| weights[i] > 0.0).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
    let areas: Vec<f64> = weights.iter().map(|w| w.max(0.0) * scale).collect();

    let mut free = rect;
    let mut row: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let side = free.width.min(free.height);
        let candidate = order[i];
        let keep_growing = row.is_empty() || {
            let current = worst_ratio(row.iter().map(|&r| areas[r]), side);
            let grown = worst_ratio(row.iter().map(|&r| areas[r]).chain([areas[candidate]]), side);
            grown <= current
        };
        if keep_growing {
            row.push(candidate);
            i += 1;
        } else {
            free = lay_row(&row, &areas, free, &mut out);
            row.clear();
        }
    }
    if !row.is_empty() {
        lay_row(&row, &areas, free, &mut out);
    }
    out
}

/// Worst aspect ratio of a row laid along a side of length `side`.
fn worst_ratio(areas: impl Iterator<Item = f64> + Clone, side: f64) -> f64 {
    let sum: f64 = areas.clone().sum();
    let max = areas.clone().fold(0.0_f64, f64::max);
    let min = areas.fold(f64::INFINITY, f64::min);
    if sum <= 0.0 || min <= 0.0 || side <= 0.0 {
        return f64::INFINITY;
    }
    let side2 = side * side;
    let sum2 = sum * sum;
    (side2 * max / sum2).max(sum2 / (side2 * min))
}

/// Place `row` along the shorter side of `free`; returns the space left over.
fn lay_row(row: &[usize], areas: &[f64], free: Rect, out: &mut [Rect]) -> Rect {
    let sum: f64 = row.iter().map(|&i| areas[i]).sum();
    if free.area() <= 0.0 || sum <= 0.0 {
        return free;
    }
    if free.width >= free.height {
        // Column on the left edge.
        let thickness = (sum / free.height).min(free.width);
        let mut y = free.y;
        for &i in row {
            let h = areas[i] / thickness;
            out[i] = Rect::new(free.x, y, thickness, h);
            y += h;
        }
        Rect::new(free.x + thickness, free.y, free.width - thickness, free.height)
    } else {
        // Row along the top edge.
        let thickness = (sum / free.width).min(free.height);
        let mut x = free.x;
        for &i in row {
            let w = areas[i] / thickness;
            out[i] = Rect::new(x, free.y, w, thickness);
            x += w;
        }
        Rect::new(free.x, free.y + thickness, free.width, free.height - thickness)
    }
}

// ── Label policy ────────────────────────────────────────────────────

/// Characters of label text a cell of `width` px can hold.
#[must_use]
pub fn label_capacity(width: f64) -> usize {
    ((width - LABEL_PADDING) / LABEL_CHAR_WIDTH).floor().max(0.0) as usize
}

/// Name and value text for a cell, elided to fit, `None` where hidden.
#[must_use]
pub fn cell_labels(rect: Rect, name: &str, value: f64) -> (Option<String>, Option<String>) {
    let capacity = label_capacity(rect.width);
    let name_label = if rect.width >= NAME_MIN_WIDTH && rect.height >= NAME_MIN_HEIGHT {
        truncate_label(name, capacity)
    } else {
        None
    };
    let value_label = if rect.width >= VALUE_MIN_WIDTH && rect.height >= VALUE_MIN_HEIGHT {
        truncate_label(&format_compact(value), capacity)
    } else {
        None
    };
    (name_label, value_label)
}

// ── Layout ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TreemapCell {
    /// Child indices from the rendered root down to this node.
    pub path: Vec<usize>,
    pub name: String,
    pub value: f64,
    pub rect: Rect,
    pub depth: usize,
    pub has_children: bool,
    pub fill: Color,
    pub name_label: Option<String>,
    pub value_label: Option<String>,
}

/// Result of laying out one treemap level, kept for hit-testing clicks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreemapLayout {
    pub bounds: Rect,
    pub cells: Vec<TreemapCell>,
}

impl TreemapLayout {
    /// Top-level cell under `point`, if any.
    #[must_use]
    pub fn cell_at(&self, point: Point) -> Option<&TreemapCell> {
        self.cells
            .iter()
            .find(|c| c.depth == 1 && c.rect.area() > 0.0 && c.rect.contains(point))
    }
}

/// Lay out `node`'s children in a `width × height` box; grandchildren are
/// nested inside their parent cell under a header band.
#[must_use]
pub fn layout_treemap(width: f64, height: f64, node: &HierarchyNode) -> TreemapLayout {
    let bounds = Rect::new(0.0, BREADCRUMB_HEIGHT, width, (height - BREADCRUMB_HEIGHT).max(0.0)).inset(GROUP_PADDING);
    let weights: Vec<f64> = node.children.iter().map(HierarchyNode::weight).collect();
    let rects = squarify(&weights, bounds);

    let mut cells = Vec::new();
    for (i, (child, rect)) in node.children.iter().zip(rects).enumerate() {
        if rect.area() <= 0.0 {
            continue;
        }
        let base = color_at(i);
        let (name_label, value_label) = cell_labels(rect, &child.name, child.weight());
        let header = if rect.height >= 2.0 * GROUP_HEADER { GROUP_HEADER } else { 0.0 };
        cells.push(TreemapCell {
            path: vec![i],
            name: child.name.clone(),
            value: child.weight(),
            rect,
            depth: 1,
            has_children: !child.is_leaf(),
            fill: base,
            // Groups only get a caption when there is a header band for it.
            name_label: if child.is_leaf() || header > 0.0 { name_label } else { None },
            value_label: if child.is_leaf() { value_label } else { None },
        });

        if child.is_leaf() {
            continue;
        }
        let inner = Rect::new(
            rect.x + GROUP_PADDING,
            rect.y + header,
            (rect.width - 2.0 * GROUP_PADDING).max(0.0),
            (rect.height - header - GROUP_PADDING).max(0.0),
        );
        let grand_weights: Vec<f64> = child.children.iter().map(HierarchyNode::weight).collect();
        for (j, (grand, grect)) in child.children.iter().zip(squarify(&grand_weights, inner)).enumerate() {
            if grect.area() <= 0.0 {
                continue;
            }
            let (name_label, value_label) = cell_labels(grect, &grand.name, grand.weight());
            cells.push(TreemapCell {
                path: vec![i, j],
                name: grand.name.clone(),
                value: grand.weight(),
                rect: grect,
                depth: 2,
                has_children: !grand.is_leaf(),
                fill: shade(base, 1 + j % 3),
                name_label,
                value_label,
            });
        }
    }

    TreemapLayout { bounds, cells }
}

// ── Drill-down state ────────────────────────────────────────────────

/// What a click on the treemap did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreemapClick {
    DrilledDown(String),
    DrilledUp,
    Ignored,
}

/// Full hierarchy plus the current zoom root.
///
/// The zoom path is kept by name so it survives a data refresh as long as
/// the same categories are still present.
#[derive(Debug, Clone, PartialEq)]
pub struct TreemapView {
    root: HierarchyNode,
    path: Vec<String>,
}

impl TreemapView {
    pub fn new(root: HierarchyNode) -> Self {
        Self { root, path: Vec::new() }
    }

    /// Replace the hierarchy, keeping the longest still-valid zoom prefix.
    pub fn set_tree(&mut self, root: HierarchyNode) {
        self.root = root;
        let mut node = &self.root;
        let mut valid = 0;
        for name in &self.path {
            match node.child(name).filter(|c| !c.is_leaf()) {
                Some(child) => {
                    node = child;
                    valid += 1;
                }
                None => break,
            }
        }
        self.path.truncate(valid);
    }

    #[must_use]
    pub fn tree(&self) -> &HierarchyNode {
        &self.root
    }

    /// The node currently rendered as the treemap root.
    #[must_use]
    pub fn current(&self) -> &HierarchyNode {
        let mut node = &self.root;
        for name in &self.path {
            match node.child(name) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    #[must_use]
    pub fn is_at_root(&self) -> bool {
        self.path.is_empty()
    }

    /// `All › Beverages`
    #[must_use]
    pub fn breadcrumb(&self) -> String {
        std::iter::once(self.root.name.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" › ")
    }

    /// Zoom into a child of the current root.
    pub fn drill_down(&mut self, name: &str) -> Result<(), CoreError> {
        let current = self.current();
        let child = current
            .child(name)
            .ok_or_else(|| CoreError::ValidationError(format!("No treemap node named '{name}' under '{}'", current.name)))?;
        if child.is_leaf() {
            return Err(CoreError::ValidationError(format!(
                "Treemap node '{name}' has no children to drill into"
            )));
        }
        self.path.push(name.to_string());
        tracing::debug!(path = %self.breadcrumb(), "treemap drill down");
        Ok(())
    }

    /// Zoom out one level. Returns `false` when already at the root.
    pub fn drill_up(&mut self) -> bool {
        let popped = self.path.pop().is_some();
        if popped {
            tracing::debug!(path = %self.breadcrumb(), "treemap drill up");
        }
        popped
    }

    pub fn reset(&mut self) {
        self.path.clear();
    }

    /// Clicking a cell with children drills into it; clicking outside every
    /// cell (the background) drills up; clicking a leaf does nothing.
    pub fn click(&mut self, point: Point, layout: &TreemapLayout) -> TreemapClick {
        match layout.cell_at(point) {
            Some(cell) if cell.has_children => {
                let name = cell.name.clone();
                match self.drill_down(&name) {
                    Ok(()) => TreemapClick::DrilledDown(name),
                    Err(_) => TreemapClick::Ignored,
                }
            }
            Some(_) => TreemapClick::Ignored,
            None if self.drill_up() => TreemapClick::DrilledUp,
            None => TreemapClick::Ignored,
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

/// Render the view's current root; returns the layout for hit-testing.
pub fn render_treemap(surface: &mut Surface, view: &TreemapView) -> (RenderOutcome, TreemapLayout) {
    render_node(surface, view.current(), &view.breadcrumb())
}

/// Render an arbitrary node as the treemap root.
pub fn render_node(surface: &mut Surface, node: &HierarchyNode, breadcrumb: &str) -> (RenderOutcome, TreemapLayout) {
    if node.children.is_empty() {
        draw_placeholder(surface);
        return (RenderOutcome::Placeholder, TreemapLayout::default());
    }
    surface.clear();

    let layout = layout_treemap(surface.width(), surface.height(), node);
    surface.push(Mark::Text {
        at: Point::new(6.0, BREADCRUMB_HEIGHT / 2.0),
        text: breadcrumb.to_string(),
        size: 11.0,
        anchor: TextAnchor::Start,
        fill: Color::TEXT,
        bold: true,
    });

    for cell in &layout.cells {
        surface.push(Mark::Rect {
            rect: cell.rect,
            fill: cell.fill,
            stroke: Some(Color::WHITE),
        });
        let text_fill = cell.fill.contrast_text();
        let mut y = cell.rect.y + 10.0;
        if let Some(name) = &cell.name_label {
            surface.push(Mark::Text {
                at: Point::new(cell.rect.x + 4.0, y),
                text: name.clone(),
                size: 11.0,
                anchor: TextAnchor::Start,
                fill: text_fill,
                bold: cell.has_children,
            });
            y += 14.0;
        }
        if let Some(value) = &cell.value_label {
            surface.push(Mark::text(Point::new(cell.rect.x + 4.0, y), value.clone(), 10.0, TextAnchor::Start, text_fill));
        }
    }

    (RenderOutcome::drawn(surface), layout)
}
