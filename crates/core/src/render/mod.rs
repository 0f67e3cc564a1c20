pub mod bar;
pub mod bubble;
pub mod common;
pub mod histogram;
pub mod line;
pub mod palette;
pub mod pie;
pub mod raster;
pub mod scale;
pub mod scene;
pub mod treemap;

use crate::errors::CoreError;
use crate::models::chart::{ChartDatum, ChartKind};
use crate::models::settings::DEFAULT_HISTOGRAM_BINS;

use scene::Surface;

/// What a renderer ended up drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Empty data; only the "No data available" message was drawn.
    Placeholder,
    Drawn { marks: usize },
}

impl RenderOutcome {
    pub(crate) fn drawn(surface: &Surface) -> Self {
        RenderOutcome::Drawn {
            marks: surface.marks().len(),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderOutcome::Placeholder)
    }
}

/// Per-call renderer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub histogram_bins: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

/// Draw `datum` as a `kind` chart onto `surface`.
///
/// The surface is cleared first, so repeated calls are idempotent. Empty
/// data always takes the placeholder path. A datum shape that does not
/// belong to `kind` is rejected.
pub fn render_chart(
    surface: &mut Surface,
    kind: ChartKind,
    datum: &ChartDatum,
    options: RenderOptions,
) -> Result<RenderOutcome, CoreError> {
    surface.set_title(kind.title());
    let outcome = match (kind, datum) {
        (ChartKind::Bar, ChartDatum::Series(s)) => bar::render_bar(surface, s),
        (ChartKind::Line, ChartDatum::Series(s)) => line::render_line(surface, s),
        (ChartKind::Pie, ChartDatum::Series(s)) => pie::render_pie(surface, s),
        (ChartKind::Doughnut, ChartDatum::Series(s)) => pie::render_doughnut(surface, s),
        (ChartKind::Histogram, ChartDatum::Distribution(v)) => {
            histogram::render_histogram(surface, v, options.histogram_bins)
        }
        (ChartKind::Treemap, ChartDatum::Hierarchy(root)) => {
            treemap::render_node(surface, root, &root.name).0
        }
        (ChartKind::Bubble, ChartDatum::Rollups(r)) => bubble::render_bubble(surface, r),
        (kind, _) => {
            return Err(CoreError::ValidationError(format!(
                "Chart datum shape does not match a {kind} chart"
            )))
        }
    };
    tracing::debug!(%kind, ?outcome, width = surface.width(), height = surface.height(), "rendered chart");
    Ok(outcome)
}
