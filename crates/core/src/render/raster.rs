use std::sync::{Arc, OnceLock};

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};

use crate::errors::CoreError;

/// Converts a vector chart into PNG bytes.
///
/// Implementations must be deterministic for the same input so exports are
/// reproducible; a failure is reported per chart and never aborts an export.
pub trait Rasterizer {
    fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, CoreError>;
}

/// `resvg`-backed rasterizer.
///
/// The font database is loaded on the first rasterization and then shared
/// by every later call and every clone.
#[derive(Clone)]
pub struct ResvgRasterizer {
    fontdb: Arc<OnceLock<Arc<fontdb::Database>>>,
}

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self {
            fontdb: Arc::new(OnceLock::new()),
        }
    }

    fn fonts(&self) -> Arc<fontdb::Database> {
        let db = self.fontdb.get_or_init(|| {
            let mut db = fontdb::Database::new();
            #[cfg(not(target_arch = "wasm32"))]
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded font database for rasterization");
            Arc::new(db)
        });
        Arc::clone(db)
    }
}

impl std::fmt::Debug for ResvgRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResvgRasterizer")
            .field("font_faces", &self.fontdb.get().map(|db| db.len()))
            .finish()
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, CoreError> {
        let fail = |message: String| CoreError::Rasterization {
            chart: "svg".to_string(),
            message,
        };

        let mut options = Options::default();
        options.fontdb = self.fonts();
        let tree = Tree::from_str(svg, &options).map_err(|e| fail(e.to_string()))?;

        let (px_w, px_h) = (width.max(1), height.max(1));
        let mut pixmap = Pixmap::new(px_w, px_h)
            .ok_or_else(|| fail(format!("cannot allocate a {px_w}x{px_h} pixmap")))?;

        let size = tree.size();
        let sx = px_w as f32 / size.width().max(1.0);
        let sy = px_h as f32 / size.height().max(1.0);
        resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());

        pixmap.encode_png().map_err(|e| fail(e.to_string()))
    }
}
