//! Coverage rendering and reporting.
//!
//! [`render`] pairs each cell with its statistics and a color;
//! [`draw`] turns rendered cells into [`Drawable`] polygons for any
//! [`RenderSurface`]; [`CoverageReport`] summarizes the rendered scores.
//!
//! The crate ships one surface, [`GeoJsonSurface`], which collects polygons
//! into a GeoJSON feature collection with simplestyle color properties.

mod geojson;
mod scale;
mod stats;

pub use geojson::GeoJsonSurface;
pub use scale::{stability_color, ColorScale, RenderMode};
pub use stats::{CoverageReport, DescriptiveStats, StatsDisplay};

use crate::coord::GeoPoint;
use crate::coverage::Aggregate;
use crate::geometry::{Cell, CellId};

/// Fill opacity of every drawn cell.
pub const FILL_OPACITY: f64 = 0.6;

/// Stroke width of every drawn cell.
pub const STROKE_WEIGHT: f64 = 1.0;

/// A cell ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub cell: Cell,
    pub average: f64,
    pub stability: f64,
    /// `average * stability`
    pub weighted: f64,
    /// Color of `weighted` on the selected scale.
    pub color: &'static str,
}

/// Which score a drawn layer is colored by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layer {
    /// Weighted coverage on the render mode's scale.
    #[default]
    Coverage,
    /// Stability on the stability scale.
    Stability,
}

/// One polygon handed to a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub cell_id: CellId,
    /// Closed ring.
    pub boundary: Vec<GeoPoint>,
    pub stroke_color: String,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_weight: f64,
    /// Score the colors were chosen from.
    pub value: f64,
}

/// Anything that can display cell polygons.
pub trait RenderSurface {
    /// Remove everything previously drawn.
    fn clear(&mut self);

    fn draw(&mut self, drawable: Drawable);
}

/// Pair every cell with its statistics and a color.
///
/// Cells missing from `aggregate` render as uncovered (average 0,
/// stability 1).
pub fn render(cells: &[Cell], aggregate: &Aggregate, mode: RenderMode) -> Vec<RenderedCell> {
    let scale = mode.scale();
    cells
        .iter()
        .map(|cell| {
            let coverage = aggregate.get_or_uncovered(&cell.id);
            let weighted = coverage.weighted();
            RenderedCell {
                cell: cell.clone(),
                average: coverage.average,
                stability: coverage.stability,
                weighted,
                color: scale.color_for(weighted),
            }
        })
        .collect()
}

/// Replace the contents of `surface` with one polygon per rendered cell.
pub fn draw(rendered: &[RenderedCell], layer: Layer, surface: &mut dyn RenderSurface) {
    surface.clear();
    for cell in rendered {
        let (color, value) = match layer {
            Layer::Coverage => (cell.color, cell.weighted),
            Layer::Stability => (stability_color(cell.stability), cell.stability),
        };
        surface.draw(Drawable {
            cell_id: cell.cell.id.clone(),
            boundary: cell.cell.boundary.clone(),
            stroke_color: color.to_string(),
            fill_color: color.to_string(),
            fill_opacity: FILL_OPACITY,
            stroke_weight: STROKE_WEIGHT,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CellCoverage;
    use crate::geometry::close_ring;

    #[derive(Default)]
    struct RecordingSurface {
        drawn: Vec<Drawable>,
        clears: usize,
    }

    impl RenderSurface for RecordingSurface {
        fn clear(&mut self) {
            self.clears += 1;
            self.drawn.clear();
        }

        fn draw(&mut self, drawable: Drawable) {
            self.drawn.push(drawable);
        }
    }

    fn cell(id: &str) -> Cell {
        Cell {
            id: CellId::from(id),
            centroid: GeoPoint::new(0.5, 0.5),
            boundary: close_ring(&[
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(1.0, 0.0),
                GeoPoint::new(1.0, 1.0),
            ]),
        }
    }

    fn aggregate() -> Aggregate {
        vec![
            (
                CellId::from("a"),
                CellCoverage {
                    average: 4.0,
                    stability: 0.5,
                },
            ),
            (
                CellId::from("b"),
                CellCoverage {
                    average: 4.0,
                    stability: 1.0,
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_render_uses_weighted_score() {
        let rendered = render(&[cell("a"), cell("b")], &aggregate(), RenderMode::Full);

        assert_eq!(rendered[0].weighted, 2.0);
        assert_eq!(rendered[0].color, "yellow");
        assert_eq!(rendered[1].weighted, 4.0);
        assert_eq!(rendered[1].color, "#800000");
    }

    #[test]
    fn test_render_preview_scale() {
        let rendered = render(&[cell("b")], &aggregate(), RenderMode::Preview);
        assert_eq!(rendered[0].color, "red");
    }

    #[test]
    fn test_missing_cell_renders_uncovered() {
        let rendered = render(&[cell("zz")], &aggregate(), RenderMode::Full);
        assert_eq!(rendered[0].average, 0.0);
        assert_eq!(rendered[0].stability, 1.0);
        assert_eq!(rendered[0].color, "blue");
    }

    #[test]
    fn test_draw_issues_one_drawable_per_cell() {
        let rendered = render(&[cell("a"), cell("b")], &aggregate(), RenderMode::Full);
        let mut surface = RecordingSurface::default();

        draw(&rendered, Layer::Coverage, &mut surface);
        draw(&rendered, Layer::Coverage, &mut surface);

        assert_eq!(surface.clears, 2);
        assert_eq!(surface.drawn.len(), 2);
        let first = &surface.drawn[0];
        assert_eq!(first.fill_opacity, 0.6);
        assert_eq!(first.stroke_color, first.fill_color);
        assert_eq!(first.boundary.first(), first.boundary.last());
    }

    #[test]
    fn test_draw_stability_layer() {
        let rendered = render(&[cell("a")], &aggregate(), RenderMode::Full);
        let mut surface = RecordingSurface::default();

        draw(&rendered, Layer::Stability, &mut surface);
        assert_eq!(surface.drawn[0].fill_color, "gold");
        assert_eq!(surface.drawn[0].value, 0.5);
    }
}
