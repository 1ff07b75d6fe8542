use ratatui::layout::Rect;

use crate::geometry::{BoundingBox, Point};

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;

/// Maps scene coordinates onto a block of terminal cells, preserving the
/// scene's aspect ratio and centering it in the area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    area: Rect,
    origin: Point,
    /// Scene units per column
    scale: f64,
}

impl Viewport {
    pub fn fit(bounds: BoundingBox, area: Rect) -> Self {
        let scene_w = bounds.width().max(1.0);
        let scene_h = bounds.height().max(1.0);
        // Leave the last column and row for points exactly on the max edge.
        let cols = area.width.saturating_sub(1).max(1) as f64;
        let rows = area.height.saturating_sub(1).max(1) as f64;

        let scale = (scene_w / cols).max(scene_h / (rows * CELL_ASPECT));
        let pad_cols = (cols - bounds.width() / scale) / 2.0;
        let pad_rows = (rows - bounds.height() / (scale * CELL_ASPECT)) / 2.0;

        Self {
            area,
            origin: Point::new(
                bounds.xmin - pad_cols * scale,
                bounds.ymin - pad_rows * scale * CELL_ASPECT,
            ),
            scale,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Cell containing `p`, or `None` if it falls outside the area.
    pub fn to_cell(&self, p: Point) -> Option<(u16, u16)> {
        let col = ((p.x - self.origin.x) / self.scale).round();
        let row = ((p.y - self.origin.y) / (self.scale * CELL_ASPECT)).round();
        if col < 0.0 || row < 0.0 || col >= self.area.width as f64 || row >= self.area.height as f64 {
            return None;
        }
        Some((self.area.x + col as u16, self.area.y + row as u16))
    }

    /// Scene point at the center of a cell.
    pub fn to_scene(&self, column: u16, row: u16) -> Point {
        let col = column.saturating_sub(self.area.x) as f64;
        let row = row.saturating_sub(self.area.y) as f64;
        Point::new(
            self.origin.x + col * self.scale,
            self.origin.y + row * self.scale * CELL_ASPECT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> BoundingBox {
        BoundingBox {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 100.0,
            ymax: 100.0,
        }
    }

    #[test]
    fn exact_fit_maps_corners() {
        let vp = Viewport::fit(square(), Rect::new(0, 0, 101, 51));
        assert_eq!(vp.scale(), 1.0);
        assert_eq!(vp.to_cell(Point::new(0.0, 0.0)), Some((0, 0)));
        assert_eq!(vp.to_cell(Point::new(100.0, 100.0)), Some((100, 50)));
        assert_eq!(vp.to_scene(50, 25), Point::new(50.0, 50.0));
    }

    #[test]
    fn wide_area_centers_scene() {
        let vp = Viewport::fit(square(), Rect::new(0, 0, 201, 51));
        assert_eq!(vp.to_cell(Point::new(0.0, 0.0)), Some((50, 0)));
        assert_eq!(vp.to_cell(Point::new(100.0, 0.0)), Some((150, 0)));
    }

    #[test]
    fn offset_area_round_trips() {
        let vp = Viewport::fit(square(), Rect::new(4, 1, 61, 21));
        for (col, row) in [(4, 1), (20, 10), (60, 20)] {
            assert_eq!(vp.to_cell(vp.to_scene(col, row)), Some((col, row)));
        }
        assert_eq!(vp.to_cell(Point::new(-1000.0, 0.0)), None);
        assert_eq!(vp.to_cell(Point::new(50.0, 1000.0)), None);
    }
}
