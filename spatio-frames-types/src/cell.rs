use crate::bbox::BoundingBox2D;
use serde::{Deserialize, Serialize};

/// One rectangle of a fixed spatial grid.
///
/// `index` is the cell's position in the grid array and doubles as the
/// identity of the micro-index built for it.
///
/// # Examples
///
/// ```
/// use spatio_frames_types::{BoundingBox2D, Cell};
///
/// let grid = Cell::uniform_grid(BoundingBox2D::new(0.0, 0.0, 4.0, 2.0), 4, 2);
/// assert_eq!(grid.len(), 8);
/// assert_eq!(grid[5].index, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Position in the grid array
    pub index: u32,
    /// Cell extent
    pub bbox: BoundingBox2D,
}

impl Cell {
    pub fn new(index: u32, bbox: BoundingBox2D) -> Self {
        Self { index, bbox }
    }

    /// Split `extent` into `columns x rows` equal cells, numbered row by row
    /// starting at the minimum corner.
    pub fn uniform_grid(extent: BoundingBox2D, columns: u32, rows: u32) -> Vec<Cell> {
        if columns == 0 || rows == 0 {
            return Vec::new();
        }

        let cell_width = extent.width() / columns as f64;
        let cell_height = extent.height() / rows as f64;
        let mut cells = Vec::with_capacity((columns * rows) as usize);

        for row in 0..rows {
            for column in 0..columns {
                let x1 = extent.min_x() + column as f64 * cell_width;
                let y1 = extent.min_y() + row as f64 * cell_height;
                cells.push(Cell::new(
                    row * columns + column,
                    BoundingBox2D::new(x1, y1, x1 + cell_width, y1 + cell_height),
                ));
            }
        }

        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_grid_layout() {
        let grid = Cell::uniform_grid(BoundingBox2D::new(0.0, 0.0, 30.0, 20.0), 3, 2);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0].bbox, BoundingBox2D::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(grid[4].bbox, BoundingBox2D::new(10.0, 10.0, 20.0, 20.0));
        assert!(grid.iter().enumerate().all(|(i, c)| c.index as usize == i));
    }

    #[test]
    fn test_uniform_grid_empty() {
        assert!(Cell::uniform_grid(BoundingBox2D::new(0.0, 0.0, 1.0, 1.0), 0, 3).is_empty());
    }
}
