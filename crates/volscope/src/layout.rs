//! Placement of surfaces inside a view's container.

use glam::UVec2;

/// A pixel rectangle inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Top-left corner.
    pub origin: UVec2,
    /// Width and height.
    pub size: UVec2,
}

/// How the active surfaces of a juxtaposition view are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// Row-major square grid, `next_square(n)` cells wide.
    Grid,
    /// Every surface covers the whole container (interchangeable mode).
    Stacked,
}

/// Returns the smallest `i` with `i * i >= n`.
pub fn next_square(n: usize) -> usize {
    let mut i = 0;
    while i * i < n {
        i += 1;
    }
    i
}

/// Returns `(row, column)` of each of `count` grid cells.
pub fn grid_cells(count: usize) -> Vec<(usize, usize)> {
    let side = next_square(count).max(1);
    (0..count).map(|i| (i / side, i % side)).collect()
}

/// Lays out `count` surfaces in `container`.
///
/// Grid cells share the container evenly; the last row may be partially
/// filled. Cells are at least one pixel wide.
#[allow(clippy::cast_possible_truncation)]
pub fn arrange(count: usize, container: UVec2, arrangement: Arrangement) -> Vec<Rect> {
    match arrangement {
        Arrangement::Stacked => vec![
            Rect {
                origin: UVec2::ZERO,
                size: container.max(UVec2::ONE),
            };
            count
        ],
        Arrangement::Grid => {
            let side = next_square(count).max(1);
            let rows = count.div_ceil(side).max(1);
            let cell = UVec2::new(container.x / side as u32, container.y / rows as u32)
                .max(UVec2::ONE);
            grid_cells(count)
                .into_iter()
                .map(|(row, column)| Rect {
                    origin: UVec2::new(column as u32 * cell.x, row as u32 * cell.y),
                    size: cell,
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_square() {
        let expected = [0, 1, 2, 2, 2, 3, 3, 3, 3, 3, 4];
        for (n, side) in expected.into_iter().enumerate() {
            assert_eq!(next_square(n), side, "n = {n}");
        }
    }

    #[test]
    fn test_grid_cells_row_major() {
        assert_eq!(grid_cells(3), vec![(0, 0), (0, 1), (1, 0)]);
        assert_eq!(grid_cells(5), vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]);
        assert!(grid_cells(0).is_empty());
    }

    #[test]
    fn test_arrange_grid() {
        let rects = arrange(3, UVec2::new(600, 400), Arrangement::Grid);
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[0].size, UVec2::new(300, 200));
        assert_eq!(rects[1].origin, UVec2::new(300, 0));
        assert_eq!(rects[2].origin, UVec2::new(0, 200));
    }

    #[test]
    fn test_arrange_grid_single_row() {
        // Two surfaces fit a 2x2 grid but only fill its first row.
        let rects = arrange(2, UVec2::new(600, 400), Arrangement::Grid);
        assert_eq!(rects[0].size, UVec2::new(300, 400));
    }

    #[test]
    fn test_arrange_stacked() {
        let rects = arrange(4, UVec2::new(640, 480), Arrangement::Stacked);
        assert!(rects
            .iter()
            .all(|r| r.origin == UVec2::ZERO && r.size == UVec2::new(640, 480)));
    }
}
