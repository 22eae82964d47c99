//! Distance helpers shared by the placement policies.

use spatio_frames_types::Cell;

/// Corner-to-corner distance between two cells.
///
/// Every placement policy measures proximity with this approximation rather
/// than the exact rectangle distance, so placements stay reproducible.
pub fn min_distance(origin: &Cell, target: &Cell) -> f64 {
    origin.bbox.corner_distance(&target.bbox)
}

/// Index of the available candidate closest to `origin`.
///
/// `None` entries are cells that were already assigned. Returns `None` when
/// no candidate is left, or when no remaining distance is comparable (NaN).
pub fn min_distance_cell(origin: &Cell, candidates: &[Option<Cell>]) -> Option<usize> {
    let mut min_dist = f64::MAX;
    let mut min_cell = None;

    for (i, candidate) in candidates.iter().enumerate() {
        let Some(cell) = candidate else {
            continue;
        };
        let dist = min_distance(origin, cell);
        if dist < min_dist {
            min_dist = dist;
            min_cell = Some(i);
        }
    }

    min_cell
}

/// Smallest distance from `cell` to any of `members`, `f64::MAX` when the
/// member list is empty.
pub fn min_distance_to_members(grid: &[Cell], members: &[usize], cell: &Cell) -> f64 {
    members
        .iter()
        .map(|&member| min_distance(&grid[member], cell))
        .fold(f64::MAX, f64::min)
}

/// Index of the largest distance; the first one wins ties.
pub fn max_distance_index(distances: &[f64]) -> Option<usize> {
    let (first, rest) = distances.split_first()?;
    let mut max_value = *first;
    let mut max_index = 0;

    for (i, &dist) in rest.iter().enumerate() {
        if dist > max_value {
            max_value = dist;
            max_index = i + 1;
        }
    }

    Some(max_index)
}
