//! D8 flow direction encoding shared by the extraction algorithms
//!
//! Directions count counterclockwise from east; 0 marks pits, flats
//! and nodata:
//!
//! ```text
//! 4  3  2
//! 5  .  1
//! 6  7  8
//! ```

/// Row/col offsets for directions 1-8, indexed by `dir - 1`
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// The direction pointing back at the sender
pub(crate) fn opposite_dir(dir: u8) -> u8 {
    ((dir - 1 + 4) % 8) + 1
}

/// Downstream neighbor of (row, col) under `dir`.
///
/// Returns `None` when the step leaves the grid or `dir` is not a
/// flow code.
pub(crate) fn downstream(
    row: usize,
    col: usize,
    dir: u8,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    if dir == 0 || dir > 8 {
        return None;
    }
    let (dr, dc) = D8_OFFSETS[(dir - 1) as usize];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        return None;
    }
    Some((nr as usize, nc as usize))
}
