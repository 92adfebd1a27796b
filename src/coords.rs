//! Linear chunk index to grid coordinates.

use std::num::NonZeroUsize;

use crate::error::{PlotError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPosition {
    pub column: usize,
    pub row: usize,
}

/// `column = index mod width`, `row = index / width`.
pub fn grid_position(index: usize, width: NonZeroUsize) -> GridPosition {
    GridPosition {
        column: index % width.get(),
        row: index / width.get(),
    }
}

/// Row width to use for `chunk_count` chunks; absent means a single row.
pub fn effective_width(width: Option<NonZeroUsize>, chunk_count: usize) -> NonZeroUsize {
    width.unwrap_or_else(|| NonZeroUsize::new(chunk_count).unwrap_or(NonZeroUsize::MIN))
}

/// Turn a user supplied width into a validated one.
pub fn checked_width(width: i64) -> Result<NonZeroUsize> {
    usize::try_from(width)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            PlotError::config(format!(
                "the number of chunks in a row has to be a positive integer, got: {}",
                width
            ))
        })
}

/// Lazily yields the grid position of every chunk in chromosome order.
pub fn grid_positions(count: usize, width: NonZeroUsize) -> impl Iterator<Item = GridPosition> {
    (0..count).map(move |i| grid_position(i, width))
}

/// Number of grid rows needed for `count` chunks.
pub fn row_count(count: usize, width: NonZeroUsize) -> usize {
    count.div_ceil(width.get())
}
