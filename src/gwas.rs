//! Trait-association hits binned onto the chunk grid.

use std::f64::consts::PI;
use std::num::NonZeroUsize;

use log::info;
use rustc_hash::FxHashMap;

use crate::coords::{grid_position, GridPosition};

/// Hits per chunk are capped at this count.
pub const HIT_CAP: u32 = 10;

/// Area of a marker drawn for a single hit.
const UNIT_AREA: f64 = 63.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GwasHit {
    pub chromosome: String,
    pub position: u64,
    pub rsid: String,
    pub trait_name: Option<String>,
}

/// All hits falling in one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GwasMarker {
    pub chunk_index: usize,
    pub position: GridPosition,
    pub count: u32,
}

impl GwasMarker {
    /// Marker radius in pixels; area grows with the squared hit count.
    pub fn radius(&self) -> f64 {
        ((self.count as f64).powi(2) * UNIT_AREA / PI).sqrt()
    }
}

/// Count the hits of `chromosome` per chunk and place each chunk on the grid.
pub fn bin_hits(
    hits: &[GwasHit],
    chromosome: &str,
    chunk_size: u64,
    width: NonZeroUsize,
) -> Vec<GwasMarker> {
    let mut counts: FxHashMap<usize, u32> = FxHashMap::default();
    for hit in hits.iter().filter(|h| h.chromosome == chromosome) {
        let index = (hit.position / chunk_size.max(1)) as usize;
        *counts.entry(index).or_insert(0) += 1;
    }

    let mut markers: Vec<GwasMarker> = counts
        .into_iter()
        .map(|(chunk_index, count)| GwasMarker {
            chunk_index,
            position: grid_position(chunk_index, width),
            count: count.min(HIT_CAP),
        })
        .collect();
    markers.sort_by_key(|m| m.chunk_index);

    info!(
        "Number of chunks with GWAS hits on chromosome {}: {}",
        chromosome,
        markers.len()
    );
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(chromosome: &str, position: u64) -> GwasHit {
        GwasHit {
            chromosome: chromosome.to_string(),
            position,
            rsid: format!("rs{}", position),
            trait_name: None,
        }
    }

    #[test]
    fn hits_are_binned_per_chunk_and_capped() {
        let mut hits: Vec<_> = (0..15).map(|i| hit("1", 1000 + i)).collect();
        hits.push(hit("1", 120));
        hits.push(hit("2", 120));

        let width = NonZeroUsize::new(4).unwrap();
        let markers = bin_hits(&hits, "1", 100, width);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].chunk_index, 1);
        assert_eq!(markers[0].count, 1);
        assert_eq!(markers[0].position, GridPosition { column: 1, row: 0 });
        assert_eq!(markers[1].chunk_index, 10);
        assert_eq!(markers[1].count, HIT_CAP);
        assert_eq!(markers[1].position, GridPosition { column: 2, row: 2 });
    }

    #[test]
    fn radius_grows_linearly_with_count() {
        let one = GwasMarker {
            chunk_index: 0,
            position: GridPosition { column: 0, row: 0 },
            count: 1,
        };
        let two = GwasMarker { count: 2, ..one };
        assert!((one.radius() - (63.0 / PI).sqrt()).abs() < 1e-12);
        assert!((two.radius() - 2.0 * one.radius()).abs() < 1e-12);
    }
}
