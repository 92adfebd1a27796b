//! Greedy gene-label placement along the two chromosome arms.
//!
//! Each arm is walked once, outward from the centromere, with a single
//! running `limit`: a label either sits at its gene's own position or, when
//! that position is already taken, is pushed to the limit. No backtracking.

use log::{debug, info};

use crate::error::{PlotError, Result};
use crate::model::{Arm, LabelSlot};

/// A gene to be labelled, read from the gene list.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneMarker {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
}

/// Genomic position to vertical pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionScale {
    pixel_size: f64,
    bases_per_row: f64,
}

impl PositionScale {
    /// `pixel / (row_width * chunk_size)` pixels per base pair.
    pub fn new(row_width: usize, chunk_size: u64, pixel_size: u32) -> Result<Self> {
        if row_width == 0 || chunk_size == 0 || pixel_size == 0 {
            return Err(PlotError::config(format!(
                "row width ({}), chunk size ({}) and pixel size ({}) have to be positive",
                row_width, chunk_size, pixel_size
            )));
        }
        Ok(PositionScale {
            pixel_size: pixel_size as f64,
            bases_per_row: row_width as f64 * chunk_size as f64,
        })
    }

    pub fn to_pixel(&self, position: u64) -> f64 {
        position as f64 * self.pixel_size / self.bases_per_row
    }
}

/// Vertical footprint of one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelGeometry {
    pub label_height: f64,
    pub margin: f64,
    pub extent_padding: f64,
}

impl LabelGeometry {
    pub fn new(label_height: f64, margin: f64, extent_padding: f64) -> Result<Self> {
        if !(label_height + margin > 0.0) || label_height < 0.0 || margin < 0.0 {
            return Err(PlotError::config(format!(
                "label height ({}) and margin ({}) must be non-negative with a positive sum",
                label_height, margin
            )));
        }
        if !(extent_padding >= 0.0) {
            return Err(PlotError::config(format!(
                "label extent padding cannot be negative, got: {}",
                extent_padding
            )));
        }
        Ok(LabelGeometry {
            label_height,
            margin,
            extent_padding,
        })
    }

    /// Minimum distance between two labels of the same arm.
    pub fn step(&self) -> f64 {
        self.label_height + self.margin
    }
}

/// Placed labels for both arms plus the vertical extent they need.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub p_arm: Vec<LabelSlot>,
    pub q_arm: Vec<LabelSlot>,
    pub top: f64,
    pub bottom: f64,
}

impl LabelLayout {
    pub fn slots(&self) -> impl Iterator<Item = &LabelSlot> {
        self.p_arm.iter().chain(self.q_arm.iter())
    }

    pub fn len(&self) -> usize {
        self.p_arm.len() + self.q_arm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p_arm.is_empty() && self.q_arm.is_empty()
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

struct ArmWalker<'a> {
    geometry: &'a LabelGeometry,
    top: f64,
    bottom: f64,
}

impl ArmWalker<'_> {
    fn place(&mut self, genes: &[&GeneMarker], arm: Arm, start: f64, scale: &PositionScale) -> Vec<LabelSlot> {
        let step = self.geometry.step();
        let mut limit = start;
        let mut slots = Vec::with_capacity(genes.len());

        for gene in genes {
            let anchor = scale.to_pixel(gene.start);
            let text = match arm {
                Arm::P if anchor <= limit => anchor,
                Arm::Q if anchor >= limit => anchor,
                _ => limit,
            };
            limit = match arm {
                Arm::P => text - step,
                Arm::Q => text + step,
            };

            let upper = text - self.geometry.label_height - self.geometry.extent_padding;
            let lower = text + self.geometry.label_height + self.geometry.extent_padding;
            if upper < self.top {
                self.top = upper;
            }
            if lower > self.bottom {
                self.bottom = lower;
            }

            slots.push(LabelSlot {
                gene_name: gene.name.clone(),
                anchor_position: anchor,
                text_position: text,
                arm,
            });
        }

        debug!(
            "{}-arm: {} labels, {} displaced",
            arm,
            slots.len(),
            slots.iter().filter(|s| s.is_displaced()).count()
        );
        slots
    }
}

/// Lay out labels for the genes of `chromosome`.
///
/// Genes starting at or before `centromere` belong to the p-arm and are
/// placed from the centromere upward (decreasing start); the rest go on the
/// q-arm, placed downward. `chromosome_height` is the pixel height of the
/// drawn chromosome and seeds the returned `(top, bottom)` extent.
pub fn layout_labels(
    genes: &[GeneMarker],
    chromosome: &str,
    centromere: u64,
    scale: &PositionScale,
    geometry: &LabelGeometry,
    chromosome_height: f64,
) -> LabelLayout {
    let mut p_genes: Vec<&GeneMarker> = genes
        .iter()
        .filter(|g| g.chromosome == chromosome && g.start <= centromere)
        .collect();
    let mut q_genes: Vec<&GeneMarker> = genes
        .iter()
        .filter(|g| g.chromosome == chromosome && g.start > centromere)
        .collect();
    p_genes.sort_by(|a, b| b.start.cmp(&a.start));
    q_genes.sort_by_key(|g| g.start);

    info!(
        "Adding annotation for {} genes on chromosome {}.",
        p_genes.len() + q_genes.len(),
        chromosome
    );

    let origin = scale.to_pixel(centromere);
    let mut walker = ArmWalker {
        geometry,
        top: 0.0,
        bottom: chromosome_height,
    };
    let p_arm = walker.place(&p_genes, Arm::P, origin, scale);
    let q_arm = walker.place(&q_genes, Arm::Q, origin, scale);

    LabelLayout {
        p_arm,
        q_arm,
        top: walker.top,
        bottom: walker.bottom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gene(start: u64, name: &str) -> GeneMarker {
        GeneMarker {
            chromosome: "1".to_string(),
            start,
            end: start + 10,
            name: name.to_string(),
        }
    }

    fn geometry() -> LabelGeometry {
        LabelGeometry::new(10.0, 5.0, 0.0).unwrap()
    }

    // One base pair per pixel.
    fn unit_scale() -> PositionScale {
        PositionScale::new(1, 1, 1).unwrap()
    }

    #[test]
    fn no_genes_keeps_chromosome_extent() {
        let layout = layout_labels(&[], "1", 500, &unit_scale(), &geometry(), 1000.0);
        assert!(layout.is_empty());
        assert_eq!((layout.top, layout.bottom), (0.0, 1000.0));
    }

    #[test]
    fn sparse_genes_stay_in_place() {
        let genes = vec![gene(100, "A"), gene(300, "B"), gene(700, "C"), gene(900, "D")];
        let layout = layout_labels(&genes, "1", 500, &unit_scale(), &geometry(), 1000.0);

        let p: Vec<_> = layout.p_arm.iter().map(|s| (s.gene_name.as_str(), s.text_position)).collect();
        let q: Vec<_> = layout.q_arm.iter().map(|s| (s.gene_name.as_str(), s.text_position)).collect();
        assert_eq!(p, vec![("B", 300.0), ("A", 100.0)]);
        assert_eq!(q, vec![("C", 700.0), ("D", 900.0)]);
        assert!(layout.slots().all(|s| !s.is_displaced()));
    }

    #[test]
    fn crowded_genes_are_pushed_outward() {
        let genes = vec![gene(490, "A"), gene(495, "B"), gene(510, "C"), gene(512, "D")];
        let layout = layout_labels(&genes, "1", 500, &unit_scale(), &geometry(), 1000.0);

        let p: Vec<_> = layout.p_arm.iter().map(|s| s.text_position).collect();
        let q: Vec<_> = layout.q_arm.iter().map(|s| s.text_position).collect();
        // B sits at 495, A is pushed to 495 - 15.
        assert_eq!(p, vec![495.0, 480.0]);
        // C sits at 510, D is pushed to 525.
        assert_eq!(q, vec![510.0, 525.0]);
        assert_eq!(layout.p_arm[1].anchor_position, 490.0);
        assert!(layout.p_arm[1].is_displaced());
    }

    #[test]
    fn labels_beyond_the_chromosome_widen_the_extent() {
        let geometry = LabelGeometry::new(10.0, 5.0, 20.0).unwrap();
        let genes = vec![gene(5, "A"), gene(6, "B"), gene(95, "C"), gene(96, "D")];
        let layout = layout_labels(&genes, "1", 50, &unit_scale(), &geometry, 100.0);
        // p-arm: 6, then pushed to -9; top = -9 - 10 - 20.
        assert_eq!(layout.top, -39.0);
        // q-arm: 95, then pushed to 110; bottom = 110 + 10 + 20.
        assert_eq!(layout.bottom, 140.0);
    }

    #[test]
    fn other_chromosomes_are_ignored() {
        let mut other = gene(100, "X");
        other.chromosome = "2".to_string();
        let layout = layout_labels(&[other], "1", 500, &unit_scale(), &geometry(), 1000.0);
        assert!(layout.is_empty());
    }

    #[test]
    fn scale_converts_positions() {
        // 9 pixels per row of 200 chunks of 50 bp.
        let scale = PositionScale::new(200, 50, 9).unwrap();
        assert_eq!(scale.to_pixel(10_000), 9.0);
        assert!(PositionScale::new(0, 50, 9).unwrap_err().is_config());
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert!(LabelGeometry::new(0.0, 0.0, 0.0).unwrap_err().is_config());
        assert!(LabelGeometry::new(-5.0, 1.0, 0.0).unwrap_err().is_config());
    }

    proptest! {
        #[test]
        fn labels_on_one_arm_never_collide(starts in prop::collection::vec(0u64..10_000, 0..80),
                                           centromere in 0u64..10_000) {
            let genes: Vec<_> = starts.iter().enumerate().map(|(i, &s)| gene(s, &format!("g{}", i))).collect();
            let g = geometry();
            let layout = layout_labels(&genes, "1", centromere, &unit_scale(), &g, 10_000.0);
            prop_assert_eq!(layout.len(), genes.len());
            for arm in [&layout.p_arm, &layout.q_arm] {
                for pair in arm.windows(2) {
                    prop_assert!((pair[0].text_position - pair[1].text_position).abs() >= g.step() - 1e-9);
                }
            }
        }
    }
}
