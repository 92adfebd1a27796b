//! Cytogenetic band ruler drawn next to the chromosome.
//!
//! Bands are stacked vertically on the same position scale as the gene
//! labels. Regular bands are boxes filled by stain; the two `acen` bands are
//! triangles pointing at each other, meeting at the centromere.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::color::Rgb;
use crate::error::{PlotError, Result};
use crate::labels::PositionScale;
use crate::model::{Arm, FeatureInterval};

/// Stain used for bands whose own stain has no colour.
const FALLBACK_STAIN: &str = "gneg";

/// Band fill colours keyed by stain (`gneg`, `gpos50`, `acen`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct CytobandPalette {
    stains: BTreeMap<String, Rgb>,
    border: Rgb,
}

impl CytobandPalette {
    /// Parse a stain to colour map; the `border` entry is required and is
    /// not a stain.
    pub fn new(colors: &BTreeMap<String, String>) -> Result<Self> {
        let mut stains = BTreeMap::new();
        let mut border = None;
        for (stain, value) in colors {
            let color: Rgb = value.parse().map_err(|e| {
                PlotError::config(format!("invalid cytoband colour for {}: {}", stain, e))
            })?;
            if stain == "border" {
                border = Some(color);
            } else {
                stains.insert(stain.clone(), color);
            }
        }
        let border = border.ok_or_else(|| PlotError::config("cytoband colours need a `border` entry"))?;
        Ok(CytobandPalette { stains, border })
    }

    pub fn color(&self, stain: &str) -> Option<Rgb> {
        self.stains.get(stain).copied()
    }

    pub fn border(&self) -> Rgb {
        self.border
    }

    fn fallback(&self) -> Rgb {
        self.color(FALLBACK_STAIN).unwrap_or(Rgb::WHITE)
    }
}

/// Outline of one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandShape {
    Block,
    /// p-arm side of the centromere: wide on top, apex at the bottom.
    NarrowingDown,
    /// q-arm side of the centromere: apex on top, wide at the bottom.
    NarrowingUp,
}

/// A band placed on the vertical pixel axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSegment {
    pub top: f64,
    pub bottom: f64,
    pub shape: BandShape,
    pub color: Rgb,
    pub name: Option<String>,
}

impl BandSegment {
    /// Filled fraction of the band width at vertical position `y`.
    pub fn fill_fraction(&self, y: f64) -> f64 {
        let height = self.bottom - self.top;
        if !(height > 0.0) || y < self.top || y > self.bottom {
            return 0.0;
        }
        match self.shape {
            BandShape::Block => 1.0,
            BandShape::NarrowingDown => (self.bottom - y) / height,
            BandShape::NarrowingUp => (y - self.top) / height,
        }
    }
}

/// The bands of one chromosome, ordered by start.
#[derive(Debug, Clone, PartialEq)]
pub struct Ideogram {
    pub segments: Vec<BandSegment>,
    pub border: Rgb,
}

impl Ideogram {
    /// Place the bands of `chromosome`; `None` when it has no bands.
    pub fn build(
        bands: &[FeatureInterval],
        chromosome: &str,
        scale: &PositionScale,
        palette: &CytobandPalette,
    ) -> Option<Ideogram> {
        let mut own: Vec<&FeatureInterval> = bands.iter().filter(|b| b.chromosome == chromosome).collect();
        if own.is_empty() {
            return None;
        }
        own.sort_by_key(|b| b.start);

        let mut unknown = BTreeSet::new();
        let segments = own
            .into_iter()
            .map(|band| {
                let color = palette.color(&band.kind).unwrap_or_else(|| {
                    unknown.insert(band.kind.as_str());
                    palette.fallback()
                });
                let shape = if band.is_acen() {
                    match band.arm() {
                        Some(Arm::P) => BandShape::NarrowingDown,
                        Some(Arm::Q) => BandShape::NarrowingUp,
                        None => {
                            warn!(
                                "Chromosome {}: acen band {:?} names no arm; drawn as a box",
                                chromosome,
                                band.name.as_deref().unwrap_or("")
                            );
                            BandShape::Block
                        }
                    }
                } else {
                    BandShape::Block
                };
                BandSegment {
                    top: scale.to_pixel(band.start),
                    bottom: scale.to_pixel(band.end),
                    shape,
                    color,
                    name: band.name.clone(),
                }
            })
            .collect::<Vec<_>>();

        for stain in unknown {
            warn!(
                "Chromosome {}: no colour for band stain {:?}; using the {} colour",
                chromosome, stain, FALLBACK_STAIN
            );
        }
        debug!("Chromosome {}: {} cytobands in the ideogram", chromosome, segments.len());

        Some(Ideogram {
            segments,
            border: palette.border(),
        })
    }

    /// Lowest pixel reached by any band.
    pub fn bottom(&self) -> f64 {
        self.segments.iter().map(|s| s.bottom).fold(0.0, f64::max)
    }

    /// Length of the longest band name, in characters.
    pub fn longest_name(&self) -> usize {
        self.segments
            .iter()
            .filter_map(|s| s.name.as_ref())
            .map(|n| n.chars().count())
            .max()
            .unwrap_or(0)
    }
}
