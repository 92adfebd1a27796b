//! Records flowing through the annotation pipeline.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::PlotError;

/// Final per-chunk label driving colour selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureClass {
    Exon,
    Gene,
    Intergenic,
    Centromere,
    Heterochromatin,
    Dummy,
}

impl FeatureClass {
    pub const ALL: [FeatureClass; 6] = [
        FeatureClass::Exon,
        FeatureClass::Gene,
        FeatureClass::Intergenic,
        FeatureClass::Centromere,
        FeatureClass::Heterochromatin,
        FeatureClass::Dummy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureClass::Exon => "exon",
            FeatureClass::Gene => "gene",
            FeatureClass::Intergenic => "intergenic",
            FeatureClass::Centromere => "centromere",
            FeatureClass::Heterochromatin => "heterochromatin",
            FeatureClass::Dummy => "dummy",
        }
    }
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureClass {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureClass::ALL
            .iter()
            .copied()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| PlotError::config(format!("unknown feature class: {:?}", s)))
    }
}

/// One row of the externally supplied chunk table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    /// `None` when the chunk is dominated by unsequenced bases.
    pub gc_ratio: Option<f64>,
}

impl ChunkRecord {
    pub fn new(chromosome: impl Into<String>, start: u64, end: u64, gc_ratio: Option<f64>) -> Self {
        ChunkRecord {
            chromosome: chromosome.into(),
            start,
            end,
            gc_ratio: gc_ratio.filter(|gc| !gc.is_nan()),
        }
    }
}

/// A fully annotated chunk, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub gc_ratio: Option<f64>,
    pub column: usize,
    pub row: usize,
    pub feature_class: FeatureClass,
    pub color: Rgb,
}

/// A gene/exon feature or a cytogenetic band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInterval {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub kind: String,
    pub name: Option<String>,
}

impl FeatureInterval {
    pub fn new(chromosome: impl Into<String>, start: u64, end: u64, kind: impl Into<String>) -> Self {
        FeatureInterval {
            chromosome: chromosome.into(),
            start,
            end,
            kind: kind.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_exon(&self) -> bool {
        self.kind == "exon"
    }

    pub fn is_acen(&self) -> bool {
        self.kind == "acen"
    }

    /// Arm named by a band such as `p11.1` or `1q21`: the first letter of the name.
    pub fn arm(&self) -> Option<Arm> {
        match self.name.as_deref()?.chars().find(|c| c.is_ascii_alphabetic())? {
            'p' | 'P' => Some(Arm::P),
            'q' | 'Q' => Some(Arm::Q),
            _ => None,
        }
    }

    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && self.end > start
    }
}

/// Genomic interval covered by a chromosome's `acen` bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentromereSpan {
    pub start: u64,
    pub end: u64,
}

impl CentromereSpan {
    /// `min(start)`..`max(end)` over the `acen` bands of `chromosome`, if any.
    ///
    /// Anything other than one p-arm and one q-arm band is still accepted but
    /// logged, since the span then may not be the real centromere.
    pub fn from_bands(bands: &[FeatureInterval], chromosome: &str) -> Option<Self> {
        if let Some(problem) = Self::irregular_bands(bands, chromosome) {
            warn!("Chromosome {}: {}", chromosome, problem);
        }
        bands
            .iter()
            .filter(|band| band.chromosome == chromosome && band.is_acen())
            .fold(None, |span: Option<CentromereSpan>, band| {
                Some(match span {
                    None => CentromereSpan {
                        start: band.start,
                        end: band.end,
                    },
                    Some(s) => CentromereSpan {
                        start: s.start.min(band.start),
                        end: s.end.max(band.end),
                    },
                })
            })
    }

    /// Describe what is off with the `acen` bands of `chromosome`, if anything.
    ///
    /// A regular centromere is exactly two bands, one named on each arm.
    /// Chromosomes without any `acen` band are not reported here.
    pub fn irregular_bands(bands: &[FeatureInterval], chromosome: &str) -> Option<String> {
        let acen: Vec<&FeatureInterval> = bands
            .iter()
            .filter(|band| band.chromosome == chromosome && band.is_acen())
            .collect();
        match acen.as_slice() {
            [] => None,
            [a, b] => {
                let mut arms = [a.arm(), b.arm()];
                arms.sort_by_key(|arm| arm.map(|a| a == Arm::Q));
                if arms == [Some(Arm::P), Some(Arm::Q)] {
                    None
                } else {
                    Some(format!(
                        "acen bands {:?} and {:?} do not name one p-arm and one q-arm band",
                        a.name.as_deref().unwrap_or(""),
                        b.name.as_deref().unwrap_or("")
                    ))
                }
            }
            other => Some(format!("expected 2 acen bands, found {}", other.len())),
        }
    }

    pub fn contains_chunk(&self, start: u64, end: u64) -> bool {
        end > self.start && start < self.end
    }
}

/// Chromosome arm used for gene-label placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arm {
    P,
    Q,
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::P => f.write_str("p"),
            Arm::Q => f.write_str("q"),
        }
    }
}

/// A placed gene label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSlot {
    pub gene_name: String,
    /// True genomic position converted to pixels.
    pub anchor_position: f64,
    /// Possibly displaced vertical slot of the text.
    pub text_position: f64,
    pub arm: Arm,
}

impl LabelSlot {
    pub fn is_displaced(&self) -> bool {
        self.anchor_position != self.text_position
    }
}
