//! Per-chromosome annotation: grid coordinates, feature classes, colours.

use std::num::NonZeroUsize;

use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::classify::{check_chunks_sorted, classify_genes, mark_centromere, mark_heterochromatin};
use crate::coords::{effective_width, grid_positions, row_count};
use crate::error::{PlotError, Result};
use crate::io::write_table;
use crate::model::{CentromereSpan, Chunk, ChunkRecord, FeatureClass, FeatureInterval};
use crate::palette::ColorPicker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationMode {
    /// Genes, exons, centromere and heterochromatin.
    #[default]
    Full,
    /// Placeholder plot of the same shape: only the centromere is shown.
    Dummy,
}

/// The annotated chunk table of one chromosome.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedChromosome {
    pub chromosome: String,
    pub width: NonZeroUsize,
    pub rows: usize,
    pub centromere: Option<CentromereSpan>,
    pub chunks: Vec<Chunk>,
}

impl AnnotatedChromosome {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Image size in pixels for square chunks of `pixel_size`.
    ///
    /// Fails when either side does not fit in a `u32`.
    pub fn dimensions(&self, pixel_size: u32) -> Result<(u32, u32)> {
        let side = |cells: usize, what: &str| {
            u32::try_from(cells)
                .ok()
                .and_then(|c| c.checked_mul(pixel_size))
                .ok_or_else(|| {
                    PlotError::config(format!(
                        "{} {} of {} pixel chunks do not fit in an image",
                        cells, what, pixel_size
                    ))
                })
        };
        Ok((side(self.width.get(), "columns")?, side(self.rows, "rows")?))
    }

    pub fn classes(&self) -> impl Iterator<Item = FeatureClass> + '_ {
        self.chunks.iter().map(|c| c.feature_class)
    }

    /// SHA-256 of the tab-separated table, as lower-case hex.
    pub fn digest(&self) -> Result<String> {
        let mut table = Vec::new();
        write_table(self, &mut table)?;
        let hash = Sha256::digest(&table);
        Ok(hash.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

/// Up to five distinct chromosome names of `features`, in order of appearance.
fn distinct_chromosomes(features: &[FeatureInterval]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for f in features {
        if !names.contains(&f.chromosome.as_str()) {
            if names.len() == 5 {
                names.push("...");
                break;
            }
            names.push(&f.chromosome);
        }
    }
    names.join(", ")
}

/// Annotate and colour the chunks of a single chromosome.
///
/// `chunks` must all belong to one chromosome and be sorted by start.
/// `features` and `cytobands` may hold other chromosomes; only matching rows
/// are used. In full mode a non-empty feature list with no row on this
/// chromosome is a precondition error, since it almost always means the two
/// tables name chromosomes differently (`chr1` against `1`). Stages run in a fixed order: coordinates, genes, centromere,
/// heterochromatin, colour. Heterochromatin runs last so it wins over the
/// centromere.
pub fn annotate_chromosome(
    chunks: &[ChunkRecord],
    features: &[FeatureInterval],
    cytobands: &[FeatureInterval],
    width: Option<NonZeroUsize>,
    picker: &ColorPicker,
    mode: AnnotationMode,
) -> Result<AnnotatedChromosome> {
    let chromosome = match chunks.first() {
        Some(first) => first.chromosome.clone(),
        None => return Err(PlotError::precondition("the chunk table is empty")),
    };
    if let Some(other) = chunks.iter().find(|c| c.chromosome != chromosome) {
        return Err(PlotError::precondition(format!(
            "chunks of chromosome {} and {} cannot be annotated together",
            chromosome, other.chromosome
        )));
    }
    check_chunks_sorted(chunks)?;

    let width = effective_width(width, chunks.len());
    let rows = row_count(chunks.len(), width);
    info!(
        "Chromosome {}: {} chunks in {} rows of {}",
        chromosome,
        chunks.len(),
        rows,
        width
    );

    let centromere = CentromereSpan::from_bands(cytobands, &chromosome);

    let classes = match mode {
        AnnotationMode::Full => {
            let mut own: Vec<FeatureInterval> = features
                .iter()
                .filter(|f| f.chromosome == chromosome)
                .cloned()
                .collect();
            if own.is_empty() && !features.is_empty() {
                let spellings = distinct_chromosomes(features);
                return Err(PlotError::precondition(format!(
                    "none of the features are on chromosome {} (features name {}); \
                     check that both tables spell chromosomes the same way",
                    chromosome, spellings
                )));
            }
            own.sort_by_key(|f| f.start);
            info!("Number of features on chromosome {}: {}", chromosome, own.len());
            classify_genes(chunks, &own)?
        }
        AnnotationMode::Dummy => vec![FeatureClass::Dummy; chunks.len()],
    };

    let classes = match &centromere {
        Some(span) => mark_centromere(chunks, classes, span),
        None => {
            warn!(
                "No centromere bands for chromosome {}; skipping the centromere pass",
                chromosome
            );
            classes
        }
    };

    let classes = match mode {
        AnnotationMode::Full => mark_heterochromatin(chunks, classes),
        AnnotationMode::Dummy => classes,
    };

    let annotated = chunks
        .iter()
        .zip(classes)
        .zip(grid_positions(chunks.len(), width))
        .map(|((record, class), position)| {
            let color = picker.pick_color(class, record.gc_ratio, position.column, width.get())?;
            Ok(Chunk {
                chromosome: record.chromosome.clone(),
                start: record.start,
                end: record.end,
                gc_ratio: record.gc_ratio,
                column: position.column,
                row: position.row,
                feature_class: class,
                color,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Chromosome {} annotated", chromosome);

    Ok(AnnotatedChromosome {
        chromosome,
        width,
        rows,
        centromere,
        chunks: annotated,
    })
}
