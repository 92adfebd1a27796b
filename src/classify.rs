//! Interval joins between the chunk grid and feature tables.
//!
//! The gene pass is a two-pointer sweep: chunks and features are both sorted
//! by start, so the feature pointer only ever moves forward and a small active
//! window holds the features that can still intersect the current chunk.

use log::debug;

use crate::error::{PlotError, Result};
use crate::model::{CentromereSpan, ChunkRecord, FeatureClass, FeatureInterval};

/// Chunks must be sorted by start and must not overlap each other.
pub fn check_chunks_sorted(chunks: &[ChunkRecord]) -> Result<()> {
    if let Some(pair) = chunks
        .windows(2)
        .find(|pair| pair[1].start < pair[0].end || pair[1].start < pair[0].start)
    {
        return Err(PlotError::precondition(format!(
            "chunks are not sorted or overlap: {}-{} is followed by {}-{}",
            pair[0].start, pair[0].end, pair[1].start, pair[1].end
        )));
    }
    Ok(())
}

pub fn check_features_sorted(features: &[FeatureInterval]) -> Result<()> {
    if let Some(pair) = features.windows(2).find(|pair| pair[1].start < pair[0].start) {
        return Err(PlotError::precondition(format!(
            "features are not sorted by start: {} comes after {}",
            pair[1].start, pair[0].start
        )));
    }
    Ok(())
}

/// Label every chunk `exon`, `gene` or `intergenic` from the overlapping features.
///
/// A chunk is `exon` if any overlapping feature is an exon, `gene` if any
/// other feature overlaps it and `intergenic` otherwise. Both inputs must be
/// sorted by start; violations are reported as precondition errors.
pub fn classify_genes(
    chunks: &[ChunkRecord],
    features: &[FeatureInterval],
) -> Result<Vec<FeatureClass>> {
    check_chunks_sorted(chunks)?;
    check_features_sorted(features)?;

    let mut classes = Vec::with_capacity(chunks.len());
    let mut active: Vec<&FeatureInterval> = Vec::new();
    let mut next = 0;

    for chunk in chunks {
        while next < features.len() && features[next].start < chunk.end {
            active.push(&features[next]);
            next += 1;
        }
        // Later chunks start even further right, so ended features never come back.
        active.retain(|f| f.end > chunk.start);

        let class = if active.iter().any(|f| f.is_exon()) {
            FeatureClass::Exon
        } else if active.is_empty() {
            FeatureClass::Intergenic
        } else {
            FeatureClass::Gene
        };
        classes.push(class);
    }

    debug!(
        "Gene pass: {} exon, {} gene, {} intergenic chunks",
        tally(&classes, FeatureClass::Exon),
        tally(&classes, FeatureClass::Gene),
        tally(&classes, FeatureClass::Intergenic)
    );

    Ok(classes)
}

/// Overwrite the label of every chunk inside the centromere span.
pub fn mark_centromere(
    chunks: &[ChunkRecord],
    mut classes: Vec<FeatureClass>,
    span: &CentromereSpan,
) -> Vec<FeatureClass> {
    for (chunk, class) in chunks.iter().zip(classes.iter_mut()) {
        if span.contains_chunk(chunk.start, chunk.end) {
            *class = FeatureClass::Centromere;
        }
    }
    debug!(
        "Centromere pass: {} chunks inside {}-{}",
        tally(&classes, FeatureClass::Centromere),
        span.start,
        span.end
    );
    classes
}

/// Overwrite the label of every chunk without a measurable GC ratio.
pub fn mark_heterochromatin(
    chunks: &[ChunkRecord],
    mut classes: Vec<FeatureClass>,
) -> Vec<FeatureClass> {
    for (chunk, class) in chunks.iter().zip(classes.iter_mut()) {
        if chunk.gc_ratio.is_none() {
            *class = FeatureClass::Heterochromatin;
        }
    }
    debug!(
        "Heterochromatin pass: {} chunks",
        tally(&classes, FeatureClass::Heterochromatin)
    );
    classes
}

fn tally(classes: &[FeatureClass], class: FeatureClass) -> usize {
    classes.iter().filter(|&&c| c == class).count()
}
