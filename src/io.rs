//! Tab-separated input tables and the integrated output table.
//!
//! Every reader looks its columns up by header name, so extra columns and
//! column order do not matter. Files ending in `.gz` or `.bgz` are
//! decompressed on the fly.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info, warn};

use crate::error::{PlotError, Result};
use crate::gwas::GwasHit;
use crate::labels::GeneMarker;
use crate::model::{ChunkRecord, FeatureInterval};
use crate::pipeline::AnnotatedChromosome;

pub const TABLE_HEADER: [&str; 8] = [
    "chr", "start", "end", "GC_ratio", "column", "row", "feature", "color",
];

fn is_gzipped(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("gz") | Some("bgz")
    )
}

/// Reader for either a gzip'd or a plain file.
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped(path) {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };
    Ok(BufReader::new(file))
}

/// Column names of a table, with any leading `#` removed.
pub struct Header {
    file: String,
    names: Vec<String>,
}

impl Header {
    fn new(file: &str, line: &str) -> Self {
        Header {
            file: file.to_string(),
            names: line
                .split('\t')
                .map(|name| name.trim().trim_start_matches('#').to_string())
                .collect(),
        }
    }

    /// Index of the first of `candidates` present in the header.
    pub fn optional(&self, candidates: &[&str]) -> Option<usize> {
        candidates
            .iter()
            .find_map(|c| self.names.iter().position(|name| name == c))
    }

    pub fn required(&self, candidates: &[&str]) -> Result<usize> {
        self.optional(candidates).ok_or_else(|| {
            PlotError::parse(
                &self.file,
                1,
                format!("missing column {}", candidates.join(" or ")),
            )
        })
    }
}

/// One data line, split on tabs.
pub struct Row<'a> {
    file: &'a str,
    line: usize,
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn get(&self, index: usize) -> Result<&'a str> {
        self.fields.get(index).copied().ok_or_else(|| {
            PlotError::parse(
                self.file,
                self.line,
                format!("expected at least {} fields, found {}", index + 1, self.fields.len()),
            )
        })
    }

    pub fn get_optional(&self, index: Option<usize>) -> Option<&'a str> {
        index
            .and_then(|i| self.fields.get(i).copied())
            .filter(|value| !value.is_empty())
    }

    pub fn position(&self, index: usize) -> Result<u64> {
        let value = self.get(index)?;
        value.trim().parse().map_err(|_| {
            PlotError::parse(self.file, self.line, format!("invalid position: {:?}", value))
        })
    }

    /// A GC ratio cell; blanks and `NA`/`nan` mean undefined.
    pub fn ratio(&self, index: usize) -> Result<Option<f64>> {
        let value = self.get(index)?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("na") || value.eq_ignore_ascii_case("nan") {
            return Ok(None);
        }
        value.parse().map(Some).map_err(|_| {
            PlotError::parse(self.file, self.line, format!("invalid GC ratio: {:?}", value))
        })
    }
}

/// Read a headed table, resolving columns once and parsing every data line.
pub fn read_table<C, T>(
    path: &Path,
    resolve: impl FnOnce(&Header) -> Result<C>,
    mut parse: impl FnMut(&Row<'_>, &C) -> Result<T>,
) -> Result<Vec<T>> {
    let file = path.display().to_string();
    let reader = get_dynamic_reader(path)?;
    let mut lines = reader.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break Header::new(&file, &line);
                }
            }
            None => {
                warn!("{} is empty", file);
                return Ok(Vec::new());
            }
        }
    };
    let columns = resolve(&header)?;

    let mut records = Vec::new();
    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = Row {
            file: &file,
            line: index + 1,
            fields: line.split('\t').collect(),
        };
        records.push(parse(&row, &columns)?);
    }

    debug!("Read {} records from {}", records.len(), file);
    Ok(records)
}

/// `chr, start, end, GC_ratio` chunk table of one or more chromosomes.
pub fn read_chunks(path: &Path) -> Result<Vec<ChunkRecord>> {
    let chunks = read_table(
        path,
        |h| {
            Ok((
                h.required(&["chr", "chrom"])?,
                h.required(&["start"])?,
                h.required(&["end"])?,
                h.required(&["GC_ratio", "gc_ratio"])?,
            ))
        },
        |row, &(chr, start, end, gc)| {
            Ok(ChunkRecord::new(
                row.get(chr)?,
                row.position(start)?,
                row.position(end)?,
                row.ratio(gc)?,
            ))
        },
    )?;
    info!("Number of chunks read from {}: {}", path.display(), chunks.len());
    Ok(chunks)
}

/// Gene and exon features: `chr, start, end, type` and an optional name.
pub fn read_features(path: &Path) -> Result<Vec<FeatureInterval>> {
    read_intervals(path, &["type", "feature"], &["gene_name", "name"])
}

/// Cytogenetic bands: `chr, start, end, name, type`; centromeres are `acen`.
pub fn read_cytobands(path: &Path) -> Result<Vec<FeatureInterval>> {
    read_intervals(path, &["type", "stain", "gieStain"], &["name"])
}

fn read_intervals(path: &Path, kind: &[&str], name: &[&str]) -> Result<Vec<FeatureInterval>> {
    read_table(
        path,
        |h| {
            Ok((
                h.required(&["chr", "chrom"])?,
                h.required(&["start"])?,
                h.required(&["end"])?,
                h.required(kind)?,
                h.optional(name),
            ))
        },
        |row, &(chr, start, end, kind, name)| {
            let mut feature =
                FeatureInterval::new(row.get(chr)?, row.position(start)?, row.position(end)?, row.get(kind)?);
            feature.name = row.get_optional(name).map(str::to_string);
            Ok(feature)
        },
    )
}

/// Genes to label: `chr, start, end, name`.
pub fn read_genes(path: &Path) -> Result<Vec<GeneMarker>> {
    read_table(
        path,
        |h| {
            Ok((
                h.required(&["chr", "chrom"])?,
                h.required(&["start"])?,
                h.required(&["end"])?,
                h.required(&["name", "gene_name"])?,
            ))
        },
        |row, &(chr, start, end, name)| {
            Ok(GeneMarker {
                chromosome: row.get(chr)?.to_string(),
                start: row.position(start)?,
                end: row.position(end)?,
                name: row.get(name)?.to_string(),
            })
        },
    )
}

/// GWAS catalogue extract: `#chr, start, rsID` and an optional `trait`.
pub fn read_gwas(path: &Path) -> Result<Vec<GwasHit>> {
    read_table(
        path,
        |h| {
            Ok((
                h.required(&["chr"])?,
                h.required(&["start"])?,
                h.required(&["rsID", "rsid"])?,
                h.optional(&["trait"]),
            ))
        },
        |row, &(chr, start, rsid, trait_name)| {
            Ok(GwasHit {
                chromosome: row.get(chr)?.to_string(),
                position: row.position(start)?,
                rsid: row.get(rsid)?.to_string(),
                trait_name: row.get_optional(trait_name).map(str::to_string),
            })
        },
    )
}

/// Write the integrated chunk table.
pub fn write_table<W: Write>(annotated: &AnnotatedChromosome, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", TABLE_HEADER.join("\t"))?;
    for chunk in &annotated.chunks {
        let gc = match chunk.gc_ratio {
            Some(gc) => gc.to_string(),
            None => "NA".to_string(),
        };
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            chunk.chromosome,
            chunk.start,
            chunk.end,
            gc,
            chunk.column,
            chunk.row,
            chunk.feature_class,
            chunk.color
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Save the integrated table, gzip'd when `path` ends in `.gz`.
pub fn write_annotated(annotated: &AnnotatedChromosome, path: &Path) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    if is_gzipped(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_table(annotated, &mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        write_table(annotated, file)?;
    }
    info!("Integrated table saved to: {}", path.display());
    Ok(())
}
