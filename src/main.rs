use anyhow::{Context, Result};
use chromoplot::gwas::{bin_hits, GwasHit};
use chromoplot::io::{read_chunks, read_cytobands, read_features, read_genes, read_gwas, write_annotated};
use chromoplot::labels::{layout_labels, GeneMarker, LabelLayout, PositionScale};
use chromoplot::ideogram::Ideogram;
use chromoplot::render::{self, Overlays, Style};
use chromoplot::{annotate_chromosome, AnnotationMode, ChunkRecord, ColorPicker, FeatureInterval, PlotConfig};
use clap::Parser;
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "chromoplot")]
#[command(about = "Plot chromosomes as grids of GC-coloured chunks.", long_about = None)]
struct Args {
    // MANDATORY OPTIONS
    /// Load chunk tables (chr, start, end, GC_ratio) from these FILEs.
    #[arg(short = 'c', long = "chunks", value_name = "FILE", num_args = 1.., required = true)]
    chunks: Vec<PathBuf>,

    /// Write images and tables into this DIR.
    #[arg(short = 'o', long = "out-dir", value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    // Annotation Sources
    /// Read plot parameters and colours from this TOML FILE.
    #[arg(short = 'C', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gene and exon features (chr, start, end, type).
    #[arg(short = 'f', long = "features", value_name = "FILE")]
    features: Option<PathBuf>,

    /// Cytogenetic bands; acen bands mark the centromere.
    #[arg(short = 'b', long = "cytobands", value_name = "FILE")]
    cytobands: Option<PathBuf>,

    /// Genes to label next to the chromosome (chr, start, end, name).
    #[arg(short = 'g', long = "genes", value_name = "FILE")]
    genes: Option<PathBuf>,

    /// GWAS hits (#chr, start, end, rsID, trait) drawn as dots.
    #[arg(short = 'G', long = "gwas", value_name = "FILE")]
    gwas: Option<PathBuf>,

    // Output Options
    /// Draw a placeholder plot showing only the centromere.
    #[arg(short = 'd', long = "dummy")]
    dummy: bool,

    /// Also write an SVG of the same plot.
    #[arg(short = 's', long = "svg")]
    svg: bool,

    /// Also write the integrated chunk table (gzip'd TSV).
    #[arg(short = 't', long = "table")]
    table: bool,

    // Overrides
    /// Number of chunks in one row [default: 200].
    #[arg(short = 'w', long = "width", value_name = "N")]
    width: Option<i64>,

    /// Edge of one chunk in pixels.
    #[arg(short = 'p', long = "pixel", value_name = "N")]
    pixel: Option<u32>,

    /// Fraction of a row after which colours get darker.
    #[arg(long = "dark-start", value_name = "FLOAT")]
    dark_start: Option<f64>,

    /// Lightness lost at the end of a row.
    #[arg(long = "dark-max", value_name = "FLOAT")]
    dark_max: Option<f64>,

    /// Save the effective configuration to this FILE.
    #[arg(long = "save-config", value_name = "FILE")]
    save_config: Option<PathBuf>,

    // Runtime
    /// Number of threads; all cores when not set.
    #[arg(short = 'T', long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 0)]
    verbose: u8,
}

/// Inputs shared by every chromosome.
struct Annotations {
    features: Vec<FeatureInterval>,
    /// Chromosomes with at least one feature.
    feature_chromosomes: FxHashSet<String>,
    cytobands: Vec<FeatureInterval>,
    genes: Vec<GeneMarker>,
    gwas: Vec<GwasHit>,
}

fn load_optional<T>(path: &Option<PathBuf>, what: &str, read: fn(&Path) -> chromoplot::Result<Vec<T>>) -> Result<Vec<T>> {
    match path {
        Some(path) => {
            let records = read(path).with_context(|| format!("Failed to read {} from {:?}", what, path))?;
            info!("Loaded {} {} from {:?}", records.len(), what, path);
            Ok(records)
        }
        None => Ok(Vec::new()),
    }
}

fn load_config(args: &Args) -> Result<PlotConfig> {
    let mut config = match &args.config {
        Some(path) => PlotConfig::load(path).with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => PlotConfig::default(),
    };

    if args.width.is_some() {
        config.plot.width = args.width;
    }
    if let Some(pixel) = args.pixel {
        config.plot.pixel_size = pixel;
    }
    if let Some(dark_start) = args.dark_start {
        config.plot.dark_start = dark_start;
    }
    if let Some(dark_max) = args.dark_max {
        config.plot.dark_max = dark_max;
    }
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.save_config {
        config.save(path).with_context(|| format!("Failed to save configuration to {:?}", path))?;
    }
    Ok(config)
}

/// Split a chunk table into chromosomes, in order of first appearance.
fn split_by_chromosome(records: Vec<ChunkRecord>) -> Vec<(String, Vec<ChunkRecord>)> {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut groups: Vec<(String, Vec<ChunkRecord>)> = Vec::new();
    for record in records {
        let slot = *index.entry(record.chromosome.clone()).or_insert_with(|| {
            groups.push((record.chromosome.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }
    groups
}

fn process_chromosome(
    name: &str,
    chunks: &[ChunkRecord],
    annotations: &Annotations,
    config: &PlotConfig,
    picker: &ColorPicker,
    jobs_share_names: bool,
    args: &Args,
) -> Result<String> {
    let mode = if args.dummy { AnnotationMode::Dummy } else { AnnotationMode::Full };
    // Once the tables agree on chromosome names, a chromosome without
    // features is plotted as intergenic instead of failing the whole run.
    let features: &[FeatureInterval] =
        if mode == AnnotationMode::Full && jobs_share_names && !annotations.feature_chromosomes.contains(name) {
            warn!("No gene features on chromosome {}", name);
            &[]
        } else {
            &annotations.features
        };
    let annotated = annotate_chromosome(
        chunks,
        features,
        &annotations.cytobands,
        config.row_width()?,
        picker,
        mode,
    )
    .with_context(|| format!("Failed to annotate chromosome {}", name))?;

    let pixel_size = config.plot.pixel_size;
    let markers = bin_hits(&annotations.gwas, name, config.plot.chunk_size, annotated.width);

    let scale = PositionScale::new(annotated.width.get(), config.plot.chunk_size, pixel_size)?;
    let ideogram = Ideogram::build(&annotations.cytobands, name, &scale, &config.cytoband_palette()?);

    let labels: Option<LabelLayout> = if annotations.genes.is_empty() {
        None
    } else {
        let centromere = match annotated.centromere {
            Some(span) => span.end,
            None => {
                warn!("Chromosome {} has no centromere; all genes are labelled on the q-arm", name);
                0
            }
        };
        let (_, height) = annotated.dimensions(pixel_size)?;
        Some(layout_labels(
            &annotations.genes,
            name,
            centromere,
            &scale,
            &config.label_geometry()?,
            height as f64,
        ))
    };

    let style = Style {
        pixel_size,
        gwas_color: config.gwas_color()?,
        label_height: config.label_height(),
    };
    let overlays = Overlays {
        markers: &markers,
        labels: labels.as_ref(),
        ideogram: ideogram.as_ref(),
    };
    let suffix = if args.dummy { "_dummy" } else { "" };

    let png = args.out_dir.join(format!("chr{}{}.png", name, suffix));
    render::save(&annotated, &overlays, &style, &png)
        .with_context(|| format!("Failed to save {:?}", png))?;

    if args.svg {
        let svg = args.out_dir.join(format!("chr{}{}.svg", name, suffix));
        render::save(&annotated, &overlays, &style, &svg)
            .with_context(|| format!("Failed to save {:?}", svg))?;
    }

    if args.table {
        let table = args.out_dir.join(format!("integrated_chr{}.tsv.gz", name));
        write_annotated(&annotated, &table).with_context(|| format!("Failed to save {:?}", table))?;
    }

    annotated.digest().map_err(Into::into)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let picker = config.color_picker()?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the thread pool")?;
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", args.out_dir))?;

    let features = load_optional(&args.features, "features", read_features)?;
    let annotations = Annotations {
        feature_chromosomes: features.iter().map(|f| f.chromosome.clone()).collect(),
        features,
        cytobands: load_optional(&args.cytobands, "cytobands", read_cytobands)?,
        genes: load_optional(&args.genes, "genes", read_genes)?,
        gwas: load_optional(&args.gwas, "GWAS hits", read_gwas)?,
    };
    if !args.dummy && annotations.features.is_empty() {
        warn!("No gene features given; every chunk with a GC ratio is intergenic");
    }

    let mut jobs = Vec::new();
    for path in &args.chunks {
        let records = read_chunks(path).with_context(|| format!("Failed to read chunks from {:?}", path))?;
        jobs.extend(split_by_chromosome(records));
    }
    info!("Processing {} chromosomes...", jobs.len());
    let shared = jobs.iter().any(|(name, _)| annotations.feature_chromosomes.contains(name));

    let results: Vec<Result<String>> = jobs
        .par_iter()
        .map(|(name, chunks)| process_chromosome(name, chunks, &annotations, &config, &picker, shared, args))
        .collect();

    for ((name, _), result) in jobs.iter().zip(results) {
        let digest = result?;
        debug!("Chromosome {} table digest: {}", name, digest);
        info!("Chromosome {} done", name);
    }

    info!("Done.");
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
