//! Chromosome chunk annotation and pixel-plot encoding.
//!
//! A chromosome is cut into fixed-size chunks carrying a GC ratio. The
//! pipeline places every chunk on a grid, classifies it against gene, exon,
//! centromere and sequencing-gap annotations, and colours it from a per-class
//! gradient that darkens towards the right edge of each row. Gene labels are
//! laid out separately along the two chromosome arms, and cytogenetic bands
//! are drawn as a ruler beside the grid.

pub mod classify;
pub mod color;
pub mod config;
pub mod coords;
pub mod error;
pub mod font;
pub mod gwas;
pub mod ideogram;
pub mod io;
pub mod labels;
pub mod model;
pub mod palette;
pub mod pipeline;
pub mod render;

pub use color::{darken, linear_gradient, Darkening, Gradient, Rgb};
pub use config::PlotConfig;
pub use error::{PlotError, Result};
pub use ideogram::{CytobandPalette, Ideogram};
pub use labels::{layout_labels, GeneMarker, LabelGeometry, LabelLayout, PositionScale};
pub use model::{Chunk, ChunkRecord, FeatureClass, FeatureInterval};
pub use palette::ColorPicker;
pub use pipeline::{annotate_chromosome, AnnotatedChromosome, AnnotationMode};
