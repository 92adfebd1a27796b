//! Plot configuration, loaded from a TOML file with CLI overrides on top.
//!
//! Everything is validated up front, before a single chunk is processed.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::color::{Darkening, Rgb};
use crate::coords::checked_width;
use crate::error::{PlotError, Result};
use crate::ideogram::CytobandPalette;
use crate::labels::LabelGeometry;
use crate::model::FeatureClass;
use crate::palette::ColorPicker;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default)]
    pub plot: PlotParameters,
    #[serde(default)]
    pub colors: ColorConfig,
    #[serde(default)]
    pub labels: LabelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotParameters {
    /// Number of chunks in one row; the whole chromosome is one row when `None`
    #[serde(default = "default_width")]
    pub width: Option<i64>,

    /// Edge of one plotted chunk in pixels
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,

    /// Size of one chunk in base pairs
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Fraction of the row width from where colours start getting darker
    #[serde(default = "default_dark_start")]
    pub dark_start: f64,

    /// How much lightness is lost at the right end of a row
    #[serde(default = "default_dark_max")]
    pub dark_max: f64,

    /// Number of colours in each GC gradient
    #[serde(default = "default_step_count")]
    pub step_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    #[serde(default = "default_exon")]
    pub exon: String,
    #[serde(default = "default_gene")]
    pub gene: String,
    #[serde(default = "default_intergenic")]
    pub intergenic: String,
    #[serde(default = "default_centromere")]
    pub centromere: String,
    #[serde(default = "default_heterochromatin")]
    pub heterochromatin: String,
    #[serde(default = "default_dummy")]
    pub dummy: String,

    /// Colour every gradient fades into at GC ratio 1
    #[serde(default = "default_gradient_finish")]
    pub gradient_finish: String,

    /// Fill of the GWAS markers
    #[serde(default = "default_gwas_point")]
    pub gwas_point: String,

    /// Ideogram fill per band stain, plus the `border` of every band
    #[serde(default = "default_cytoband")]
    pub cytoband: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Height of one gene label; ten chunk pixels when absent
    #[serde(default)]
    pub label_height: Option<f64>,

    /// Gap kept between consecutive labels on one arm
    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Room added around labels that spill over the chromosome
    #[serde(default = "default_extent_padding")]
    pub extent_padding: f64,
}

fn default_width() -> Option<i64> { Some(200) }
fn default_pixel_size() -> u32 { 9 }
fn default_chunk_size() -> u64 { 50 }
fn default_dark_start() -> f64 { 0.75 }
fn default_dark_max() -> f64 { 0.15 }
fn default_step_count() -> i64 { 30 }
fn default_exon() -> String { "#FFD326".to_string() }
fn default_gene() -> String { "#6CB8CC".to_string() }
fn default_intergenic() -> String { "#A3E0D1".to_string() }
fn default_centromere() -> String { "#9393FF".to_string() }
fn default_heterochromatin() -> String { "#F9D2C2".to_string() }
fn default_dummy() -> String { "#D3D3D3".to_string() }
fn default_gradient_finish() -> String { "#FFFFFF".to_string() }
fn default_gwas_point() -> String { "#000000".to_string() }
fn default_cytoband() -> BTreeMap<String, String> {
    [
        ("gneg", "#FFFFFF"),
        ("gpos25", "#E5E5E5"),
        ("gpos50", "#CCCCCC"),
        ("gpos75", "#B3B3B3"),
        ("gpos100", "#999999"),
        ("acen", "#CCCCCC"),
        ("gvar", "#999999"),
        ("stalk", "#E5E5E5"),
        ("border", "#999999"),
    ]
    .into_iter()
    .map(|(stain, color)| (stain.to_string(), color.to_string()))
    .collect()
}
fn default_margin() -> f64 { 10.0 }
fn default_extent_padding() -> f64 { 50.0 }

impl Default for PlotParameters {
    fn default() -> Self {
        PlotParameters {
            width: default_width(),
            pixel_size: default_pixel_size(),
            chunk_size: default_chunk_size(),
            dark_start: default_dark_start(),
            dark_max: default_dark_max(),
            step_count: default_step_count(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        ColorConfig {
            exon: default_exon(),
            gene: default_gene(),
            intergenic: default_intergenic(),
            centromere: default_centromere(),
            heterochromatin: default_heterochromatin(),
            dummy: default_dummy(),
            gradient_finish: default_gradient_finish(),
            gwas_point: default_gwas_point(),
            cytoband: default_cytoband(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            label_height: None,
            margin: default_margin(),
            extent_padding: default_extent_padding(),
        }
    }
}

impl ColorConfig {
    pub fn base_color(&self, class: FeatureClass) -> &str {
        match class {
            FeatureClass::Exon => &self.exon,
            FeatureClass::Gene => &self.gene,
            FeatureClass::Intergenic => &self.intergenic,
            FeatureClass::Centromere => &self.centromere,
            FeatureClass::Heterochromatin => &self.heterochromatin,
            FeatureClass::Dummy => &self.dummy,
        }
    }

    fn validate(&self) -> Result<()> {
        for class in FeatureClass::ALL {
            self.base_color(class).parse::<Rgb>().map_err(|e| {
                PlotError::config(format!("invalid colour for {}: {}", class, e))
            })?;
        }
        self.gradient_finish.parse::<Rgb>()?;
        self.gwas_point.parse::<Rgb>()?;
        CytobandPalette::new(&self.cytoband)?;
        Ok(())
    }
}

impl PlotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: PlotConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Reject every parameter the pipeline could not work with.
    pub fn validate(&self) -> Result<()> {
        self.row_width()?;
        self.step_count()?;
        self.darkening()?;
        self.colors.validate()?;

        if self.plot.pixel_size == 0 {
            return Err(PlotError::config("pixel size has to be a positive integer"));
        }
        if self.plot.chunk_size == 0 {
            return Err(PlotError::config("chunk size has to be a positive integer"));
        }
        self.label_geometry()?;
        Ok(())
    }

    pub fn row_width(&self) -> Result<Option<NonZeroUsize>> {
        self.plot.width.map(checked_width).transpose()
    }

    pub fn step_count(&self) -> Result<usize> {
        usize::try_from(self.plot.step_count)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                PlotError::config(format!(
                    "the number of gradient steps has to be a positive integer, got: {}",
                    self.plot.step_count
                ))
            })
    }

    pub fn darkening(&self) -> Result<Darkening> {
        Darkening::new(self.plot.dark_start, self.plot.dark_max)
    }

    pub fn color_picker(&self) -> Result<ColorPicker> {
        ColorPicker::new(&self.colors, self.step_count()?, self.darkening()?)
    }

    pub fn gwas_color(&self) -> Result<Rgb> {
        self.colors.gwas_point.parse()
    }

    pub fn cytoband_palette(&self) -> Result<CytobandPalette> {
        CytobandPalette::new(&self.colors.cytoband)
    }

    pub fn label_height(&self) -> f64 {
        self.labels
            .label_height
            .unwrap_or(self.plot.pixel_size as f64 * 10.0)
    }

    pub fn label_geometry(&self) -> Result<LabelGeometry> {
        LabelGeometry::new(
            self.label_height(),
            self.labels.margin,
            self.labels.extent_padding,
        )
    }
}
