//! Per-class gradients and the GC-ratio driven colour picker.

use std::collections::BTreeMap;

use log::warn;

use crate::color::{Darkening, Gradient, Rgb};
use crate::config::ColorConfig;
use crate::error::{PlotError, Result};
use crate::model::FeatureClass;

/// Picks the colour of a chunk from its class, GC ratio and column.
#[derive(Debug, Clone)]
pub struct ColorPicker {
    gradients: BTreeMap<FeatureClass, Gradient>,
    darkening: Darkening,
}

impl ColorPicker {
    /// One gradient of `step_count` colours per class, from its base colour to
    /// the configured finish colour.
    pub fn new(colors: &ColorConfig, step_count: usize, darkening: Darkening) -> Result<Self> {
        if step_count == 0 {
            return Err(PlotError::config(
                "the number of gradient steps has to be a positive integer",
            ));
        }

        let finish: Rgb = colors.gradient_finish.parse()?;
        let mut gradients = BTreeMap::new();
        for class in FeatureClass::ALL {
            let base: Rgb = colors.base_color(class).parse()?;
            gradients.insert(class, Gradient::linear(base, finish, step_count));
        }

        Ok(ColorPicker {
            gradients,
            darkening,
        })
    }

    /// Build from an explicit, possibly partial, class to gradient map.
    pub fn from_gradients(gradients: BTreeMap<FeatureClass, Gradient>, darkening: Darkening) -> Self {
        ColorPicker {
            gradients,
            darkening,
        }
    }

    pub fn darkening(&self) -> &Darkening {
        &self.darkening
    }

    pub fn gradient(&self, class: FeatureClass) -> Option<&Gradient> {
        self.gradients.get(&class)
    }

    /// Base colour before any darkening.
    pub fn map_color(&self, class: FeatureClass, gc_ratio: Option<f64>) -> Rgb {
        match (class, gc_ratio) {
            (FeatureClass::Dummy, _) => self.first_of(FeatureClass::Dummy),
            (_, None) => self.first_of(FeatureClass::Heterochromatin),
            (_, Some(gc)) => match self.gradients.get(&class) {
                Some(gradient) if !gradient.is_empty() => {
                    let top = gradient.len() - 1;
                    let index = (gc * top as f64).floor().clamp(0.0, top as f64) as usize;
                    gradient.get(index).unwrap_or(Rgb::BLACK)
                }
                _ => {
                    warn!("Feature {} was not found in color mapper. Returning black.", class);
                    Rgb::BLACK
                }
            },
        }
    }

    /// Final colour of a chunk sitting in `column` of a `row_width` wide row.
    pub fn pick_color(
        &self,
        class: FeatureClass,
        gc_ratio: Option<f64>,
        column: usize,
        row_width: usize,
    ) -> Result<Rgb> {
        let color = self.map_color(class, gc_ratio);
        if class == FeatureClass::Dummy {
            return Ok(color);
        }
        self.darkening.apply(color, column, row_width)
    }

    fn first_of(&self, class: FeatureClass) -> Rgb {
        match self.gradients.get(&class).and_then(Gradient::first) {
            Some(color) => color,
            None => {
                warn!("Feature {} was not found in color mapper. Returning black.", class);
                Rgb::BLACK
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker() -> ColorPicker {
        ColorPicker::new(
            &ColorConfig::default(),
            20,
            Darkening::new(0.75, 0.15).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn undefined_gc_is_heterochromatin_base() {
        let p = picker();
        let hetero = p.gradient(FeatureClass::Heterochromatin).unwrap().first().unwrap();
        for class in [
            FeatureClass::Exon,
            FeatureClass::Gene,
            FeatureClass::Intergenic,
            FeatureClass::Centromere,
            FeatureClass::Heterochromatin,
        ] {
            assert_eq!(p.pick_color(class, None, 0, 100).unwrap(), hetero);
        }
    }

    #[test]
    fn dummy_is_constant_and_never_darkened() {
        let p = picker();
        let dummy = p.gradient(FeatureClass::Dummy).unwrap().first().unwrap();
        assert_eq!(p.pick_color(FeatureClass::Dummy, Some(0.9), 99, 100).unwrap(), dummy);
        assert_eq!(p.pick_color(FeatureClass::Dummy, None, 99, 100).unwrap(), dummy);
    }

    #[test]
    fn gc_ratio_is_quantized_and_clamped() {
        let p = picker();
        let exon = p.gradient(FeatureClass::Exon).unwrap().clone();
        assert_eq!(p.map_color(FeatureClass::Exon, Some(0.0)), exon.get(0).unwrap());
        // floor(0.5 * 19) = 9
        assert_eq!(p.map_color(FeatureClass::Exon, Some(0.5)), exon.get(9).unwrap());
        assert_eq!(p.map_color(FeatureClass::Exon, Some(1.0)), exon.get(19).unwrap());
        assert_eq!(p.map_color(FeatureClass::Exon, Some(1.7)), exon.get(19).unwrap());
        assert_eq!(p.map_color(FeatureClass::Exon, Some(-0.2)), exon.get(0).unwrap());
    }

    #[test]
    fn missing_gradient_falls_back_to_black() {
        let mut gradients = BTreeMap::new();
        gradients.insert(
            FeatureClass::Heterochromatin,
            Gradient::monochrome("#F9D2C2".parse().unwrap(), 5),
        );
        let p = ColorPicker::from_gradients(gradients, Darkening::new(0.5, 0.1).unwrap());
        assert_eq!(p.pick_color(FeatureClass::Gene, Some(0.3), 0, 10).unwrap(), Rgb::BLACK);
        assert_eq!(p.map_color(FeatureClass::Dummy, Some(0.3)), Rgb::BLACK);
    }

    #[test]
    fn right_edge_is_darker() {
        let p = picker();
        let left = p.pick_color(FeatureClass::Intergenic, Some(0.4), 0, 100).unwrap();
        let right = p.pick_color(FeatureClass::Intergenic, Some(0.4), 99, 100).unwrap();
        assert!(right.to_hls().1 < left.to_hls().1);
    }

    #[test]
    fn zero_steps_is_a_config_error() {
        let err = ColorPicker::new(
            &ColorConfig::default(),
            0,
            Darkening::new(0.75, 0.15).unwrap(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }
}
