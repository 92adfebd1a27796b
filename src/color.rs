//! Colour primitives: hex parsing, linear gradients and position-based darkening.

use std::fmt;
use std::str::FromStr;

use crate::error::{PlotError, Result};

/// An opaque 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Sentinel returned when a feature class has no gradient.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Hue, lightness, saturation, each in `[0, 1]`.
    pub fn to_hls(&self) -> (f64, f64, f64) {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let maxc = r.max(g).max(b);
        let minc = r.min(g).min(b);
        let sumc = maxc + minc;
        let rangec = maxc - minc;
        let l = sumc / 2.0;

        if rangec == 0.0 {
            return (0.0, l, 0.0);
        }

        let s = if l <= 0.5 {
            rangec / sumc
        } else {
            rangec / (2.0 - sumc)
        };

        let rc = (maxc - r) / rangec;
        let gc = (maxc - g) / rangec;
        let bc = (maxc - b) / rangec;

        let h = if r == maxc {
            bc - gc
        } else if g == maxc {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };

        ((h / 6.0).rem_euclid(1.0), l, s)
    }

    pub fn from_hls(h: f64, l: f64, s: f64) -> Self {
        if s == 0.0 {
            let v = unit_to_channel(l);
            return Rgb::new(v, v, v);
        }

        let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let m1 = 2.0 * l - m2;

        Rgb::new(
            unit_to_channel(hue_component(m1, m2, h + 1.0 / 3.0)),
            unit_to_channel(hue_component(m1, m2, h)),
            unit_to_channel(hue_component(m1, m2, h - 1.0 / 3.0)),
        )
    }
}

fn hue_component(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn unit_to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

impl FromStr for Rgb {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| {
                PlotError::config(format!(
                    "colour must be given in hexadecimal format (eg. \"#1ED5FA\"), got: {:?}",
                    s
                ))
            })?;

        // All six characters are ASCII hex digits, so slicing and parsing cannot fail.
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        Ok(Rgb::new(channel(0), channel(2), channel(4)))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ordered list of colours interpolated between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gradient(Vec<Rgb>);

impl Gradient {
    /// Linear per-channel interpolation from `start` to `finish` in `steps` colours.
    ///
    /// The first element is always `start`; `steps == 0` gives an empty gradient.
    pub fn linear(start: Rgb, finish: Rgb, steps: usize) -> Self {
        if steps == 0 {
            return Gradient(Vec::new());
        }

        let mut colors = Vec::with_capacity(steps);
        colors.push(start);

        let lerp = |a: u8, b: u8, t: f64| -> u8 {
            (a as f64 + t * (b as f64 - a as f64))
                .round()
                .clamp(0.0, 255.0) as u8
        };

        for step in 1..steps {
            let t = step as f64 / (steps - 1) as f64;
            colors.push(Rgb::new(
                lerp(start.r, finish.r, t),
                lerp(start.g, finish.g, t),
                lerp(start.b, finish.b, t),
            ));
        }

        Gradient(colors)
    }

    /// A gradient with no visual change.
    pub fn monochrome(color: Rgb, steps: usize) -> Self {
        Self::linear(color, color, steps)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.0.get(index).copied()
    }

    pub fn first(&self) -> Option<Rgb> {
        self.0.first().copied()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.0
    }
}

/// String-level gradient builder: hex endpoints in, lower-case hex colours out.
pub fn linear_gradient(start: &str, finish: &str, steps: i64) -> Result<Vec<String>> {
    let start: Rgb = start.parse()?;
    let finish: Rgb = finish.parse()?;
    let steps = usize::try_from(steps).map_err(|_| {
        PlotError::config(format!(
            "the number of gradient steps cannot be negative, got: {}",
            steps
        ))
    })?;

    Ok(Gradient::linear(start, finish, steps)
        .colors()
        .iter()
        .map(Rgb::to_string)
        .collect())
}

/// Lightness reduction towards the right-hand side of a grid row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Darkening {
    threshold: f64,
    max_fraction: f64,
}

impl Darkening {
    /// Both values must lie in the open interval `(0, 1)`.
    pub fn new(threshold: f64, max_fraction: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(PlotError::config(format!(
                "darkening threshold has to be a fraction between 0 and 1, got: {}",
                threshold
            )));
        }
        if !(max_fraction > 0.0 && max_fraction < 1.0) {
            return Err(PlotError::config(format!(
                "maximum darkening has to be a fraction between 0 and 1, got: {}",
                max_fraction
            )));
        }
        Ok(Darkening {
            threshold,
            max_fraction,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_fraction(&self) -> f64 {
        self.max_fraction
    }

    /// Lightness multiplier for `column`: 1 up to the threshold, falling
    /// linearly to `1 - max_fraction` at the last column.
    pub fn scale(&self, column: usize, row_width: usize) -> Result<f64> {
        if row_width == 0 {
            return Err(PlotError::config("row width has to be a positive integer"));
        }

        let frac = column as f64 / row_width as f64;
        if frac <= self.threshold {
            return Ok(1.0);
        }

        let progress = ((frac - self.threshold) / (1.0 - self.threshold)).min(1.0);
        Ok(1.0 - self.max_fraction * progress)
    }

    pub fn apply(&self, color: Rgb, column: usize, row_width: usize) -> Result<Rgb> {
        let scale = self.scale(column, row_width)?;
        if scale == 1.0 {
            return Ok(color);
        }

        let (h, l, s) = color.to_hls();
        Ok(Rgb::from_hls(h, l * scale, s))
    }
}

/// Darken `color` based on how far right `column` sits in a row of `row_width` chunks.
pub fn darken(
    color: &str,
    column: usize,
    row_width: usize,
    threshold: f64,
    max_fraction: f64,
) -> Result<String> {
    let color: Rgb = color.parse()?;
    let darkened = Darkening::new(threshold, max_fraction)?.apply(color, column, row_width)?;
    Ok(darkened.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_and_formats_hex() {
        let c: Rgb = "#1ED5FA".parse().unwrap();
        assert_eq!(c, Rgb::new(0x1e, 0xd5, 0xfa));
        assert_eq!(c.to_string(), "#1ed5fa");
        assert_eq!("#ffffff".parse::<Rgb>().unwrap(), Rgb::WHITE);
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["cica", "#cica", "ffffff", "#209345209", "#12345g", ""] {
            let err = bad.parse::<Rgb>().unwrap_err();
            assert!(err.is_config(), "{} should be a config error", bad);
        }
    }

    #[test]
    fn gradient_endpoints() {
        let g = Gradient::linear(Rgb::BLACK, Rgb::WHITE, 10);
        assert_eq!(g.len(), 10);
        assert_eq!(g.first(), Some(Rgb::BLACK));
        assert_eq!(g.get(9), Some(Rgb::WHITE));
        // 1/9 * 255 = 28.33
        assert_eq!(g.get(1), Some(Rgb::new(28, 28, 28)));
    }

    #[test]
    fn gradient_of_single_step_is_start() {
        let g = Gradient::linear(Rgb::new(1, 2, 3), Rgb::WHITE, 1);
        assert_eq!(g.colors(), &[Rgb::new(1, 2, 3)]);
    }

    #[test]
    fn string_gradient_lowercases_and_validates() {
        let g = linear_gradient("#FFD326", "#FFFFFF", 3).unwrap();
        assert_eq!(g, vec!["#ffd326", "#ffe993", "#ffffff"]);
        assert!(linear_gradient("#000000", "#FFFFFF", 0).unwrap().is_empty());
        assert!(linear_gradient("#000000", "#FFFFFF", -1).unwrap_err().is_config());
        assert!(linear_gradient("#cica", "#FFFFFF", 5).unwrap_err().is_config());
    }

    #[test]
    fn hls_round_trip_of_known_colours() {
        for hex in ["#ffd326", "#6cb8cc", "#a3e0d1", "#9393ff", "#f9d2c2", "#000000", "#808080"] {
            let c: Rgb = hex.parse().unwrap();
            let (h, l, s) = c.to_hls();
            assert_eq!(Rgb::from_hls(h, l, s), c, "round trip of {}", hex);
        }
    }

    #[test]
    fn hls_of_pure_red() {
        let (h, l, s) = Rgb::new(255, 0, 0).to_hls();
        assert_eq!(h, 0.0);
        assert!((l - 0.5).abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn darkening_is_identity_up_to_threshold() {
        assert_eq!(darken("#6CB8CC", 0, 100, 0.75, 0.15).unwrap(), "#6cb8cc");
        assert_eq!(darken("#6CB8CC", 75, 100, 0.75, 0.15).unwrap(), "#6cb8cc");
    }

    #[test]
    fn darkening_past_threshold_reduces_lightness() {
        let base: Rgb = "#6CB8CC".parse().unwrap();
        let dark: Rgb = darken("#6CB8CC", 99, 100, 0.75, 0.15)
            .unwrap()
            .parse()
            .unwrap();
        let (_, l0, _) = base.to_hls();
        let (_, l1, _) = dark.to_hls();
        assert!(l1 < l0);
        // Never more than the maximum fraction (plus 8-bit rounding).
        assert!(l1 >= l0 * (1.0 - 0.15) - 1.0 / 255.0);
    }

    #[test]
    fn darkening_rejects_bad_parameters() {
        assert!(darken("#6CB8CC", 1, 10, 1.0, 0.1).unwrap_err().is_config());
        assert!(darken("#6CB8CC", 1, 10, 0.5, 1.0).unwrap_err().is_config());
        assert!(darken("#6CB8CC", 1, 10, 0.0, 0.1).unwrap_err().is_config());
        assert!(darken("#6CB8CC", 1, 0, 0.5, 0.1).unwrap_err().is_config());
        assert!(darken("6CB8CC", 1, 10, 0.5, 0.1).unwrap_err().is_config());
    }

    proptest! {
        #[test]
        fn gradient_length_and_start(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(),
                                     steps in 2usize..64) {
            let start = Rgb::new(r, g, b);
            let gradient = Gradient::linear(start, Rgb::WHITE, steps);
            prop_assert_eq!(gradient.len(), steps);
            prop_assert_eq!(gradient.first(), Some(start));
            prop_assert_eq!(gradient.get(steps - 1), Some(Rgb::WHITE));
        }

        #[test]
        fn monochrome_gradient_is_constant(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(),
                                           steps in 0usize..64) {
            let c = Rgb::new(r, g, b);
            let gradient = Gradient::monochrome(c, steps);
            prop_assert_eq!(gradient.len(), steps);
            prop_assert!(gradient.colors().iter().all(|&x| x == c));
        }

        #[test]
        fn darkening_is_monotonic(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(),
                                  width in 2usize..400) {
            let darkening = Darkening::new(0.6, 0.3).unwrap();
            let color = Rgb::new(r, g, b);
            let mut previous = color.to_hls().1;
            for column in 0..width {
                let l = darkening.apply(color, column, width).unwrap().to_hls().1;
                // Allow one 8-bit step of rounding noise.
                prop_assert!(l <= previous + 1.0 / 255.0 + 1e-9);
                if (column as f64) / (width as f64) <= 0.6 {
                    prop_assert_eq!(darkening.apply(color, column, width).unwrap(), color);
                }
                previous = previous.min(l);
            }
        }
    }
}
