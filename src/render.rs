//! Raster and vector output of an annotated chromosome.

use std::path::Path;

use image::{Rgb as Pixel, RgbImage};
use log::info;

use crate::color::Rgb;
use crate::error::{PlotError, Result};
use crate::font;
use crate::gwas::GwasMarker;
use crate::ideogram::{BandShape, Ideogram};
use crate::labels::LabelLayout;
use crate::pipeline::AnnotatedChromosome;

/// Horizontal run of the leader line between a gene and its label.
const LEADER_LENGTH: f64 = 60.0;

/// Space between the band names, the band ruler and the chromosome.
const BAND_GAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub pixel_size: u32,
    pub gwas_color: Rgb,
    pub label_height: f64,
}

impl Style {
    fn font_size(&self) -> f64 {
        (self.label_height * 0.8).max(8.0)
    }

    /// Width of the cytoband ruler.
    fn band_width(&self) -> f64 {
        self.pixel_size as f64 * 5.0
    }
}

/// Everything drawn on top of, or next to, the chunk grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlays<'a> {
    pub markers: &'a [GwasMarker],
    pub labels: Option<&'a LabelLayout>,
    pub ideogram: Option<&'a Ideogram>,
}

/// Placement of the chromosome and its surroundings on the canvas.
///
/// From left to right: band names, band ruler, chunk grid, gene labels.
/// `shift` moves everything down so labels above the chromosome stay visible.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Canvas {
    band_x: f64,
    left: f64,
    shift: f64,
    chrom_width: f64,
    width: f64,
    height: f64,
}

impl Canvas {
    fn new(annotated: &AnnotatedChromosome, overlays: &Overlays, style: &Style, char_width: f64) -> Result<Self> {
        let (chrom_width, chrom_height) = annotated.dimensions(style.pixel_size)?;
        let chrom_width = chrom_width as f64;
        let chrom_height = chrom_height as f64;

        let (band_x, left, band_bottom) = match overlays.ideogram {
            Some(ideogram) => {
                let names = ideogram.longest_name() as f64 * char_width;
                let band_x = (names + BAND_GAP).ceil();
                (band_x, band_x + style.band_width() + BAND_GAP, ideogram.bottom())
            }
            None => (0.0, 0.0, 0.0),
        };

        let (top, label_bottom, text_width) = match overlays.labels {
            Some(layout) if !layout.is_empty() => {
                let longest = layout.slots().map(|s| s.gene_name.chars().count()).max().unwrap_or(0);
                (
                    layout.top.min(0.0),
                    layout.bottom,
                    LEADER_LENGTH + 5.0 + longest as f64 * char_width + 10.0,
                )
            }
            _ => (0.0, 0.0, 0.0),
        };

        let shift = (-top).ceil();
        let bottom = chrom_height.max(label_bottom).max(band_bottom);
        Ok(Canvas {
            band_x,
            left,
            shift,
            chrom_width,
            width: left + chrom_width + text_width,
            height: shift + bottom,
        })
    }

    fn image_size(&self) -> Result<(u32, u32)> {
        let side = |v: f64| {
            let v = v.ceil();
            if v <= u32::MAX as f64 {
                Ok(v as u32)
            } else {
                Err(PlotError::config(format!("a canvas side of {} pixels is too large", v)))
            }
        };
        Ok((side(self.width)?, side(self.height)?))
    }
}

fn pixel(color: Rgb) -> Pixel<u8> {
    Pixel(color.channels())
}

fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Pixel<u8>) {
    let (width, height) = img.dimensions();
    for y in y0.max(0)..y1.min(height as i64) {
        for x in x0.max(0)..x1.min(width as i64) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Paint the chunk grid, then the ideogram, GWAS markers and gene labels.
pub fn render_png(annotated: &AnnotatedChromosome, overlays: &Overlays, style: &Style) -> Result<RgbImage> {
    let cell = font::cell_size(style.font_size());
    let char_width = (font::ADVANCE * cell) as f64;
    let canvas = Canvas::new(annotated, overlays, style, char_width)?;
    let (width, height) = canvas.image_size()?;
    let mut img = RgbImage::from_pixel(width, height, pixel(Rgb::WHITE));

    let size = style.pixel_size as i64;
    let left = canvas.left as i64;
    let shift = canvas.shift as i64;

    for chunk in &annotated.chunks {
        let x0 = left + chunk.column as i64 * size;
        let y0 = shift + chunk.row as i64 * size;
        fill_rect(&mut img, x0, y0, x0 + size, y0 + size, pixel(chunk.color));
    }

    if let Some(ideogram) = overlays.ideogram {
        draw_ideogram_png(&mut img, ideogram, &canvas, style, cell);
    }

    let fill = pixel(style.gwas_color);
    for marker in overlays.markers {
        let (cx, cy) = marker_center(marker, style.pixel_size);
        let (cx, cy) = (cx + canvas.left, cy + canvas.shift);
        let r = marker.radius();
        let x_range = ((cx - r).floor().max(0.0) as u32)..((cx + r).ceil().min(width as f64) as u32);
        for y in ((cy - r).floor().max(0.0) as u32)..((cy + r).ceil().min(height as f64) as u32) {
            for x in x_range.clone() {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x, y, fill);
                }
            }
        }
    }

    if let Some(layout) = overlays.labels {
        let black = pixel(Rgb::BLACK);
        let chrom_right = (canvas.left + canvas.chrom_width) as i64;
        let elbow = chrom_right + (LEADER_LENGTH / 2.0) as i64;
        let text_x = chrom_right + LEADER_LENGTH as i64;
        let text_height = (font::HEIGHT * cell) as i64;
        for slot in layout.slots() {
            let anchor = shift + slot.anchor_position.round() as i64;
            let text = shift + slot.text_position.round() as i64;
            // Leader: out from the chromosome, over to the label row, on to the text.
            fill_rect(&mut img, chrom_right, anchor, elbow + 1, anchor + 1, black);
            fill_rect(&mut img, elbow, anchor.min(text), elbow + 1, anchor.max(text) + 1, black);
            fill_rect(&mut img, elbow, text, text_x, text + 1, black);
            font::draw_text(&mut img, text_x + 5, text - text_height / 2, &slot.gene_name, cell, black);
        }
    }

    Ok(img)
}

fn draw_ideogram_png(img: &mut RgbImage, ideogram: &Ideogram, canvas: &Canvas, style: &Style, cell: u32) {
    let border = pixel(ideogram.border);
    let x0 = canvas.band_x as i64;
    let band_width = style.band_width();
    let x1 = x0 + band_width as i64;
    let center = canvas.band_x + band_width / 2.0;
    let text_height = (font::HEIGHT * cell) as i64;

    for segment in &ideogram.segments {
        let top = (canvas.shift + segment.top).round() as i64;
        let bottom = ((canvas.shift + segment.bottom).round() as i64).max(top + 1);
        let fill = pixel(segment.color);
        for y in top..bottom {
            let half = band_width / 2.0 * segment.fill_fraction(y as f64 + 0.5 - canvas.shift);
            let from = (center - half).round() as i64;
            let to = (center + half).round() as i64;
            if to <= from {
                continue;
            }
            fill_rect(img, from, y, to, y + 1, fill);
            fill_rect(img, from, y, from + 1, y + 1, border);
            fill_rect(img, to - 1, y, to, y + 1, border);
        }
        match segment.shape {
            BandShape::Block => {
                fill_rect(img, x0, top, x1, top + 1, border);
                fill_rect(img, x0, bottom - 1, x1, bottom, border);
            }
            BandShape::NarrowingDown => fill_rect(img, x0, top, x1, top + 1, border),
            BandShape::NarrowingUp => fill_rect(img, x0, bottom - 1, x1, bottom, border),
        }

        if let Some(name) = &segment.name {
            let text_x = x0 - (BAND_GAP / 2.0) as i64 - font::text_width(name, cell) as i64;
            let text_y = (top + bottom) / 2 - text_height / 2;
            font::draw_text(img, text_x, text_y, name, cell, border);
        }
    }
}

fn marker_center(marker: &GwasMarker, size: u32) -> (f64, f64) {
    let half = size as f64 / 2.0;
    (
        marker.position.column as f64 * size as f64 + half,
        marker.position.row as f64 * size as f64 + half,
    )
}

/// Escape special XML characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Render the chromosome as SVG, with the band ruler on the left and gene
/// labels on the right when given.
///
/// Label extents may be negative; the drawing is shifted down so they stay
/// on the canvas.
pub fn render_svg(annotated: &AnnotatedChromosome, overlays: &Overlays, style: &Style) -> Result<String> {
    let size = style.pixel_size as f64;
    let font_size = style.font_size();
    let canvas = Canvas::new(annotated, overlays, style, font_size * 0.6)?;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
  .gene-name {{ font-family: 'DejaVu Sans', Arial, sans-serif; font-size: {}px; }}
</style>
<rect width="100%" height="100%" fill="white"/>
<g transform="translate(0,{})">
"#,
        canvas.width, canvas.height, canvas.width, canvas.height, font_size, canvas.shift
    ));

    if let Some(ideogram) = overlays.ideogram {
        write_ideogram_svg(&mut svg, ideogram, &canvas, style, font_size);
    }

    // Chunks of one row are sorted by column, so equal neighbours merge into one rect.
    for row in annotated.chunks.chunk_by(|a, b| a.row == b.row) {
        for run in row.chunk_by(|a, b| a.column + 1 == b.column && a.color == b.color) {
            let first = &run[0];
            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                canvas.left + first.column as f64 * size,
                first.row as f64 * size,
                run.len() as f64 * size,
                size,
                first.color
            ));
            svg.push('\n');
        }
    }

    for marker in overlays.markers {
        let (cx, cy) = marker_center(marker, style.pixel_size);
        svg.push_str(&format!(
            r#"<circle cx="{}" cy="{}" r="{:.2}" fill="{}"/>"#,
            canvas.left + cx,
            cy,
            marker.radius(),
            style.gwas_color
        ));
        svg.push('\n');
    }

    if let Some(layout) = overlays.labels {
        let chrom_right = canvas.left + canvas.chrom_width;
        let elbow_start = chrom_right + LEADER_LENGTH / 3.0;
        let elbow_end = chrom_right + 2.0 * LEADER_LENGTH / 3.0;
        let text_x = chrom_right + LEADER_LENGTH;
        for slot in layout.slots() {
            svg.push_str(&format!(
                r#"<polyline points="{},{} {},{} {},{} {},{}" fill="none" stroke="black" stroke-width="1"/>"#,
                chrom_right,
                slot.anchor_position,
                elbow_start,
                slot.anchor_position,
                elbow_end,
                slot.text_position,
                text_x,
                slot.text_position
            ));
            svg.push('\n');
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" class="gene-name" fill="black">{}</text>"#,
                text_x + 5.0,
                slot.text_position + font_size / 3.0,
                escape_xml(&slot.gene_name)
            ));
            svg.push('\n');
        }
    }

    svg.push_str("</g>\n</svg>\n");
    Ok(svg)
}

fn write_ideogram_svg(svg: &mut String, ideogram: &Ideogram, canvas: &Canvas, style: &Style, font_size: f64) {
    let x1 = canvas.band_x;
    let band_width = style.band_width();
    let x2 = x1 + band_width;
    let mid = x1 + band_width / 2.0;

    for segment in &ideogram.segments {
        let (top, bottom) = (segment.top, segment.bottom);
        match segment.shape {
            BandShape::Block => svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
                x1,
                top,
                band_width,
                bottom - top,
                segment.color,
                ideogram.border
            )),
            BandShape::NarrowingDown => svg.push_str(&format!(
                r#"<polygon points="{},{} {},{} {},{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
                x1, top, x2, top, mid, bottom, segment.color, ideogram.border
            )),
            BandShape::NarrowingUp => svg.push_str(&format!(
                r#"<polygon points="{},{} {},{} {},{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
                x1, bottom, x2, bottom, mid, top, segment.color, ideogram.border
            )),
        }
        svg.push('\n');

        if let Some(name) = &segment.name {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="end" class="gene-name" fill="{}">{}</text>"#,
                x1 - BAND_GAP / 2.0,
                (top + bottom) / 2.0 + font_size / 3.0,
                ideogram.border,
                escape_xml(name)
            ));
            svg.push('\n');
        }
    }
}

/// Write `svg` or a PNG, picked by the extension of `path`.
pub fn save(annotated: &AnnotatedChromosome, overlays: &Overlays, style: &Style, path: &Path) -> Result<()> {
    let is_svg = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        info!("Rendering SVG to {}", path.display());
        std::fs::write(path, render_svg(annotated, overlays, style)?)?;
    } else {
        info!("Rendering image to {}", path.display());
        render_png(annotated, overlays, style)?.save(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorConfig;
    use crate::coords::GridPosition;
    use crate::ideogram::CytobandPalette;
    use crate::labels::PositionScale;
    use crate::model::{Arm, Chunk, FeatureClass, FeatureInterval, LabelSlot};
    use std::num::NonZeroUsize;

    fn chromosome(colors: &[&str], width: usize) -> AnnotatedChromosome {
        let chunks: Vec<Chunk> = colors
            .iter()
            .enumerate()
            .map(|(i, c)| Chunk {
                chromosome: "1".to_string(),
                start: i as u64 * 10,
                end: (i as u64 + 1) * 10,
                gc_ratio: Some(0.5),
                column: i % width,
                row: i / width,
                feature_class: FeatureClass::Intergenic,
                color: c.parse().unwrap(),
            })
            .collect();
        AnnotatedChromosome {
            chromosome: "1".to_string(),
            width: NonZeroUsize::new(width).unwrap(),
            rows: colors.len().div_ceil(width),
            centromere: None,
            chunks,
        }
    }

    fn style() -> Style {
        Style {
            pixel_size: 4,
            gwas_color: Rgb::BLACK,
            label_height: 10.0,
        }
    }

    fn shifted_layout() -> LabelLayout {
        LabelLayout {
            p_arm: vec![LabelSlot {
                gene_name: "A&B".to_string(),
                anchor_position: 1.0,
                text_position: -20.0,
                arm: Arm::P,
            }],
            q_arm: vec![],
            top: -35.0,
            bottom: 4.0,
        }
    }

    fn ideogram() -> Ideogram {
        // Ten 10 bp chunks in rows of five, 4 pixels each: 12.5 bp per pixel.
        let bands = vec![
            FeatureInterval::new("1", 0, 50, "gneg").with_name("p12"),
            FeatureInterval::new("1", 50, 60, "acen").with_name("p11"),
            FeatureInterval::new("1", 60, 70, "acen").with_name("q11"),
            FeatureInterval::new("1", 70, 100, "gpos100").with_name("q12"),
        ];
        let scale = PositionScale::new(5, 10, 4).unwrap();
        let palette = CytobandPalette::new(&ColorConfig::default().cytoband).unwrap();
        Ideogram::build(&bands, "1", &scale, &palette).unwrap()
    }

    #[test]
    fn png_blocks_follow_the_grid() {
        let annotated = chromosome(&["#ff0000", "#00ff00", "#0000ff"], 2);
        let img = render_png(&annotated, &Overlays::default(), &style()).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(4, 0).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(1, 6).0, [0, 0, 255]);
        // The missing last chunk stays blank.
        assert_eq!(img.get_pixel(6, 6).0, [255, 255, 255]);
    }

    #[test]
    fn png_marker_is_drawn_at_chunk_center() {
        let annotated = chromosome(&["#ffffff"; 100], 10);
        let marker = GwasMarker {
            chunk_index: 55,
            position: GridPosition { column: 5, row: 5 },
            count: 1,
        };
        let overlays = Overlays {
            markers: &[marker],
            ..Overlays::default()
        };
        let img = render_png(&annotated, &overlays, &style()).unwrap();
        assert_eq!(img.get_pixel(22, 22).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn png_labels_extend_the_canvas() {
        let annotated = chromosome(&["#aaaaaa"; 4], 4);
        let plain = render_png(&annotated, &Overlays::default(), &style()).unwrap();
        assert_eq!(plain.dimensions(), (16, 4));

        let layout = shifted_layout();
        let overlays = Overlays {
            labels: Some(&layout),
            ..Overlays::default()
        };
        let img = render_png(&annotated, &overlays, &style()).unwrap();
        // 35 pixels above the chromosome; leader, gap and three 6 pixel glyphs to the right.
        assert_eq!(img.dimensions(), (16 + 60 + 5 + 18 + 10, 39));
        assert!(img.height() > plain.height());
        assert_eq!(img.get_pixel(0, 35).0, [0xaa, 0xaa, 0xaa]);

        // Leader starts at the gene's own row and ends at the label row.
        assert_eq!(img.get_pixel(16, 36).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(46, 25).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(70, 15).0, [0, 0, 0]);
        // Top of the 'A' glyph of the label text.
        assert_eq!(img.get_pixel(82, 11).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(81, 11).0, [255, 255, 255]);
    }

    #[test]
    fn png_ideogram_sits_left_of_the_chromosome() {
        let annotated = chromosome(&["#aaaaaa"; 10], 5);
        let ideogram = ideogram();
        let overlays = Overlays {
            ideogram: Some(&ideogram),
            ..Overlays::default()
        };
        let img = render_png(&annotated, &overlays, &style()).unwrap();
        // Names of three 6 pixel glyphs plus a gap, a 20 pixel ruler, another gap.
        assert_eq!(img.dimensions(), (28 + 20 + 10 + 20, 8));
        assert_eq!(img.get_pixel(58, 0).0, [0xaa, 0xaa, 0xaa]);
        assert_eq!(img.get_pixel(38, 7).0, [0x99, 0x99, 0x99]);
        let border = [0x99, 0x99, 0x99];
        assert!((0..28).any(|x| (0..8).any(|y| img.get_pixel(x, y).0 == border)));
    }

    #[test]
    fn svg_merges_equal_neighbours() {
        let annotated = chromosome(&["#aaaaaa", "#aaaaaa", "#bbbbbb", "#bbbbbb", "#bbbbbb", "#aaaaaa"], 3);
        let svg = render_svg(&annotated, &Overlays::default(), &style()).unwrap();
        // Row 0: aa-aa | bb; row 1: bb-bb | aa.
        assert_eq!(svg.matches("<rect x=").count(), 4);
        assert!(svg.contains(r##"<rect x="0" y="0" width="8" height="4" fill="#aaaaaa"/>"##));
        assert!(svg.contains(r##"<rect x="0" y="4" width="8" height="4" fill="#bbbbbb"/>"##));
    }

    #[test]
    fn svg_labels_shift_the_canvas() {
        let annotated = chromosome(&["#aaaaaa"; 4], 4);
        let layout = shifted_layout();
        let overlays = Overlays {
            labels: Some(&layout),
            ..Overlays::default()
        };
        let svg = render_svg(&annotated, &overlays, &style()).unwrap();
        assert!(svg.contains(r#"<g transform="translate(0,35)">"#));
        assert!(svg.contains("A&amp;B"));
        assert!(svg.contains(r#"height="39""#));
    }

    #[test]
    fn svg_ideogram_draws_bands_and_centromere_triangles() {
        let annotated = chromosome(&["#aaaaaa"; 10], 5);
        let ideogram = ideogram();
        let overlays = Overlays {
            ideogram: Some(&ideogram),
            ..Overlays::default()
        };
        let svg = render_svg(&annotated, &overlays, &style()).unwrap();
        assert_eq!(svg.matches("<polygon").count(), 2);
        // p11 narrows downwards onto the centromere, q11 upwards.
        assert!(svg.contains(r##"<polygon points="25,4 45,4 35,4.8" fill="#cccccc" stroke="#999999""##));
        assert!(svg.contains(r##"<polygon points="25,5.6 45,5.6 35,4.8" fill="#cccccc" stroke="#999999""##));
        assert!(svg.contains(r#"<rect x="25" y="5.6" width="20" height=""#));
        assert!(svg.contains(r##"fill="#999999" stroke="#999999""##));
        assert!(svg.contains(r#"text-anchor="end""#));
        assert!(svg.contains(">q12</text>"));
        // The chunk grid moves right of the ruler.
        assert!(svg.contains(r##"<rect x="55" y="0" width="20" height="4" fill="#aaaaaa"/>"##));
    }

    #[test]
    fn oversized_canvas_is_a_config_error() {
        let annotated = chromosome(&["#aaaaaa"; 4], 4);
        let huge = Style {
            pixel_size: u32::MAX,
            ..style()
        };
        assert!(render_png(&annotated, &Overlays::default(), &huge).unwrap_err().is_config());
        assert!(render_svg(&annotated, &Overlays::default(), &huge).unwrap_err().is_config());
    }

    #[test]
    fn output_format_follows_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let annotated = chromosome(&["#aaaaaa"; 4], 2);
        let png = dir.path().join("chr1.png");
        let svg = dir.path().join("chr1.svg");
        save(&annotated, &Overlays::default(), &style(), &png).unwrap();
        save(&annotated, &Overlays::default(), &style(), &svg).unwrap();
        assert_eq!(image::open(&png).unwrap().to_rgb8().dimensions(), (8, 8));
        assert!(std::fs::read_to_string(&svg).unwrap().starts_with("<?xml"));
    }
}
