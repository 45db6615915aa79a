//! Comparison bar chart: one bar per feature at the export year.

use anyhow::{Result, anyhow};
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::types::ChartImage;
use super::util::{AXIS_GREY, hatch_lines, px, series_color};
use super::{Chart, Margin, Scene, encode, text_style, vertical_text_style};
use crate::format::format_number;
use crate::models::Feature;
use crate::scale::{BandScale, LinearScale};

/// Smallest y-axis maximum, so an all-zero chart still has a usable axis.
pub const MIN_Y_MAX: f64 = 1.0 / 1.1;
/// Values below this are drawn at a token height instead of (almost) nothing.
pub const VISIBILITY_FLOOR: f64 = 0.1;
/// Token bar height as a fraction of the y-axis maximum.
pub const FLOOR_FRACTION: f64 = 0.005;

const MARGIN: Margin = Margin {
    top: 20,
    right: 20,
    bottom: 80,
    left: 120,
};
const Y_TICKS: usize = 5;
const HATCH_SPACING: i32 = 6;

/// Y-axis maximum for a set of values; unavailable values are ignored.
pub fn bar_domain_max(values: &[Option<f64>]) -> f64 {
    values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .fold(MIN_Y_MAX, f64::max)
}

/// Value a bar is drawn at. Small and unavailable values get the token height.
pub fn bar_display_value(value: Option<f64>, y_max: f64) -> f64 {
    match value {
        Some(v) if v >= VISIBILITY_FLOOR => v,
        _ => y_max * FLOOR_FRACTION,
    }
}

/// One bar in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub color: RGBColor,
    pub value: Option<f64>,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub bottom: f64,
    /// Confidence band as `(top, bottom)` pixel rows.
    pub ci: Option<(f64, f64)>,
}

impl Bar {
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Fully computed bar chart geometry.
#[derive(Debug, Clone)]
pub struct BarLayout {
    pub width: u32,
    pub height: u32,
    pub y: LinearScale,
    pub x: BandScale,
    pub bars: Vec<Bar>,
    pub ticks: Vec<f64>,
    pub axis_label: String,
    lang: String,
}

impl BarLayout {
    pub fn new(chart: &Chart, features: &[Feature]) -> Self {
        let plot_w = chart.width as f64 - (MARGIN.left + MARGIN.right) as f64;
        let plot_h = chart.height as f64 - (MARGIN.top + MARGIN.bottom) as f64;
        let left = MARGIN.left as f64;
        let top = MARGIN.top as f64;

        let values: Vec<Option<f64>> = features
            .iter()
            .map(|f| f.value(&chart.bubble_stat, chart.year))
            .collect();
        let (lo_stat, hi_stat) = chart.ci_stats();
        let bounds: Vec<Option<(f64, f64)>> = features
            .iter()
            .map(|f| {
                if !chart.display_ci {
                    return None;
                }
                match (f.value(&lo_stat, chart.year), f.value(&hi_stat, chart.year)) {
                    (Some(lo), Some(hi)) => Some((lo.min(hi), lo.max(hi))),
                    _ => None,
                }
            })
            .collect();
        let highs: Vec<Option<f64>> = bounds.iter().map(|b| b.map(|(_, hi)| hi)).collect();
        let y_max = bar_domain_max(&values).max(bar_domain_max(&highs));
        let y = LinearScale::rounded((0.0, y_max), (top + plot_h, top));
        let x = BandScale::new(
            features.iter().map(|f| f.name.clone()).collect(),
            (left, left + plot_w),
            0.3,
            true,
        );

        let bars = features
            .iter()
            .zip(values.iter().zip(&bounds))
            .enumerate()
            .map(|(i, (f, (value, bound)))| {
                let shown = bar_display_value(*value, y_max);
                let ci = bound.map(|(lo, hi)| (y.map(hi), y.map(lo)));
                Bar {
                    label: f.name.clone(),
                    color: series_color(f, i),
                    value: *value,
                    left: x.position_at(i),
                    width: x.bandwidth(),
                    top: y.map(shown),
                    bottom: y.map(0.0),
                    ci,
                }
            })
            .collect();

        Self {
            width: chart.width,
            height: chart.height,
            ticks: y.ticks(Y_TICKS),
            y,
            x,
            bars,
            axis_label: chart.axis_label.clone(),
            lang: chart.lang.clone(),
        }
    }
}

impl Scene for BarLayout {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        let right = self.width as i32 - MARGIN.right;
        let plot_mid = (MARGIN.top + self.height as i32 - MARGIN.bottom) / 2;

        let tick_style = text_style(20.0, &AXIS_GREY, Pos::new(HPos::Right, VPos::Center));
        for t in &self.ticks {
            let row = self.y.map(*t) as i32;
            root.draw(&PathElement::new(
                vec![(MARGIN.left, row), (right, row)],
                AXIS_GREY.stroke_width(1),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
            root.draw(&Text::new(
                format_number(*t, &self.lang),
                (MARGIN.left - 15, row),
                tick_style.clone(),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
        }

        let title_style =
            vertical_text_style(24.0, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top));
        root.draw(&Text::new(
            self.axis_label.clone(),
            (MARGIN.left - 100, plot_mid),
            title_style,
        ))
        .map_err(|e| anyhow!("{:?}", e))?;

        for bar in &self.bars {
            let (x0, x1) = (bar.left, bar.left + bar.width);
            root.draw(&Rectangle::new(
                [px((x0, bar.top)), px((x1, bar.bottom))],
                bar.color.filled(),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;

            if let Some((ci_top, ci_bottom)) = bar.ci {
                draw_hatched(root, px((x0, ci_top)), px((x1, ci_bottom)), &BLACK)?;
            }
        }
        Ok(())
    }
}

/// Outlined rectangle filled with diagonal hatching.
pub(crate) fn draw_hatched<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    top_left: (i32, i32),
    bottom_right: (i32, i32),
    color: &RGBColor,
) -> Result<()> {
    let ink = color.mix(0.6);
    root.draw(&Rectangle::new([top_left, bottom_right], WHITE.mix(0.35).filled()))
        .map_err(|e| anyhow!("{:?}", e))?;
    for [a, b] in hatch_lines((top_left, bottom_right), HATCH_SPACING) {
        root.draw(&PathElement::new(vec![a, b], ink.stroke_width(1)))
            .map_err(|e| anyhow!("{:?}", e))?;
    }
    root.draw(&Rectangle::new([top_left, bottom_right], ink.stroke_width(2)))
        .map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

struct CiSwatch {
    color: RGBColor,
}

impl Scene for CiSwatch {
    fn size(&self) -> (u32, u32) {
        (46, 46)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        root.draw(&Rectangle::new([(8, 0), (38, 46)], self.color.filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        draw_hatched(root, (8, 10), (38, 36), &BLACK)
    }
}

impl Chart {
    /// Bar chart of the bubble statistic at the export year, one bar per feature.
    pub fn create_bar_chart(&self, features: &[Feature]) -> Result<ChartImage> {
        encode(&BarLayout::new(self, features), self.format)
    }

    /// Swatch explaining the hatched confidence band.
    pub fn create_bar_chart_ci_legend(&self, color: RGBColor) -> Result<ChartImage> {
        encode(&CiSwatch { color }, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExportRequest, LayerKind, YearRange};
    use std::collections::BTreeMap;

    fn feature(name: &str, er: f64) -> Feature {
        let mut stats = BTreeMap::new();
        stats.insert("er-15".to_string(), er);
        stats.insert("erl-15".to_string(), (er - 0.5).max(0.0));
        stats.insert("erh-15".to_string(), er + 0.5);
        Feature {
            geoid: name.len().to_string(),
            layer: LayerKind::States,
            name: name.into(),
            parent_location: String::new(),
            bbox: None,
            high_props: None,
            stats,
        }
    }

    fn chart(display_ci: bool) -> Chart {
        let req = ExportRequest {
            lang: "en".into(),
            year: 2015,
            years: YearRange::new(2010, 2016),
            features: vec![],
            data_prop: "pr".into(),
            bubble_prop: "er".into(),
            show_us_average: false,
            us_average: BTreeMap::new(),
            display_ci,
            formats: vec![],
        };
        Chart::for_request(&req, "Eviction Rate")
    }

    #[test]
    fn domain_ignores_unavailable() {
        assert_eq!(bar_domain_max(&[None, Some(0.2)]), MIN_Y_MAX);
        assert_eq!(bar_domain_max(&[Some(3.5), None, Some(f64::NAN)]), 3.5);
    }

    #[test]
    fn tiny_values_keep_a_visible_bar() {
        assert_eq!(bar_display_value(Some(0.05), 2.0), 0.01);
        assert_eq!(bar_display_value(Some(0.5), 2.0), 0.5);
        let layout = BarLayout::new(&chart(false), &[feature("Tiny", 0.05)]);
        let bar = &layout.bars[0];
        assert!(bar.height() > 0.0);
        assert!(bar.ci.is_none());
    }

    #[test]
    fn ci_band_spans_bounds() {
        let layout = BarLayout::new(&chart(true), &[feature("A", 4.0), feature("B", 2.0)]);
        let (top, bottom) = layout.bars[0].ci.unwrap();
        assert_eq!(top, layout.y.map(4.5));
        assert_eq!(bottom, layout.y.map(3.5));
        assert!(layout.bars[0].left < layout.bars[1].left);
    }

    #[test]
    fn wide_ci_stays_inside_the_plot() {
        let mut wide = feature("Wide", 1.0);
        wide.stats.insert("erh-15".to_string(), 3.0);
        let layout = BarLayout::new(&chart(true), &[wide.clone()]);
        let (top, bottom) = layout.bars[0].ci.unwrap();
        assert_eq!(top, MARGIN.top as f64);
        assert!(bottom > top);
        assert!(layout.bars[0].top > top);

        // Bounds only widen the axis when they are drawn.
        let plain = BarLayout::new(&chart(false), &[wide]);
        assert_eq!(plain.bars[0].top, MARGIN.top as f64);
    }

    #[test]
    fn renders_svg() {
        let img = chart(true)
            .create_bar_chart(&[feature("A", 4.0), feature("B", 0.0)])
            .unwrap();
        let svg = String::from_utf8(img.bytes).unwrap();
        assert!(svg.contains("<rect"));
        assert!(svg.contains("Eviction Rate"));
    }
}
