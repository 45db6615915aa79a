//! Rate-over-time line chart and its series legend swatches.

use anyhow::{Result, anyhow};
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::bar::MIN_Y_MAX;
use super::types::{ChartImage, SeriesStroke};
use super::util::{AXIS_GREY, dash_segments, offset_polyline, px, series_color};
use super::{Chart, Margin, Scene, encode, text_style, vertical_text_style};
use crate::format::format_number;
use crate::models::Feature;
use crate::scale::LinearScale;

const MARGIN: Margin = Margin {
    top: 20,
    right: 50,
    bottom: 80,
    left: 120,
};
const LINE_WIDTH: u32 = 6;
const HALO_INNER_WIDTH: u32 = 3;
const MARKER_RADIUS: i32 = 8;
const TICK_SIZE: i32 = 16;
const Y_TICKS: usize = 5;
const CI_ALPHA: f64 = 0.2;

/// Split a year series into runs of consecutive available values.
pub fn contiguous_runs(values: &[(i32, Option<f64>)]) -> Vec<Vec<(i32, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (year, v) in values {
        match v {
            Some(v) => current.push((*year, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// One feature's line, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub label: String,
    pub color: RGBColor,
    pub stroke: SeriesStroke,
    /// Polylines between gaps; a single available year yields a one-point run.
    pub runs: Vec<Vec<(f64, f64)>>,
    pub markers: Vec<(f64, f64)>,
    /// Closed confidence band outlines, one per run with bounds.
    pub bands: Vec<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone)]
pub struct LineLayout {
    pub width: u32,
    pub height: u32,
    pub x: LinearScale,
    pub y: LinearScale,
    pub x_ticks: Vec<f64>,
    pub y_ticks: Vec<f64>,
    pub series: Vec<LineSeries>,
    pub axis_label: String,
    lang: String,
}

impl LineLayout {
    pub fn new(chart: &Chart, features: &[Feature]) -> Self {
        let years = chart.years.years();
        let plot_w = chart.width as f64 - (MARGIN.left + MARGIN.right) as f64;
        let plot_h = chart.height as f64 - (MARGIN.top + MARGIN.bottom) as f64;
        let (lo_stat, hi_stat) = chart.ci_stats();

        let table: Vec<Vec<(i32, Option<f64>)>> = features
            .iter()
            .map(|f| {
                years
                    .iter()
                    .map(|y| (*y, f.value(&chart.bubble_stat, *y)))
                    .collect()
            })
            .collect();
        let bounds: Vec<Vec<(i32, Option<(f64, f64)>)>> = features
            .iter()
            .map(|f| {
                years
                    .iter()
                    .map(|y| {
                        let b = match (f.value(&lo_stat, *y), f.value(&hi_stat, *y)) {
                            (Some(lo), Some(hi)) if chart.display_ci => {
                                Some((lo.min(hi), lo.max(hi)))
                            }
                            _ => None,
                        };
                        (*y, b)
                    })
                    .collect()
            })
            .collect();

        let y_max = table
            .iter()
            .flatten()
            .filter_map(|(_, v)| *v)
            .chain(bounds.iter().flatten().filter_map(|(_, b)| b.map(|b| b.1)))
            .filter(|v| v.is_finite())
            .fold(MIN_Y_MAX, f64::max);

        let first = *years.first().unwrap_or(&chart.year) as f64;
        let last = *years.last().unwrap_or(&chart.year) as f64;
        let x = LinearScale::rounded(
            (first, last),
            (MARGIN.left as f64, MARGIN.left as f64 + plot_w),
        );
        let y = LinearScale::rounded(
            (0.0, y_max),
            (MARGIN.top as f64 + plot_h, MARGIN.top as f64),
        );
        let x_tick_count = (years.len().saturating_sub(1) / 3).max(1);

        let series = features
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let to_px = |(yr, v): (i32, f64)| (x.map(yr as f64), y.map(v));
                let runs: Vec<Vec<(f64, f64)>> = contiguous_runs(&table[i])
                    .into_iter()
                    .map(|run| run.into_iter().map(to_px).collect())
                    .collect();
                let markers = runs.iter().flatten().copied().collect();
                let bands = band_runs(&bounds[i])
                    .into_iter()
                    .map(|run| {
                        let upper = run.iter().map(|(yr, (_, hi))| to_px((*yr, *hi)));
                        let lower = run.iter().rev().map(|(yr, (lo, _))| to_px((*yr, *lo)));
                        upper.chain(lower).collect()
                    })
                    .collect();
                LineSeries {
                    label: f.name.clone(),
                    color: series_color(f, i),
                    stroke: SeriesStroke::for_index(i),
                    runs,
                    markers,
                    bands,
                }
            })
            .collect();

        Self {
            width: chart.width,
            height: chart.height,
            x_ticks: x.ticks(x_tick_count),
            y_ticks: y.ticks(Y_TICKS),
            x,
            y,
            series,
            axis_label: chart.axis_label.clone(),
            lang: chart.lang.clone(),
        }
    }
}

fn band_runs(bounds: &[(i32, Option<(f64, f64)>)]) -> Vec<Vec<(i32, (f64, f64))>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (year, b) in bounds {
        match b {
            Some(b) => current.push((*year, *b)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Stroke a polyline with the series pattern.
fn stroke_path<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    points: &[(f64, f64)],
    color: &RGBColor,
    stroke: SeriesStroke,
    width: u32,
    inner_width: u32,
) -> Result<()> {
    let draw = |pts: &[(f64, f64)], style: ShapeStyle| -> Result<()> {
        let pts: Vec<(i32, i32)> = pts.iter().copied().map(px).collect();
        root.draw(&PathElement::new(pts, style))
            .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    };
    match stroke {
        SeriesStroke::Solid => draw(points, color.stroke_width(width)),
        SeriesStroke::Dashed { on, off } => {
            for dash in dash_segments(points, on, off) {
                draw(&dash, color.stroke_width(width))?;
            }
            Ok(())
        }
        // Two edge strokes leave the middle of the line unpainted, so bands and grid
        // lines show through it.
        SeriesStroke::Halo => {
            let edge = (width.saturating_sub(inner_width) / 2).max(1);
            let offset = (width + inner_width) as f64 / 4.0;
            draw(&offset_polyline(points, offset), color.stroke_width(edge))?;
            draw(&offset_polyline(points, -offset), color.stroke_width(edge))
        }
    }
}

impl Scene for LineLayout {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        let right = self.width as i32 - MARGIN.right;
        let baseline = self.height as i32 - MARGIN.bottom;

        let year_style = text_style(22.0, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top));
        for t in &self.x_ticks {
            let col = self.x.map(*t) as i32;
            root.draw(&PathElement::new(
                vec![(col, baseline), (col, baseline + TICK_SIZE)],
                AXIS_GREY.stroke_width(1),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
            root.draw(&Text::new(
                format!("{}", t.round() as i64),
                (col, baseline + TICK_SIZE + 10),
                year_style.clone(),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
        }

        let tick_style = text_style(20.0, &AXIS_GREY, Pos::new(HPos::Right, VPos::Center));
        for t in &self.y_ticks {
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

        root.draw(&Text::new(
            self.axis_label.clone(),
            (MARGIN.left - 100, (MARGIN.top + baseline) / 2),
            vertical_text_style(24.0, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top)),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;

        // Bands first so every line stays on top of every band.
        for s in &self.series {
            for band in &s.bands {
                let pts: Vec<(i32, i32)> = band.iter().copied().map(px).collect();
                root.draw(&Polygon::new(pts, s.color.mix(CI_ALPHA).filled()))
                    .map_err(|e| anyhow!("{:?}", e))?;
            }
        }

        for s in &self.series {
            for run in s.runs.iter().filter(|r| r.len() > 1) {
                stroke_path(root, run, &s.color, s.stroke, LINE_WIDTH, HALO_INNER_WIDTH)?;
            }
            for m in &s.markers {
                root.draw(&Circle::new(px(*m), MARKER_RADIUS, s.color.filled()))
                    .map_err(|e| anyhow!("{:?}", e))?;
            }
        }
        Ok(())
    }
}

/// Short stroke sample identifying one series next to its name.
struct LineSwatch {
    color: RGBColor,
    stroke: SeriesStroke,
}

impl Scene for LineSwatch {
    fn size(&self) -> (u32, u32) {
        (37, 6)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        let width = if self.stroke == SeriesStroke::Halo { 6 } else { 4 };
        stroke_path(root, &[(0.0, 3.0), (37.0, 3.0)], &self.color, self.stroke, width, 3)
    }
}

/// Translucent band with a center line, explaining the line chart's bands.
struct BandSwatch {
    color: RGBColor,
}

impl Scene for BandSwatch {
    fn size(&self) -> (u32, u32) {
        (54, 30)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        root.draw(&Rectangle::new([(0, 4), (54, 26)], self.color.mix(CI_ALPHA).filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        root.draw(&PathElement::new(
            vec![(0, 15), (54, 15)],
            self.color.stroke_width(4),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl Chart {
    /// Bubble statistic over the full year range, one line per feature.
    pub fn create_line_chart(&self, features: &[Feature]) -> Result<ChartImage> {
        encode(&LineLayout::new(self, features), self.format)
    }

    /// Stroke sample for the `index`-th series.
    pub fn create_line_chart_legend(&self, feature: &Feature, index: usize) -> Result<ChartImage> {
        let swatch = LineSwatch {
            color: series_color(feature, index),
            stroke: SeriesStroke::for_index(index),
        };
        encode(&swatch, self.format)
    }

    /// Swatch explaining the translucent confidence band.
    pub fn create_line_chart_ci_legend(&self, color: RGBColor) -> Result<ChartImage> {
        encode(&BandSwatch { color }, self.format)
    }
}
