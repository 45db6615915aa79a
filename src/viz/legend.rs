//! Map legends: sample bubbles sized like the live map, and the choropleth gradient.
//!
//! Bubble radii come from the same zoom-blended step expression the interactive map uses,
//! evaluated at the zoom the screenshot service picks for the feature's bounds. The
//! legend is laid out in CSS pixels at 660x220 and scaled to the requested size.

use anyhow::{Result, anyhow};
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::bar::draw_hatched;
use super::text::{fit_font_px, truncate_to_width};
use super::types::ChartImage;
use super::util::{AXIS_GREY, BUBBLE_FILL, lerp_color, px};
use super::{Chart, Scene, encode, text_style};
use crate::expr::{BubbleExpression, bubble_value_at, viewport_zoom};
use crate::format::format_value;
use crate::models::Feature;
use crate::screenshot::SCREENSHOT_SIZE_PX;
use crate::tables::{Breakpoint, StatTables};

/// Design height of the legend in CSS pixels.
const DESIGN_HEIGHT: f64 = 220.0;
/// The map renders at this fraction of the screenshot size when fitting bounds.
const VIEWPORT_DIVISOR: f64 = 2.5;
/// Sample bubbles as fractions of the largest radius drawn at the legend zoom.
const SAMPLE_FRACTIONS: [f64; 2] = [0.3, 1.0];
const GRADIENT_STEPS: usize = 64;
const LABEL_PX: f64 = 16.0;
/// Width share of the bubble panel when both panels are shown.
const BUBBLE_SHARE: f64 = 0.4;

/// Zoom the live map shows `feature` at inside a screenshot.
pub fn legend_zoom(feature: &Feature, expr: &BubbleExpression) -> f64 {
    match feature.bbox {
        Some(b) => {
            let side = SCREENSHOT_SIZE_PX as f64 / VIEWPORT_DIVISOR;
            viewport_zoom(&b, side, side)
        }
        None => expr.min.zoom,
    }
}

/// `(value, radius)` of the small and large legend bubbles at `zoom`.
pub fn bubble_legend_samples(expr: &BubbleExpression, zoom: f64) -> [(f64, f64); 2] {
    let max_r = expr.max_radius_at(zoom);
    SAMPLE_FRACTIONS.map(|f| {
        let r = max_r * f;
        (bubble_value_at(r, zoom, expr), r)
    })
}

#[derive(Debug, Clone, PartialEq)]
struct BubblePanel {
    samples: Vec<(String, f64)>,
    description: String,
}

#[derive(Debug, Clone, PartialEq)]
struct ChoroplethPanel {
    low: Breakpoint,
    high: Breakpoint,
    low_label: String,
    high_label: String,
    description: String,
    no_data: String,
}

/// Pixel rectangle `(x0, y0, x1, y1)`.
type Area = (f64, f64, f64, f64);

#[derive(Debug, Clone)]
struct MapLegend {
    width: u32,
    height: u32,
    /// Output pixels per design pixel, fixed by the requested height.
    scale: f64,
    bubbles: Option<BubblePanel>,
    choropleth: Option<ChoroplethPanel>,
}

/// Vertical rows of the bubble panel, relative to its top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BubbleRows {
    label: f64,
    center: f64,
    description: f64,
    bottom: f64,
}

impl MapLegend {
    /// Legend at `width`x`height`, enlarged when the largest sample bubble would not fit
    /// at its true size.
    fn new(
        width: u32,
        height: u32,
        bubbles: Option<BubblePanel>,
        choropleth: Option<ChoroplethPanel>,
    ) -> Self {
        let mut legend = Self {
            width,
            height,
            scale: height as f64 / DESIGN_HEIGHT,
            bubbles,
            choropleth,
        };
        if let Some(panel) = &legend.bubbles {
            let s = legend.scale;
            let rows = legend.bubble_rows(panel);
            legend.height = legend.height.max(rows.bottom.ceil() as u32);
            let n = panel.samples.len().max(1) as f64;
            let column = 2.0 * legend.max_radius(panel) + 20.0 * s;
            let share = if legend.choropleth.is_some() { BUBBLE_SHARE } else { 1.0 };
            legend.width = legend.width.max((n * column / share).ceil() as u32);
        }
        legend
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn max_radius(&self, panel: &BubblePanel) -> f64 {
        panel
            .samples
            .iter()
            .map(|(_, r)| r * self.scale)
            .fold(1.0, f64::max)
    }

    fn bubble_rows(&self, panel: &BubblePanel) -> BubbleRows {
        let s = self.scale;
        let font = LABEL_PX * s;
        let r = self.max_radius(panel);
        let label = 8.0 * s;
        let center = label + font + 8.0 * s + r;
        let description = center + r + 10.0 * s;
        BubbleRows {
            label,
            center,
            description,
            bottom: description + font + 8.0 * s,
        }
    }

    fn panels(&self) -> (Option<Area>, Option<Area>) {
        let (w, h) = (self.width as f64, self.height as f64);
        match (&self.bubbles, &self.choropleth) {
            (Some(_), Some(_)) => (
                Some((0.0, 0.0, w * BUBBLE_SHARE, h)),
                Some((w * BUBBLE_SHARE, 0.0, w, h)),
            ),
            (Some(_), None) => (Some((0.0, 0.0, w, h)), None),
            (None, Some(_)) => (None, Some((0.0, 0.0, w, h))),
            (None, None) => (None, None),
        }
    }

    fn draw_bubbles<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        panel: &BubblePanel,
        area: Area,
    ) -> Result<()> {
        let (x0, y0, x1, _) = area;
        let pw = x1 - x0;
        let s = self.scale();
        let font = LABEL_PX * s;
        let rows = self.bubble_rows(panel);
        let cy = y0 + rows.center;
        let label_style = text_style(font, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top));
        let n = panel.samples.len().max(1) as f64;
        for (i, (label, radius)) in panel.samples.iter().enumerate() {
            let cx = x0 + pw * (i as f64 + 0.5) / n;
            let r = (radius * s).max(1.0).round() as i32;
            root.draw(&Circle::new(px((cx, cy)), r, BUBBLE_FILL.filled()))
                .map_err(|e| anyhow!("{:?}", e))?;
            root.draw(&Circle::new(px((cx, cy)), r, WHITE.stroke_width(2)))
                .map_err(|e| anyhow!("{:?}", e))?;
            root.draw(&Text::new(label.clone(), px((cx, y0 + rows.label)), label_style.clone()))
                .map_err(|e| anyhow!("{:?}", e))?;
        }
        let size = fit_font_px(&panel.description, font as u32, 8, pw as u32);
        let text = truncate_to_width(&panel.description, size, pw as u32);
        root.draw(&Text::new(
            text,
            px((x0 + pw / 2.0, y0 + rows.description)),
            text_style(size as f64, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top)),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }

    fn draw_choropleth<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        panel: &ChoroplethPanel,
        area: Area,
    ) -> Result<()> {
        let (x0, y0, x1, y1) = area;
        let ph = y1 - y0;
        let s = self.scale();
        let font = LABEL_PX * s;
        let pad = 10.0 * s;
        let (bar_top, bar_bottom) = (y0 + ph * 0.3, y0 + ph * 0.48);
        let swatch = bar_bottom - bar_top;

        // Striped "no data" square, left of the gradient.
        let sw0 = (x0 + pad, bar_top);
        let sw1 = (x0 + pad + swatch, bar_bottom);
        draw_hatched(root, px(sw0), px(sw1), &AXIS_GREY)?;
        root.draw(&Text::new(
            panel.no_data.clone(),
            px(((sw0.0 + sw1.0) / 2.0, bar_bottom + 6.0 * s)),
            text_style(font * 0.8, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top)),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;

        let gx0 = sw1.0 + pad * 2.0;
        let gx1 = x1 - pad;
        let step = (gx1 - gx0) / GRADIENT_STEPS as f64;
        for i in 0..GRADIENT_STEPS {
            let t = i as f64 / (GRADIENT_STEPS - 1) as f64;
            let c = lerp_color(panel.low.color, panel.high.color, t);
            let a = (gx0 + step * i as f64, bar_top);
            // Overlap by a pixel so rounding never leaves seams.
            let b = (gx0 + step * (i + 1) as f64 + 1.0, bar_bottom);
            root.draw(&Rectangle::new([px(a), px(b)], c.filled()))
                .map_err(|e| anyhow!("{:?}", e))?;
        }

        let label_y = bar_top - 4.0 * s;
        root.draw(&Text::new(
            panel.low_label.clone(),
            px((gx0, label_y)),
            text_style(font, &AXIS_GREY, Pos::new(HPos::Left, VPos::Bottom)),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
        root.draw(&Text::new(
            panel.high_label.clone(),
            px((gx1, label_y)),
            text_style(font, &AXIS_GREY, Pos::new(HPos::Right, VPos::Bottom)),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;

        let desc_w = (gx1 - gx0) as u32;
        let size = fit_font_px(&panel.description, font as u32, 8, desc_w);
        root.draw(&Text::new(
            truncate_to_width(&panel.description, size, desc_w),
            px(((gx0 + gx1) / 2.0, bar_bottom + 12.0 * s)),
            text_style(size as f64, &AXIS_GREY, Pos::new(HPos::Center, VPos::Top)),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl Scene for MapLegend {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        let (bubble_area, choropleth_area) = self.panels();
        if let (Some(panel), Some(area)) = (&self.bubbles, bubble_area) {
            self.draw_bubbles(root, panel, area)?;
        }
        if let (Some(panel), Some(area)) = (&self.choropleth, choropleth_area) {
            self.draw_choropleth(root, panel, area)?;
        }
        Ok(())
    }
}

fn bubble_panel(
    expr: &BubbleExpression,
    zoom: f64,
    stat: &str,
    lang: &str,
    description: &str,
) -> BubblePanel {
    BubblePanel {
        samples: bubble_legend_samples(expr, zoom)
            .iter()
            .map(|(v, r)| (format_value(stat, *v, lang), *r))
            .collect(),
        description: description.to_string(),
    }
}

fn choropleth_panel(
    scale: &[Breakpoint],
    stat: &str,
    lang: &str,
    description: &str,
    no_data: &str,
) -> Option<ChoroplethPanel> {
    let (low, high) = (*scale.first()?, *scale.last()?);
    Some(ChoroplethPanel {
        low,
        high,
        low_label: format_value(stat, low.value, lang),
        high_label: format_value(stat, high.value, lang),
        description: description.to_string(),
        no_data: no_data.to_string(),
    })
}

/// Labels a map legend needs, already translated.
#[derive(Debug, Clone, Copy)]
pub struct MapLegendText<'a> {
    /// Describes the bubble statistic (e.g. "Eviction Rate").
    pub bubble: &'a str,
    /// Describes the choropleth statistic.
    pub data: &'a str,
    pub no_data: &'a str,
}

impl Chart {
    /// Bubble samples for `feature` at the zoom its screenshot is taken at.
    pub fn create_map_bubble_legend(
        &self,
        feature: &Feature,
        expr: &BubbleExpression,
        description: &str,
    ) -> Result<ChartImage> {
        let panel = bubble_panel(
            expr,
            legend_zoom(feature, expr),
            &self.bubble_stat,
            &self.lang,
            description,
        );
        let legend = MapLegend::new(300, 300, Some(panel), None);
        encode(&legend, self.format)
    }

    /// Gradient between the lowest and highest breakpoints of a data scale.
    pub fn create_map_choropleth_legend(
        &self,
        scale: &[Breakpoint],
        data_stat: &str,
        description: &str,
        no_data: &str,
    ) -> Result<ChartImage> {
        let panel = choropleth_panel(scale, data_stat, &self.lang, description, no_data)
            .ok_or_else(|| anyhow!("scale for `{data_stat}` has no breakpoints"))?;
        let legend = MapLegend::new(500, 200, None, Some(panel));
        encode(&legend, self.format)
    }

    /// Combined legend placed under a feature's map screenshot. A data statistic of
    /// `none` leaves out the choropleth half.
    pub fn create_map_legend(
        &self,
        feature: &Feature,
        width: u32,
        height: u32,
        data_stat: &str,
        tables: &StatTables,
        text: MapLegendText<'_>,
    ) -> crate::Result<ChartImage> {
        let expr = tables.bubble(&self.bubble_stat, feature.layer)?;
        let bubbles = bubble_panel(
            expr,
            legend_zoom(feature, expr),
            &self.bubble_stat,
            &self.lang,
            text.bubble,
        );
        let choropleth = if data_stat.starts_with("none") {
            None
        } else {
            let scale = tables.scale(data_stat, feature.layer)?;
            choropleth_panel(scale, data_stat, &self.lang, text.data, text.no_data)
        };
        let legend = MapLegend::new(width, height, Some(bubbles), choropleth);
        Ok(encode(&legend, self.format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ZoomStop;
    use crate::viz::ImageFormat;
    use crate::models::{BBox, ExportRequest, LayerKind, YearRange};
    use std::collections::BTreeMap;

    fn expr() -> BubbleExpression {
        BubbleExpression {
            min: ZoomStop::new(2.0, &[0.0, 1.0, 10.0, 4.0, 20.0, 8.0]),
            max: ZoomStop::new(10.0, &[0.0, 2.0, 10.0, 16.0, 20.0, 32.0]),
        }
    }

    fn feature(bbox: Option<BBox>) -> Feature {
        Feature {
            geoid: "42".into(),
            layer: LayerKind::States,
            name: "Pennsylvania".into(),
            parent_location: "USA".into(),
            bbox,
            high_props: None,
            stats: BTreeMap::new(),
        }
    }

    fn chart() -> Chart {
        let req = ExportRequest {
            lang: "en".into(),
            year: 2015,
            years: YearRange::new(2010, 2016),
            features: vec![],
            data_prop: "pr".into(),
            bubble_prop: "er".into(),
            show_us_average: false,
            us_average: BTreeMap::new(),
            display_ci: false,
            formats: vec![],
        };
        Chart::for_request(&req, "Eviction Rate")
    }

    #[test]
    fn samples_invert_the_sizing_curve() {
        let e = expr();
        let [(small_v, small_r), (big_v, big_r)] = bubble_legend_samples(&e, 10.0);
        assert_eq!(big_r, 32.0);
        assert_eq!(big_v, 20.0);
        assert!(small_r < big_r && small_v < big_v);
    }

    #[test]
    fn zoom_from_bounds_or_minimum() {
        let e = expr();
        assert_eq!(legend_zoom(&feature(None), &e), 2.0);
        let pa = BBox { west: -80.52, south: 39.72, east: -74.69, north: 42.27 };
        let z = legend_zoom(&feature(Some(pa)), &e);
        assert!((0.0..=20.0).contains(&z) && z.fract() == 0.0);
    }

    #[test]
    fn combined_legend_renders() {
        let tables = StatTables::builtin().unwrap();
        let text = MapLegendText { bubble: "Eviction Rate", data: "Poverty Rate", no_data: "No data" };
        let img = chart()
            .create_map_legend(&feature(None), 1320, 440, "pr", &tables, text)
            .unwrap();
        let svg = String::from_utf8(img.bytes).unwrap();
        assert!(svg.contains("No data"));
        assert!(svg.contains("<circle"));
        let only_bubbles = chart()
            .create_map_legend(&feature(None), 660, 220, "none", &tables, text)
            .unwrap();
        assert!(!String::from_utf8(only_bubbles.bytes).unwrap().contains("No data"));
    }

    #[test]
    fn large_bubbles_grow_the_legend() {
        let big = BubbleExpression {
            min: ZoomStop::new(2.0, &[0.0, 10.0, 100.0, 200.0]),
            max: ZoomStop::new(10.0, &[0.0, 20.0, 100.0, 400.0]),
        };
        let panel = bubble_panel(&big, 2.0, "er", "en", "Eviction Rate");
        let legend = MapLegend::new(660, 220, Some(panel), None);
        assert!(legend.height > 220);
        assert!(legend.width >= 800);
        let svg = String::from_utf8(encode(&legend, ImageFormat::Svg).unwrap().bytes).unwrap();
        assert!(svg.contains(r#"r="200""#));

        // Small bubbles keep the requested size.
        let small = MapLegend::new(660, 220, Some(bubble_panel(&expr(), 2.0, "er", "en", "")), None);
        assert_eq!((small.width, small.height), (660, 220));
    }

    #[test]
    fn unknown_data_stat_is_config_error() {
        let tables = StatTables::builtin().unwrap();
        let text = MapLegendText { bubble: "", data: "", no_data: "" };
        let err = chart()
            .create_map_legend(&feature(None), 660, 220, "zz", &tables, text)
            .unwrap_err();
        assert!(matches!(err, crate::ExportError::MissingStatistic { .. }));
    }

    #[test]
    fn standalone_legends_render() {
        let c = chart();
        let e = expr();
        assert!(c.create_map_bubble_legend(&feature(None), &e, "Eviction Rate").is_ok());
        let tables = StatTables::builtin().unwrap();
        let scale = tables.scale("pr", LayerKind::States).unwrap();
        assert!(c.create_map_choropleth_legend(scale, "pr", "Poverty Rate", "No data").is_ok());
        assert!(c.create_map_choropleth_legend(&[], "pr", "", "").is_err());
    }
}
