//! Chart and legend rendering to **SVG** or **PNG**.
//!
//! - Fixed chart kinds: comparison bar chart and rate-over-time line chart
//! - Map legends whose bubble sizes match the live map at the screenshot's zoom
//! - Everything is laid out in pixel space with [`crate::scale`] so the geometry can be
//!   inspected without rendering
//!
//! SVG needs no font at render time. PNG rasterizes text and therefore needs a TrueType
//! font registered once per process with [`register_font_file`].

pub mod bar;
pub mod legend;
pub mod line;
pub mod text;
pub mod types;
pub mod util;

pub use bar::{BarLayout, bar_display_value, bar_domain_max};
pub use legend::{bubble_legend_samples, legend_zoom};
pub use line::{LineLayout, contiguous_runs};
pub use types::{ChartImage, ImageFormat, SeriesStroke};

use anyhow::{Result, anyhow, bail};
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::Pos;
use plotters::style::{FontDesc, FontStyle, FontTransform};
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::{ExportRequest, YearRange};

/// Family every chart draws text with; PNG output needs it registered.
pub const FONT_FAMILY: &str = "sans-serif";

static FONT_READY: AtomicBool = AtomicBool::new(false);

/// Register a TrueType/OpenType file as the chart font. Later calls are no-ops.
pub fn register_font_file(path: &Path) -> Result<()> {
    if FONT_READY.load(Ordering::Acquire) {
        return Ok(());
    }
    let bytes = std::fs::read(path).map_err(|e| anyhow!("read font {}: {e}", path.display()))?;
    // ab_glyph keeps a reference for the life of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("invalid font {}", path.display()))?;
    FONT_READY.store(true, Ordering::Release);
    Ok(())
}

pub fn font_ready() -> bool {
    FONT_READY.load(Ordering::Acquire)
}

/// Something drawable onto any plotters backend at a fixed pixel size.
pub trait Scene {
    fn size(&self) -> (u32, u32);

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

/// Render a scene into an encoded image.
pub fn encode<S: Scene>(scene: &S, format: ImageFormat) -> Result<ChartImage> {
    let (width, height) = scene.size();
    if width == 0 || height == 0 {
        bail!("chart size must be non-zero, got {width}x{height}");
    }
    let bytes = match format {
        ImageFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                scene.draw(&root)?;
                root.present().map_err(|e| anyhow!("{:?}", e))?;
            }
            svg.into_bytes()
        }
        ImageFormat::Png => {
            if !font_ready() {
                bail!("PNG charts need a registered font (set EXPORT_FONT_PATH)");
            }
            let mut buf = vec![0u8; width as usize * height as usize * 3];
            {
                let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
                scene.draw(&root)?;
                root.present().map_err(|e| anyhow!("{:?}", e))?;
            }
            let mut png = Vec::new();
            PngEncoder::new(&mut png)
                .write_image(&buf, width, height, image::ColorType::Rgb8)
                .map_err(|e| anyhow!("png encode: {e}"))?;
            png
        }
    };
    Ok(ChartImage {
        format,
        width,
        height,
        bytes,
    })
}

/// Text style in the chart family.
pub(crate) fn text_style<'a>(px: f64, color: &'a RGBColor, pos: Pos) -> TextStyle<'a> {
    TextStyle::from(FontDesc::from((FONT_FAMILY, px)))
        .color(color)
        .pos(pos)
}

/// Text style rotated to read bottom-to-top (y axis titles).
pub(crate) fn vertical_text_style<'a>(px: f64, color: &'a RGBColor, pos: Pos) -> TextStyle<'a> {
    TextStyle::from(FontDesc::from((FONT_FAMILY, px)).transform(FontTransform::Rotate270))
        .color(color)
        .pos(pos)
}

/// Outer padding around the plotting area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margin {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Settings shared by the charts of one export.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub width: u32,
    pub height: u32,
    pub year: i32,
    pub years: YearRange,
    pub bubble_stat: String,
    /// Y axis title, already translated.
    pub axis_label: String,
    pub lang: String,
    pub display_ci: bool,
    pub format: ImageFormat,
}

/// Size of the comparison charts placed on slides and pages.
pub const DEFAULT_CHART_SIZE: (u32, u32) = (945, 532);

impl Chart {
    pub fn for_request(request: &ExportRequest, axis_label: impl Into<String>) -> Self {
        Self {
            width: DEFAULT_CHART_SIZE.0,
            height: DEFAULT_CHART_SIZE.1,
            year: request.year,
            years: request.years,
            bubble_stat: request.bubble_stat().to_string(),
            axis_label: axis_label.into(),
            lang: request.lang.clone(),
            display_ci: request.display_ci,
            format: ImageFormat::default(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Statistic keys holding the confidence bounds of the bubble statistic.
    pub(crate) fn ci_stats(&self) -> (String, String) {
        (format!("{}l", self.bubble_stat), format!("{}h", self.bubble_stat))
    }
}
