//! Public types for the chart module.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encoding of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Vector output; needs no fonts at render time.
    #[default]
    Svg,
    /// Raster output; needs a registered font (see [`super::register_font_file`]).
    Png,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Png => "image/png",
        }
    }

    pub fn ext(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Encoded chart plus its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl ChartImage {
    /// `data:` URI suitable for embedding in slide or document templates.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), STANDARD.encode(&self.bytes))
    }
}

/// Stroke pattern of the i-th line series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesStroke {
    Solid,
    /// `on` pixels drawn, `off` pixels skipped.
    Dashed { on: f64, off: f64 },
    /// Wide colored stroke with a narrower background-colored stroke on top.
    Halo,
}

impl SeriesStroke {
    pub fn for_index(idx: usize) -> Self {
        match idx {
            1 => SeriesStroke::Dashed { on: 2.0, off: 2.0 },
            2 => SeriesStroke::Dashed { on: 8.0, off: 8.0 },
            3 => SeriesStroke::Halo,
            _ => SeriesStroke::Solid,
        }
    }
}
