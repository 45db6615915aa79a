//! Piecewise-linear step expressions and the zoom-dependent bubble sizing curve.
//!
//! The live map sizes bubbles with a nested interpolation: zoom picks a blend between
//! a low-zoom and a high-zoom stop, and each stop maps statistic values to radii.
//! Static legends must pick the same radii, so the evaluation here mirrors that
//! convention exactly:
//! - zoom is clamped into `[min.zoom, max.zoom]`
//! - both stop lists are blended entry-wise by the zoom progress `t`
//! - the blended list is searched by output (radius) and labels (values) interpolated

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{ExportError, Result};
use crate::models::BBox;

/// Tile size the live map renders at.
pub const TILE_SIZE_PX: f64 = 256.0;
pub const MAX_ZOOM: f64 = 20.0;
const MAX_MERCATOR_LAT: f64 = 85.0511;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopOp {
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "/")]
    Div,
}

/// A constant, or a small derived sub-expression such as `["*", 2, 5]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopValue {
    Const(f64),
    Op(StopOp, Box<StopValue>, Box<StopValue>),
}

impl StopValue {
    pub fn eval(&self) -> f64 {
        match self {
            StopValue::Const(v) => *v,
            StopValue::Op(op, a, b) => {
                let (a, b) = (a.eval(), b.eval());
                match op {
                    StopOp::Mul => a * b,
                    StopOp::Add => a + b,
                    StopOp::Sub => a - b,
                    StopOp::Div => {
                        if b == 0.0 {
                            0.0
                        } else {
                            a / b
                        }
                    }
                }
            }
        }
    }
}

impl From<f64> for StopValue {
    fn from(v: f64) -> Self {
        StopValue::Const(v)
    }
}

/// Radii at one zoom level, as a flat `[value, radius, value, radius, ...]` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomStop {
    pub zoom: f64,
    pub steps: Vec<StopValue>,
}

impl ZoomStop {
    pub fn new(zoom: f64, steps: &[f64]) -> Self {
        Self {
            zoom,
            steps: steps.iter().copied().map(StopValue::from).collect(),
        }
    }

    pub fn resolve(&self) -> Vec<f64> {
        self.steps.iter().map(StopValue::eval).collect()
    }
}

/// Bubble sizing for one statistic and layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleExpression {
    pub min: ZoomStop,
    pub max: ZoomStop,
}

impl BubbleExpression {
    /// Checked at table load so evaluation never has to.
    pub fn validate(&self) -> Result<()> {
        if self.min.zoom >= self.max.zoom {
            return Err(ExportError::Config(format!(
                "bubble zoom stops must increase ({} >= {})",
                self.min.zoom, self.max.zoom
            )));
        }
        let (lo, hi) = (self.min.resolve(), self.max.resolve());
        if lo.is_empty() || lo.len() % 2 != 0 || lo.len() != hi.len() {
            return Err(ExportError::Config(format!(
                "bubble stops need matching value/radius pairs ({} vs {} entries)",
                lo.len(),
                hi.len()
            )));
        }
        for steps in [&lo, &hi] {
            let sorted = steps
                .chunks(2)
                .zip(steps.chunks(2).skip(1))
                .all(|(a, b)| b[0] >= a[0] && b[1] >= a[1]);
            if !sorted {
                return Err(ExportError::Config(
                    "bubble stop values and radii must be ascending".into(),
                ));
            }
        }
        Ok(())
    }

    /// Progress of `zoom` between the two stops, after clamping.
    pub fn progress(&self, zoom: f64) -> f64 {
        let (z0, z1) = (self.min.zoom, self.max.zoom);
        let z = zoom.clamp(z0.min(z1), z0.max(z1));
        if z1 == z0 { 0.0 } else { (z - z0) / (z1 - z0) }
    }

    /// Step list the live map effectively uses at `zoom`.
    pub fn steps_at(&self, zoom: f64) -> Vec<f64> {
        let t = self.progress(zoom);
        self.min
            .resolve()
            .into_iter()
            .zip(self.max.resolve())
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }

    /// Largest bubble radius drawn at `zoom`.
    pub fn max_radius_at(&self, zoom: f64) -> f64 {
        self.steps_at(zoom).last().copied().unwrap_or(0.0)
    }
}

/// Linear interpolation of `ys` over ascending `xs`, clamped to the ends.
fn interpolate(xs: &[f64], ys: &[f64], q: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    if q <= xs[0] {
        return ys[0];
    }
    if q >= xs[n - 1] {
        return ys[n - 1];
    }
    // Last index whose x is <= q.
    let (mut lo, mut hi) = (0usize, n - 1);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if xs[mid] <= q {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let (x0, x1) = (xs[lo], xs[lo + 1]);
    if x1 == x0 {
        return ys[lo];
    }
    let t = (q - x0) / (x1 - x0);
    ys[lo] + t * (ys[lo + 1] - ys[lo])
}

fn split_pairs(steps: &[f64]) -> (Vec<f64>, Vec<f64>) {
    steps.chunks_exact(2).map(|p| (p[0], p[1])).unzip()
}

/// Evaluate a flat `[label, output, label, output, ...]` list (ascending by output)
/// at `query`, returning the interpolated label.
pub fn evaluate_steps(steps: &[f64], query: f64) -> f64 {
    let (labels, outputs) = split_pairs(steps);
    interpolate(&outputs, &labels, query)
}

/// Forward direction of [`evaluate_steps`]: the output for a label.
pub fn output_for_label(steps: &[f64], label: f64) -> f64 {
    let (labels, outputs) = split_pairs(steps);
    interpolate(&labels, &outputs, label)
}

/// Statistic value whose bubble has radius `size_px` at `zoom`.
pub fn bubble_value_at(size_px: f64, zoom: f64, expr: &BubbleExpression) -> f64 {
    evaluate_steps(&expr.steps_at(zoom), size_px)
}

/// Bubble radius for `value` at `zoom`.
pub fn bubble_radius_at(value: f64, zoom: f64, expr: &BubbleExpression) -> f64 {
    output_for_label(&expr.steps_at(zoom), value)
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (PI / 4.0 + lat / 2.0).tan().ln()
}

/// Whole-number zoom at which `bbox` fits a `width` x `height` pixel viewport.
pub fn viewport_zoom(bbox: &BBox, width: f64, height: f64) -> f64 {
    let lon_frac = (bbox.east - bbox.west).abs() / 360.0;
    let lat_frac = (mercator_y(bbox.north) - mercator_y(bbox.south)).abs() / (2.0 * PI);
    let zx = (width / TILE_SIZE_PX / lon_frac).log2();
    let zy = (height / TILE_SIZE_PX / lat_frac).log2();
    let z = zx.min(zy);
    if z.is_nan() {
        return MAX_ZOOM;
    }
    z.floor().clamp(0.0, MAX_ZOOM)
}
