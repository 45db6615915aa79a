//! Drawing helpers: series palette, color blending, hatch and dash geometry.

use plotters::prelude::*;

use crate::models::Feature;

/// Series palette, in selection order. Slot 3 is reserved for the national average.
const SERIES: [RGBColor; 4] = [
    RGBColor(0xe2, 0x40, 0x00), // orange   (#e24000)
    RGBColor(0x43, 0x48, 0x78), // indigo   (#434878)
    RGBColor(0x2c, 0x89, 0x7f), // teal     (#2c897f)
    RGBColor(0x94, 0xaa, 0xbd), // slate    (#94aabd)
];

/// Axis, grid and label grey (#666666).
pub const AXIS_GREY: RGBColor = RGBColor(0x66, 0x66, 0x66);
/// Bubble fill used by the map legend.
pub const BUBBLE_FILL: RGBAColor = RGBAColor(255, 4, 0, 0.65);

#[inline]
pub fn palette_color(idx: usize) -> RGBColor {
    SERIES[idx % SERIES.len()]
}

/// Color of the `idx`-th plotted feature; the US average always takes slot 3.
pub fn series_color(feature: &Feature, idx: usize) -> RGBColor {
    if feature.is_us_average() {
        SERIES[3]
    } else {
        palette_color(idx)
    }
}

/// Linear blend of two colors, alpha included.
pub fn lerp_color(a: RGBAColor, b: RGBAColor, t: f64) -> RGBAColor {
    let t = t.clamp(0.0, 1.0);
    let ch = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBAColor(ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2), a.3 + (b.3 - a.3) * t)
}

/// Diagonal (bottom-left to top-right) line segments filling a rectangle.
///
/// `rect` is `((x0, y0), (x1, y1))` with `x0 <= x1` and `y0 <= y1`; lines are `spacing`
/// pixels apart along the x axis and clipped to the rectangle.
pub fn hatch_lines(rect: ((i32, i32), (i32, i32)), spacing: i32) -> Vec<[(i32, i32); 2]> {
    let ((x0, y0), (x1, y1)) = rect;
    let spacing = spacing.max(1);
    let mut out = Vec::new();
    // Lines of constant x + y.
    let mut k = x0 + y0 + spacing;
    while k < x1 + y1 {
        let lo = x0.max(k - y1);
        let hi = x1.min(k - y0);
        if lo <= hi {
            out.push([(lo, k - lo), (hi, k - hi)]);
        }
        k += spacing;
    }
    out
}

/// Split a polyline into dash pieces of `on` pixels separated by `off` pixels.
/// `off == 0` returns the polyline unchanged.
pub fn dash_segments(points: &[(f64, f64)], on: f64, off: f64) -> Vec<Vec<(f64, f64)>> {
    if off <= 0.0 || on <= 0.0 || points.len() < 2 {
        return vec![points.to_vec()];
    }
    let period = on + off;
    let mut out: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    // Position inside the current on/off period.
    let mut phase = 0.0f64;
    for w in points.windows(2) {
        let ((ax, ay), (bx, by)) = (w[0], w[1]);
        let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
        if len == 0.0 {
            continue;
        }
        let at = |d: f64| (ax + (bx - ax) * d / len, ay + (by - ay) * d / len);
        let mut d = 0.0;
        while d < len {
            let in_dash = phase < on;
            let to_boundary = if in_dash { on - phase } else { period - phase };
            if in_dash && current.is_empty() {
                current.push(at(d));
            }
            if to_boundary <= len - d {
                d += to_boundary;
                if in_dash {
                    current.push(at(d));
                    out.push(std::mem::take(&mut current));
                    phase = on;
                } else {
                    phase = 0.0;
                }
            } else {
                if in_dash {
                    current.push(at(len));
                }
                phase += len - d;
                d = len;
            }
        }
    }
    if current.len() >= 2 {
        out.push(current);
    }
    out
}

/// Polyline shifted sideways by `d` pixels (positive to the left of travel in screen
/// space), with mitred joins. Very sharp joins are capped at four times `d`.
pub fn offset_polyline(points: &[(f64, f64)], d: f64) -> Vec<(f64, f64)> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let normal = |a: (f64, f64), b: (f64, f64)| {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 { (0.0, 0.0) } else { (-dy / len, dx / len) }
    };
    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let n_in = if i > 0 { normal(points[i - 1], p) } else { normal(p, points[1]) };
            let n_out = if i < last { normal(p, points[i + 1]) } else { n_in };
            let (mx, my) = (n_in.0 + n_out.0, n_in.1 + n_out.1);
            let m_len = (mx * mx + my * my).sqrt();
            if m_len < 1e-9 {
                return (p.0 + n_out.0 * d, p.1 + n_out.1 * d);
            }
            let (mx, my) = (mx / m_len, my / m_len);
            let cos = mx * n_out.0 + my * n_out.1;
            let scale = d / cos.max(0.25);
            (p.0 + mx * scale, p.1 + my * scale)
        })
        .collect()
}

/// Convert to plotters' integer pixel coordinates.
#[inline]
pub fn px(p: (f64, f64)) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}
