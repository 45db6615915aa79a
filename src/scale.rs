//! Linear and band scales mapping data space to pixel space.
//!
//! Behaviour follows the d3-scale conventions the web front end uses, so axis ticks and
//! bar placement line up with the charts people see on the site:
//! - tick steps are 1, 2 or 5 times a power of ten, about `count` of them
//! - a degenerate linear domain maps everything to the middle of the range
//! - band padding applies to both inner gaps and outer edges

/// Pick a round tick step for `[start, stop]` with about `count` ticks.
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start).abs() / count.max(1) as f64;
    if raw == 0.0 || !raw.is_finite() {
        return 0.0;
    }
    let power = raw.log10().floor();
    let error = raw / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * 10f64.powf(power)
}

/// Round tick values spanning `[start, stop]` (inclusive when they fall on a step).
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let (lo, hi) = if start <= stop { (start, stop) } else { (stop, start) };
    if lo == hi {
        return vec![lo];
    }
    let step = tick_step(lo, hi, count);
    if step == 0.0 || !step.is_finite() {
        return Vec::new();
    }
    // Work in integer multiples to avoid 0.30000000000000004-style labels.
    let out: Vec<f64> = if step >= 1.0 {
        let i0 = (lo / step).ceil() as i64;
        let i1 = (hi / step).floor() as i64;
        (i0..=i1).map(|i| i as f64 * step).collect()
    } else {
        let inv = (1.0 / step).round();
        let i0 = (lo * inv).ceil() as i64;
        let i1 = (hi * inv).floor() as i64;
        (i0..=i1).map(|i| i as f64 / inv).collect()
    };
    if start > stop {
        out.into_iter().rev().collect()
    } else {
        out
    }
}

/// Affine mapping from a numeric domain to a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
    /// Round mapped values to whole pixels.
    pub round: bool,
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            round: false,
        }
    }

    /// Same as `new`, but mapped values snap to whole pixels.
    pub fn rounded(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            round: true,
        }
    }

    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = if d1 == d0 { 0.5 } else { (v - d0) / (d1 - d0) };
        let out = r0 + t * (r1 - r0);
        if self.round { out.round() } else { out }
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (px - r0) / (r1 - r0) * (d1 - d0)
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count)
    }

    /// Extend the domain outward to whole tick steps.
    pub fn nice(mut self, count: usize) -> Self {
        let (d0, d1) = self.domain;
        let step = tick_step(d0.min(d1), d0.max(d1), count);
        if step > 0.0 {
            let lo = (d0.min(d1) / step).floor() * step;
            let hi = (d0.max(d1) / step).ceil() * step;
            self.domain = if d0 <= d1 { (lo, hi) } else { (hi, lo) };
        }
        self
    }
}

/// Evenly spaced bands for categorical x positions.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    start: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    /// Lay out `domain` over `range` with equal inner and outer `padding` (0..1).
    pub fn new(domain: Vec<String>, range: (f64, f64), padding: f64, round: bool) -> Self {
        let n = domain.len() as f64;
        let (r0, r1) = range;
        let padding = padding.clamp(0.0, 1.0);
        let mut step = (r1 - r0) / (n - padding + padding * 2.0).max(1.0);
        if round {
            step = step.floor();
        }
        let mut start = r0 + (r1 - r0 - step * (n - padding)) * 0.5;
        let mut bandwidth = step * (1.0 - padding);
        if round {
            start = start.round();
            bandwidth = bandwidth.round();
        }
        Self {
            domain,
            start,
            step,
            bandwidth,
        }
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Left edge of the i-th band.
    pub fn position_at(&self, i: usize) -> f64 {
        self.start + self.step * i as f64
    }

    /// Left edge of the band for `label`, if it is in the domain.
    pub fn position(&self, label: &str) -> Option<f64> {
        self.domain
            .iter()
            .position(|d| d == label)
            .map(|i| self.position_at(i))
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }
}
