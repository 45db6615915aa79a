//! Per-statistic bubble expressions and choropleth breakpoints.
//!
//! Each statistic maps layer kinds to an entry and must carry a `default`; the check
//! happens once at load so lookups only fail for statistics that are absent entirely.

use ahash::AHashMap;
use plotters::style::RGBAColor;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{ExportError, Result};
use crate::expr::BubbleExpression;
use crate::models::LayerKind;

const BUILTIN_TABLES: &str = include_str!("../assets/scales.json");
const DEFAULT_KEY: &str = "default";

impl FromStr for LayerKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "states" => Ok(LayerKind::States),
            "counties" => Ok(LayerKind::Counties),
            "cities" => Ok(LayerKind::Cities),
            "tracts" => Ok(LayerKind::Tracts),
            "block-groups" => Ok(LayerKind::BlockGroups),
            other => Err(ExportError::Config(format!("unknown layer kind `{other}`"))),
        }
    }
}

/// A `default` entry plus per-layer overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerTable<T> {
    pub default: T,
    pub layers: BTreeMap<LayerKind, T>,
}

impl<T> LayerTable<T> {
    fn from_raw(stat: &str, mut raw: BTreeMap<String, T>) -> Result<Self> {
        let default = raw.remove(DEFAULT_KEY).ok_or_else(|| {
            ExportError::Config(format!("statistic `{stat}` has no `default` entry"))
        })?;
        let layers = raw
            .into_iter()
            .map(|(k, v)| Ok((k.parse::<LayerKind>()?, v)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { default, layers })
    }

    pub fn get(&self, layer: LayerKind) -> &T {
        self.layers.get(&layer).unwrap_or(&self.default)
    }
}

/// One choropleth color stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub value: f64,
    pub color: RGBAColor,
}

/// Parse `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
pub fn parse_color(s: &str) -> Option<RGBAColor> {
    static RGBA: OnceLock<Regex> = OnceLock::new();
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        return Some(RGBAColor(r, g, b, 1.0));
    }
    let re = RGBA.get_or_init(|| {
        Regex::new(r"^rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*([0-9.]+)\s*)?\)$")
            .expect("static regex")
    });
    let caps = re.captures(s)?;
    let channel = |i: usize| caps[i].parse::<u8>().ok();
    let alpha = match caps.get(4) {
        Some(m) => m.as_str().parse::<f64>().ok()?.clamp(0.0, 1.0),
        None => 1.0,
    };
    Some(RGBAColor(channel(1)?, channel(2)?, channel(3)?, alpha))
}

#[derive(Deserialize)]
struct RawTables {
    bubbles: BTreeMap<String, BTreeMap<String, BubbleExpression>>,
    scales: BTreeMap<String, BTreeMap<String, Vec<(f64, String)>>>,
}

fn parse_breakpoints(stat: &str, raw: Vec<(f64, String)>) -> Result<Vec<Breakpoint>> {
    if raw.is_empty() {
        return Err(ExportError::Config(format!("scale for `{stat}` is empty")));
    }
    let mut out = Vec::with_capacity(raw.len());
    for (value, color) in raw {
        let color = parse_color(&color).ok_or_else(|| {
            ExportError::Config(format!("scale for `{stat}` has invalid color `{color}`"))
        })?;
        if out.last().is_some_and(|b: &Breakpoint| b.value > value) {
            return Err(ExportError::Config(format!(
                "scale breakpoints for `{stat}` must ascend"
            )));
        }
        out.push(Breakpoint { value, color });
    }
    Ok(out)
}

/// Lookup tables shared read-only by every request.
#[derive(Debug, Clone)]
pub struct StatTables {
    bubbles: AHashMap<String, LayerTable<BubbleExpression>>,
    scales: AHashMap<String, LayerTable<Vec<Breakpoint>>>,
}

impl StatTables {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLES)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let raw: RawTables = serde_json::from_str(s)?;

        let mut bubbles = AHashMap::new();
        for (stat, layers) in raw.bubbles {
            let table = LayerTable::from_raw(&stat, layers)?;
            table.default.validate()?;
            for expr in table.layers.values() {
                expr.validate()?;
            }
            bubbles.insert(stat, table);
        }

        let mut scales = AHashMap::new();
        for (stat, layers) in raw.scales {
            let parsed = layers
                .into_iter()
                .map(|(k, v)| Ok((k, parse_breakpoints(&stat, v)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            scales.insert(stat.clone(), LayerTable::from_raw(&stat, parsed)?);
        }

        Ok(Self { bubbles, scales })
    }

    pub fn bubble(&self, stat: &str, layer: LayerKind) -> Result<&BubbleExpression> {
        self.bubbles
            .get(stat)
            .map(|t| t.get(layer))
            .ok_or_else(|| ExportError::MissingStatistic {
                table: "bubble",
                stat: stat.to_string(),
            })
    }

    pub fn scale(&self, stat: &str, layer: LayerKind) -> Result<&[Breakpoint]> {
        self.scales
            .get(stat)
            .map(|t| t.get(layer).as_slice())
            .ok_or_else(|| ExportError::MissingStatistic {
                table: "scale",
                stat: stat.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse() {
        assert_eq!(parse_color("#e24000"), Some(RGBAColor(0xe2, 0x40, 0x00, 1.0)));
        assert_eq!(
            parse_color("rgba(37, 51, 132, 0.9)"),
            Some(RGBAColor(37, 51, 132, 0.9))
        );
        assert_eq!(parse_color("rgb(1,2,3)"), Some(RGBAColor(1, 2, 3, 1.0)));
        assert_eq!(parse_color("hsl(0, 0%, 0%)"), None);
    }

    #[test]
    fn layer_falls_back_to_default() {
        let t = StatTables::builtin().unwrap();
        let states = t.bubble("er", LayerKind::States).unwrap();
        let tracts = t.bubble("er", LayerKind::Tracts).unwrap();
        assert_eq!(states.min.zoom, 2.0);
        assert_eq!(tracts, t.bubble("er", LayerKind::Unknown).unwrap());
        assert!(t.scale("pr", LayerKind::Counties).unwrap().len() >= 2);
    }

    #[test]
    fn unknown_statistic_is_config_error() {
        let t = StatTables::builtin().unwrap();
        assert!(matches!(
            t.bubble("zz", LayerKind::States),
            Err(ExportError::MissingStatistic { table: "bubble", .. })
        ));
        assert!(matches!(
            t.scale("zz", LayerKind::States),
            Err(ExportError::MissingStatistic { table: "scale", .. })
        ));
    }

    #[test]
    fn missing_default_rejected_at_load() {
        let json = r##"{"bubbles": {}, "scales": {"pr": {"states": [[0, "#ffffff"], [1, "#000000"]]}}}"##;
        let err = StatTables::from_json(json).unwrap_err();
        assert!(err.to_string().contains("default"));
    }
}
