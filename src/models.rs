use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ExportError, Result};

/// Display name given to the synthetic national-average feature.
pub const US_AVERAGE_NAME: &str = "United States";
/// GEOID given to the synthetic national-average feature.
pub const US_AVERAGE_GEOID: &str = "0";

/// Geography level a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    States,
    Counties,
    Cities,
    Tracts,
    BlockGroups,
    /// Anything the front end sends that we do not know (e.g. the US average row).
    #[serde(other)]
    Unknown,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::States => "states",
            LayerKind::Counties => "counties",
            LayerKind::Cities => "cities",
            LayerKind::Tracts => "tracts",
            LayerKind::BlockGroups => "block-groups",
            LayerKind::Unknown => "",
        }
    }
}

/// Geographic bounds as `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self {
            west: v[0],
            south: v[1],
            east: v[2],
            north: v[3],
        }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.west, b.south, b.east, b.north]
    }
}

/// Inclusive year range, serialized as `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Every year in the range, in order.
    pub fn years(&self) -> Vec<i32> {
        (self.start..=self.end).collect()
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<[i32; 2]> for YearRange {
    fn from(v: [i32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<YearRange> for [i32; 2] {
    fn from(r: YearRange) -> Self {
        [r.start, r.end]
    }
}

/// Two-digit suffix used in statistic keys (`2015` -> `"15"`).
pub fn year_suffix(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

/// Property key for a statistic in a given year (`("er", 2015)` -> `"er-15"`).
pub fn stat_key(stat: &str, year: i32) -> String {
    format!("{}-{}", stat, year_suffix(year))
}

/// Serde helper: GEOIDs arrive as JSON strings or numbers depending on the layer.
/// Accept both and normalize to `String`.
fn de_string_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct GeoidVisitor;

    impl<'de> Visitor<'de> for GeoidVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer GEOID")
        }

        fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("negative GEOID"));
            }
            Ok(v.to_string())
        }

        fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(s.to_string())
        }
    }

    deserializer.deserialize_any(GeoidVisitor)
}

/// One selected geography with its sparse statistics.
///
/// `stats` maps `"{statistic}-{yy}"` to a number; `-1` marks an unavailable value.
/// Low-reliability markers live in the same map as `"lf-{yy}"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "GEOID", deserialize_with = "de_string_from_string_or_number")]
    pub geoid: String,
    #[serde(rename = "layerId", default = "unknown_layer")]
    pub layer: LayerKind,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "pl", default)]
    pub parent_location: String,
    #[serde(default)]
    pub bbox: Option<BBox>,
    /// Comma separated `stat-yy` entries computed upstream as top-percentile outliers.
    #[serde(rename = "highProps", default)]
    pub high_props: Option<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

fn unknown_layer() -> LayerKind {
    LayerKind::Unknown
}

impl Feature {
    /// Raw value for a property key, sentinel included.
    pub fn raw(&self, key: &str) -> Option<f64> {
        self.stats.get(key).copied()
    }

    /// Value of `stat` in `year`, or `None` when missing, negative (sentinel) or NaN.
    pub fn value(&self, stat: &str, year: i32) -> Option<f64> {
        self.raw(&stat_key(stat, year))
            .filter(|v| v.is_finite() && *v >= 0.0)
    }

    /// Two-digit state FIPS prefix of the GEOID.
    pub fn state_fips(&self) -> &str {
        self.geoid.get(..2).unwrap_or(&self.geoid)
    }

    pub fn has_high_marker(&self, stat_year: &str) -> bool {
        self.high_props
            .as_deref()
            .map(|s| s.split(',').any(|p| p.trim() == stat_year))
            .unwrap_or(false)
    }

    pub fn has_low_marker(&self, year_suffix: &str) -> bool {
        self.raw(&format!("lf-{year_suffix}"))
            .map(|v| v > 0.0)
            .unwrap_or(false)
    }

    pub fn is_us_average(&self) -> bool {
        self.geoid == US_AVERAGE_GEOID || self.name == US_AVERAGE_NAME
    }
}

/// Everything needed to build (and address) one export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub lang: String,
    pub year: i32,
    pub years: YearRange,
    pub features: Vec<Feature>,
    pub data_prop: String,
    pub bubble_prop: String,
    #[serde(default)]
    pub show_us_average: bool,
    #[serde(default)]
    pub us_average: BTreeMap<String, f64>,
    #[serde(rename = "displayCI", default)]
    pub display_ci: bool,
    #[serde(default)]
    pub formats: Vec<String>,
}

impl ExportRequest {
    /// Data statistic with any `-yy` suffix removed.
    pub fn data_stat(&self) -> &str {
        strip_year(&self.data_prop)
    }

    /// Bubble statistic with any `-yy` suffix removed; `none` falls back to eviction rate.
    pub fn bubble_stat(&self) -> &str {
        if self.bubble_prop.starts_with("none") {
            "er"
        } else {
            strip_year(&self.bubble_prop)
        }
    }

    pub fn year_suffix(&self) -> String {
        year_suffix(self.year)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() || self.features.len() > 3 {
            return Err(ExportError::InvalidRequest(format!(
                "expected 1 to 3 features, got {}",
                self.features.len()
            )));
        }
        if self.years.start > self.years.end {
            return Err(ExportError::InvalidRequest(format!(
                "year range {}-{} is reversed",
                self.years.start, self.years.end
            )));
        }
        Ok(())
    }

    /// Synthetic feature carrying the national averages.
    pub fn us_average_feature(&self) -> Feature {
        Feature {
            geoid: US_AVERAGE_GEOID.into(),
            layer: LayerKind::Unknown,
            name: US_AVERAGE_NAME.into(),
            parent_location: String::new(),
            bbox: None,
            high_props: None,
            stats: self.us_average.clone(),
        }
    }

    /// Features plotted in comparison charts: the selection, plus the US average when
    /// requested or when only one area is selected.
    pub fn chart_features(&self) -> Vec<Feature> {
        let mut out = self.features.clone();
        if self.show_us_average || self.features.len() == 1 {
            out.push(self.us_average_feature());
        }
        out
    }
}

fn strip_year(prop: &str) -> &str {
    prop.split('-').next().unwrap_or(prop)
}
