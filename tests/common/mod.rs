#![allow(dead_code)]

use eviction_export::{BBox, ExportRequest, Feature, LayerKind, YearRange};
use std::collections::BTreeMap;

pub fn feature(geoid: &str, name: &str, stats: &[(&str, f64)]) -> Feature {
    Feature {
        geoid: geoid.into(),
        layer: LayerKind::States,
        name: name.into(),
        parent_location: "USA".into(),
        bbox: Some(BBox {
            west: -80.52,
            south: 39.72,
            east: -74.69,
            north: 42.27,
        }),
        high_props: None,
        stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

/// Pennsylvania and New York, 2010-2016, poverty rate choropleth with eviction bubbles.
pub fn pa_ny_request(formats: &[&str]) -> ExportRequest {
    let pa = feature(
        "42",
        "Pennsylvania",
        &[("e-15", 24601.0), ("er-15", 3.5), ("er-14", 3.2), ("pr-15", 13.1)],
    );
    let ny = feature(
        "36",
        "New York",
        &[("e-15", 12345.0), ("er-15", 1.6), ("er-14", 1.8), ("pr-15", 15.4)],
    );
    let mut us_average = BTreeMap::new();
    us_average.insert("er-15".to_string(), 2.34);
    us_average.insert("er-14".to_string(), 2.4);
    ExportRequest {
        lang: "en".into(),
        year: 2015,
        years: YearRange::new(2010, 2016),
        features: vec![pa, ny],
        data_prop: "pr".into(),
        bubble_prop: "er".into(),
        show_us_average: false,
        us_average,
        display_ci: false,
        formats: formats.iter().map(|f| f.to_string()).collect(),
    }
}
