use eviction_export::flags::{classify, is_high_flag, is_low_flag, is_maryland_filing};
use eviction_export::{Feature, Flag, LayerKind};
use std::collections::BTreeMap;

fn feature(geoid: &str, high_props: Option<&str>, low: bool) -> Feature {
    let mut stats = BTreeMap::new();
    if low {
        stats.insert("lf-15".to_string(), 1.0);
    }
    Feature {
        geoid: geoid.into(),
        layer: LayerKind::Counties,
        name: "Somewhere".into(),
        parent_location: "Somestate".into(),
        bbox: None,
        high_props: high_props.map(str::to_string),
        stats,
    }
}

#[test]
fn exactly_one_flag_per_triple() {
    let geoids = ["24005", "42101", "36061"];
    let highs = [None, Some("er-15"), Some("efr-15,er-15"), Some("efr-14")];
    let stats = ["er", "efr", "pr", "e"];
    for geoid in geoids {
        for high in highs {
            for low in [false, true] {
                let f = feature(geoid, high, low);
                for stat in stats {
                    let held = [
                        is_maryland_filing(&f, stat),
                        is_high_flag(&f, stat, "15"),
                        is_low_flag(&f, stat, "15"),
                    ];
                    assert!(
                        held.iter().filter(|b| **b).count() <= 1,
                        "{geoid} {high:?} {low} {stat}"
                    );
                    let expected = match held {
                        [true, _, _] => Flag::Maryland,
                        [_, true, _] => Flag::High,
                        [_, _, true] => Flag::Low,
                        _ => Flag::None,
                    };
                    assert_eq!(classify(&f, stat, "15"), expected);
                }
            }
        }
    }
}

#[test]
fn maryland_filing_overrides_upstream_high_list() {
    let f = feature("24510", Some("efr-15"), true);
    assert_eq!(classify(&f, "efr", "15"), Flag::Maryland);
    assert_eq!(classify(&f, "er", "15"), Flag::Low);
}

#[test]
fn high_list_matches_whole_entries_only() {
    let f = feature("42101", Some("efr-15"), false);
    assert_eq!(classify(&f, "er", "15"), Flag::None);
    assert_eq!(classify(&f, "efr", "15"), Flag::High);
    assert_eq!(classify(&f, "efr", "16"), Flag::None);
}

#[test]
fn low_flag_only_for_rates() {
    let f = feature("42101", None, true);
    assert_eq!(classify(&f, "pr", "15"), Flag::None);
    assert!(!Flag::None.is_flagged());
    assert!(classify(&f, "er", "15").is_flagged());
}
