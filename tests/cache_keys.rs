mod common;

use eviction_export::derive_key;

#[test]
fn pa_ny_scenario_key() {
    let req = common::pa_ny_request(&["xlsx"]);
    assert_eq!(
        derive_key(&req, "xlsx"),
        "en/2015/2010-2016/pr/er/42/36/eviction_lab_export.xlsx"
    );
}

#[test]
fn key_is_deterministic() {
    let a = common::pa_ny_request(&["pdf"]);
    let b = common::pa_ny_request(&["pdf"]);
    assert_eq!(derive_key(&a, "pdf"), derive_key(&b, "pdf"));
}

#[test]
fn key_ignores_statistic_values_and_formats() {
    let a = common::pa_ny_request(&["pdf"]);
    let mut b = common::pa_ny_request(&["xlsx", "csv"]);
    b.features[0].stats.insert("er-15".into(), 99.0);
    assert_eq!(derive_key(&a, "zip"), derive_key(&b, "zip"));
}

#[test]
fn key_varies_with_every_addressing_field() {
    let base = common::pa_ny_request(&[]);
    let key = derive_key(&base, "zip");

    let mut r = base.clone();
    r.lang = "es".into();
    assert_ne!(derive_key(&r, "zip"), key);

    let mut r = base.clone();
    r.year = 2014;
    assert_ne!(derive_key(&r, "zip"), key);

    let mut r = base.clone();
    r.years.end = 2015;
    assert_ne!(derive_key(&r, "zip"), key);

    let mut r = base.clone();
    r.show_us_average = true;
    assert!(derive_key(&r, "zip").contains("/us/42/36/"));

    let mut r = base.clone();
    r.display_ci = true;
    assert!(derive_key(&r, "zip").ends_with("/36/ci/eviction_lab_export.zip"));

    assert_ne!(derive_key(&base, "pdf"), key);
}

#[test]
fn year_suffixed_props_are_normalized() {
    let mut req = common::pa_ny_request(&[]);
    req.data_prop = "pr-15".into();
    req.bubble_prop = "efr-15".into();
    assert_eq!(
        derive_key(&req, "csv"),
        "en/2015/2010-2016/pr/efr/42/36/eviction_lab_export.csv"
    );
}
