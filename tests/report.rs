mod common;

use eviction_export::tables::StatTables;
use eviction_export::translate::Translations;
use eviction_export::{Flag, RenderedFeature, ReportContext};

#[test]
fn unavailable_total_uses_language_string() {
    let tr = Translations::builtin().unwrap();
    for (lang, unavailable) in [("en", "Unavailable"), ("es", "No disponible")] {
        let mut req = common::pa_ny_request(&[]);
        req.lang = lang.into();
        req.features[0].stats.insert("e-15".into(), -1.0);
        let rf = RenderedFeature::new(&req.features[0], 0, &req, tr.language(lang).unwrap());
        assert_eq!(rf.total, None);
        assert_eq!(rf.evictions_per_day, unavailable);
        let e = rf.data_rows.iter().find(|r| r.stat == "e").unwrap();
        assert_eq!(e.value, unavailable);
        // The input feature is never rewritten.
        assert_eq!(req.features[0].raw("e-15"), Some(-1.0));
    }
}

#[test]
fn context_renders_every_feature_in_order() {
    let (tr, tables) = (Translations::builtin().unwrap(), StatTables::builtin().unwrap());
    let mut req = common::pa_ny_request(&[]);
    req.show_us_average = true;
    let ctx = ReportContext::new(&req, &tr, &tables).unwrap();
    let features = ctx.features();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].title, "Pennsylvania experienced 24,601 evictions in 2015");
    assert_eq!(features[1].title_name, "New York");
    assert_eq!(features[1].rate, "1.6%");
    assert_eq!(features[0].us_diff.as_deref(), Some("-1.16"));
    assert_eq!(features[1].us_diff.as_deref(), Some("+0.74"));
    assert!(features.iter().all(|f| f.flag == Flag::None));
    assert_eq!(ctx.series_legends().unwrap().len(), 3);
}

#[test]
fn filing_rate_requests_describe_filings() {
    let tr = Translations::builtin().unwrap();
    let mut req = common::pa_ny_request(&[]);
    req.bubble_prop = "efr".into();
    req.features[0].stats.insert("ef-15".into(), 50000.0);
    req.features[0].stats.insert("efr-15".into(), 150.0);
    let rf = RenderedFeature::new(&req.features[0], 0, &req, tr.language("en").unwrap());
    assert_eq!(rf.title, "Pennsylvania experienced 50,000 eviction filings in 2015");
    assert_eq!(rf.rate, ">100%");
    assert!(rf.bullet_two.starts_with("Eviction Filing Rate"));
}

#[test]
fn spanish_titles_are_translated() {
    let (tr, tables) = (Translations::builtin().unwrap(), StatTables::builtin().unwrap());
    let mut req = common::pa_ny_request(&[]);
    req.lang = "es".into();
    let ctx = ReportContext::new(&req, &tr, &tables).unwrap();
    let english = Translations::builtin().unwrap();
    let en = english.language("en").unwrap();
    assert_ne!(ctx.bar_chart_title(), en.export.bar_chart_title);
    assert_ne!(ctx.features()[0].title, "Pennsylvania experienced 24,601 evictions in 2015");
}
