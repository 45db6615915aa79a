mod common;

use eviction_export::viz::bar::{FLOOR_FRACTION, MIN_Y_MAX};
use eviction_export::viz::{BarLayout, Chart, ImageFormat, LineLayout, SeriesStroke};
use plotters::style::RGBColor;
use std::fs;

fn chart(display_ci: bool) -> Chart {
    let mut req = common::pa_ny_request(&[]);
    req.display_ci = display_ci;
    Chart::for_request(&req, "Eviction Rate")
}

#[test]
fn bar_floor_keeps_small_values_visible() {
    let tiny = common::feature("01", "Tiny", &[("er-15", 0.04)]);
    let missing = common::feature("02", "Missing", &[("er-15", -1.0)]);
    let layout = BarLayout::new(&chart(false), &[tiny, missing]);

    assert_eq!(layout.y.domain, (0.0, MIN_Y_MAX));
    let expected = layout.y.map(0.0) - layout.y.map(MIN_Y_MAX * FLOOR_FRACTION);
    for bar in &layout.bars {
        assert!(bar.height() > 0.0);
        assert!((bar.height() - expected).abs() < 1.0);
    }
    assert_eq!(layout.bars[1].value, None);
}

#[test]
fn bar_domain_tracks_largest_value() {
    let req = common::pa_ny_request(&[]);
    let layout = BarLayout::new(&chart(false), &req.chart_features());
    assert_eq!(layout.y.domain, (0.0, 3.5));
    assert_eq!(layout.bars.len(), 2);
    assert!(layout.bars[0].height() > layout.bars[1].height());
}

#[test]
fn us_average_series_uses_halo() {
    let mut req = common::pa_ny_request(&[]);
    req.features.push(common::feature("06", "California", &[("er-15", 1.0)]));
    req.show_us_average = true;
    let layout = LineLayout::new(&chart(false), &req.chart_features());
    assert_eq!(layout.series.len(), 4);
    assert_eq!(layout.series[3].stroke, SeriesStroke::Halo);
    assert_eq!(layout.series[2].stroke, SeriesStroke::Dashed { on: 8.0, off: 8.0 });
}

#[test]
fn charts_write_svg_files() {
    let req = common::pa_ny_request(&[]);
    let features = req.chart_features();
    let dir = tempfile::tempdir().unwrap();
    let c = chart(true).with_format(ImageFormat::Svg);

    let outputs = [
        ("bar.svg", c.create_bar_chart(&features).unwrap()),
        ("line.svg", c.create_line_chart(&features).unwrap()),
        ("legend.svg", c.create_line_chart_legend(&features[0], 0).unwrap()),
        ("bar_ci.svg", c.create_bar_chart_ci_legend(RGBColor(0xe2, 0x40, 0x00)).unwrap()),
        ("line_ci.svg", c.create_line_chart_ci_legend(RGBColor(0x43, 0x48, 0x78)).unwrap()),
    ];
    for (name, image) in outputs {
        assert_eq!(image.format, ImageFormat::Svg);
        let path = dir.path().join(name);
        fs::write(&path, &image.bytes).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<svg"), "{name}");
    }
}

#[test]
fn data_uri_is_base64_svg() {
    let req = common::pa_ny_request(&[]);
    let image = chart(false).create_bar_chart(&req.features).unwrap();
    assert!(image.data_uri().starts_with("data:image/svg+xml;base64,PHN2Zy"));
    assert_eq!((image.width, image.height), (945, 532));
}
