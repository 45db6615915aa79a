//! Per-request view of the selection: translated, formatted and flagged.
//!
//! [`RenderedFeature`] is derived once per feature and never written back into the
//! input [`Feature`]. [`ReportContext`] bundles everything a producer needs (strings,
//! tables, chart settings, screenshots) for one request.

use chrono::{NaiveDate, Utc};

use crate::error::Result;
use crate::flags::{Flag, classify};
use crate::format::{
    cap_rate_value, diff_from_average, evictions_per_day, format_number, format_optional,
    format_value,
};
use crate::models::{ExportRequest, Feature};
use crate::screenshot::ScreenshotClient;
use crate::tables::StatTables;
use crate::translate::{ExportStrings, Language, Translations};
use crate::viz::legend::MapLegendText;
use crate::viz::{Chart, ChartImage, ImageFormat};

/// Size of the legend drawn under a feature's map screenshot.
pub const MAP_LEGEND_SIZE: (u32, u32) = (1320, 440);

/// One labelled, formatted statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub stat: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub geoid: String,
    /// Position in the request, used for screenshot addressing and series colors.
    pub index: usize,
    pub title_name: String,
    pub title: String,
    /// Formatted count of the bubble statistic's underlying total, if available.
    pub total: Option<String>,
    pub evictions_per_day: String,
    /// Bubble rate with `%`, capped at `>100`.
    pub rate: String,
    pub bullet_one: String,
    pub bullet_two: String,
    pub flag: Flag,
    pub flag_text: Option<String>,
    /// Formatted `(low, high)` confidence bounds of the bubble rate.
    pub ci: Option<(String, String)>,
    /// Signed difference between the national average and this feature's rate.
    pub us_diff: Option<String>,
    pub data_rows: Vec<StatRow>,
    pub dem_rows: Vec<StatRow>,
}

/// Count statistic behind a rate (`er` -> `e`, `efr` -> `ef`).
pub fn total_stat(bubble_stat: &str) -> &str {
    let mut chars = bubble_stat.char_indices();
    match chars.next_back() {
        Some((i, _)) if i > 0 => &bubble_stat[..i],
        _ => bubble_stat,
    }
}

fn rows(
    props: &[(String, String)],
    feature: &Feature,
    year: i32,
    lang: &str,
    unavailable: &str,
) -> Vec<StatRow> {
    props
        .iter()
        .map(|(stat, label)| StatRow {
            stat: stat.clone(),
            label: label.clone(),
            value: format_optional(stat, feature.value(stat, year), lang, unavailable),
        })
        .collect()
}

impl RenderedFeature {
    pub fn new(feature: &Feature, index: usize, request: &ExportRequest, language: &Language) -> Self {
        let s = &language.export;
        let lang = request.lang.as_str();
        let year = request.year;
        let bubble = request.bubble_stat();
        let title_name = s.title_name(feature);
        let kind = s.kind_text(bubble).to_lowercase();

        let total = feature
            .value(total_stat(bubble), year)
            .map(|v| format_number(v, lang));
        let title = match &total {
            Some(t) => s.feature_title(&title_name, t, &kind, year),
            None => s.feature_title_unavailable(&title_name, &kind, year),
        };

        let per_day = feature
            .value("e", year)
            .map(|v| format_number(evictions_per_day(v, year), lang))
            .unwrap_or_else(|| s.unavailable.clone());
        let rate_value = feature.value(bubble, year);
        let rate = rate_value
            .map(|v| format!("{}%", cap_rate_value(v, lang)))
            .unwrap_or_else(|| s.unavailable.clone());

        let flag = classify(feature, bubble, &request.year_suffix());
        let flag_text = match flag {
            Flag::None => None,
            Flag::Low => Some(s.flag_low.clone()),
            Flag::Maryland => Some(s.flag_maryland_filing.clone()),
            Flag::High => Some(s.flag_99th.clone()),
        };

        let ci = if request.display_ci {
            let lo = feature.value(&format!("{bubble}l"), year);
            let hi = feature.value(&format!("{bubble}h"), year);
            lo.zip(hi)
                .map(|(lo, hi)| (format_value(bubble, lo, lang), format_value(bubble, hi, lang)))
        } else {
            None
        };

        let us_diff = if request.show_us_average && !feature.is_us_average() {
            request
                .us_average_feature()
                .value(bubble, year)
                .zip(rate_value)
                .map(|(avg, v)| diff_from_average(avg, v))
        } else {
            None
        };

        Self {
            geoid: feature.geoid.clone(),
            index,
            title_name,
            title,
            bullet_one: s.feature_bullet_one(&per_day),
            bullet_two: s.feature_bullet_two(s.rate_text(bubble), &rate),
            total,
            evictions_per_day: per_day,
            rate,
            flag,
            flag_text,
            ci,
            us_diff,
            data_rows: rows(&language.data_props, feature, year, lang, &s.unavailable),
            dem_rows: rows(&language.dem_data_props, feature, year, lang, &s.unavailable),
        }
    }
}

/// Everything a producer needs for one request. Built per call.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub request: &'a ExportRequest,
    pub language: &'a Language,
    pub tables: &'a StatTables,
    pub image_format: ImageFormat,
    pub extract_date: NaiveDate,
    screenshots: Option<&'a ScreenshotClient>,
}

impl<'a> ReportContext<'a> {
    pub fn new(
        request: &'a ExportRequest,
        translations: &'a Translations,
        tables: &'a StatTables,
    ) -> Result<Self> {
        Ok(Self {
            request,
            language: translations.language(&request.lang)?,
            tables,
            image_format: ImageFormat::default(),
            extract_date: Utc::now().date_naive(),
            screenshots: None,
        })
    }

    pub fn with_screenshots(mut self, client: &'a ScreenshotClient) -> Self {
        self.screenshots = Some(client);
        self
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn with_extract_date(mut self, date: NaiveDate) -> Self {
        self.extract_date = date;
        self
    }

    pub fn strings(&self) -> &'a ExportStrings {
        &self.language.export
    }

    pub fn features(&self) -> Vec<RenderedFeature> {
        self.request
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| RenderedFeature::new(f, i, self.request, self.language))
            .collect()
    }

    pub fn extract_date_text(&self) -> String {
        self.strings()
            .title_extract_date(&self.extract_date.format("%Y-%m-%d").to_string())
    }

    /// Chart settings with the translated rate as axis title.
    pub fn chart(&self) -> Chart {
        let axis = self.strings().rate_text(self.request.bubble_stat());
        Chart::for_request(self.request, axis).with_format(self.image_format)
    }

    pub fn bar_chart_title(&self) -> String {
        let s = self.strings();
        s.bar_chart_title(s.rates_text(self.request.bubble_stat()), self.request.year)
    }

    pub fn line_chart_title(&self) -> String {
        let s = self.strings();
        s.line_chart_title(s.rates_text(self.request.bubble_stat()))
    }

    pub fn bar_chart(&self) -> Result<ChartImage> {
        Ok(self.chart().create_bar_chart(&self.request.chart_features())?)
    }

    pub fn line_chart(&self) -> Result<ChartImage> {
        Ok(self.chart().create_line_chart(&self.request.chart_features())?)
    }

    /// Legend swatch per charted series, in chart order, with its label.
    pub fn series_legends(&self) -> Result<Vec<(String, ChartImage)>> {
        let chart = self.chart();
        let s = self.strings();
        self.request
            .chart_features()
            .iter()
            .enumerate()
            .map(|(i, f)| -> Result<(String, ChartImage)> {
                let label = if f.is_us_average() {
                    s.label_us_avg.clone()
                } else {
                    s.title_name(f)
                };
                Ok((label, chart.create_line_chart_legend(f, i)?))
            })
            .collect()
    }

    pub fn map_legend(&self, feature: &Feature) -> Result<ChartImage> {
        let s = self.strings();
        let data_stat = self.request.data_stat();
        let text = MapLegendText {
            bubble: s.rate_text(self.request.bubble_stat()),
            data: self.language.prop_label(data_stat).unwrap_or(data_stat),
            no_data: &s.no_data,
        };
        let (w, h) = MAP_LEGEND_SIZE;
        self.chart()
            .create_map_legend(feature, w, h, data_stat, self.tables, text)
    }

    /// Map screenshot for the feature at `index`; `None` when unconfigured or failed.
    pub fn screenshot(&self, feature: &Feature, index: usize) -> Option<Vec<u8>> {
        self.screenshots?.fetch(
            feature,
            self.request.data_stat(),
            self.request.bubble_stat(),
            &self.request.year_suffix(),
            index,
        )
    }
}
