//! Language-keyed export strings.
//!
//! Every key is a required struct field, so a language missing a string fails at load
//! time instead of in the middle of a render. Parameterized strings use `{var}`
//! placeholders filled by the helper methods below.

use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{ExportError, Result};
use crate::models::{Feature, LayerKind};

const BUILTIN_TRANSLATIONS: &str = include_str!("../assets/translations.json");

#[derive(Debug, Clone, Deserialize)]
pub struct ExportStrings {
    pub title_intro: String,
    pub title_source: String,
    pub title_extract_date: String,
    pub title_web_link: String,
    pub unavailable: String,
    pub eviction: String,
    pub evictions: String,
    pub eviction_filing: String,
    pub eviction_filings: String,
    pub eviction_rate: String,
    pub eviction_filing_rate: String,
    pub eviction_rates: String,
    pub eviction_filing_rates: String,
    pub evictions_per_day: String,
    pub feature_title: String,
    pub feature_title_unavailable: String,
    pub feature_bullet_one: String,
    pub feature_bullet_two: String,
    pub feature_eviction_rate_description: String,
    pub feature_eviction_filing_rate_description: String,
    pub demographic_breakdown: String,
    pub bar_chart_title: String,
    pub line_chart_title: String,
    pub no_data: String,
    pub flag_99th: String,
    pub flag_low: String,
    pub flag_maryland_filing: String,
    pub tract_singular: String,
    pub block_group_singular: String,
    pub label_us_avg: String,
    pub min_abbrev: String,
    pub max_abbrev: String,
    pub confidence_interval: String,
}

/// Replace `{var}` placeholders; unknown placeholders are left as written.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("static regex"));
    re.replace_all(template, |caps: &Captures| {
        vars.iter()
            .find(|(k, _)| *k == &caps[1])
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

impl ExportStrings {
    pub fn feature_title(&self, name: &str, total: &str, kind: &str, year: i32) -> String {
        fill(
            &self.feature_title,
            &[("name", name), ("total", total), ("kind", kind), ("year", &year.to_string())],
        )
    }

    pub fn feature_title_unavailable(&self, name: &str, kind: &str, year: i32) -> String {
        fill(
            &self.feature_title_unavailable,
            &[("name", name), ("kind", kind), ("year", &year.to_string())],
        )
    }

    pub fn feature_bullet_one(&self, total: &str) -> String {
        fill(&self.feature_bullet_one, &[("total", total)])
    }

    pub fn feature_bullet_two(&self, rate_desc: &str, rate: &str) -> String {
        fill(&self.feature_bullet_two, &[("rate_desc", rate_desc), ("rate", rate)])
    }

    pub fn bar_chart_title(&self, subject: &str, year: i32) -> String {
        fill(&self.bar_chart_title, &[("subject", subject), ("year", &year.to_string())])
    }

    pub fn line_chart_title(&self, subject: &str) -> String {
        fill(&self.line_chart_title, &[("subject", subject)])
    }

    pub fn title_extract_date(&self, date: &str) -> String {
        fill(&self.title_extract_date, &[("date", date)])
    }

    /// Axis/legend wording for the bubble statistic.
    pub fn rate_text(&self, bubble_stat: &str) -> &str {
        if bubble_stat == "er" {
            &self.eviction_rate
        } else {
            &self.eviction_filing_rate
        }
    }

    pub fn rates_text(&self, bubble_stat: &str) -> &str {
        if bubble_stat == "er" {
            &self.eviction_rates
        } else {
            &self.eviction_filing_rates
        }
    }

    pub fn kind_text(&self, bubble_stat: &str) -> &str {
        if bubble_stat == "er" {
            &self.evictions
        } else {
            &self.eviction_filings
        }
    }

    /// Heading used for a feature: states by name, small geographies with their parent.
    pub fn title_name(&self, feature: &Feature) -> String {
        match feature.layer {
            LayerKind::States | LayerKind::Unknown => feature.name.clone(),
            LayerKind::Tracts => format!(
                "{} {}, {}",
                self.tract_singular, feature.name, feature.parent_location
            ),
            LayerKind::BlockGroups => format!(
                "{} {}, {}",
                self.block_group_singular, feature.name, feature.parent_location
            ),
            LayerKind::Counties | LayerKind::Cities => {
                format!("{}, {}", feature.name, feature.parent_location)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Language {
    pub export: ExportStrings,
    /// Eviction statistics, in display order.
    pub data_props: Vec<(String, String)>,
    /// Census statistics, in display order.
    pub dem_data_props: Vec<(String, String)>,
}

impl Language {
    /// Display label of a statistic from either list.
    pub fn prop_label(&self, stat: &str) -> Option<&str> {
        self.data_props
            .iter()
            .chain(self.dem_data_props.iter())
            .find(|(id, _)| id == stat)
            .map(|(_, label)| label.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Translations {
    languages: BTreeMap<String, Language>,
}

impl Translations {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TRANSLATIONS)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    pub fn language(&self, lang: &str) -> Result<&Language> {
        self.languages
            .get(lang)
            .ok_or_else(|| ExportError::MissingLanguage(lang.to_string()))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_both_languages() {
        let t = Translations::builtin().unwrap();
        assert_eq!(t.languages().collect::<Vec<_>>(), vec!["en", "es"]);
        assert_eq!(t.language("es").unwrap().export.unavailable, "No disponible");
        assert!(matches!(t.language("fr"), Err(ExportError::MissingLanguage(_))));
    }

    #[test]
    fn templates_fill() {
        let t = Translations::builtin().unwrap();
        let en = &t.language("en").unwrap().export;
        assert_eq!(
            en.feature_title("Pennsylvania", "1,234", "evictions", 2015),
            "Pennsylvania experienced 1,234 evictions in 2015"
        );
        assert_eq!(fill("{a} and {b}", &[("a", "x")]), "x and {b}");
    }

    #[test]
    fn missing_key_fails_at_load() {
        let broken = r#"{"en": {"export": {"unavailable": "n/a"}, "data_props": [], "dem_data_props": []}}"#;
        assert!(Translations::from_json(broken).is_err());
    }
}
