//! Format-specific renderers behind one capability trait.
//!
//! The cache picks a [`Producer`] from a [`ProducerSet`] by [`ExportFormat`]. Template
//! driven formats (slides, documents) are registered by the embedding service; the crate
//! ships the data sheet as CSV and as a workbook, plus a self-contained HTML report, the
//! page the portable-document service prints.

use ahash::AHashMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rust_xlsxwriter::Workbook;
use std::fmt;
use std::str::FromStr;

use crate::error::{ExportError, Result};
use crate::report::{RenderedFeature, ReportContext, StatRow};
use crate::viz::ChartImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExportFormat {
    Pptx,
    Xlsx,
    Docx,
    Pdf,
    Csv,
    Html,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Pptx,
        ExportFormat::Xlsx,
        ExportFormat::Docx,
        ExportFormat::Pdf,
        ExportFormat::Csv,
        ExportFormat::Html,
    ];

    pub fn ext(&self) -> &'static str {
        match self {
            ExportFormat::Pptx => "pptx",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.ext() == lower)
            .ok_or_else(|| ExportError::UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

pub trait Producer: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// Asset-bucket key of the template this producer fills, if any.
    fn template_key(&self) -> Option<&str> {
        None
    }

    fn create_file(&self, ctx: &ReportContext<'_>) -> Result<Vec<u8>>;
}

/// Producers keyed by the format they create.
#[derive(Default)]
pub struct ProducerSet {
    producers: AHashMap<ExportFormat, Box<dyn Producer>>,
}

impl fmt::Debug for ProducerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.formats()).finish()
    }
}

impl ProducerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSV, spreadsheet and HTML producers.
    pub fn builtin() -> Self {
        Self::new()
            .with(CsvProducer)
            .with(XlsxProducer)
            .with(HtmlProducer)
    }

    /// Register `producer`, replacing any earlier one for its format.
    pub fn with(mut self, producer: impl Producer + 'static) -> Self {
        self.register(producer);
        self
    }

    pub fn register(&mut self, producer: impl Producer + 'static) {
        self.producers.insert(producer.format(), Box::new(producer));
    }

    pub fn get(&self, format: ExportFormat) -> Result<&dyn Producer> {
        self.producers
            .get(&format)
            .map(|p| p.as_ref())
            .ok_or_else(|| ExportError::UnknownFormat(format.to_string()))
    }

    pub fn formats(&self) -> Vec<ExportFormat> {
        let mut out: Vec<ExportFormat> = self.producers.keys().copied().collect();
        out.sort();
        out
    }
}

/// Prefix cells a spreadsheet would evaluate as a formula.
pub fn escape_formula(cell: &str) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{cell}"),
        _ => cell.to_string(),
    }
}

/// One cell of the data sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

/// Codebook data shared by the CSV and spreadsheet producers: one row per feature and
/// year with every statistic, the US average last when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataSheet {
    pub fn new(ctx: &ReportContext<'_>) -> Self {
        let stats: Vec<&str> = ctx
            .language
            .data_props
            .iter()
            .chain(ctx.language.dem_data_props.iter())
            .map(|(id, _)| id.as_str())
            .collect();

        let mut header: Vec<String> = ["GEOID", "name", "parent-location", "year"]
            .into_iter()
            .map(String::from)
            .collect();
        header.extend(stats.iter().map(|s| s.to_string()));

        let mut features = ctx.request.features.clone();
        if ctx.request.show_us_average {
            features.push(ctx.request.us_average_feature());
        }
        let mut rows = Vec::with_capacity(features.len() * ctx.request.years.len());
        for f in &features {
            for year in ctx.request.years.years() {
                let mut row = vec![
                    Cell::Text(f.geoid.clone()),
                    Cell::Text(f.name.clone()),
                    Cell::Text(f.parent_location.clone()),
                    Cell::Number(year as f64),
                ];
                row.extend(
                    stats
                        .iter()
                        .map(|s| f.value(s, year).map_or(Cell::Empty, Cell::Number)),
                );
                rows.push(row);
            }
        }
        Self { header, rows }
    }
}

/// The data sheet as comma-separated text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvProducer;

impl Producer for CsvProducer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn create_file(&self, ctx: &ReportContext<'_>) -> Result<Vec<u8>> {
        let sheet = DataSheet::new(ctx);
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&sheet.header)?;
        for row in &sheet.rows {
            wtr.write_record(row.iter().map(|cell| match cell {
                Cell::Text(t) => escape_formula(t),
                Cell::Number(n) => n.to_string(),
                Cell::Empty => String::new(),
            }))?;
        }
        wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }
}

/// Name of the single worksheet in spreadsheet exports.
pub const SHEET_NAME: &str = "Data";

/// The data sheet as an Excel workbook with typed numeric cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxProducer;

impl Producer for XlsxProducer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn create_file(&self, ctx: &ReportContext<'_>) -> Result<Vec<u8>> {
        let sheet = DataSheet::new(ctx);
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;
        for (col, title) in sheet.header.iter().enumerate() {
            worksheet.write_string(0, col as u16, title.as_str())?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(t) => {
                        worksheet.write_string(r, col, t.as_str())?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, col, *n)?;
                    }
                    Cell::Empty => {}
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn img(src: &str, alt: &str, class: &str) -> String {
    format!(
        "<img class=\"{class}\" alt=\"{}\" src=\"{src}\">\n",
        escape_html(alt)
    )
}

fn chart_img(chart: &ChartImage, alt: &str, class: &str) -> String {
    img(&chart.data_uri(), alt, class)
}

fn stat_table(rows: &[StatRow]) -> String {
    let mut out = String::from("<table>\n");
    for r in rows {
        out.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape_html(&r.label),
            escape_html(&r.value)
        ));
    }
    out.push_str("</table>\n");
    out
}

/// Self-contained report page with charts and screenshots inlined as data URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlProducer;

impl HtmlProducer {
    fn feature_section(
        &self,
        ctx: &ReportContext<'_>,
        rendered: &RenderedFeature,
    ) -> Result<String> {
        let s = ctx.strings();
        let feature = &ctx.request.features[rendered.index];
        let mut out = format!(
            "<section class=\"feature\">\n<h2>{}</h2>\n<ul>\n<li>{}</li>\n<li>{}</li>\n</ul>\n",
            escape_html(&rendered.title),
            escape_html(&rendered.bullet_one),
            escape_html(&rendered.bullet_two),
        );
        if let Some((lo, hi)) = &rendered.ci {
            out.push_str(&format!(
                "<p class=\"ci\">{}: {} {} / {} {}</p>\n",
                escape_html(&s.confidence_interval),
                escape_html(&s.min_abbrev),
                escape_html(lo),
                escape_html(&s.max_abbrev),
                escape_html(hi)
            ));
        }
        if let Some(diff) = &rendered.us_diff {
            out.push_str(&format!(
                "<p class=\"us-diff\">{}: {}</p>\n",
                escape_html(&s.label_us_avg),
                escape_html(diff)
            ));
        }
        if let Some(text) = &rendered.flag_text {
            out.push_str(&format!("<p class=\"flag\">{}</p>\n", escape_html(text)));
        }
        if let Some(png) = ctx.screenshot(feature, rendered.index) {
            let uri = format!("data:image/png;base64,{}", STANDARD.encode(png));
            out.push_str(&img(&uri, &rendered.title_name, "map"));
        }
        out.push_str(&chart_img(&ctx.map_legend(feature)?, &rendered.title_name, "map-legend"));
        out.push_str(&stat_table(&rendered.data_rows));
        out.push_str(&format!("<h3>{}</h3>\n", escape_html(&s.demographic_breakdown)));
        out.push_str(&stat_table(&rendered.dem_rows));
        out.push_str("</section>\n");
        Ok(out)
    }
}

impl Producer for HtmlProducer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn create_file(&self, ctx: &ReportContext<'_>) -> Result<Vec<u8>> {
        let s = ctx.strings();
        let features = ctx.features();
        let names: Vec<&str> = features.iter().map(|f| f.title_name.as_str()).collect();
        let heading = format!("{} {}", s.title_intro, names.join(" / "));

        let mut html = format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n",
            escape_html(&ctx.request.lang),
            escape_html(&heading)
        );
        html.push_str(&format!(
            "<header>\n<h1>{}</h1>\n<p>{}</p>\n<p>{}</p>\n<p>{}</p>\n</header>\n",
            escape_html(&heading),
            escape_html(&s.title_source),
            escape_html(&ctx.extract_date_text()),
            escape_html(&s.title_web_link)
        ));
        for rendered in &features {
            html.push_str(&self.feature_section(ctx, rendered)?);
        }

        html.push_str("<section class=\"comparison\">\n");
        html.push_str(&format!("<h2>{}</h2>\n", escape_html(&ctx.bar_chart_title())));
        html.push_str(&chart_img(&ctx.bar_chart()?, &ctx.bar_chart_title(), "chart"));
        html.push_str(&format!("<h2>{}</h2>\n", escape_html(&ctx.line_chart_title())));
        html.push_str(&chart_img(&ctx.line_chart()?, &ctx.line_chart_title(), "chart"));
        html.push_str("<ul class=\"legend\">\n");
        for (label, swatch) in ctx.series_legends()? {
            html.push_str(&format!(
                "<li>{}{}</li>\n",
                chart_img(&swatch, &label, "swatch").trim_end(),
                escape_html(&label)
            ));
        }
        html.push_str("</ul>\n</section>\n");

        let note = if ctx.request.bubble_stat() == "er" {
            &s.feature_eviction_rate_description
        } else {
            &s.feature_eviction_filing_rate_description
        };
        html.push_str(&format!("<footer><p>{}</p></footer>\n", escape_html(note)));
        html.push_str("</body>\n</html>\n");
        Ok(html.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExportRequest, Feature, LayerKind, YearRange};
    use crate::tables::StatTables;
    use crate::translate::Translations;
    use std::collections::BTreeMap;

    fn request() -> ExportRequest {
        let mut stats = BTreeMap::new();
        stats.insert("er-15".to_string(), 3.5);
        stats.insert("e-15".to_string(), 1234.0);
        stats.insert("er-14".to_string(), -1.0);
        ExportRequest {
            lang: "en".into(),
            year: 2015,
            years: YearRange::new(2014, 2015),
            features: vec![Feature {
                geoid: "42".into(),
                layer: LayerKind::States,
                name: "=Pennsylvania".into(),
                parent_location: "USA".into(),
                bbox: None,
                high_props: None,
                stats,
            }],
            data_prop: "pr".into(),
            bubble_prop: "er".into(),
            show_us_average: false,
            us_average: BTreeMap::new(),
            display_ci: false,
            formats: vec!["csv".into(), "html".into()],
        }
    }

    #[test]
    fn format_lookup() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            "odt".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
        let set = ProducerSet::builtin();
        assert_eq!(
            set.formats(),
            vec![ExportFormat::Xlsx, ExportFormat::Csv, ExportFormat::Html]
        );
        assert!(set.get(ExportFormat::Pptx).is_err());
        assert_eq!(set.get(ExportFormat::Csv).unwrap().template_key(), None);
    }

    #[test]
    fn formula_cells_are_escaped() {
        assert_eq!(escape_formula("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(escape_formula("-1"), "'-1");
        assert_eq!(escape_formula("Ohio"), "Ohio");
    }

    #[test]
    fn csv_has_row_per_feature_year() {
        let (tr, tables) = (Translations::builtin().unwrap(), StatTables::builtin().unwrap());
        let req = request();
        let ctx = ReportContext::new(&req, &tr, &tables).unwrap();
        let bytes = CsvProducer.create_file(&ctx).unwrap();
        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let headers = rdr.headers().unwrap().clone();
        let er = headers.iter().position(|h| h == "er").unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "'=Pennsylvania");
        assert_eq!(&rows[0][3], "2014");
        assert_eq!(&rows[0][er], "");
        assert_eq!(&rows[1][er], "3.5");
    }

    #[test]
    fn data_sheet_keeps_numbers_typed() {
        let (tr, tables) = (Translations::builtin().unwrap(), StatTables::builtin().unwrap());
        let req = request();
        let ctx = ReportContext::new(&req, &tr, &tables).unwrap();
        let sheet = DataSheet::new(&ctx);
        let er = sheet.header.iter().position(|h| h == "er").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], Cell::Text("42".into()));
        assert_eq!(sheet.rows[1][3], Cell::Number(2015.0));
        assert_eq!(sheet.rows[0][er], Cell::Empty);
        assert_eq!(sheet.rows[1][er], Cell::Number(3.5));
    }

    #[test]
    fn xlsx_is_a_workbook_with_a_data_sheet() {
        use std::io::Read;

        let (tr, tables) = (Translations::builtin().unwrap(), StatTables::builtin().unwrap());
        let req = request();
        let ctx = ReportContext::new(&req, &tr, &tables).unwrap();
        let bytes = XlsxProducer.create_file(&ctx).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut workbook = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut workbook)
            .unwrap();
        assert!(workbook.contains(r#"name="Data""#));
        assert!(archive.by_name("xl/worksheets/sheet1.xml").is_ok());
    }

    #[test]
    fn html_report_inlines_charts() {
        let (tr, tables) = (Translations::builtin().unwrap(), StatTables::builtin().unwrap());
        let req = request();
        let ctx = ReportContext::new(&req, &tr, &tables).unwrap();
        let html = String::from_utf8(HtmlProducer.create_file(&ctx).unwrap()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("=Pennsylvania experienced 1,234 evictions in 2015"));
        assert!(html.contains("data:image/svg+xml;base64,"));
        assert!(html.contains("Comparison of Eviction Rates over time"));
    }
}
