//! Content-addressed export cache.
//!
//! Every artifact lives under a key derived only from the request, so a repeated request
//! finds the stored file and skips generation. The existence check and the upload are
//! not atomic: two concurrent misses both generate and the last write wins, which is
//! harmless because both produce the same bytes.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::archive;
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::models::ExportRequest;
use crate::producer::{ExportFormat, ProducerSet};
use crate::report::ReportContext;
use crate::screenshot::ScreenshotClient;
use crate::sibling::SiblingRenderer;
use crate::storage::{Disposition, HttpObjectStore, ObjectStore, Visibility};
use crate::tables::StatTables;
use crate::translate::Translations;
use crate::viz::{ImageFormat, register_font_file};

/// File stem of every export.
pub const EXPORT_STEM: &str = "eviction_lab_export";

/// Storage key for `request` rendered as `ext`:
/// `lang/year/start-end/dataProp/bubbleProp/[us/]geoid.../[ci/]eviction_lab_export.{ext}`.
///
/// GEOIDs keep the caller's order, so the same areas selected in a different order map
/// to a different key.
pub fn derive_key(request: &ExportRequest, ext: &str) -> String {
    let mut parts = key_prefix(request);
    parts.push(format!("{EXPORT_STEM}.{ext}"));
    parts.join("/")
}

/// Storage key of the zip bundle. The recognised formats, sorted and de-duplicated, sit
/// between the selection and the file name so bundles of different contents never share
/// a key: `.../geoid.../[ci/]csv/html/eviction_lab_export.zip`.
pub fn derive_bundle_key(request: &ExportRequest) -> String {
    let mut parts = key_prefix(request);
    parts.extend(bundle_formats(request).iter().map(|f| f.ext().to_string()));
    parts.push(format!("{EXPORT_STEM}.zip"));
    parts.join("/")
}

/// Recognised formats of `request`, sorted by extension without duplicates.
pub fn bundle_formats(request: &ExportRequest) -> Vec<ExportFormat> {
    let mut formats: Vec<ExportFormat> = request
        .formats
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect();
    formats.sort_by_key(|f| f.ext());
    formats.dedup();
    formats
}

fn key_prefix(request: &ExportRequest) -> Vec<String> {
    let mut parts: Vec<String> = vec![
        request.lang.clone(),
        request.year.to_string(),
        format!("{}-{}", request.years.start, request.years.end),
        request.data_stat().to_string(),
        request.bubble_stat().to_string(),
    ];
    if request.show_us_average {
        parts.push("us".into());
    }
    parts.extend(request.features.iter().map(|f| f.geoid.clone()));
    if request.display_ci {
        parts.push("ci".into());
    }
    parts
}

/// A produced file and the key it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub cache_key: String,
    pub file_ext: String,
    pub bytes: Vec<u8>,
}

pub struct ExportCache {
    config: ExportConfig,
    store: Arc<dyn ObjectStore>,
    producers: ProducerSet,
    tables: StatTables,
    translations: Translations,
    sibling: Option<SiblingRenderer>,
    screenshots: Option<ScreenshotClient>,
    image_format: ImageFormat,
}

impl std::fmt::Debug for ExportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCache")
            .field("bucket", &self.config.bucket())
            .field("producers", &self.producers)
            .field("sibling", &self.sibling.as_ref().map(|s| &s.endpoint))
            .field("image_format", &self.image_format)
            .finish()
    }
}

impl ExportCache {
    /// Cache over `store` with tables and translations loaded from `config`.
    pub fn new(config: ExportConfig, store: Arc<dyn ObjectStore>, producers: ProducerSet) -> Result<Self> {
        let tables = config.load_tables()?;
        let translations = config.load_translations()?;
        Ok(Self {
            config,
            store,
            producers,
            tables,
            translations,
            sibling: None,
            screenshots: None,
            image_format: ImageFormat::default(),
        })
    }

    /// Fully wired cache: HTTP object store, built-in producers, the screenshot service,
    /// and the document render service when `pdf_path` is set. A configured font
    /// switches charts to PNG.
    pub fn from_config(config: ExportConfig) -> Result<Self> {
        let store = Arc::new(HttpObjectStore::new(config.storage_endpoint.clone())?);
        let screenshots = ScreenshotClient::new(config.screenshot_base.clone())?;
        let sibling = config
            .pdf_path
            .clone()
            .map(SiblingRenderer::new)
            .transpose()?;
        let font = config.font_path.clone();
        let mut cache = Self::new(config, store, ProducerSet::builtin())?.with_screenshots(screenshots);
        if let Some(s) = sibling {
            cache = cache.with_sibling(s);
        }
        if let Some(path) = font {
            register_font_file(&path)?;
            cache = cache.with_image_format(ImageFormat::Png);
        }
        Ok(cache)
    }

    pub fn with_sibling(mut self, sibling: SiblingRenderer) -> Self {
        self.sibling = Some(sibling);
        self
    }

    pub fn with_screenshots(mut self, client: ScreenshotClient) -> Self {
        self.screenshots = Some(client);
        self
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn url(&self, key: &str) -> String {
        self.config.object_url(key)
    }

    /// Whether `key` is stored. Failed checks count as a miss.
    pub fn exists(&self, key: &str) -> bool {
        match self.store.exists(&self.config.bucket(), key) {
            Ok(found) => found,
            Err(e) => {
                debug!("existence check for {key} failed, treating as miss: {e}");
                false
            }
        }
    }

    /// Per-call report context for `request`.
    pub fn context<'a>(&'a self, request: &'a ExportRequest) -> Result<ReportContext<'a>> {
        let mut ctx = ReportContext::new(request, &self.translations, &self.tables)?
            .with_image_format(self.image_format);
        if let Some(client) = &self.screenshots {
            ctx = ctx.with_screenshots(client);
        }
        Ok(ctx)
    }

    /// Generate `format` for `request` without touching the store.
    pub fn create(&self, request: &ExportRequest, format: ExportFormat) -> Result<ExportArtifact> {
        let bytes = self.produce(request, format)?;
        Ok(ExportArtifact {
            cache_key: derive_key(request, format.ext()),
            file_ext: format.ext().to_string(),
            bytes,
        })
    }

    /// URL of the stored artifact, generating and uploading it on a miss.
    pub fn get_or_create(&self, request: &ExportRequest, format: ExportFormat) -> Result<String> {
        request.validate()?;
        let key = derive_key(request, format.ext());
        if self.exists(&key) {
            debug!("cache hit {key}");
            return Ok(self.url(&key));
        }
        debug!("cache miss {key}");
        let artifact = self.create(request, format)?;
        self.upload(&artifact)?;
        Ok(self.url(&artifact.cache_key))
    }

    /// URL of a zip holding every requested format, reusing stored per-format files.
    pub fn get_or_create_bundle(&self, request: &ExportRequest) -> Result<String> {
        request.validate()?;
        let key = derive_bundle_key(request);
        if self.exists(&key) {
            debug!("cache hit {key}");
            return Ok(self.url(&key));
        }
        debug!("cache miss {key}");

        for name in &request.formats {
            if let Err(e) = name.parse::<ExportFormat>() {
                warn!("skipping bundle entry: {e}");
            }
        }
        let mut entries: Vec<(ExportFormat, Vec<u8>)> = Vec::new();
        for format in bundle_formats(request) {
            match self.bundle_entry(request, format) {
                Ok(bytes) => entries.push((format, bytes)),
                Err(ExportError::UnknownFormat(f)) => {
                    warn!("skipping bundle entry: no producer for `{f}`");
                }
                Err(e) => return Err(e),
            }
        }
        if entries.is_empty() {
            return Err(ExportError::InvalidRequest(format!(
                "none of the requested formats {:?} could be produced",
                request.formats
            )));
        }

        let bytes = archive::pack(entries.iter().map(|(f, b)| (f.ext(), b.as_slice())))?;
        let artifact = ExportArtifact {
            cache_key: key,
            file_ext: "zip".into(),
            bytes,
        };
        self.upload(&artifact)?;
        Ok(self.url(&artifact.cache_key))
    }

    /// Stored bytes for one bundle member, or freshly produced (and stored) ones.
    fn bundle_entry(&self, request: &ExportRequest, format: ExportFormat) -> Result<Vec<u8>> {
        let key = derive_key(request, format.ext());
        if self.exists(&key) {
            match self.store.get(&self.config.bucket(), &key) {
                Ok(bytes) => {
                    debug!("bundle reuses {key}");
                    return Ok(bytes);
                }
                Err(e) => warn!("stored {key} unreadable, regenerating: {e}"),
            }
        }
        let artifact = self.create(request, format)?;
        self.upload(&artifact)?;
        Ok(artifact.bytes)
    }

    /// Bytes for `format`. The document service handles PDF when configured; its
    /// failure falls back to the local producer.
    fn produce(&self, request: &ExportRequest, format: ExportFormat) -> Result<Vec<u8>> {
        if format == ExportFormat::Pdf {
            if let Some(sibling) = &self.sibling {
                match sibling.render(request) {
                    Ok(bytes) => return Ok(bytes),
                    Err(e) => warn!("render service failed, producing locally: {e}"),
                }
            }
        }
        let producer = self.producers.get(format)?;
        let ctx = self.context(request)?;
        producer.create_file(&ctx)
    }

    fn upload(&self, artifact: &ExportArtifact) -> Result<()> {
        info!(
            "uploading {} ({} bytes)",
            artifact.cache_key,
            artifact.bytes.len()
        );
        self.store.put(
            &self.config.bucket(),
            &artifact.cache_key,
            &artifact.bytes,
            Visibility::PublicRead,
            Disposition::Attachment,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, LayerKind, YearRange};
    use std::collections::BTreeMap;

    fn feature(geoid: &str) -> Feature {
        Feature {
            geoid: geoid.into(),
            layer: LayerKind::States,
            name: geoid.into(),
            parent_location: String::new(),
            bbox: None,
            high_props: None,
            stats: BTreeMap::new(),
        }
    }

    fn request(geoids: &[&str]) -> ExportRequest {
        ExportRequest {
            lang: "en".into(),
            year: 2015,
            years: YearRange::new(2010, 2016),
            features: geoids.iter().map(|g| feature(g)).collect(),
            data_prop: "pr-15".into(),
            bubble_prop: "er-15".into(),
            show_us_average: false,
            us_average: BTreeMap::new(),
            display_ci: false,
            formats: vec![],
        }
    }

    #[test]
    fn key_layout() {
        let req = request(&["42", "36"]);
        assert_eq!(
            derive_key(&req, "xlsx"),
            "en/2015/2010-2016/pr/er/42/36/eviction_lab_export.xlsx"
        );
    }

    #[test]
    fn key_markers_and_order() {
        let mut req = request(&["36", "42"]);
        req.show_us_average = true;
        req.display_ci = true;
        assert_eq!(
            derive_key(&req, "zip"),
            "en/2015/2010-2016/pr/er/us/36/42/ci/eviction_lab_export.zip"
        );
        assert_ne!(derive_key(&req, "zip"), derive_key(&request(&["42", "36"]), "zip"));
    }

    #[test]
    fn bundle_key_lists_sorted_formats() {
        let mut req = request(&["42", "36"]);
        req.formats = vec!["html".into(), "CSV".into(), "odt".into(), "csv".into()];
        assert_eq!(
            derive_bundle_key(&req),
            "en/2015/2010-2016/pr/er/42/36/csv/html/eviction_lab_export.zip"
        );
        req.formats = vec!["csv".into()];
        assert_eq!(
            derive_bundle_key(&req),
            "en/2015/2010-2016/pr/er/42/36/csv/eviction_lab_export.zip"
        );
    }

    #[test]
    fn none_bubble_falls_back_to_eviction_rate() {
        let mut req = request(&["42"]);
        req.bubble_prop = "none".into();
        assert_eq!(derive_key(&req, "pdf"), "en/2015/2010-2016/pr/er/42/eviction_lab_export.pdf");
    }
}
