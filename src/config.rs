//! Deployment configuration, read from flags or the environment.

use clap::Args;
use std::path::PathBuf;

use crate::error::Result;
use crate::tables::StatTables;
use crate::translate::Translations;

/// Where exports are stored and which collaborators are reachable.
#[derive(Args, Clone, Debug)]
pub struct ExportConfig {
    /// Bucket receiving generated exports
    #[arg(long, env = "EXPORT_BUCKET", default_value = "eviction-lab-exports")]
    pub export_bucket: String,

    /// Bucket holding producer templates and fonts
    #[arg(long, env = "ASSET_BUCKET", default_value = "eviction-lab-export-assets")]
    pub asset_bucket: String,

    /// Deployment stage; `dev` switches to the `-dev` buckets
    #[arg(long, env = "STAGE", default_value = "prod")]
    pub stage: String,

    /// Object store endpoint used for reads and writes
    #[arg(long, env = "STORAGE_ENDPOINT", default_value = "https://s3.amazonaws.com")]
    pub storage_endpoint: String,

    /// Base of the public URLs handed back to callers
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "https://s3.amazonaws.com")]
    pub public_base_url: String,

    /// Map screenshot service
    #[arg(
        long,
        env = "SCREENSHOT_BASE",
        default_value = "https://screenshot.evictionlab.org"
    )]
    pub screenshot_base: String,

    /// Sibling service that renders the portable document, if deployed
    #[arg(long, env = "PDF_PATH")]
    pub pdf_path: Option<String>,

    /// TrueType font registered for PNG chart output
    #[arg(long, env = "EXPORT_FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// JSON file replacing the built-in bubble/scale tables
    #[arg(long, env = "EXPORT_TABLES_PATH")]
    pub tables_path: Option<PathBuf>,

    /// JSON file replacing the built-in translations
    #[arg(long, env = "EXPORT_TRANSLATIONS_PATH")]
    pub translations_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_bucket: "eviction-lab-exports".into(),
            asset_bucket: "eviction-lab-export-assets".into(),
            stage: "prod".into(),
            storage_endpoint: "https://s3.amazonaws.com".into(),
            public_base_url: "https://s3.amazonaws.com".into(),
            screenshot_base: "https://screenshot.evictionlab.org".into(),
            pdf_path: None,
            font_path: None,
            tables_path: None,
            translations_path: None,
        }
    }
}

fn staged(bucket: &str, stage: &str) -> String {
    if stage == "dev" {
        format!("{bucket}-dev")
    } else {
        bucket.to_string()
    }
}

impl ExportConfig {
    /// Export bucket for the configured stage.
    pub fn bucket(&self) -> String {
        staged(&self.export_bucket, &self.stage)
    }

    pub fn assets_bucket(&self) -> String {
        staged(&self.asset_bucket, &self.stage)
    }

    /// Public URL of an export key.
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket(),
            key
        )
    }

    pub fn load_tables(&self) -> Result<StatTables> {
        match &self.tables_path {
            Some(p) => StatTables::from_path(p),
            None => StatTables::builtin(),
        }
    }

    pub fn load_translations(&self) -> Result<Translations> {
        match &self.translations_path {
            Some(p) => Translations::from_path(p),
            None => Translations::builtin(),
        }
    }
}
